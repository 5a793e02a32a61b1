use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown header magic `{0}`; expected 00 or 20")]
    UnknownHeaderMagic(String),

    #[error("Unknown text encoding `{0}`")]
    UnknownEncoding(String),

    #[error("Cannot name entry after file `{file_name}`")]
    EntryName {
        file_name: String,
        #[source]
        source: afs_format::ValidationError,
    },

    #[error("Invalid block alignment `{0}`; expected a positive number")]
    InvalidAlignment(String),

    #[error("Cannot open archive `{}`", .path.display())]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: afs_format::Error,
    },

    #[error("Cannot extract archive into `{}`", .path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: afs_format::Error,
    },

    #[error("Cannot read metadata `{}`", .path.display())]
    LoadMetadata {
        path: PathBuf,
        #[source]
        source: afs_format::Error,
    },

    #[error("Cannot write metadata `{}`", .path.display())]
    SaveMetadata {
        path: PathBuf,
        #[source]
        source: afs_format::Error,
    },

    #[error("Cannot collect entries from `{}`", .path.display())]
    CollectEntries {
        path: PathBuf,
        #[source]
        source: afs_format::Error,
    },

    #[error("Cannot read directory `{}`", .path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input directory does not exist: `{}`", .path.display())]
    MissingDirectory { path: PathBuf },

    #[error("Cannot write archive `{}`", .path.display())]
    SaveArchive {
        path: PathBuf,
        #[source]
        source: afs_format::Error,
    },
}

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("I/O failure while processing AFS data")]
    Io(#[from] std::io::Error),
}

/// The stream does not hold AFS data this library can understand.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Stream doesn't seem to contain valid AFS data (magic: {0:#010x}).")]
    InvalidMagic(u32),

    #[error("Table of contents for {entry_count} entries does not fit in a stream of {stream_len} bytes.")]
    TruncatedToc { entry_count: u32, stream_len: u64 },
}

/// The caller handed in something the archive model cannot hold.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Entry name can't be empty.")]
    EmptyName,

    #[error("Entry name can't be longer than {max} bytes: \"{name}\".")]
    NameTooLong { name: String, max: usize },

    #[error("Entry name contains characters that can't be encoded: \"{0}\".")]
    UnencodableName(String),

    #[error("Entry name contains invalid characters: \"{0}\".")]
    InvalidNameCharacters(String),

    #[error("No entry at index {index} (archive has {count} entries).")]
    NoSuchEntry { index: usize, count: usize },

    #[error("Entry at index {0} is a null entry.")]
    NullEntry(usize),

    #[error("Can't save into the same file the AFS data is being read from. Path: '{}'", .0.display())]
    SameStream(PathBuf),

    #[error("Block alignment must be greater than zero.")]
    ZeroAlignment,

    #[error("File is too big to be stored in an AFS archive. Path: '{}'", .0.display())]
    FileTooLarge(PathBuf),

    #[error("Entry data is too big to be stored in an AFS archive ({0} bytes).")]
    DataTooLarge(u64),

    #[error("Archive layout exceeds the 4 GiB addressable by AFS offsets.")]
    LayoutOverflow,

    #[error("File \"{}\" has not been found.", .0.display())]
    FileNotFound(PathBuf),
}

/// Loading or upgrading a metadata sidecar failed.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Metadata version {found} is newer than the latest supported version {supported}.")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Could not read the size of \"{file_name}\" to fill in its custom data.")]
    MissingFile {
        file_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata entry \"{0}\" has no file name.")]
    MissingFileName(String),

    #[error("Metadata is not valid JSON for version {version}.")]
    Malformed {
        version: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("Metadata could not be parsed.")]
    Parse(#[source] serde_json::Error),
}

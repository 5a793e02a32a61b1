use std::path::Path;

use afs_format::{Archive, MetadataRecord, MetadataStore};

use crate::error::{Error, Result};
use crate::util::{format_size, print_notification};

pub fn run(archive_path: &Path, output: &Path) -> Result<()> {
    let mut progress = print_notification;

    let mut archive =
        Archive::open(archive_path, &mut progress).map_err(|source| Error::OpenArchive {
            path: archive_path.to_path_buf(),
            source,
        })?;

    let stats = archive
        .extract_all(output, &mut progress)
        .map_err(|source| Error::Extract {
            path: output.to_path_buf(),
            source,
        })?;

    let store = MetadataStore::for_directory(output);
    store
        .save(&MetadataRecord::from_archive(&archive))
        .map_err(|source| Error::SaveMetadata {
            path: store.path().to_path_buf(),
            source,
        })?;

    println!(
        "Extracted {} files ({}) to {}",
        stats.files,
        format_size(stats.bytes),
        output.display()
    );
    if stats.null_entries > 0 {
        println!("Skipped {} null entries", stats.null_entries);
    }
    if stats.invalid_dates > 0 {
        eprintln!(
            "WARNING: {} entries had invalid dates and kept the extraction time",
            stats.invalid_dates
        );
    }
    println!("Metadata written to {}", store.path().display());

    Ok(())
}

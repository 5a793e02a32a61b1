use std::path::Path;

use afs_format::metadata::DirectoryFileSizes;
use afs_format::{names, HeaderMagic, MetadataRecord, MetadataStore};
use encoding_rs::Encoding;

use crate::error::{Error, Result};
use crate::util::{format_size, print_notification};

pub fn run(
    input: &Path,
    archive_path: &Path,
    alignment: Option<u32>,
    header_magic: Option<HeaderMagic>,
    encoding: Option<&'static Encoding>,
) -> Result<()> {
    if !input.is_dir() {
        return Err(Error::MissingDirectory {
            path: input.to_path_buf(),
        });
    }

    let store = MetadataStore::for_directory(input);
    let mut record = if store.exists() {
        store
            .load_and_upgrade(input)
            .map_err(|source| Error::LoadMetadata {
                path: store.path().to_path_buf(),
                source,
            })?
    } else {
        tracing::info!(
            "no metadata at {}; archiving every file in {}",
            store.path().display(),
            input.display()
        );
        let file_names = list_files(input, archive_path)?;
        let mut record = MetadataRecord::from_file_names(file_names, &DirectoryFileSizes::new(input))
            .map_err(|source| Error::CollectEntries {
                path: input.to_path_buf(),
                source: source.into(),
            })?;

        if let Some(encoding) = encoding {
            for entry in record.entries.iter_mut() {
                entry.name = names::raw_name_from_text(&entry.file_name, encoding).map_err(
                    |source| Error::EntryName {
                        file_name: entry.file_name.clone(),
                        source,
                    },
                )?;
            }
        }
        record
    };

    if let Some(alignment) = alignment {
        record.entry_block_alignment = alignment;
    }
    if let Some(header_magic) = header_magic {
        record.header_magic_type = header_magic;
    }

    let mut archive = record
        .to_archive(input)
        .map_err(|source| Error::CollectEntries {
            path: input.to_path_buf(),
            source,
        })?;

    let mut progress = print_notification;
    let length = archive
        .save_to_path(archive_path, &mut progress)
        .map_err(|source| Error::SaveArchive {
            path: archive_path.to_path_buf(),
            source,
        })?;

    println!(
        "Wrote {} entries ({}) to {}",
        archive.entry_count(),
        format_size(length),
        archive_path.display()
    );

    Ok(())
}

/// Regular files directly inside `dir`, sorted by name, leaving out the archive being written.
fn list_files(dir: &Path, archive_path: &Path) -> Result<Vec<String>> {
    let archive_path = archive_path.canonicalize().ok();
    let mut file_names = vec![];

    for entry in jwalk::WalkDir::new(dir)
        .skip_hidden(false)
        .min_depth(1)
        .max_depth(1)
        .sort(true)
    {
        let entry = entry.map_err(|e| Error::ReadDirectory {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        if archive_path.is_some() && path.canonicalize().ok() == archive_path {
            continue;
        }

        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => file_names.push(name.to_string()),
            None => tracing::warn!("skipping file with a non UTF-8 name: {}", path.display()),
        }
    }

    Ok(file_names)
}

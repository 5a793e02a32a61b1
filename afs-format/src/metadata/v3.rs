//! Version 3 sidecars, the current schema.
//!
//! v3 differences from v2:
//! - `UnknownAttribute`/`HasUnknownAttribute` become a plain `CustomData`
//! - `AllAttributesContainEntrySize` records whether every custom value equals its file size

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::archive::Archive;
use crate::entry::Entry;
use crate::error::{MigrationError, Result};
use crate::header::{AttributeLayout, HeaderMagic};
use crate::names;

use super::{v1, FileSizeSource, CURRENT_VERSION};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataRecord {
    pub metadata_version: u32,
    #[serde(deserialize_with = "super::header_magic")]
    pub header_magic_type: HeaderMagic,
    #[serde(deserialize_with = "super::attribute_layout")]
    pub attributes_info_type: AttributeLayout,
    #[serde(default = "super::default_alignment")]
    pub entry_block_alignment: u32,
    #[serde(default)]
    pub all_attributes_contain_entry_size: bool,
    pub entries: Vec<MetadataEntry>,
}

/// `name` is the raw in-archive name; `file_name` is the extracted file holding the bytes.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataEntry {
    #[serde(default)]
    pub is_null: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub custom_data: u32,
}

impl MetadataEntry {
    pub fn null() -> MetadataEntry {
        MetadataEntry {
            is_null: true,
            ..MetadataEntry::default()
        }
    }
}

impl MetadataRecord {
    /// Describes `archive` as it would be extracted: each entry's file name is its unique
    /// sanitized name.
    pub fn from_archive(archive: &Archive<'_>) -> MetadataRecord {
        let entries: Vec<MetadataEntry> = archive
            .entries()
            .iter()
            .map(|entry| match entry {
                Entry::Null => MetadataEntry::null(),
                Entry::Data(data) => MetadataEntry {
                    is_null: false,
                    name: data.raw_name().to_string(),
                    file_name: data.name().to_string(),
                    custom_data: data.custom_data(),
                },
            })
            .collect();

        let all_attributes_contain_entry_size = archive
            .entries()
            .iter()
            .filter_map(Entry::as_data)
            .all(|d| d.custom_data() == d.size());

        MetadataRecord {
            metadata_version: CURRENT_VERSION,
            header_magic_type: archive.header_magic(),
            attributes_info_type: archive.attribute_layout(),
            entry_block_alignment: archive.alignment(),
            all_attributes_contain_entry_size,
            entries,
        }
    }

    /// Describes a plain directory listing: one entry per file, in the given order.
    pub fn from_file_names<I: IntoIterator<Item = String>>(
        file_names: I,
        sizes: &dyn FileSizeSource,
    ) -> std::result::Result<MetadataRecord, MigrationError> {
        v1::Record::from_file_names(file_names).upgrade().upgrade(sizes)
    }

    /// Builds an archive whose entries read their bytes from the files in `files_dir`.
    ///
    /// When `AllAttributesContainEntrySize` is set, custom data follows the current file
    /// sizes; otherwise the stored values are written as they are.
    pub fn to_archive<P: AsRef<Path>>(&self, files_dir: P) -> Result<Archive<'static>> {
        let files_dir = files_dir.as_ref();

        let mut archive = Archive::new();
        archive.set_header_magic(self.header_magic_type);
        archive.set_attribute_layout(self.attributes_info_type);
        archive.set_alignment(self.entry_block_alignment)?;

        for entry in &self.entries {
            if entry.is_null {
                archive.add_null();
                continue;
            }

            if entry.file_name.is_empty() {
                return Err(MigrationError::MissingFileName(entry.name.clone()).into());
            }

            let path = files_dir.join(names::relative_file_path(&entry.file_name));
            let index = archive.add_file(&path, &entry.name)?;
            if !self.all_attributes_contain_entry_size {
                archive.set_custom_data(index, entry.custom_data)?;
            }
        }

        Ok(archive)
    }
}

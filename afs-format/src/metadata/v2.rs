//! Version 2 sidecars.
//!
//! v2 differences from v1:
//! - Entries carry `IsNull`, `Name` (raw name) and `FileName`
//! - `EntryBlockAlignment` is recorded
//! - The opaque attribute field is `UnknownAttribute`, guarded by `HasUnknownAttribute`

use serde::{Deserialize, Serialize};

use crate::error::MigrationError;
use crate::header::{AttributeLayout, HeaderMagic};

use super::v3::{MetadataEntry, MetadataRecord};
use super::FileSizeSource;

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    pub metadata_version: u32,

    #[serde(default, deserialize_with = "super::header_magic")]
    pub header_magic_type: HeaderMagic,

    #[serde(default, deserialize_with = "super::attribute_layout")]
    pub attributes_info_type: AttributeLayout,

    #[serde(default = "super::default_alignment")]
    pub entry_block_alignment: u32,

    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entry {
    #[serde(default)]
    pub is_null: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub has_unknown_attribute: bool,
    #[serde(default)]
    pub unknown_attribute: u32,
}

impl Record {
    /// Entries without an opaque value get the size of their extracted file as custom data.
    pub fn upgrade(self, sizes: &dyn FileSizeSource) -> Result<MetadataRecord, MigrationError> {
        let mut all_sizes = true;
        let mut entries = Vec::with_capacity(self.entries.len());

        for entry in self.entries {
            if entry.is_null {
                entries.push(MetadataEntry::null());
                continue;
            }

            if entry.file_name.is_empty() {
                return Err(MigrationError::MissingFileName(entry.name));
            }

            let custom_data = if entry.has_unknown_attribute {
                let matches_size = sizes
                    .file_size(&entry.file_name)
                    .map_or(false, |size| size == entry.unknown_attribute as u64);
                all_sizes &= matches_size;
                entry.unknown_attribute
            } else {
                let size = sizes
                    .file_size(&entry.file_name)
                    .map_err(|source| MigrationError::MissingFile {
                        file_name: entry.file_name.clone(),
                        source,
                    })?;
                u32::try_from(size).unwrap_or(u32::MAX)
            };

            entries.push(MetadataEntry {
                is_null: false,
                name: entry.name,
                file_name: entry.file_name,
                custom_data,
            });
        }

        Ok(MetadataRecord {
            metadata_version: 3,
            header_magic_type: self.header_magic_type,
            attributes_info_type: self.attributes_info_type,
            entry_block_alignment: self.entry_block_alignment,
            all_attributes_contain_entry_size: all_sizes,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tests::FixedSizes;

    fn entry(name: &str, unknown: Option<u32>) -> Entry {
        Entry {
            is_null: false,
            name: name.into(),
            file_name: name.into(),
            has_unknown_attribute: unknown.is_some(),
            unknown_attribute: unknown.unwrap_or(0),
        }
    }

    fn record(entries: Vec<Entry>) -> Record {
        Record {
            metadata_version: 2,
            entry_block_alignment: 0x800,
            entries,
            ..Record::default()
        }
    }

    #[test]
    fn opaque_values_are_kept() {
        let sizes = FixedSizes([("a", 10), ("b", 20)].into_iter().collect());
        let v3 = record(vec![entry("a", None), entry("b", Some(0xcafe))])
            .upgrade(&sizes)
            .unwrap();

        assert_eq!(v3.entries[0].custom_data, 10);
        assert_eq!(v3.entries[1].custom_data, 0xcafe);
        assert!(!v3.all_attributes_contain_entry_size);
    }

    #[test]
    fn opaque_value_equal_to_size_keeps_flag() {
        let sizes = FixedSizes([("a", 10), ("b", 20)].into_iter().collect());
        let v3 = record(vec![entry("a", None), entry("b", Some(20))])
            .upgrade(&sizes)
            .unwrap();
        assert!(v3.all_attributes_contain_entry_size);
    }

    #[test]
    fn null_entries_need_no_file() {
        let sizes = FixedSizes([("a", 3)].into_iter().collect());
        let mut null = entry("", None);
        null.is_null = true;

        let v3 = record(vec![null, entry("a", None)]).upgrade(&sizes).unwrap();
        assert!(v3.entries[0].is_null);
        assert_eq!(v3.entries[1].custom_data, 3);
        assert!(v3.all_attributes_contain_entry_size);
    }

    #[test]
    fn data_entry_without_file_name_fails() {
        let sizes = FixedSizes(Default::default());
        let mut e = entry("a", None);
        e.file_name.clear();
        assert!(matches!(
            record(vec![e]).upgrade(&sizes),
            Err(MigrationError::MissingFileName(name)) if name == "a"
        ));
    }
}

//! Version 1 sidecars.
//!
//! Two shapes were written under this version:
//! - the entry form: `Entries` of `{ RawName, Name }`, where `Name` is the extracted file name
//! - the list form: `FileNames` plus `HeaderType`/`AttributesType`, with names doubling as raw names
//!
//! Neither shape can describe null entries or a block alignment.

use serde::{Deserialize, Serialize};

use crate::header::{AttributeLayout, HeaderMagic};

use super::v2;

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    #[serde(default)]
    pub metadata_version: u32,

    #[serde(alias = "HeaderType", default, deserialize_with = "super::header_magic")]
    pub header_magic_type: HeaderMagic,

    #[serde(alias = "AttributesType", default, deserialize_with = "super::attribute_layout")]
    pub attributes_info_type: AttributeLayout,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<Entry>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entry {
    #[serde(default)]
    pub raw_name: Option<String>,
    #[serde(default)]
    pub name: String,
}

impl Record {
    /// A list-form record for a plain directory of files, as if it had been written by
    /// the oldest tooling.
    pub fn from_file_names<I: IntoIterator<Item = String>>(file_names: I) -> Record {
        Record {
            metadata_version: 1,
            header_magic_type: HeaderMagic::Afs00,
            attributes_info_type: AttributeLayout::Beginning,
            entries: None,
            file_names: Some(file_names.into_iter().collect()),
        }
    }

    /// Display names become file names; raw names become names.
    pub fn upgrade(self) -> v2::Record {
        let entries = match (self.entries, self.file_names) {
            (Some(entries), _) => entries
                .into_iter()
                .map(|e| v2::Entry {
                    name: e.raw_name.unwrap_or_else(|| e.name.clone()),
                    file_name: e.name,
                    ..v2::Entry::default()
                })
                .collect(),
            (None, Some(file_names)) => file_names
                .into_iter()
                .map(|f| v2::Entry {
                    name: f.clone(),
                    file_name: f,
                    ..v2::Entry::default()
                })
                .collect(),
            (None, None) => vec![],
        };

        v2::Record {
            metadata_version: 2,
            header_magic_type: self.header_magic_type,
            attributes_info_type: self.attributes_info_type,
            entry_block_alignment: super::default_alignment(),
            entries,
        }
    }
}

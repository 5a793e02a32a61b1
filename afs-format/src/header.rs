use std::fmt;

use serde::{Deserialize, Serialize};

pub mod constants {
    /// `AFS\0`
    pub const HEADER_MAGIC_00: u32 = 0x0053_4641;
    /// `AFS ` (trailing space)
    pub const HEADER_MAGIC_20: u32 = 0x2053_4641;

    pub const HEADER_SIZE: u32 = 0x8;
    pub const TOC_ELEMENT_SIZE: u32 = 0x8;
    pub const ATTRIBUTE_INFO_SIZE: u32 = 0x8;
    pub const ATTRIBUTE_ELEMENT_SIZE: u32 = 0x30;
    pub const MAX_ENTRY_NAME_LENGTH: usize = 0x20;
    pub const DEFAULT_BLOCK_ALIGNMENT: u32 = 0x800;
}

use self::constants::*;

/// The two 4-byte magics found in the wild.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum HeaderMagic {
    /// `AFS` followed by 0x00.
    #[serde(rename = "AFS_00")]
    Afs00,
    /// `AFS` followed by 0x20.
    #[serde(rename = "AFS_20")]
    Afs20,
}

impl Default for HeaderMagic {
    fn default() -> Self {
        HeaderMagic::Afs00
    }
}

impl HeaderMagic {
    pub const fn from_u32(magic: u32) -> Option<HeaderMagic> {
        match magic {
            HEADER_MAGIC_00 => Some(HeaderMagic::Afs00),
            HEADER_MAGIC_20 => Some(HeaderMagic::Afs20),
            _ => None,
        }
    }

    pub const fn id(self) -> u32 {
        match self {
            HeaderMagic::Afs00 => HEADER_MAGIC_00,
            HeaderMagic::Afs20 => HEADER_MAGIC_20,
        }
    }
}

impl fmt::Display for HeaderMagic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderMagic::Afs00 => f.write_str("AFS_00"),
            HeaderMagic::Afs20 => f.write_str("AFS_20"),
        }
    }
}

/// Where the attribute-info pointer lives, if the archive has an attribute table at all.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AttributeLayout {
    #[serde(rename = "NoAttributes")]
    None,
    /// Pointer immediately follows the table of contents.
    #[serde(rename = "InfoAtBeginning")]
    Beginning,
    /// Pointer occupies the 8 bytes just before the first entry's data.
    #[serde(rename = "InfoAtEnd")]
    End,
}

impl Default for AttributeLayout {
    fn default() -> Self {
        AttributeLayout::Beginning
    }
}

impl AttributeLayout {
    #[inline(always)]
    pub fn has_attributes(self) -> bool {
        self != AttributeLayout::None
    }
}

impl fmt::Display for AttributeLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttributeLayout::None => "NoAttributes",
            AttributeLayout::Beginning => "InfoAtBeginning",
            AttributeLayout::End => "InfoAtEnd",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct AfsHeader {
    pub(crate) magic: HeaderMagic,
    pub(crate) entry_count: u32,
}

/// One `(offset, size)` pair of the table of contents.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct TocRecord {
    pub offset: u32,
    pub size: u32,
}

impl TocRecord {
    pub const NULL: TocRecord = TocRecord { offset: 0, size: 0 };

    #[inline(always)]
    pub fn is_null(self) -> bool {
        self.offset == 0 && self.size == 0
    }

    #[inline(always)]
    pub fn end(self) -> u64 {
        self.offset as u64 + self.size as u64
    }
}

/// The `(offset, size)` pointer to the attribute table.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct AttributeInfo {
    pub offset: u32,
    pub size: u32,
}

/// One 0x30-byte row of the attribute table.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub(crate) struct AttributeRecord {
    pub(crate) name: [u8; MAX_ENTRY_NAME_LENGTH],
    pub(crate) last_write_time: crate::entry::LastWriteTime,
    pub(crate) custom_data: u32,
}

/// Byte position of the attribute-info slot that sits right after the table of contents.
#[inline(always)]
pub(crate) fn attribute_info_beginning_offset(entry_count: u32) -> u64 {
    HEADER_SIZE as u64 + entry_count as u64 * TOC_ELEMENT_SIZE as u64
}

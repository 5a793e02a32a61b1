//! Finding the attribute table.
//!
//! The attribute-info pointer is not self-describing: one producer writes it right after
//! the table of contents, another writes it in the 8 bytes just before the first entry's
//! data, and archives without attributes often hold leftover garbage in either slot. Both
//! slots are probed in that order and a candidate is only accepted if it describes a table
//! that sits after all entry data, fits in the file and is large enough for one record per
//! entry.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::header::constants::*;
use crate::header::{attribute_info_beginning_offset, AttributeInfo, AttributeLayout, TocRecord};

/// Span covered by entry data, computed over non-null TOC records.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DataBlock {
    pub start: u64,
    pub end: u64,
}

impl DataBlock {
    /// `None` when every record is null.
    pub fn from_toc(toc: &[TocRecord]) -> Option<DataBlock> {
        let mut present = toc.iter().filter(|r| !r.is_null());
        let first = present.next()?;

        let block = present.fold(
            DataBlock {
                start: first.offset as u64,
                end: first.end(),
            },
            |block, r| DataBlock {
                start: block.start.min(r.offset as u64),
                end: block.end.max(r.end()),
            },
        );
        Some(block)
    }
}

/// Outcome of probing for the attribute table.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Located {
    pub layout: AttributeLayout,
    pub table: Option<AttributeInfo>,
}

impl Located {
    const NONE: Located = Located {
        layout: AttributeLayout::None,
        table: None,
    };
}

/// Whether `info` plausibly points at an attribute table.
///
/// A size of zero is always rejected. An archive with no entries saved with attributes
/// gets a pointer to an empty table, so it reads back as having none.
pub fn is_attribute_info_valid(
    info: AttributeInfo,
    file_length: u64,
    data_block_end: u64,
    entry_count: u32,
) -> bool {
    let offset = info.offset as u64;
    let size = info.size as u64;

    // All zeroes is how writers say "no attributes".
    if offset == 0 || size == 0 {
        return false;
    }

    if size > file_length.saturating_sub(data_block_end) {
        return false;
    }
    if size < entry_count as u64 * ATTRIBUTE_ELEMENT_SIZE as u64 {
        return false;
    }
    if offset < data_block_end {
        return false;
    }
    if offset > file_length - size {
        return false;
    }

    true
}

/// Decides between the two candidate slots. Kept free of I/O so the heuristic can be
/// exercised on its own.
pub fn choose(
    at_beginning: Option<AttributeInfo>,
    at_end: Option<AttributeInfo>,
    file_length: u64,
    data_block_end: u64,
    entry_count: u32,
) -> Located {
    let valid = |info: &AttributeInfo| {
        is_attribute_info_valid(*info, file_length, data_block_end, entry_count)
    };

    if let Some(info) = at_beginning.filter(valid) {
        return Located {
            layout: AttributeLayout::Beginning,
            table: Some(info),
        };
    }

    tracing::debug!("attribute info not found after the table of contents, trying before the data block");

    if let Some(info) = at_end.filter(valid) {
        return Located {
            layout: AttributeLayout::End,
            table: Some(info),
        };
    }

    tracing::debug!("no valid attribute info found, archive has no attributes");
    Located::NONE
}

/// Reads both candidate slots from `reader` and picks one.
pub fn locate<R: Read + Seek>(
    reader: &mut R,
    toc: &[TocRecord],
    file_length: u64,
) -> std::io::Result<Located> {
    let entry_count = toc.len() as u32;
    let data_block = DataBlock::from_toc(toc);
    let data_block_end = data_block.map_or(0, |b| b.end);

    let at_beginning = read_info_at(reader, attribute_info_beginning_offset(entry_count))?;

    let at_end = match data_block.and_then(|b| b.start.checked_sub(ATTRIBUTE_INFO_SIZE as u64)) {
        Some(pos) => read_info_at(reader, pos)?,
        None => None,
    };

    Ok(choose(
        at_beginning,
        at_end,
        file_length,
        data_block_end,
        entry_count,
    ))
}

/// A slot that runs past the end of the stream is simply not a candidate.
fn read_info_at<R: Read + Seek>(reader: &mut R, pos: u64) -> std::io::Result<Option<AttributeInfo>> {
    reader.seek(SeekFrom::Start(pos))?;

    let offset = match reader.read_u32::<LittleEndian>() {
        Ok(v) => v,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    let size = match reader.read_u32::<LittleEndian>() {
        Ok(v) => v,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };

    tracing::debug!(
        pos = format_args!("{:#x}", pos),
        offset = format_args!("{:#x}", offset),
        size = format_args!("{:#x}", size),
        "read attribute info candidate"
    );

    Ok(Some(AttributeInfo { offset, size }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn toc() -> Vec<TocRecord> {
        vec![
            TocRecord { offset: 0x800, size: 0x10 },
            TocRecord::NULL,
            TocRecord { offset: 0x1000, size: 0x20 },
        ]
    }

    /// 3 entries, data up to 0x1020, attribute table at 0x1800.
    fn archive_with_info_at(slot: Option<u64>, info: AttributeInfo) -> Vec<u8> {
        let mut bytes = vec![0u8; 0x2000];
        let mut pos = 8;
        for r in toc() {
            bytes[pos..pos + 4].copy_from_slice(&r.offset.to_le_bytes());
            bytes[pos + 4..pos + 8].copy_from_slice(&r.size.to_le_bytes());
            pos += 8;
        }
        if let Some(slot) = slot {
            let slot = slot as usize;
            bytes[slot..slot + 4].copy_from_slice(&info.offset.to_le_bytes());
            bytes[slot + 4..slot + 8].copy_from_slice(&info.size.to_le_bytes());
        }
        bytes
    }

    const GOOD: AttributeInfo = AttributeInfo { offset: 0x1800, size: 3 * 0x30 };

    #[test]
    fn data_block_skips_null_records() {
        assert_eq!(
            DataBlock::from_toc(&toc()),
            Some(DataBlock { start: 0x800, end: 0x1020 })
        );
        assert_eq!(DataBlock::from_toc(&[TocRecord::NULL]), None);
    }

    #[test]
    fn finds_info_at_beginning() {
        let bytes = archive_with_info_at(Some(8 + 3 * 8), GOOD);
        let located = locate(&mut Cursor::new(&bytes), &toc(), bytes.len() as u64).unwrap();
        assert_eq!(located.layout, AttributeLayout::Beginning);
        assert_eq!(located.table, Some(GOOD));
    }

    #[test]
    fn finds_info_at_end() {
        let bytes = archive_with_info_at(Some(0x800 - 8), GOOD);
        let located = locate(&mut Cursor::new(&bytes), &toc(), bytes.len() as u64).unwrap();
        assert_eq!(located.layout, AttributeLayout::End);
        assert_eq!(located.table, Some(GOOD));
    }

    #[test]
    fn garbage_is_rejected() {
        let garbage = AttributeInfo { offset: 0xdead_beef, size: 0x1234 };
        let bytes = archive_with_info_at(Some(0x800 - 8), garbage);
        let located = locate(&mut Cursor::new(&bytes), &toc(), bytes.len() as u64).unwrap();
        assert_eq!(located, Located::NONE);

        let bytes = archive_with_info_at(None, GOOD);
        let located = locate(&mut Cursor::new(&bytes), &toc(), bytes.len() as u64).unwrap();
        assert_eq!(located.layout, AttributeLayout::None);
    }

    #[test]
    fn every_bound_is_checked() {
        let len = 0x2000;
        let end = 0x1020;
        let ok = |offset, size| is_attribute_info_valid(AttributeInfo { offset, size }, len, end, 3);

        assert!(ok(0x1800, 0x90));
        assert!(ok(0x1020, 0x90));
        assert!(!ok(0, 0x90));
        assert!(!ok(0x1800, 0));
        assert!(!ok(0x1800, 0x8f), "too small for 3 records");
        assert!(!ok(0x1000, 0x90), "starts inside the data block");
        assert!(!ok(0x1fa0, 0x90), "runs past the end of the file");
        assert!(!ok(0x1020, 0xfe1), "bigger than the space after the data");
    }

    #[test]
    fn beginning_wins_when_both_are_valid() {
        let other = AttributeInfo { offset: 0x1900, size: 0x90 };
        let located = choose(Some(GOOD), Some(other), 0x2000, 0x1020, 3);
        assert_eq!(located.layout, AttributeLayout::Beginning);
        assert_eq!(located.table, Some(GOOD));
    }

    #[test]
    fn truncated_stream_is_not_an_error() {
        let bytes = vec![0u8; 10];
        let located = locate(&mut Cursor::new(&bytes), &[], bytes.len() as u64).unwrap();
        assert_eq!(located, Located::NONE);
    }
}

use std::io::{Read, Seek};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::entry::LastWriteTime;
use crate::error::{FormatError, Result};
use crate::header::constants::MAX_ENTRY_NAME_LENGTH;
use crate::header::{AfsHeader, AttributeRecord, HeaderMagic, TocRecord};

pub(crate) trait DeserializeOwned {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self>
    where
        Self: Sized;
}

impl DeserializeOwned for TocRecord {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let offset = reader.read_u32::<LittleEndian>()?;
        let size = reader.read_u32::<LittleEndian>()?;
        Ok(TocRecord { offset, size })
    }
}

impl DeserializeOwned for LastWriteTime {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(LastWriteTime {
            year: reader.read_u16::<LittleEndian>()?,
            month: reader.read_u16::<LittleEndian>()?,
            day: reader.read_u16::<LittleEndian>()?,
            hour: reader.read_u16::<LittleEndian>()?,
            minute: reader.read_u16::<LittleEndian>()?,
            second: reader.read_u16::<LittleEndian>()?,
        })
    }
}

impl DeserializeOwned for AttributeRecord {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut name = [0u8; MAX_ENTRY_NAME_LENGTH];
        reader.read_exact(&mut name)?;
        let last_write_time = LastWriteTime::deserialize_owned(reader)?;
        let custom_data = reader.read_u32::<LittleEndian>()?;

        Ok(AttributeRecord {
            name,
            last_write_time,
            custom_data,
        })
    }
}

/// Reads the magic and entry count. Anything but the two known magics is a format error.
pub(crate) fn read_header<R: Read + Seek>(reader: &mut R) -> Result<AfsHeader> {
    let start = reader.stream_position()?;
    let raw_magic = reader.read_u32::<LittleEndian>()?;
    let magic = HeaderMagic::from_u32(raw_magic).ok_or(FormatError::InvalidMagic(raw_magic))?;
    let entry_count = reader.read_u32::<LittleEndian>()?;

    tracing::debug!(
        start = format_args!("{:#x}", start),
        %magic,
        entry_count,
        "deserialized AfsHeader"
    );

    Ok(AfsHeader { magic, entry_count })
}

pub(crate) fn read_toc<R: Read + Seek>(
    reader: &mut R,
    entry_count: u32,
) -> std::io::Result<Vec<TocRecord>> {
    let start = reader.stream_position()?;
    let mut toc = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        toc.push(TocRecord::deserialize_owned(reader)?);
    }
    let end = reader.stream_position()?;

    tracing::debug!(
        start = format_args!("{:#x}", start),
        end = format_args!("{:#x}", end),
        bytes = end - start,
        count = entry_count,
        "deserialized TOC"
    );

    Ok(toc)
}

use std::io::{Read, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::entry::LastWriteTime;
use crate::header::{AfsHeader, AttributeInfo, AttributeRecord, TocRecord};

pub(crate) trait Serialize {
    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;
}

impl Serialize for AfsHeader {
    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.magic.id())?;
        writer.write_u32::<LittleEndian>(self.entry_count)
    }
}

impl Serialize for TocRecord {
    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.size)
    }
}

impl Serialize for AttributeInfo {
    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.size)
    }
}

impl Serialize for LastWriteTime {
    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u16::<LittleEndian>(self.year)?;
        writer.write_u16::<LittleEndian>(self.month)?;
        writer.write_u16::<LittleEndian>(self.day)?;
        writer.write_u16::<LittleEndian>(self.hour)?;
        writer.write_u16::<LittleEndian>(self.minute)?;
        writer.write_u16::<LittleEndian>(self.second)
    }
}

impl Serialize for AttributeRecord {
    fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.name)?;
        self.last_write_time.write(writer)?;
        writer.write_u32::<LittleEndian>(self.custom_data)
    }
}

/// Writes `count` zero bytes.
pub(crate) fn write_zeroes<W: Write>(writer: &mut W, count: u64) -> std::io::Result<()> {
    std::io::copy(&mut std::io::repeat(0).take(count), writer).map(|_| ())
}

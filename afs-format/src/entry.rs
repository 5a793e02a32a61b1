use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// One slot of the table of contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A reserved slot with no data: `(0, 0)` in the table of contents.
    Null,
    Data(DataEntry),
}

impl Entry {
    #[inline(always)]
    pub fn is_null(&self) -> bool {
        matches!(self, Entry::Null)
    }

    #[inline(always)]
    pub fn as_data(&self) -> Option<&DataEntry> {
        match self {
            Entry::Data(data) => Some(data),
            Entry::Null => None,
        }
    }

    #[inline(always)]
    pub(crate) fn as_data_mut(&mut self) -> Option<&mut DataEntry> {
        match self {
            Entry::Data(data) => Some(data),
            Entry::Null => None,
        }
    }

    /// Size of the entry's data, `None` for null entries.
    #[inline(always)]
    pub fn size(&self) -> Option<u32> {
        self.as_data().map(|d| d.size)
    }
}

/// Where an entry's bytes come from when it is read or written.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EntrySource {
    /// A region of the archive this entry was parsed from.
    Archive { offset: u32 },
    File(PathBuf),
    Memory(Vec<u8>),
}

#[derive(Clone, PartialEq)]
pub struct DataEntry {
    pub(crate) raw_name: String,
    pub(crate) name: String,
    pub(crate) size: u32,
    pub(crate) last_write_time: LastWriteTime,
    pub(crate) custom_data: u32,
    pub(crate) source: EntrySource,
}

impl DataEntry {
    pub(crate) fn new(
        raw_name: String,
        size: u32,
        last_write_time: LastWriteTime,
        custom_data: u32,
        source: EntrySource,
    ) -> DataEntry {
        DataEntry {
            name: raw_name.clone(),
            raw_name,
            size,
            last_write_time,
            custom_data,
            source,
        }
    }

    /// The name as stored in the archive's attribute table.
    #[inline(always)]
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// A name safe to use on disk, unique within its archive.
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline(always)]
    pub fn last_write_time(&self) -> LastWriteTime {
        self.last_write_time
    }

    /// Often the file size, sometimes a game-specific value. Kept verbatim.
    #[inline(always)]
    pub fn custom_data(&self) -> u32 {
        self.custom_data
    }

    /// Offset of the data in the archive this entry was read from.
    pub fn archive_offset(&self) -> Option<u32> {
        match self.source {
            EntrySource::Archive { offset } => Some(offset),
            _ => None,
        }
    }

    /// Path of the file this entry will be packed from, if it was added from disk.
    pub fn source_path(&self) -> Option<&Path> {
        match &self.source {
            EntrySource::File(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Debug for DataEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            EntrySource::Archive { offset } => format!("archive@{:#x}", offset),
            EntrySource::File(path) => format!("file:{}", path.display()),
            EntrySource::Memory(data) => format!("memory[{}]", data.len()),
        };
        f.debug_struct("DataEntry")
            .field("raw_name", &self.raw_name)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("last_write_time", &self.last_write_time)
            .field("custom_data", &format_args!("{:#x}", self.custom_data))
            .field("source", &source)
            .finish()
    }
}

/// The six 16-bit date fields of an attribute record, exactly as stored.
///
/// Archives in the wild contain zeroed or otherwise impossible dates, so nothing is validated
/// until the value is converted with [`LastWriteTime::to_naive`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct LastWriteTime {
    pub year: u16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
}

impl LastWriteTime {
    /// `None` when the fields do not form a real calendar date and time.
    pub fn to_naive(self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?.and_hms_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
        )
    }

    pub fn from_naive(time: NaiveDateTime) -> LastWriteTime {
        LastWriteTime {
            year: u16::try_from(time.year()).unwrap_or(0),
            month: time.month() as u16,
            day: time.day() as u16,
            hour: time.hour() as u16,
            minute: time.minute() as u16,
            second: time.second() as u16,
        }
    }
}

impl fmt::Display for LastWriteTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

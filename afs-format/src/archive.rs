use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, TimeZone};

use crate::de::{self, DeserializeOwned};
use crate::entry::{DataEntry, Entry, EntrySource, LastWriteTime};
use crate::error::{Error, FormatError, Result, ValidationError};
use crate::header::constants::*;
use crate::header::{
    attribute_info_beginning_offset, AfsHeader, AttributeInfo, AttributeLayout, AttributeRecord,
    HeaderMagic, TocRecord,
};
use crate::layout::{self, Layout};
use crate::locate;
use crate::names;
use crate::progress::{emit, Notification, Progress};
use crate::ser::{write_zeroes, Serialize};

/// Anything an archive can be parsed from.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

struct SourceStream<'a> {
    reader: Box<dyn ReadSeek + 'a>,
    path: Option<PathBuf>,
}

/// An AFS archive held in memory as an ordered list of entries.
///
/// Entries parsed from a stream keep reading their bytes from that stream, so the
/// archive owns it until it is dropped.
pub struct Archive<'a> {
    source: Option<SourceStream<'a>>,
    header_magic: HeaderMagic,
    attribute_layout: AttributeLayout,
    alignment: u32,
    entries: Vec<Entry>,
}

/// Totals from [`Archive::extract_all`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ExtractStats {
    pub files: u64,
    pub null_entries: u64,
    pub bytes: u64,
    pub invalid_dates: u64,
}

impl fmt::Debug for Archive<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("source", &self.source.as_ref().map(|s| s.path.clone()))
            .field("header_magic", &self.header_magic)
            .field("attribute_layout", &self.attribute_layout)
            .field("alignment", &format_args!("{:#x}", self.alignment))
            .field("entries", &self.entries)
            .finish()
    }
}

impl Default for Archive<'static> {
    fn default() -> Self {
        Archive::new()
    }
}

impl Archive<'static> {
    /// An empty archive: `AFS_00` magic, attributes at the beginning, 0x800 alignment.
    pub fn new() -> Archive<'static> {
        Archive {
            source: None,
            header_magic: HeaderMagic::default(),
            attribute_layout: AttributeLayout::default(),
            alignment: DEFAULT_BLOCK_ALIGNMENT,
            entries: vec![],
        }
    }

    /// Opens and parses the archive at `path`. The file stays open for reading entry data.
    pub fn open<P: AsRef<Path>>(path: P, progress: Progress<'_>) -> Result<Archive<'static>> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).open(path)?;
        let mut archive = Archive::parse(BufReader::new(file), progress)?;
        if let Some(source) = archive.source.as_mut() {
            source.path = Some(path.canonicalize()?);
        }
        Ok(archive)
    }
}

impl<'a> Archive<'a> {
    /// Reads header, table of contents and (if present) attribute table from `reader`.
    pub fn parse<R: Read + Seek + 'a>(mut reader: R, progress: Progress<'_>) -> Result<Archive<'a>> {
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let header = de::read_header(&mut reader)?;
        if attribute_info_beginning_offset(header.entry_count) > stream_len {
            return Err(FormatError::TruncatedToc {
                entry_count: header.entry_count,
                stream_len,
            }
            .into());
        }

        let toc = de::read_toc(&mut reader, header.entry_count)?;
        for (index, record) in toc.iter().enumerate() {
            if !record.is_null() && record.end() > stream_len {
                emit(
                    progress,
                    Notification::Warning(format!(
                        "Entry {} points past the end of the stream ({:#x} > {:#x}).",
                        index,
                        record.end(),
                        stream_len
                    )),
                );
            }
        }

        let located = locate::locate(&mut reader, &toc, stream_len)?;

        let attributes = match located.table {
            Some(info) => Some(read_attribute_table(&mut reader, info, toc.len())?),
            None => None,
        };

        let entries = toc
            .iter()
            .enumerate()
            .map(|(index, record)| {
                if record.is_null() {
                    return Entry::Null;
                }

                let (raw_name, last_write_time, custom_data) = match &attributes {
                    Some(attributes) => {
                        let attribute = &attributes[index];
                        (
                            names::decode_name(&attribute.name),
                            attribute.last_write_time,
                            attribute.custom_data,
                        )
                    }
                    None => (format!("{:08}", index), LastWriteTime::default(), record.size),
                };

                Entry::Data(DataEntry::new(
                    raw_name,
                    record.size,
                    last_write_time,
                    custom_data,
                    EntrySource::Archive {
                        offset: record.offset,
                    },
                ))
            })
            .collect();

        let mut archive = Archive {
            source: Some(SourceStream {
                reader: Box::new(reader),
                path: None,
            }),
            header_magic: header.magic,
            attribute_layout: located.layout,
            alignment: DEFAULT_BLOCK_ALIGNMENT,
            entries,
        };
        archive.update_entry_names();

        tracing::debug!(
            magic = %archive.header_magic,
            layout = %archive.attribute_layout,
            entries = archive.entries.len(),
            "parsed archive"
        );

        Ok(archive)
    }

    #[inline(always)]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Result<&Entry> {
        self.entries.get(index).ok_or_else(|| {
            ValidationError::NoSuchEntry {
                index,
                count: self.entries.len(),
            }
            .into()
        })
    }

    #[inline(always)]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn header_magic(&self) -> HeaderMagic {
        self.header_magic
    }

    pub fn set_header_magic(&mut self, magic: HeaderMagic) {
        self.header_magic = magic;
    }

    #[inline(always)]
    pub fn attribute_layout(&self) -> AttributeLayout {
        self.attribute_layout
    }

    pub fn set_attribute_layout(&mut self, layout: AttributeLayout) {
        self.attribute_layout = layout;
    }

    #[inline(always)]
    pub fn contains_attributes(&self) -> bool {
        self.attribute_layout.has_attributes()
    }

    /// Byte boundary every entry start and the file length are rounded up to.
    #[inline(always)]
    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    pub fn set_alignment(&mut self, alignment: u32) -> Result<()> {
        if alignment == 0 {
            return Err(ValidationError::ZeroAlignment.into());
        }
        self.alignment = alignment;
        Ok(())
    }

    /// Canonical path of the file this archive was opened from, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_ref().and_then(|s| s.path.as_deref())
    }

    /// Appends an entry whose bytes will be read from `path` when the archive is saved.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P, raw_name: &str) -> Result<usize> {
        let path = path.as_ref();
        names::encode_name(raw_name)?;

        let meta = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(ValidationError::FileNotFound(path.to_path_buf()).into()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ValidationError::FileNotFound(path.to_path_buf()).into())
            }
            Err(e) => return Err(e.into()),
        };

        let size =
            u32::try_from(meta.len()).map_err(|_| ValidationError::FileTooLarge(path.to_path_buf()))?;
        let last_write_time = meta
            .modified()
            .map(|time| LastWriteTime::from_naive(DateTime::<Local>::from(time).naive_local()))
            .unwrap_or_default();

        self.push(DataEntry::new(
            raw_name.to_string(),
            size,
            last_write_time,
            size,
            EntrySource::File(path.to_path_buf()),
        ))
    }

    /// Appends an entry holding `data`.
    pub fn add_bytes(
        &mut self,
        raw_name: &str,
        data: Vec<u8>,
        last_write_time: LastWriteTime,
    ) -> Result<usize> {
        names::encode_name(raw_name)?;
        let size = u32::try_from(data.len())
            .map_err(|_| ValidationError::DataTooLarge(data.len() as u64))?;

        self.push(DataEntry::new(
            raw_name.to_string(),
            size,
            last_write_time,
            size,
            EntrySource::Memory(data),
        ))
    }

    /// Appends an entry with everything `reader` yields, stamped with the current local time.
    pub fn add_from_reader<R: Read>(&mut self, raw_name: &str, mut reader: R) -> Result<usize> {
        let mut data = vec![];
        reader.read_to_end(&mut data)?;
        let now = LastWriteTime::from_naive(Local::now().naive_local());
        self.add_bytes(raw_name, data, now)
    }

    /// Appends a reserved slot with no data.
    pub fn add_null(&mut self) -> usize {
        self.entries.push(Entry::Null);
        self.entries.len() - 1
    }

    pub fn remove_entry(&mut self, index: usize) -> Result<Entry> {
        self.entry(index)?;
        let entry = self.entries.remove(index);
        self.update_entry_names();
        Ok(entry)
    }

    /// Changes the raw name stored in the attribute table.
    pub fn rename_entry(&mut self, index: usize, raw_name: &str) -> Result<()> {
        names::validate_raw_name(raw_name)?;
        self.data_entry_mut(index)?.raw_name = raw_name.to_string();
        self.update_entry_names();
        Ok(())
    }

    pub fn set_custom_data(&mut self, index: usize, custom_data: u32) -> Result<()> {
        self.data_entry_mut(index)?.custom_data = custom_data;
        Ok(())
    }

    pub fn set_last_write_time(&mut self, index: usize, time: LastWriteTime) -> Result<()> {
        self.data_entry_mut(index)?.last_write_time = time;
        Ok(())
    }

    /// A bounded reader over one entry's bytes. It borrows the archive, so no other
    /// seek on the underlying stream can happen while it is alive.
    pub fn entry_reader(&mut self, index: usize) -> Result<Box<dyn Read + '_>> {
        let entry = data_entry(&self.entries, index)?;
        open_entry(&mut self.source, entry)
    }

    /// Copies one entry's bytes into `writer`, returning how many were written.
    pub fn extract_entry<W: Write>(&mut self, index: usize, mut writer: W) -> Result<u64> {
        let entry = data_entry(&self.entries, index)?;
        let size = entry.size as u64;
        let mut reader = open_entry(&mut self.source, entry)?;
        copy_exact(&mut reader, &mut writer, size)
    }

    /// Writes one entry to `path`, creating parent directories and applying the stored
    /// last write time when the archive has attributes. Returns whether the date was usable.
    pub fn extract_to_file<P: AsRef<Path>>(&mut self, index: usize, path: P) -> Result<bool> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.extract_entry(index, &mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;

        if !self.contains_attributes() {
            return Ok(true);
        }

        let time = data_entry(&self.entries, index)?.last_write_time;
        match to_system_time(time) {
            Some(time) => {
                file.set_modified(time)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Extracts every data entry into `dir` under its unique sanitized name.
    pub fn extract_all<P: AsRef<Path>>(&mut self, dir: P, progress: Progress<'_>) -> Result<ExtractStats> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let count = self.entries.len();
        let mut stats = ExtractStats::default();

        for index in 0..count {
            let name = match &self.entries[index] {
                Entry::Null => {
                    emit(
                        progress,
                        Notification::Warning(format!(
                            "Null entry. Skipping... {}/{}",
                            index + 1,
                            count
                        )),
                    );
                    stats.null_entries += 1;
                    continue;
                }
                Entry::Data(data) => data.name.clone(),
            };

            emit(
                progress,
                Notification::Info(format!("Extracting entry... {}/{}", index + 1, count)),
            );

            let path = dir.join(names::relative_file_path(&name));
            if path.exists() {
                emit(
                    progress,
                    Notification::Warning(format!(
                        "File \"{}\" already exists. Overwriting...",
                        path.display()
                    )),
                );
            }

            if !self.extract_to_file(index, &path)? {
                stats.invalid_dates += 1;
                emit(
                    progress,
                    Notification::Warning(format!(
                        "Invalid date for \"{}\". Ignoring.",
                        path.display()
                    )),
                );
            }

            stats.files += 1;
            stats.bytes += self.entries[index].size().unwrap_or(0) as u64;
        }

        emit(
            progress,
            Notification::Success("Finished extracting all entries successfully.".into()),
        );

        Ok(stats)
    }

    /// The byte layout [`Archive::save`] would produce.
    pub fn layout(&self) -> Result<Layout> {
        Ok(layout::allocate(
            self.entries.iter().map(Entry::size),
            self.alignment,
            self.contains_attributes(),
        )?)
    }

    /// Writes the whole archive to `writer` in ascending offset order. Returns the file length.
    pub fn save<W: Write>(&mut self, mut writer: W, progress: Progress<'_>) -> Result<u64> {
        emit(progress, Notification::Info("Creating AFS stream...".into()));

        let layout = self.layout()?;
        let count = self.entries.len();
        let mut pos: u64 = 0;

        AfsHeader {
            magic: self.header_magic,
            entry_count: count as u32,
        }
        .write(&mut writer)?;
        pos += HEADER_SIZE as u64;

        for (index, entry) in self.entries.iter().enumerate() {
            emit(
                progress,
                Notification::Info(format!("Writing entry info... {}/{}", index + 1, count)),
            );
            let record = match entry {
                Entry::Null => TocRecord::NULL,
                Entry::Data(data) => TocRecord {
                    offset: layout.offsets[index],
                    size: data.size,
                },
            };
            record.write(&mut writer)?;
            pos += TOC_ELEMENT_SIZE as u64;
        }

        let info_pos = match self.attribute_layout {
            AttributeLayout::None => None,
            AttributeLayout::Beginning => Some(pos),
            AttributeLayout::End => Some(layout.first_entry_offset as u64 - ATTRIBUTE_INFO_SIZE as u64),
        };
        if let Some(info_pos) = info_pos {
            pos = fill_to(&mut writer, pos, info_pos)?;
            AttributeInfo {
                offset: layout.attribute_table_offset,
                size: layout.attribute_table_size,
            }
            .write(&mut writer)?;
            pos += ATTRIBUTE_INFO_SIZE as u64;
        }
        pos = fill_to(&mut writer, pos, layout.first_entry_offset as u64)?;

        for (index, entry) in self.entries.iter().enumerate() {
            let data = match entry {
                Entry::Null => {
                    emit(
                        progress,
                        Notification::Info(format!("Null file... {}/{}", index + 1, count)),
                    );
                    continue;
                }
                Entry::Data(data) => data,
            };

            emit(
                progress,
                Notification::Info(format!("Writing entry... {}/{}", index + 1, count)),
            );

            pos = fill_to(&mut writer, pos, layout.offsets[index] as u64)?;
            let mut reader = open_entry(&mut self.source, data)?;
            pos += copy_exact(&mut reader, &mut writer, data.size as u64)?;
        }

        if self.contains_attributes() {
            pos = fill_to(&mut writer, pos, layout.attribute_table_offset as u64)?;

            for (index, entry) in self.entries.iter().enumerate() {
                let record = match entry {
                    Entry::Null => {
                        emit(
                            progress,
                            Notification::Info(format!("Null file... {}/{}", index + 1, count)),
                        );
                        AttributeRecord::default()
                    }
                    Entry::Data(data) => {
                        emit(
                            progress,
                            Notification::Info(format!(
                                "Writing attribute... {}/{}",
                                index + 1,
                                count
                            )),
                        );
                        attribute_record(data)?
                    }
                };
                record.write(&mut writer)?;
                pos += ATTRIBUTE_ELEMENT_SIZE as u64;
            }
        }

        pos = fill_to(&mut writer, pos, layout.end_of_file as u64)?;
        writer.flush()?;

        emit(
            progress,
            Notification::Success("AFS stream has been saved successfully.".into()),
        );

        Ok(pos)
    }

    /// Saves to a new file at `path`. Refuses to overwrite the file this archive reads from.
    pub fn save_to_path<P: AsRef<Path>>(&mut self, path: P, progress: Progress<'_>) -> Result<u64> {
        let path = path.as_ref();

        if let (Some(source), Ok(dest)) = (self.source_path(), path.canonicalize()) {
            if source == dest {
                return Err(ValidationError::SameStream(dest).into());
            }
        }

        let file = File::create(path)?;
        self.save(BufWriter::new(file), progress)
    }

    pub(crate) fn update_entry_names(&mut self) {
        let sanitized: Vec<Option<String>> = self
            .entries
            .iter()
            .map(|e| e.as_data().map(|d| names::sanitize(&d.raw_name)))
            .collect();

        let unique = names::resolve_duplicates(sanitized.iter().map(|s| s.as_deref()));

        for (entry, name) in self.entries.iter_mut().zip(unique) {
            if let (Some(data), Some(name)) = (entry.as_data_mut(), name) {
                data.name = name;
            }
        }
    }

    fn push(&mut self, entry: DataEntry) -> Result<usize> {
        self.entries.push(Entry::Data(entry));
        self.update_entry_names();
        Ok(self.entries.len() - 1)
    }

    fn data_entry_mut(&mut self, index: usize) -> Result<&mut DataEntry> {
        let count = self.entries.len();
        match self.entries.get_mut(index) {
            Some(Entry::Data(data)) => Ok(data),
            Some(Entry::Null) => Err(ValidationError::NullEntry(index).into()),
            None => Err(ValidationError::NoSuchEntry { index, count }.into()),
        }
    }
}

fn data_entry(entries: &[Entry], index: usize) -> Result<&DataEntry> {
    match entries.get(index) {
        Some(Entry::Data(data)) => Ok(data),
        Some(Entry::Null) => Err(ValidationError::NullEntry(index).into()),
        None => Err(ValidationError::NoSuchEntry {
            index,
            count: entries.len(),
        }
        .into()),
    }
}

fn open_entry<'s>(
    source: &'s mut Option<SourceStream<'_>>,
    entry: &'s DataEntry,
) -> Result<Box<dyn Read + 's>> {
    let size = entry.size as u64;
    match &entry.source {
        EntrySource::Archive { offset } => {
            let source = source.as_mut().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "source archive is not open")
            })?;
            source.reader.seek(SeekFrom::Start(*offset as u64))?;
            Ok(Box::new(Read::by_ref(&mut source.reader).take(size)))
        }
        EntrySource::File(path) => {
            let file = File::open(path)?;
            Ok(Box::new(BufReader::new(file).take(size)))
        }
        EntrySource::Memory(data) => Ok(Box::new(&data[..])),
    }
}

fn read_attribute_table<R: Read + Seek>(
    reader: &mut R,
    info: AttributeInfo,
    entry_count: usize,
) -> std::io::Result<Vec<AttributeRecord>> {
    reader.seek(SeekFrom::Start(info.offset as u64))?;
    let mut records = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        records.push(AttributeRecord::deserialize_owned(reader)?);
    }

    tracing::debug!(
        start = format_args!("{:#x}", info.offset),
        bytes = entry_count * ATTRIBUTE_ELEMENT_SIZE as usize,
        count = entry_count,
        "deserialized attribute table"
    );

    Ok(records)
}

fn attribute_record(entry: &DataEntry) -> Result<AttributeRecord> {
    let encoded = names::encode_name(&entry.raw_name)?;
    let mut name = [0u8; MAX_ENTRY_NAME_LENGTH];
    name[..encoded.len()].copy_from_slice(&encoded);

    Ok(AttributeRecord {
        name,
        last_write_time: entry.last_write_time,
        custom_data: entry.custom_data,
    })
}

/// Zero-fills from `pos` up to `target`.
fn fill_to<W: Write>(writer: &mut W, pos: u64, target: u64) -> std::io::Result<u64> {
    if target > pos {
        write_zeroes(writer, target - pos)?;
        Ok(target)
    } else {
        Ok(pos)
    }
}

fn copy_exact<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    size: u64,
) -> Result<u64> {
    let copied = std::io::copy(&mut reader.take(size), writer)?;
    if copied != size {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("entry data ended after {} of {} bytes", copied, size),
        )));
    }
    Ok(copied)
}

fn to_system_time(time: LastWriteTime) -> Option<SystemTime> {
    let naive = time.to_naive()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(SystemTime::from)
}

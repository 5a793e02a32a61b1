//! The sidecar describing how to rebuild an archive from a directory of extracted files.
//!
//! Each schema version lives in its own module with a pure `upgrade` step to the next one.
//! Loading parses whatever version is on disk and walks the chain up to [`CURRENT_VERSION`].

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::error::{MigrationError, Result};
use crate::header::{AttributeLayout, HeaderMagic};
use crate::names;

pub mod v1;
pub mod v2;
pub mod v3;

pub use self::v3::{MetadataEntry, MetadataRecord};

pub const CURRENT_VERSION: u32 = 3;

/// Looks up the on-disk size of an extracted file. Only the v2 to v3 step needs it.
pub trait FileSizeSource {
    fn file_size(&self, file_name: &str) -> std::io::Result<u64>;
}

/// Resolves file names against a directory of extracted files.
#[derive(Debug, Clone)]
pub struct DirectoryFileSizes {
    dir: PathBuf,
}

impl DirectoryFileSizes {
    pub fn new<P: AsRef<Path>>(dir: P) -> DirectoryFileSizes {
        DirectoryFileSizes {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl FileSizeSource for DirectoryFileSizes {
    fn file_size(&self, file_name: &str) -> std::io::Result<u64> {
        let meta = fs::metadata(self.dir.join(names::relative_file_path(file_name)))?;
        Ok(meta.len())
    }
}

/// A sidecar as found on disk, before migration.
#[derive(Debug, Clone)]
pub enum VersionedRecord {
    V1(v1::Record),
    V2(v2::Record),
    V3(MetadataRecord),
}

impl VersionedRecord {
    /// Parses sidecar JSON, choosing the schema from `MetadataVersion`. A missing or zero
    /// version is the oldest schema.
    pub fn from_json(text: &str) -> std::result::Result<VersionedRecord, MigrationError> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(MigrationError::Parse)?;

        let version = match value.get("MetadataVersion") {
            None | Some(serde_json::Value::Null) => 1,
            Some(v) => u32::deserialize(v).map_err(MigrationError::Parse)?,
        };

        let malformed = |source: serde_json::Error| MigrationError::Malformed { version, source };

        match version {
            0 | 1 => v1::Record::deserialize(value)
                .map(VersionedRecord::V1)
                .map_err(malformed),
            2 => v2::Record::deserialize(value)
                .map(VersionedRecord::V2)
                .map_err(malformed),
            3 => MetadataRecord::deserialize(value)
                .map(VersionedRecord::V3)
                .map_err(malformed),
            found => Err(MigrationError::UnsupportedVersion {
                found,
                supported: CURRENT_VERSION,
            }),
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            VersionedRecord::V1(_) => 1,
            VersionedRecord::V2(_) => 2,
            VersionedRecord::V3(_) => 3,
        }
    }

    /// Applies every migration step from this record's version up to the current one.
    pub fn upgrade(
        self,
        sizes: &dyn FileSizeSource,
    ) -> std::result::Result<MetadataRecord, MigrationError> {
        let v2 = match self {
            VersionedRecord::V3(record) => return Ok(record),
            VersionedRecord::V2(record) => record,
            VersionedRecord::V1(record) => record.upgrade(),
        };
        v2.upgrade(sizes)
    }
}

/// The outcome of [`MetadataStore::load`].
#[derive(Debug, Clone)]
pub struct Loaded {
    pub record: MetadataRecord,
    pub original_version: u32,
}

impl Loaded {
    #[inline(always)]
    pub fn was_upgraded(&self) -> bool {
        self.original_version != CURRENT_VERSION
    }
}

/// Reads and writes the sidecar file of one extracted archive.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new<P: AsRef<Path>>(path: P) -> MetadataStore {
        MetadataStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The sidecar that sits next to `dir`, named `<dir>.json`.
    pub fn for_directory<P: AsRef<Path>>(dir: P) -> MetadataStore {
        let mut path = dir.as_ref().components().as_path().as_os_str().to_owned();
        path.push(".json");
        MetadataStore {
            path: PathBuf::from(path),
        }
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the sidecar and migrates it in memory. Nothing is written back.
    pub fn load(&self, sizes: &dyn FileSizeSource) -> Result<Loaded> {
        let text = fs::read_to_string(&self.path)?;
        let versioned = VersionedRecord::from_json(&text)?;
        let original_version = versioned.version();
        let record = versioned.upgrade(sizes)?;

        tracing::debug!(
            path = %self.path.display(),
            from = original_version,
            to = CURRENT_VERSION,
            entries = record.entries.len(),
            "loaded metadata"
        );

        Ok(Loaded {
            record,
            original_version,
        })
    }

    /// Loads the sidecar, back-filling sizes from `files_dir`, and rewrites it at the
    /// current version if it was older.
    pub fn load_and_upgrade<P: AsRef<Path>>(&self, files_dir: P) -> Result<MetadataRecord> {
        let loaded = self.load(&DirectoryFileSizes::new(files_dir))?;
        if loaded.was_upgraded() {
            tracing::info!(
                path = %self.path.display(),
                from = loaded.original_version,
                "upgrading metadata to version {}",
                CURRENT_VERSION
            );
            self.save(&loaded.record)?;
        }
        Ok(loaded.record)
    }

    pub fn save(&self, record: &MetadataRecord) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, record).map_err(std::io::Error::from)?;
        writer.flush()?;
        Ok(())
    }
}

pub(crate) const fn default_alignment() -> u32 {
    crate::header::constants::DEFAULT_BLOCK_ALIGNMENT
}

/// Older sidecars store enums as their ordinal; newer ones by name. Both are accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum EnumValue<T> {
    Ordinal(u32),
    Named(T),
}

pub(crate) fn header_magic<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<HeaderMagic, D::Error> {
    match EnumValue::<HeaderMagic>::deserialize(deserializer)? {
        EnumValue::Named(magic) => Ok(magic),
        EnumValue::Ordinal(0) => Ok(HeaderMagic::Afs00),
        EnumValue::Ordinal(1) => Ok(HeaderMagic::Afs20),
        EnumValue::Ordinal(n) => Err(D::Error::custom(format!("unknown header magic type {}", n))),
    }
}

pub(crate) fn attribute_layout<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<AttributeLayout, D::Error> {
    match EnumValue::<AttributeLayout>::deserialize(deserializer)? {
        EnumValue::Named(layout) => Ok(layout),
        EnumValue::Ordinal(0) => Ok(AttributeLayout::None),
        EnumValue::Ordinal(1) => Ok(AttributeLayout::Beginning),
        EnumValue::Ordinal(2) => Ok(AttributeLayout::End),
        EnumValue::Ordinal(n) => Err(D::Error::custom(format!("unknown attributes info type {}", n))),
    }
}

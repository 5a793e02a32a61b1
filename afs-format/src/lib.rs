//! Reading and writing AFS archives, the flat container format used by many Sega-era games.

mod archive;
mod de;
mod entry;
pub mod error;
mod header;
pub mod layout;
pub mod locate;
pub mod metadata;
pub mod names;
mod progress;
mod ser;

pub use archive::{Archive, ExtractStats, ReadSeek};
pub use entry::{DataEntry, Entry, LastWriteTime};
pub use error::{Error, FormatError, MigrationError, Result, ValidationError};
pub use header::{constants, AttributeInfo, AttributeLayout, HeaderMagic, TocRecord};
pub use metadata::{MetadataEntry, MetadataRecord, MetadataStore};
pub use progress::{silent, Notification, Progress};

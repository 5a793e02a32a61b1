use std::path::Path;

use afs_format::{names, silent, Archive, Entry};
use encoding_rs::Encoding;

use crate::error::{Error, Result};

pub fn run(archive_path: &Path, encoding: Option<&'static Encoding>) -> Result<()> {
    let archive = Archive::open(archive_path, &mut silent).map_err(|source| Error::OpenArchive {
        path: archive_path.to_path_buf(),
        source,
    })?;

    let file_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    println!();
    println!("File name            : {}", file_name);
    println!("Header magic         : {}", archive.header_magic());
    println!("Attributes info type : {}", archive.attribute_layout());
    println!("Number of entries    : {}", archive.entry_count());
    println!();
    println!(" Index    | Name                             | Size       | Last Write Time");
    println!(" ---------------------------------------------------------------------------------");

    let with_attributes = archive.contains_attributes();
    for (index, entry) in archive.entries().iter().enumerate() {
        match entry {
            Entry::Null => {
                println!(" {:08} | {:<32} | {:<10} | N/A", index, "(null)", "N/A");
            }
            Entry::Data(data) => {
                let (name, time) = if with_attributes {
                    let name = encoding
                        .and_then(|e| names::decode_raw_name_with(data.raw_name(), e).ok())
                        .unwrap_or_else(|| data.raw_name().to_string());
                    (name, data.last_write_time().to_string())
                } else {
                    ("N/A".to_string(), "N/A".to_string())
                };
                println!(" {:08} | {:<32} | 0x{:08X} | {}", index, name, data.size(), time);
            }
        }
    }

    Ok(())
}

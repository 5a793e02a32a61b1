//! End-to-end tests: archives on disk, extraction, sidecars and rebuilding.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use afs_format::metadata::{DirectoryFileSizes, MetadataStore};
use afs_format::{
    silent, Archive, AttributeLayout, Error, HeaderMagic, LastWriteTime, MetadataRecord,
    Notification, ValidationError,
};
use tempfile::TempDir;

fn time() -> LastWriteTime {
    LastWriteTime {
        year: 2003,
        month: 5,
        day: 6,
        hour: 12,
        minute: 34,
        second: 56,
    }
}

/// Writes a small archive with a null slot and a duplicated name into `dir`.
fn write_sample(dir: &Path, layout: AttributeLayout) -> PathBuf {
    let mut archive = Archive::new();
    archive.set_header_magic(HeaderMagic::Afs20);
    archive.set_attribute_layout(layout);
    archive.add_bytes("voice.adx", b"first entry".to_vec(), time()).unwrap();
    archive.add_null();
    archive.add_bytes("voice.adx", vec![0xab; 3000], time()).unwrap();
    archive.add_bytes("", b"blank".to_vec(), time()).unwrap();

    let path = dir.join("sample.afs");
    archive.save_to_path(&path, &mut silent).unwrap();
    path
}

/// Extracting, writing a sidecar and rebuilding reproduces the archive byte for byte.
#[test]
fn extract_and_rebuild_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let original_path = write_sample(temp.path(), AttributeLayout::Beginning);
    let files_dir = temp.path().join("sample");

    let mut archive = Archive::open(&original_path, &mut silent).unwrap();
    let stats = archive.extract_all(&files_dir, &mut silent).unwrap();
    assert_eq!(stats.files, 3);
    assert_eq!(stats.null_entries, 1);
    assert_eq!(stats.bytes, 11 + 3000 + 5);
    assert_eq!(stats.invalid_dates, 0);

    assert_eq!(fs::read(files_dir.join("voice.adx")).unwrap(), b"first entry");
    assert_eq!(fs::read(files_dir.join("voice (1).adx")).unwrap(), vec![0xab; 3000]);
    assert_eq!(fs::read(files_dir.join("_NO_NAME")).unwrap(), b"blank");

    let store = MetadataStore::for_directory(&files_dir);
    store.save(&MetadataRecord::from_archive(&archive)).unwrap();
    drop(archive);

    let record = store.load_and_upgrade(&files_dir).unwrap();
    let mut rebuilt = record.to_archive(&files_dir).unwrap();
    let rebuilt_path = temp.path().join("rebuilt.afs");
    rebuilt.save_to_path(&rebuilt_path, &mut silent).unwrap();

    assert_eq!(fs::read(rebuilt_path).unwrap(), fs::read(original_path).unwrap());
}

/// Opaque custom values survive a rebuild when they differ from the file size.
#[test]
fn custom_data_is_preserved() {
    let temp = TempDir::new().unwrap();
    let files_dir = temp.path().join("files");

    let mut archive = Archive::new();
    archive.add_bytes("a.bin", vec![1; 16], time()).unwrap();
    archive.set_custom_data(0, 0xdead_beef).unwrap();
    let mut bytes = vec![];
    archive.save(&mut bytes, &mut silent).unwrap();

    let mut parsed = Archive::parse(Cursor::new(bytes.clone()), &mut silent).unwrap();
    parsed.extract_all(&files_dir, &mut silent).unwrap();
    let record = MetadataRecord::from_archive(&parsed);
    assert!(!record.all_attributes_contain_entry_size);

    let mut out = vec![];
    record.to_archive(&files_dir).unwrap().save(&mut out, &mut silent).unwrap();
    assert_eq!(out, bytes);
}

/// The attribute pointer is found in either slot, and garbage in the slot means no attributes.
#[test]
fn attribute_pointer_heuristic() {
    let temp = TempDir::new().unwrap();

    let end = write_sample(temp.path(), AttributeLayout::End);
    let archive = Archive::open(&end, &mut silent).unwrap();
    assert_eq!(archive.attribute_layout(), AttributeLayout::End);
    assert_eq!(archive.header_magic(), HeaderMagic::Afs20);

    let beginning = write_sample(temp.path(), AttributeLayout::Beginning);
    let mut bytes = fs::read(&beginning).unwrap();
    // slot after the four TOC records
    bytes[40..48].copy_from_slice(&[0xff, 0xff, 0xff, 0x7f, 0x10, 0, 0, 0]);

    let archive = Archive::parse(Cursor::new(bytes), &mut silent).unwrap();
    assert_eq!(archive.attribute_layout(), AttributeLayout::None);
    let names: Vec<_> = archive
        .entries()
        .iter()
        .filter_map(|e| e.as_data().map(|d| d.name().to_string()))
        .collect();
    assert_eq!(names, vec!["00000000", "00000002", "00000003"]);
}

/// A v1 sidecar is upgraded using real file sizes and written back at the current version.
#[test]
fn legacy_sidecar_is_upgraded_on_load() {
    let temp = TempDir::new().unwrap();
    let files_dir = temp.path().join("game");
    fs::create_dir(&files_dir).unwrap();
    fs::write(files_dir.join("x.bin"), vec![7u8; 1234]).unwrap();

    let store = MetadataStore::for_directory(&files_dir);
    fs::write(
        store.path(),
        r#"{
            "MetadataVersion": 1,
            "HeaderMagicType": 0,
            "AttributesInfoType": 1,
            "Entries": [{ "RawName": "x.bin", "Name": "x.bin" }]
        }"#,
    )
    .unwrap();

    let record = store.load_and_upgrade(&files_dir).unwrap();
    assert_eq!(record.entries[0].name, "x.bin");
    assert_eq!(record.entries[0].file_name, "x.bin");
    assert_eq!(record.entries[0].custom_data, 1234);
    assert!(record.all_attributes_contain_entry_size);

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(written["MetadataVersion"], 3);
    assert_eq!(written["Entries"][0]["CustomData"], 1234);

    let loaded = store.load(&DirectoryFileSizes::new(&files_dir)).unwrap();
    assert!(!loaded.was_upgraded());
    assert_eq!(loaded.record, record);
}

/// A plain directory becomes an archive of its files in name order.
#[test]
fn directory_without_sidecar() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("b.bin"), b"bb").unwrap();
    fs::write(temp.path().join("a.bin"), b"a").unwrap();

    let record = MetadataRecord::from_file_names(
        vec!["a.bin".to_string(), "b.bin".to_string()],
        &DirectoryFileSizes::new(temp.path()),
    )
    .unwrap();
    assert_eq!(record.header_magic_type, HeaderMagic::Afs00);
    assert_eq!(record.attributes_info_type, AttributeLayout::Beginning);

    let mut archive = record.to_archive(temp.path()).unwrap();
    let mut out = vec![];
    archive.save(&mut out, &mut silent).unwrap();

    let mut parsed = Archive::parse(Cursor::new(out), &mut silent).unwrap();
    assert_eq!(parsed.entries()[0].as_data().unwrap().raw_name(), "a.bin");
    let mut data = vec![];
    parsed.extract_entry(1, &mut data).unwrap();
    assert_eq!(data, b"bb");
}

/// Saving over the file being read is refused and leaves it untouched.
#[test]
fn refuses_to_overwrite_source() {
    let temp = TempDir::new().unwrap();
    let path = write_sample(temp.path(), AttributeLayout::Beginning);
    let before = fs::read(&path).unwrap();

    let mut archive = Archive::open(&path, &mut silent).unwrap();
    let same = temp.path().join(".").join("sample.afs");
    assert!(matches!(
        archive.save_to_path(&same, &mut silent),
        Err(Error::Validation(ValidationError::SameStream(_)))
    ));
    assert_eq!(fs::read(&path).unwrap(), before);
}

/// Existing files and bad dates produce warnings, not failures.
#[test]
fn extraction_warnings() {
    let temp = TempDir::new().unwrap();
    let files_dir = temp.path().join("out");

    let mut archive = Archive::new();
    let bad_date = LastWriteTime {
        month: 13,
        ..time()
    };
    archive.add_bytes("bad.bin", vec![1, 2, 3], bad_date).unwrap();
    let mut bytes = vec![];
    archive.save(&mut bytes, &mut silent).unwrap();
    let mut parsed = Archive::parse(Cursor::new(bytes), &mut silent).unwrap();

    let mut first = vec![];
    let stats = parsed
        .extract_all(&files_dir, &mut |n| first.push(n))
        .unwrap();
    assert_eq!(stats.invalid_dates, 1);
    assert!(first
        .iter()
        .any(|n| matches!(n, Notification::Warning(m) if m.contains("Invalid date"))));

    let mut second = vec![];
    parsed
        .extract_all(&files_dir, &mut |n| second.push(n))
        .unwrap();
    assert!(second
        .iter()
        .any(|n| matches!(n, Notification::Warning(m) if m.contains("already exists"))));
    assert_eq!(fs::read(files_dir.join("bad.bin")).unwrap(), vec![1, 2, 3]);
}

/// Names that only differ by root or dot components still extract to separate files,
/// so rebuilding packs each entry's own bytes.
#[test]
fn rooted_and_dotted_names_do_not_share_a_file() {
    let temp = TempDir::new().unwrap();
    let files_dir = temp.path().join("files");

    let mut archive = Archive::new();
    archive.add_bytes("x.bin", b"AAAA".to_vec(), time()).unwrap();
    archive.add_bytes("/x.bin", b"BBBBBBBB".to_vec(), time()).unwrap();
    archive.add_bytes("./x.bin", b"CC".to_vec(), time()).unwrap();
    archive.add_bytes("", b"blank".to_vec(), time()).unwrap();
    archive.add_bytes("..", b"dots".to_vec(), time()).unwrap();
    let mut bytes = vec![];
    archive.save(&mut bytes, &mut silent).unwrap();

    let mut parsed = Archive::parse(Cursor::new(bytes.clone()), &mut silent).unwrap();
    let names: Vec<_> = parsed
        .entries()
        .iter()
        .filter_map(|e| e.as_data().map(|d| d.name().to_string()))
        .collect();
    assert_eq!(
        names,
        vec!["x.bin", "x (1).bin", "x (2).bin", "_NO_NAME", "_NO_NAME (1)"]
    );

    let mut notes = vec![];
    let stats = parsed
        .extract_all(&files_dir, &mut |n| notes.push(n))
        .unwrap();
    assert_eq!(stats.files, 5);
    assert!(!notes
        .iter()
        .any(|n| matches!(n, Notification::Warning(m) if m.contains("already exists"))));
    assert_eq!(fs::read(files_dir.join("x.bin")).unwrap(), b"AAAA");
    assert_eq!(fs::read(files_dir.join("x (1).bin")).unwrap(), b"BBBBBBBB");
    assert_eq!(fs::read(files_dir.join("_NO_NAME (1)")).unwrap(), b"dots");

    let record = MetadataRecord::from_archive(&parsed);
    let mut out = vec![];
    record.to_archive(&files_dir).unwrap().save(&mut out, &mut silent).unwrap();
    assert_eq!(out, bytes);
}

/// Entries added from a reader keep its bytes, and report their size as custom data.
#[test]
fn add_from_reader_round_trips() {
    let mut archive = Archive::new();
    let index = archive
        .add_from_reader("stream.bin", Cursor::new(vec![5u8; 300]))
        .unwrap();
    assert_eq!(index, 0);

    let entry = archive.entries()[0].as_data().unwrap();
    assert_eq!(entry.size(), 300);
    assert_eq!(entry.custom_data(), 300);
    assert_eq!(entry.source_path(), None);

    let mut bytes = vec![];
    archive.save(&mut bytes, &mut silent).unwrap();
    let mut parsed = Archive::parse(Cursor::new(bytes), &mut silent).unwrap();
    let mut data = vec![];
    parsed.extract_entry(0, &mut data).unwrap();
    assert_eq!(data, vec![5u8; 300]);
    assert_eq!(parsed.entries()[0].as_data().unwrap().custom_data(), 300);
}

/// Files added from disk remember where they come from and take their modification time.
#[test]
fn add_file_records_source_and_time() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("disk.bin");
    fs::write(&path, b"on disk").unwrap();

    let mut archive = Archive::new();
    let index = archive.add_file(&path, "disk.bin").unwrap();
    let entry = archive.entries()[index].as_data().unwrap();
    assert_eq!(entry.source_path(), Some(path.as_path()));
    assert_eq!(entry.size(), 7);
    assert!(entry.last_write_time().to_naive().is_some());

    archive.set_last_write_time(index, time()).unwrap();
    let mut bytes = vec![];
    archive.save(&mut bytes, &mut silent).unwrap();
    let parsed = Archive::parse(Cursor::new(bytes), &mut silent).unwrap();
    assert_eq!(parsed.entries()[0].as_data().unwrap().last_write_time(), time());

    let null = archive.add_null();
    assert!(matches!(
        archive.set_last_write_time(null, time()),
        Err(Error::Validation(ValidationError::NullEntry(_)))
    ));
}

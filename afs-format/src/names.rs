//! Turning raw in-archive names into names that are safe and unique on disk.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use encoding_rs::Encoding;

use crate::error::ValidationError;
use crate::header::constants::MAX_ENTRY_NAME_LENGTH;

/// Given to entries whose attribute name is blank; some archives store empty names for valid files.
pub const DUMMY_ENTRY_NAME: &str = "_NO_NAME";

#[cfg(not(windows))]
const PLATFORM_INVALID_PATH_CHARS: &[char] = &[];

#[cfg(windows)]
const PLATFORM_INVALID_PATH_CHARS: &[char] = &['"', '<', '>', '|'];

/// Control characters (below `' '`) are invalid on every platform, so names extract the same
/// everywhere. Windows additionally rejects `"<>|`.
#[inline(always)]
pub fn is_invalid_path_char(c: char) -> bool {
    c < ' ' || PLATFORM_INVALID_PATH_CHARS.contains(&c)
}

/// Makes a raw entry name usable as a relative path on the host.
///
/// Invalid path characters and every `:` are removed (some archives embed full drive-letter
/// paths as the name). Root, `.` and `..` components are then dropped so the result always
/// stays inside the extraction directory. A name that ends up with no components becomes
/// [`DUMMY_ENTRY_NAME`]. The result is exactly the path an entry is extracted to.
pub fn sanitize(raw_name: &str) -> String {
    if raw_name.trim().is_empty() {
        return DUMMY_ENTRY_NAME.to_string();
    }

    let filtered: String = raw_name
        .chars()
        .filter(|&c| c != ':' && !is_invalid_path_char(c))
        .collect();

    let parts = normal_components(&filtered);
    if parts.iter().all(|p| p.trim().is_empty()) {
        return DUMMY_ENTRY_NAME.to_string();
    }
    parts.join(&MAIN_SEPARATOR.to_string())
}

fn normal_components(name: &str) -> Vec<&str> {
    Path::new(name)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect()
}

/// Splits `name` into stem and extension (with its leading dot), looking only at the last path component.
pub fn split_extension(name: &str) -> (&str, &str) {
    let file_start = name.rfind(|c| c == '/' || c == '\\').map_or(0, |i| i + 1);
    match name[file_start..].rfind('.') {
        Some(dot) if file_start + dot + 1 < name.len() => name.split_at(file_start + dot),
        _ => (name, ""),
    }
}

/// Gives every present name a unique display name, in archive order.
///
/// The first occurrence keeps its name; the Nth repeat becomes `"{stem} ({N}){extension}"`.
/// `None` slots (null entries) pass through untouched and are not counted. If a generated
/// name is already used by another entry, the counter keeps climbing until it is free.
pub fn resolve_duplicates<'a, I>(sanitized_names: I) -> Vec<Option<String>>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let names: Vec<Option<&str>> = sanitized_names.into_iter().collect();

    let mut taken: HashSet<String> = names.iter().flatten().map(|s| s.to_string()).collect();
    let mut seen: HashMap<&str, u32> = HashMap::new();

    names
        .iter()
        .map(|name| {
            let name = (*name)?;
            let count = seen.entry(name).or_insert(0);

            if *count == 0 {
                *count = 1;
                return Some(name.to_string());
            }

            let (stem, extension) = split_extension(name);
            loop {
                let candidate = format!("{} ({}){}", stem, *count, extension);
                *count += 1;
                if taken.insert(candidate.clone()) {
                    return Some(candidate);
                }
            }
        })
        .collect()
}

/// Decodes a fixed-size name field: trailing zero padding is dropped and each byte maps to
/// the code point of the same value, so any byte string survives an encode/decode cycle.
pub fn decode_name(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    bytes[..end].iter().map(|&b| b as char).collect()
}

/// Inverse of [`decode_name`]. Fails for characters above U+00FF or names longer than the field.
pub fn encode_name(name: &str) -> Result<Vec<u8>, ValidationError> {
    let bytes = name
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| ValidationError::UnencodableName(name.to_string()))?;

    if bytes.len() > MAX_ENTRY_NAME_LENGTH {
        return Err(ValidationError::NameTooLong {
            name: name.to_string(),
            max: MAX_ENTRY_NAME_LENGTH,
        });
    }

    Ok(bytes)
}

/// Reads a raw name's bytes as text in a legacy codepage (Shift-JIS in most archives).
/// Only for display; the raw name itself is what gets written back.
pub fn decode_raw_name_with(raw_name: &str, encoding: &'static Encoding) -> Result<String, ValidationError> {
    let bytes = encode_name(raw_name)?;
    Ok(encoding.decode_without_bom_handling(&bytes).0.into_owned())
}

/// The raw name whose bytes are `text` encoded in `encoding`.
pub fn raw_name_from_text(text: &str, encoding: &'static Encoding) -> Result<String, ValidationError> {
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(ValidationError::UnencodableName(text.to_string()));
    }
    if bytes.len() > MAX_ENTRY_NAME_LENGTH {
        return Err(ValidationError::NameTooLong {
            name: text.to_string(),
            max: MAX_ENTRY_NAME_LENGTH,
        });
    }
    Ok(decode_name(&bytes))
}

/// Checks a caller-supplied raw name before it is stored in an entry.
pub fn validate_raw_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    if name.chars().any(is_invalid_path_char) {
        return Err(ValidationError::InvalidNameCharacters(name.to_string()));
    }

    encode_name(name).map(|_| ())
}

/// Maps a file name from a sidecar to a path relative to the extraction directory, with the
/// same component rules as [`sanitize`]. Names produced by [`sanitize`] map to themselves.
pub fn relative_file_path(name: &str) -> PathBuf {
    let parts = normal_components(name);
    if parts.is_empty() {
        PathBuf::from(DUMMY_ENTRY_NAME)
    } else {
        parts.iter().collect()
    }
}

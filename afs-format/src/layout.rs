use crate::error::ValidationError;
use crate::header::constants::*;

/// Rounds `value` up to the next multiple of `unit`. `unit` must be non-zero.
#[inline(always)]
pub fn pad(value: u64, unit: u64) -> u64 {
    let diff = value % unit;
    if diff == 0 {
        value
    } else {
        value + (unit - diff)
    }
}

/// The packed byte layout of an archive about to be written.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Layout {
    /// Start of the first entry's data; the attribute-info slot at the end sits 8 bytes before this.
    pub first_entry_offset: u32,
    /// One offset per entry in archive order; null entries get 0.
    pub offsets: Vec<u32>,
    pub attribute_table_offset: u32,
    pub attribute_table_size: u32,
    /// Total file length, already aligned.
    pub end_of_file: u32,
}

/// Computes where everything goes.
///
/// `sizes` holds one item per entry in archive order, `None` for null entries.
/// Output is a pure function of the input: the same entries, sizes and alignment
/// always give the same offsets.
pub fn allocate<I>(sizes: I, alignment: u32, with_attributes: bool) -> Result<Layout, ValidationError>
where
    I: IntoIterator<Item = Option<u32>>,
{
    if alignment == 0 {
        return Err(ValidationError::ZeroAlignment);
    }
    let unit = alignment as u64;
    let sizes: Vec<Option<u32>> = sizes.into_iter().collect();
    let entry_count = sizes.len() as u64;

    let first_entry_offset = pad(
        HEADER_SIZE as u64 + entry_count * TOC_ELEMENT_SIZE as u64 + ATTRIBUTE_INFO_SIZE as u64,
        unit,
    );

    let mut running = first_entry_offset;
    let mut offsets = Vec::with_capacity(sizes.len());

    for size in sizes.iter() {
        match size {
            None => offsets.push(0),
            Some(size) => {
                offsets.push(to_u32(running)?);
                running = pad(running + *size as u64, unit);
            }
        }
    }

    let attribute_table_size = if with_attributes {
        entry_count * ATTRIBUTE_ELEMENT_SIZE as u64
    } else {
        0
    };
    let end_of_file = pad(running + attribute_table_size, unit);

    let layout = Layout {
        first_entry_offset: to_u32(first_entry_offset)?,
        offsets,
        attribute_table_offset: to_u32(running)?,
        attribute_table_size: to_u32(attribute_table_size)?,
        end_of_file: to_u32(end_of_file)?,
    };

    tracing::debug!(
        first_entry = format_args!("{:#x}", layout.first_entry_offset),
        attributes = format_args!("{:#x}", layout.attribute_table_offset),
        end = format_args!("{:#x}", layout.end_of_file),
        entries = entry_count,
        "allocated layout"
    );

    Ok(layout)
}

#[inline(always)]
fn to_u32(value: u64) -> Result<u32, ValidationError> {
    u32::try_from(value).map_err(|_| ValidationError::LayoutOverflow)
}

use crate::fields::{aux_data_offset, tag_value_size};

/// Locate a tag in auxiliary data, returning `(start, end)` offsets of the
/// whole entry (tag, type byte and value).
#[must_use]
pub fn find_tag_bounds(aux_data: &[u8], tag: &[u8; 2]) -> Option<(usize, usize)> {
    let mut p = 0;
    while p + 3 <= aux_data.len() {
        let val_type = aux_data[p + 2];
        let size = tag_value_size(val_type, &aux_data[p + 3..])?;
        let entry_end = p + 3 + size;
        if entry_end > aux_data.len() {
            return None;
        }
        if &aux_data[p..p + 2] == tag {
            return Some((p, entry_end));
        }
        p = entry_end;
    }
    None
}

/// Type byte of a tag (e.g. `b'Z'`, `b'c'`), if present.
#[must_use]
pub fn find_tag_type(aux_data: &[u8], tag: &[u8; 2]) -> Option<u8> {
    find_tag_bounds(aux_data, tag).map(|(start, _)| aux_data[start + 2])
}

/// Find an integer tag value in auxiliary data.
///
/// Supports signed/unsigned byte, short, and int types (c/C/s/S/i/I).
#[must_use]
pub fn find_int_tag(aux_data: &[u8], tag: &[u8; 2]) -> Option<i64> {
    let (start, end) = find_tag_bounds(aux_data, tag)?;
    let v = &aux_data[start + 3..end];
    match aux_data[start + 2] {
        b'c' => Some(i64::from(v[0].cast_signed())),
        b'C' => Some(i64::from(v[0])),
        b's' => Some(i64::from(i16::from_le_bytes([v[0], v[1]]))),
        b'S' => Some(i64::from(u16::from_le_bytes([v[0], v[1]]))),
        b'i' => Some(i64::from(i32::from_le_bytes([v[0], v[1], v[2], v[3]]))),
        b'I' => Some(i64::from(u32::from_le_bytes([v[0], v[1], v[2], v[3]]))),
        _ => None,
    }
}

/// Find a single-character (`A`-type) tag.
#[must_use]
pub fn find_char_tag(aux_data: &[u8], tag: &[u8; 2]) -> Option<u8> {
    let (start, _) = find_tag_bounds(aux_data, tag)?;
    (aux_data[start + 2] == b'A').then(|| aux_data[start + 3])
}

/// Find a string (`Z`-type) tag, returning value bytes without the NUL.
#[must_use]
pub fn find_string_tag<'a>(aux_data: &'a [u8], tag: &[u8; 2]) -> Option<&'a [u8]> {
    let (start, end) = find_tag_bounds(aux_data, tag)?;
    (aux_data[start + 2] == b'Z').then(|| &aux_data[start + 3..end - 1])
}

/// Append a string (Z-type) tag at the end of a record.
pub fn append_string_tag(record: &mut Vec<u8>, tag: &[u8; 2], value: &[u8]) {
    record.extend_from_slice(&[tag[0], tag[1], b'Z']);
    record.extend_from_slice(value);
    record.push(0);
}

/// Append a single-character (`A`-type) tag.
pub fn append_char_tag(record: &mut Vec<u8>, tag: &[u8; 2], value: u8) {
    record.extend_from_slice(&[tag[0], tag[1], b'A', value]);
}

/// Append an integer tag using the smallest signed type that fits.
///
/// Encodes as:
/// - `i8` (type `'c'`): if value in `[-128, 127]`
/// - `i16` (type `'s'`): if value in `[-32768, 32767]`
/// - `i32` (type `'i'`): otherwise
pub fn append_int_tag(record: &mut Vec<u8>, tag: &[u8; 2], value: i32) {
    record.push(tag[0]);
    record.push(tag[1]);
    if let Ok(v) = i8::try_from(value) {
        record.push(b'c');
        record.push(v.cast_unsigned());
    } else if let Ok(v) = i16::try_from(value) {
        record.push(b's');
        record.extend_from_slice(&v.to_le_bytes());
    } else {
        record.push(b'i');
        record.extend_from_slice(&value.to_le_bytes());
    }
}

/// Remove a tag from a record. No-op if the tag is not found.
pub fn remove_tag(record: &mut Vec<u8>, tag: &[u8; 2]) {
    let aux_start = aux_data_offset(record);
    if aux_start >= record.len() {
        return;
    }
    if let Some((start, end)) = find_tag_bounds(&record[aux_start..], tag) {
        record.drain(aux_start + start..aux_start + end);
    }
}

/// Update an existing int tag in-place, or append if absent.
///
/// A 4-byte `i`/`I` entry is overwritten where it stands; any other encoding
/// is removed and re-appended with [`append_int_tag`].
pub fn update_int_tag(record: &mut Vec<u8>, tag: &[u8; 2], value: i32) {
    let aux_start = aux_data_offset(record);
    if aux_start < record.len() {
        if let Some((start, end)) = find_tag_bounds(&record[aux_start..], tag) {
            let abs_start = aux_start + start;
            let abs_end = aux_start + end;
            if matches!(record[abs_start + 2], b'i' | b'I') && abs_end - abs_start == 7 {
                record[abs_start + 3..abs_end].copy_from_slice(&value.to_le_bytes());
                return;
            }
            record.drain(abs_start..abs_end);
        }
    }
    append_int_tag(record, tag, value);
}

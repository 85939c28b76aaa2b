//! Fixed-offset field access for raw alignment records.
//!
//! Records are held in the BAM binary layout without the leading
//! `block_size` word. Every accessor here recomputes offsets from the
//! fixed header, so a record stays consistent as long as the header
//! counts match the variable-length segments that follow it.
//!
//! # Record Binary Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0-3     4     refID (i32) - reference sequence ID
//! 4-7     4     pos (i32) - 0-based leftmost position
//! 8       1     l_read_name (u8) - length of read name + NUL padding
//! 9       1     mapq (u8) - mapping quality
//! 10-11   2     bin (u16) - BAM bin
//! 12-13   2     n_cigar_op (u16) - number of CIGAR operations
//! 14-15   2     flag (u16) - bitwise flags
//! 16-19   4     l_seq (u32) - length of sequence
//! 20-23   4     next_refID (i32) - mate reference sequence ID
//! 24-27   4     next_pos (i32) - mate 0-based position
//! 28-31   4     tlen (i32) - template length
//! 32+     var   read_name, CIGAR, packed sequence, quality, aux data
//! ```

use crate::error::{RecordError, Result};

/// Length of the fixed header that precedes the read name.
pub const MIN_BAM_HEADER_LEN: usize = 32;

/// Largest value `l_read_name` can hold.
pub const MAX_L_READ_NAME: usize = 255;

/// BAM flag bits.
pub mod flags {
    /// Read is paired in sequencing.
    pub const PAIRED: u16 = 0x1;
    /// Each segment properly aligned.
    pub const PROPER_PAIR: u16 = 0x2;
    /// Read is unmapped.
    pub const UNMAPPED: u16 = 0x4;
    /// Mate is unmapped.
    pub const MATE_UNMAPPED: u16 = 0x8;
    /// Read is reverse complemented.
    pub const REVERSE: u16 = 0x10;
    /// Mate is reverse complemented.
    pub const MATE_REVERSE: u16 = 0x20;
    /// First segment in template (R1).
    pub const FIRST_SEGMENT: u16 = 0x40;
    /// Last segment in template (R2).
    pub const LAST_SEGMENT: u16 = 0x80;
    /// Secondary alignment.
    pub const SECONDARY: u16 = 0x100;
    /// Supplementary alignment.
    pub const SUPPLEMENTARY: u16 = 0x800;

    /// Bits that survive when two mates collapse into one fragment record.
    pub const FRAGMENT_MASK: u16 = FIRST_SEGMENT | LAST_SEGMENT | REVERSE;
}

/// Fixed-size tag value sizes indexed by type byte.
/// 0 = variable/unknown (needs special handling).
pub(crate) const TAG_FIXED_SIZES: [u8; 256] = {
    let mut table = [0u8; 256];
    table[b'A' as usize] = 1;
    table[b'c' as usize] = 1;
    table[b'C' as usize] = 1;
    table[b's' as usize] = 2;
    table[b'S' as usize] = 2;
    table[b'i' as usize] = 4;
    table[b'I' as usize] = 4;
    table[b'f' as usize] = 4;
    table
};

/// Size in bytes of a tag value of type `val_type` whose payload starts at `data`.
#[inline]
#[must_use]
pub fn tag_value_size(val_type: u8, data: &[u8]) -> Option<usize> {
    let fixed = TAG_FIXED_SIZES[val_type as usize];
    if fixed > 0 {
        return Some(fixed as usize);
    }
    match val_type {
        b'Z' | b'H' => Some(data.iter().position(|&b| b == 0)? + 1),
        b'B' => {
            if data.len() < 5 {
                return None;
            }
            let elem_size = TAG_FIXED_SIZES[data[0] as usize] as usize;
            if elem_size == 0 {
                return None;
            }
            let count = u32::from_le_bytes([data[1], data[2], data[3], data[4]]) as usize;
            Some(5 + count * elem_size)
        }
        _ => None,
    }
}

// ============================================================================
// Read Primitives
// ============================================================================
//
// All primitives below assume `bam.len() >= 32`. Records built through
// `RawRecord::from_bytes` or the synthesis path always satisfy this.

/// Reference sequence ID.
#[inline]
#[must_use]
pub fn ref_id(bam: &[u8]) -> i32 {
    i32::from_le_bytes([bam[0], bam[1], bam[2], bam[3]])
}

/// 0-based leftmost position.
#[inline]
#[must_use]
pub fn pos(bam: &[u8]) -> i32 {
    i32::from_le_bytes([bam[4], bam[5], bam[6], bam[7]])
}

/// Length of the read name including its NUL padding.
#[inline]
#[must_use]
pub fn l_read_name(bam: &[u8]) -> u8 {
    bam[8]
}

#[inline]
#[must_use]
pub fn mapq(bam: &[u8]) -> u8 {
    bam[9]
}

#[inline]
#[must_use]
pub fn bin(bam: &[u8]) -> u16 {
    u16::from_le_bytes([bam[10], bam[11]])
}

/// Number of CIGAR operations.
#[inline]
#[must_use]
pub fn n_cigar_op(bam: &[u8]) -> u16 {
    u16::from_le_bytes([bam[12], bam[13]])
}

#[inline]
#[must_use]
pub fn flags(bam: &[u8]) -> u16 {
    u16::from_le_bytes([bam[14], bam[15]])
}

/// Query sequence length.
#[inline]
#[must_use]
pub fn l_seq(bam: &[u8]) -> u32 {
    u32::from_le_bytes([bam[16], bam[17], bam[18], bam[19]])
}

#[inline]
#[must_use]
pub fn mate_ref_id(bam: &[u8]) -> i32 {
    i32::from_le_bytes([bam[20], bam[21], bam[22], bam[23]])
}

#[inline]
#[must_use]
pub fn mate_pos(bam: &[u8]) -> i32 {
    i32::from_le_bytes([bam[24], bam[25], bam[26], bam[27]])
}

#[inline]
#[must_use]
pub fn template_length(bam: &[u8]) -> i32 {
    i32::from_le_bytes([bam[28], bam[29], bam[30], bam[31]])
}

/// Read name bytes up to (not including) the first NUL.
#[inline]
#[must_use]
pub fn read_name(bam: &[u8]) -> &[u8] {
    let l = l_read_name(bam) as usize;
    let name = &bam[MIN_BAM_HEADER_LEN..MIN_BAM_HEADER_LEN + l];
    let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
    &name[..end]
}

// ============================================================================
// Write Primitives
// ============================================================================

#[inline]
pub fn set_ref_id(bam: &mut [u8], value: i32) {
    bam[0..4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn set_pos(bam: &mut [u8], value: i32) {
    bam[4..8].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn set_mapq(bam: &mut [u8], value: u8) {
    bam[9] = value;
}

#[inline]
pub fn set_bin(bam: &mut [u8], value: u16) {
    bam[10..12].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn set_n_cigar_op(bam: &mut [u8], value: u16) {
    bam[12..14].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn set_flags(bam: &mut [u8], value: u16) {
    bam[14..16].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn set_l_seq(bam: &mut [u8], value: u32) {
    bam[16..20].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn set_mate_ref_id(bam: &mut [u8], value: i32) {
    bam[20..24].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn set_mate_pos(bam: &mut [u8], value: i32) {
    bam[24..28].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn set_template_length(bam: &mut [u8], value: i32) {
    bam[28..32].copy_from_slice(&value.to_le_bytes());
}

// ============================================================================
// Segment Offsets
// ============================================================================

/// Offset of the first CIGAR word.
#[inline]
#[must_use]
pub fn cigar_offset(bam: &[u8]) -> usize {
    MIN_BAM_HEADER_LEN + l_read_name(bam) as usize
}

/// Offset of the packed sequence.
#[inline]
#[must_use]
pub fn seq_offset(bam: &[u8]) -> usize {
    cigar_offset(bam) + n_cigar_op(bam) as usize * 4
}

/// Offset of the quality scores.
#[inline]
#[must_use]
pub fn qual_offset(bam: &[u8]) -> usize {
    seq_offset(bam) + (l_seq(bam) as usize).div_ceil(2)
}

/// Offset of the auxiliary tag block.
#[inline]
#[must_use]
pub fn aux_data_offset(bam: &[u8]) -> usize {
    qual_offset(bam) + l_seq(bam) as usize
}

/// Auxiliary tag block of a record.
#[inline]
#[must_use]
pub fn aux_data_slice(bam: &[u8]) -> &[u8] {
    &bam[aux_data_offset(bam).min(bam.len())..]
}

/// Length of `name` once NUL-terminated and padded to a multiple of four.
///
/// At least one NUL is always added, so a 4-byte name takes 8 bytes.
#[inline]
#[must_use]
pub fn padded_name_len(name_len: usize) -> usize {
    name_len + (4 - name_len % 4)
}

/// Check that every segment declared by the fixed header fits in `bam`.
///
/// # Errors
/// Returns [`RecordError::Truncated`] naming the first segment that overruns
/// the blob, or [`RecordError::Malformed`] for an empty read name.
pub fn check_layout(bam: &[u8]) -> Result<()> {
    if bam.len() < MIN_BAM_HEADER_LEN {
        return Err(RecordError::Truncated {
            field: "header",
            needed: MIN_BAM_HEADER_LEN,
            available: bam.len(),
        });
    }
    let segments = [
        ("read_name", cigar_offset(bam)),
        ("cigar", seq_offset(bam)),
        ("sequence", qual_offset(bam)),
        ("quality", aux_data_offset(bam)),
    ];
    for (field, end) in segments {
        if end > bam.len() {
            return Err(RecordError::Truncated { field, needed: end, available: bam.len() });
        }
    }
    let l = l_read_name(bam) as usize;
    if l < 2 || bam[MIN_BAM_HEADER_LEN] == 0 {
        return Err(RecordError::malformed("read_name", "query name is empty"));
    }
    if bam[MIN_BAM_HEADER_LEN + l - 1] != 0 {
        return Err(RecordError::malformed("read_name", "query name is not NUL-terminated"));
    }
    Ok(())
}

/// BAM bin for the 0-based half-open interval `[beg, end)`.
#[must_use]
pub fn reg2bin(beg: i64, end: i64) -> u16 {
    let end = end - 1;
    let levels: [(u32, i64); 5] = [(14, 4681), (17, 585), (20, 73), (23, 9), (26, 1)];
    for (shift, offset) in levels {
        if beg >> shift == end >> shift {
            return (offset + (beg >> shift)) as u16;
        }
    }
    0
}

//! Owned raw alignment record.
//!
//! [`RawRecord`] owns the bytes of one record in BAM layout (no
//! `block_size` prefix) and keeps the segments consistent through edits:
//! changing the CIGAR, the sequence or a tag shifts everything after the
//! edited segment by the exact size difference.
//!
//! Buffers grow to the next power of two of the requested size and never
//! shrink their allocation, so a record reused as a merge destination
//! settles at a stable capacity.

use std::ops::Deref;

use crate::cigar::{get_cigar_ops, query_span, reference_span, spans_fit_position};
use crate::error::{RecordError, Result};
use crate::fields::{
    self, MAX_L_READ_NAME, MIN_BAM_HEADER_LEN, aux_data_offset, aux_data_slice, check_layout,
    cigar_offset, flags::REVERSE, padded_name_len, seq_offset,
};
use crate::sequence::{
    MISSING_QUALITY, pack_sequence_into, quality_scores_slice, sequence_slice, sequence_slice_mut,
};
use crate::tags;

/// Grow `buf` so it can hold `total` bytes, rounding the allocation up to the
/// next power of two.
///
/// # Errors
/// Returns [`RecordError::Allocation`] if the allocator refuses the request.
pub fn reserve_pow2(buf: &mut Vec<u8>, total: usize) -> Result<()> {
    if total <= buf.capacity() {
        return Ok(());
    }
    let target = total.checked_next_power_of_two().unwrap_or(total);
    buf.try_reserve_exact(target - buf.len())
        .map_err(|_| RecordError::Allocation { requested: target })
}

/// A single alignment record held as raw bytes.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct RawRecord {
    buf: Vec<u8>,
}

impl std::fmt::Debug for RawRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.buf.len() < MIN_BAM_HEADER_LEN {
            return f.debug_struct("RawRecord").field("len", &self.buf.len()).finish();
        }
        f.debug_struct("RawRecord")
            .field("name", &String::from_utf8_lossy(self.query_name()))
            .field("ref_id", &self.ref_id())
            .field("pos", &self.pos())
            .field("flags", &self.flags())
            .field("cigar", &crate::cigar::cigar_to_string(&self.cigar()))
            .field("query_length", &self.query_length())
            .finish()
    }
}

impl RawRecord {
    /// Creates an empty record, typically used as a reusable destination.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a raw blob after checking its layout.
    ///
    /// The read name is re-padded with NULs to a multiple of four bytes.
    ///
    /// # Errors
    /// Returns [`RecordError::Truncated`] if a declared segment runs past the
    /// blob and [`RecordError::Malformed`] for an empty or oversized name, a
    /// CIGAR spanning more than `i32::MAX` bases, or a CIGAR whose query span
    /// disagrees with `l_seq`.
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self> {
        check_layout(&buf)?;
        let mut record = Self { buf };
        record.pad_read_name()?;

        let l_seq = record.query_length();
        let cigar = record.cigar();
        if !spans_fit_position(&cigar) {
            return Err(RecordError::malformed(
                "cigar",
                format!("{} ops span more than {} bases", cigar.len(), i32::MAX),
            ));
        }
        if l_seq > 0 && !cigar.is_empty() && query_span(&cigar) as usize != l_seq {
            return Err(RecordError::malformed(
                "l_seq",
                format!(
                    "sequence length {l_seq} does not match CIGAR query length {}",
                    query_span(&cigar)
                ),
            ));
        }
        Ok(record)
    }

    fn pad_read_name(&mut self) -> Result<()> {
        let l_read_name = fields::l_read_name(&self.buf) as usize;
        let name_len = fields::read_name(&self.buf).len();
        let padded = padded_name_len(name_len);
        if padded > MAX_L_READ_NAME {
            return Err(RecordError::malformed(
                "read_name",
                format!("name of {name_len} bytes is too long to pad"),
            ));
        }
        if padded != l_read_name {
            let start = MIN_BAM_HEADER_LEN + name_len;
            let end = MIN_BAM_HEADER_LEN + l_read_name;
            let total = self.buf.len() + padded - l_read_name;
            reserve_pow2(&mut self.buf, total)?;
            self.buf.splice(start..end, std::iter::repeat_n(0u8, padded - name_len));
            self.buf[8] = padded as u8;
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Backing buffer, for synthesis code that lays out a record from scratch.
    #[inline]
    pub(crate) fn buf_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    // ========================================================================
    // Field accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn ref_id(&self) -> i32 {
        fields::ref_id(&self.buf)
    }

    #[inline]
    #[must_use]
    pub fn pos(&self) -> i32 {
        fields::pos(&self.buf)
    }

    #[inline]
    #[must_use]
    pub fn mate_ref_id(&self) -> i32 {
        fields::mate_ref_id(&self.buf)
    }

    #[inline]
    #[must_use]
    pub fn mate_pos(&self) -> i32 {
        fields::mate_pos(&self.buf)
    }

    #[inline]
    #[must_use]
    pub fn flags(&self) -> u16 {
        fields::flags(&self.buf)
    }

    #[inline]
    #[must_use]
    pub fn mapq(&self) -> u8 {
        fields::mapq(&self.buf)
    }

    #[inline]
    #[must_use]
    pub fn template_length(&self) -> i32 {
        fields::template_length(&self.buf)
    }

    #[inline]
    #[must_use]
    pub fn query_length(&self) -> usize {
        fields::l_seq(&self.buf) as usize
    }

    #[inline]
    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.flags() & REVERSE != 0
    }

    #[inline]
    #[must_use]
    pub fn query_name(&self) -> &[u8] {
        fields::read_name(&self.buf)
    }

    #[inline]
    #[must_use]
    pub fn cigar(&self) -> Vec<u32> {
        get_cigar_ops(&self.buf)
    }

    /// Reference bases covered by the alignment.
    #[inline]
    #[must_use]
    pub fn reference_span(&self) -> u32 {
        reference_span(&self.cigar())
    }

    /// One past the last aligned reference base (`pos + reference_span`).
    #[inline]
    #[must_use]
    pub fn end_position(&self) -> i64 {
        i64::from(self.pos()) + i64::from(self.reference_span())
    }

    /// Packed 4-bit sequence bytes.
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> &[u8] {
        sequence_slice(&self.buf)
    }

    #[inline]
    pub fn sequence_mut(&mut self) -> &mut [u8] {
        sequence_slice_mut(&mut self.buf)
    }

    #[inline]
    #[must_use]
    pub fn quality(&self) -> &[u8] {
        quality_scores_slice(&self.buf)
    }

    #[inline]
    #[must_use]
    pub fn aux_data(&self) -> &[u8] {
        aux_data_slice(&self.buf)
    }

    #[inline]
    #[must_use]
    pub fn int_tag(&self, tag: &[u8; 2]) -> Option<i64> {
        tags::find_int_tag(self.aux_data(), tag)
    }

    #[inline]
    #[must_use]
    pub fn char_tag(&self, tag: &[u8; 2]) -> Option<u8> {
        tags::find_char_tag(self.aux_data(), tag)
    }

    #[inline]
    #[must_use]
    pub fn string_tag(&self, tag: &[u8; 2]) -> Option<&[u8]> {
        tags::find_string_tag(self.aux_data(), tag)
    }

    // ========================================================================
    // Fixed-field setters
    // ========================================================================

    #[inline]
    pub fn set_ref_id(&mut self, value: i32) {
        fields::set_ref_id(&mut self.buf, value);
    }

    #[inline]
    pub fn set_pos(&mut self, value: i32) {
        fields::set_pos(&mut self.buf, value);
    }

    #[inline]
    pub fn set_flags(&mut self, value: u16) {
        fields::set_flags(&mut self.buf, value);
    }

    /// Point the mate fields at `(ref_id, pos)`; `(-1, -1)` clears them.
    #[inline]
    pub fn set_mate(&mut self, ref_id: i32, pos: i32) {
        fields::set_mate_ref_id(&mut self.buf, ref_id);
        fields::set_mate_pos(&mut self.buf, pos);
    }

    #[inline]
    pub fn set_template_length(&mut self, value: i32) {
        fields::set_template_length(&mut self.buf, value);
    }

    // ========================================================================
    // Variable-length edits
    // ========================================================================

    /// Replace this record's bytes with a copy of `other`, reusing the buffer.
    ///
    /// # Errors
    /// Returns [`RecordError::Allocation`] if the buffer cannot grow.
    pub fn copy_from(&mut self, other: &RawRecord) -> Result<()> {
        self.buf.clear();
        reserve_pow2(&mut self.buf, other.len())?;
        self.buf.extend_from_slice(&other.buf);
        Ok(())
    }

    /// Replace `range` of the buffer with `replacement`, growing first.
    fn splice_segment(&mut self, start: usize, end: usize, replacement: &[u8]) -> Result<()> {
        let total = self.buf.len() - (end - start) + replacement.len();
        reserve_pow2(&mut self.buf, total)?;
        self.buf.splice(start..end, replacement.iter().copied());
        Ok(())
    }

    /// Replace the CIGAR, shifting the sequence, qualities and tags.
    ///
    /// # Errors
    /// Returns [`RecordError::Malformed`] if `cigar` has more than `u16::MAX`
    /// ops, or [`RecordError::Allocation`] if the buffer cannot grow.
    pub fn set_cigar(&mut self, cigar: &[u32]) -> Result<()> {
        let n_ops = u16::try_from(cigar.len()).map_err(|_| {
            RecordError::malformed("n_cigar_op", format!("{} ops exceed u16", cigar.len()))
        })?;
        let start = cigar_offset(&self.buf);
        let end = seq_offset(&self.buf);
        let bytes: Vec<u8> = cigar.iter().flat_map(|op| op.to_le_bytes()).collect();
        self.splice_segment(start, end, &bytes)?;
        fields::set_n_cigar_op(&mut self.buf, n_ops);
        Ok(())
    }

    /// Replace the sequence with ASCII `bases`; qualities become absent (`0xFF`).
    ///
    /// # Errors
    /// Returns [`RecordError::Malformed`] if the length exceeds `u32::MAX`, or
    /// [`RecordError::Allocation`] if the buffer cannot grow.
    pub fn set_sequence(&mut self, bases: &[u8]) -> Result<()> {
        let l_seq = u32::try_from(bases.len())
            .map_err(|_| RecordError::malformed("l_seq", "sequence too long"))?;
        let start = seq_offset(&self.buf);
        let end = aux_data_offset(&self.buf);
        let mut segment = Vec::with_capacity(bases.len().div_ceil(2) + bases.len());
        pack_sequence_into(&mut segment, bases);
        segment.resize(segment.len() + bases.len(), MISSING_QUALITY);
        self.splice_segment(start, end, &segment)?;
        fields::set_l_seq(&mut self.buf, l_seq);
        Ok(())
    }

    /// Set an integer tag, overwriting an existing 4-byte entry in place.
    ///
    /// # Errors
    /// Returns [`RecordError::Allocation`] if the buffer cannot grow.
    pub fn update_int_tag(&mut self, tag: &[u8; 2], value: i32) -> Result<()> {
        self.reserve_extra(7)?;
        tags::update_int_tag(&mut self.buf, tag, value);
        Ok(())
    }

    /// Append a single-character tag.
    ///
    /// # Errors
    /// Returns [`RecordError::Allocation`] if the buffer cannot grow.
    pub fn append_char_tag(&mut self, tag: &[u8; 2], value: u8) -> Result<()> {
        self.reserve_extra(4)?;
        tags::append_char_tag(&mut self.buf, tag, value);
        Ok(())
    }

    /// Append a string tag.
    ///
    /// # Errors
    /// Returns [`RecordError::Allocation`] if the buffer cannot grow.
    pub fn append_string_tag(&mut self, tag: &[u8; 2], value: &[u8]) -> Result<()> {
        self.reserve_extra(value.len() + 4)?;
        tags::append_string_tag(&mut self.buf, tag, value);
        Ok(())
    }

    pub fn remove_tag(&mut self, tag: &[u8; 2]) {
        tags::remove_tag(&mut self.buf, tag);
    }

    /// Room for `additional` more bytes past the current end.
    fn reserve_extra(&mut self, additional: usize) -> Result<()> {
        let total = self.buf.len() + additional;
        reserve_pow2(&mut self.buf, total)
    }
}

impl AsRef<[u8]> for RawRecord {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl Deref for RawRecord {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

//! Packed 4-bit nucleotide sequences.
//!
//! Two bases per byte, the even index in the high nibble. An odd-length
//! sequence leaves the low nibble of its last byte unused (zero).

use crate::error::{RecordError, Result};
use crate::fields::{l_seq, qual_offset, seq_offset};

/// BAM 4-bit base encoding -> ASCII lookup table.
///
/// Index is the 4-bit nibble value: 0=`=`, 1=`A`, 2=`C`, 4=`G`, 8=`T`, 15=`N`.
pub const BAM_BASE_TO_ASCII: [u8; 16] = *b"=ACMGRSVTWYHKDBN";

/// Code written for an unknown base.
pub const N_CODE: u8 = 0x0F;

/// Quality byte meaning "no qualities stored".
pub const MISSING_QUALITY: u8 = 0xFF;

const SEQ_CODES: [u8; 256] = build_seq_codes();

const fn build_seq_codes() -> [u8; 256] {
    let mut codes = [N_CODE; 256];
    let mut i: u8 = 0;
    while (i as usize) < BAM_BASE_TO_ASCII.len() {
        let base = BAM_BASE_TO_ASCII[i as usize];
        codes[base as usize] = i;
        codes[base.to_ascii_lowercase() as usize] = i;
        i += 1;
    }
    codes
}

/// Complement of each 4-bit code. Ambiguity codes map to their complementary
/// ambiguity (`M`<->`K`, `R`<->`Y`, `V`<->`B`, `H`<->`D`); `=`, `S`, `W` and `N`
/// are their own complement.
pub const COMPLEMENT_CODE: [u8; 16] = [0, 8, 4, 12, 2, 10, 6, 14, 1, 9, 5, 13, 3, 11, 7, 15];

/// Maps a packed byte `[hi, lo]` to the packed reverse complement `[~lo, ~hi]`.
pub const REVCOMP_BYTE: [u8; 256] = build_revcomp_bytes();

const fn build_revcomp_bytes() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0usize;
    while i < 256 {
        let hi = COMPLEMENT_CODE[i >> 4];
        let lo = COMPLEMENT_CODE[i & 0x0F];
        table[i] = (lo << 4) | hi;
        i += 1;
    }
    table
}

/// 4-bit code of the base at `position`.
#[inline]
#[must_use]
pub fn get_base(seq: &[u8], position: usize) -> u8 {
    let byte = seq[position / 2];
    if position.is_multiple_of(2) { byte >> 4 } else { byte & 0x0F }
}

/// Write the 4-bit `code` at `position`, leaving the neighbouring nibble intact.
#[inline]
pub fn set_base(seq: &mut [u8], position: usize, code: u8) {
    let idx = position / 2;
    if position.is_multiple_of(2) {
        seq[idx] = (code << 4) | (seq[idx] & 0x0F);
    } else {
        seq[idx] = (seq[idx] & 0xF0) | (code & 0x0F);
    }
}

/// ASCII base -> 4-bit code. Unknown characters become `N`.
#[inline]
#[must_use]
pub fn encode_base(base: u8) -> u8 {
    SEQ_CODES[base as usize]
}

/// Pack ASCII bases, appending `ceil(len / 2)` bytes to `dst`.
pub fn pack_sequence_into(dst: &mut Vec<u8>, bases: &[u8]) {
    dst.reserve(bases.len().div_ceil(2));
    let mut pairs = bases.chunks_exact(2);
    for pair in pairs.by_ref() {
        dst.push((encode_base(pair[0]) << 4) | encode_base(pair[1]));
    }
    if let Some(&last) = pairs.remainder().first() {
        dst.push(encode_base(last) << 4);
    }
}

#[must_use]
pub fn pack_sequence(bases: &[u8]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(bases.len().div_ceil(2));
    pack_sequence_into(&mut packed, bases);
    packed
}

/// Decode the first `len` bases of a packed sequence to ASCII.
#[must_use]
pub fn unpack_sequence(seq: &[u8], len: usize) -> Vec<u8> {
    (0..len).map(|i| BAM_BASE_TO_ASCII[get_base(seq, i) as usize]).collect()
}

/// Packed sequence bytes of a record.
#[inline]
#[must_use]
pub fn sequence_slice(bam: &[u8]) -> &[u8] {
    let off = seq_offset(bam);
    &bam[off..off + (l_seq(bam) as usize).div_ceil(2)]
}

#[inline]
pub fn sequence_slice_mut(bam: &mut [u8]) -> &mut [u8] {
    let off = seq_offset(bam);
    let len = (l_seq(bam) as usize).div_ceil(2);
    &mut bam[off..off + len]
}

/// Raw Phred quality scores of a record (not Phred+33).
#[inline]
#[must_use]
pub fn quality_scores_slice(bam: &[u8]) -> &[u8] {
    let off = qual_offset(bam);
    &bam[off..off + l_seq(bam) as usize]
}

#[inline]
pub fn quality_scores_slice_mut(bam: &mut [u8]) -> &mut [u8] {
    let off = qual_offset(bam);
    let len = l_seq(bam) as usize;
    &mut bam[off..off + len]
}

/// Copy the first `len` bases of packed `src` into `dst`, clearing the unused
/// low nibble when `len` is odd.
///
/// # Errors
/// Returns [`RecordError::Truncated`] if either buffer is shorter than
/// `ceil(len / 2)` bytes.
pub fn copy_packed_prefix(src: &[u8], len: usize, dst: &mut [u8]) -> Result<()> {
    let n_bytes = len.div_ceil(2);
    ensure_len("sequence", src.len(), n_bytes)?;
    ensure_len("sequence", dst.len(), n_bytes)?;
    dst[..n_bytes].copy_from_slice(&src[..n_bytes]);
    if len % 2 == 1 {
        dst[n_bytes - 1] &= 0xF0;
    }
    Ok(())
}

/// Write `a[..a_len]` followed by the reverse complement of `b[..b_len]`
/// into `dst` as one packed sequence of `a_len + b_len` bases.
///
/// Exactly `ceil((a_len + b_len) / 2)` bytes of `dst` are written. Each
/// parity of `(a_len, b_len)` has its own byte pattern:
///
/// ```text
/// a even, b even: [aa aa][bb bb]         whole reverse-complement bytes
/// a even, b odd:  [aa aa][bb bb b-]      shifted by one nibble
/// a odd,  b even: [aa ab][bb bb b-]      first B base fills a's last nibble
/// a odd,  b odd:  [aa ab][bb bb]         whole bytes after the fill
/// ```
///
/// # Errors
/// Returns [`RecordError::Truncated`] if a source or `dst` is too short for
/// the requested lengths.
pub fn merge_packed(a: &[u8], a_len: usize, b: &[u8], b_len: usize, dst: &mut [u8]) -> Result<()> {
    let a_bytes = a_len.div_ceil(2);
    let b_bytes = b_len.div_ceil(2);
    ensure_len("sequence", a.len(), a_bytes)?;
    ensure_len("sequence", b.len(), b_bytes)?;
    ensure_len("sequence", dst.len(), (a_len + b_len).div_ceil(2))?;

    copy_packed_prefix(a, a_len, dst)?;
    if b_len == 0 {
        return Ok(());
    }

    let a_odd = a_len % 2 == 1;
    let b_odd = b_len % 2 == 1;
    // complement of the high / low nibble of a source byte, as a bare nibble
    let comp_hi = |byte: u8| REVCOMP_BYTE[byte as usize] & 0x0F;
    let comp_lo = |byte: u8| REVCOMP_BYTE[byte as usize] >> 4;

    match (a_odd, b_odd) {
        (false, false) => {
            for i in 0..b_bytes {
                dst[a_bytes + i] = REVCOMP_BYTE[b[b_bytes - 1 - i] as usize];
            }
        }
        (false, true) => {
            for i in 0..b_bytes - 1 {
                dst[a_bytes + i] = (comp_hi(b[b_bytes - 1 - i]) << 4) | comp_lo(b[b_bytes - 2 - i]);
            }
            dst[a_bytes + b_bytes - 1] = comp_hi(b[0]) << 4;
        }
        (true, false) => {
            dst[a_bytes - 1] |= comp_lo(b[b_bytes - 1]);
            for i in 0..b_bytes - 1 {
                dst[a_bytes + i] = (comp_hi(b[b_bytes - 1 - i]) << 4) | comp_lo(b[b_bytes - 2 - i]);
            }
            dst[a_bytes + b_bytes - 1] = comp_hi(b[0]) << 4;
        }
        (true, true) => {
            dst[a_bytes - 1] |= comp_hi(b[b_bytes - 1]);
            for i in 0..b_bytes - 1 {
                dst[a_bytes + i] = REVCOMP_BYTE[b[b_bytes - 2 - i] as usize];
            }
        }
    }
    Ok(())
}

fn ensure_len(field: &'static str, available: usize, needed: usize) -> Result<()> {
    if available < needed {
        return Err(RecordError::Truncated { field, needed, available });
    }
    Ok(())
}

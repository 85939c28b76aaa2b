//! CIGAR arrays in their packed BAM form (`len << 4 | op`).
//!
//! Rewrites here work on `&mut [u32]` / `&mut Vec<u32>` so a caller can
//! edit a CIGAR in isolation and write it back with
//! `RawRecord::set_cigar`.

use crate::error::{RecordError, Result};
use crate::fields::{cigar_offset, n_cigar_op};

pub const CIGAR_MATCH: u32 = 0;
pub const CIGAR_INS: u32 = 1;
pub const CIGAR_DEL: u32 = 2;
pub const CIGAR_REF_SKIP: u32 = 3;
pub const CIGAR_SOFT_CLIP: u32 = 4;
pub const CIGAR_HARD_CLIP: u32 = 5;
pub const CIGAR_PAD: u32 = 6;
pub const CIGAR_EQUAL: u32 = 7;
pub const CIGAR_DIFF: u32 = 8;

/// Largest length a single packed op can carry.
pub const MAX_OP_LEN: u32 = u32::MAX >> 4;

const CIGAR_CHARS: &[u8; 9] = b"MIDNSHP=X";

const CONSUMES_QUERY: u8 = 0b01;
const CONSUMES_REFERENCE: u8 = 0b10;

/// Consumption bits per op kind; kinds 9..15 consume nothing.
const OP_CONSUMES: [u8; 16] = [
    CONSUMES_QUERY | CONSUMES_REFERENCE, // M
    CONSUMES_QUERY,                      // I
    CONSUMES_REFERENCE,                  // D
    CONSUMES_REFERENCE,                  // N
    CONSUMES_QUERY,                      // S
    0,                                   // H
    0,                                   // P
    CONSUMES_QUERY | CONSUMES_REFERENCE, // =
    CONSUMES_QUERY | CONSUMES_REFERENCE, // X
    0,
    0,
    0,
    0,
    0,
    0,
    0,
];

#[inline]
#[must_use]
pub fn op_kind(op: u32) -> u32 {
    op & 0xF
}

#[inline]
#[must_use]
pub fn op_len(op: u32) -> u32 {
    op >> 4
}

/// Pack an op kind and length into one CIGAR word.
#[inline]
#[must_use]
pub fn make_op(kind: u32, len: u32) -> u32 {
    (len << 4) | (kind & 0xF)
}

#[inline]
#[must_use]
pub fn consumes_reference(op: u32) -> bool {
    OP_CONSUMES[op_kind(op) as usize] & CONSUMES_REFERENCE != 0
}

#[inline]
#[must_use]
pub fn consumes_query(op: u32) -> bool {
    OP_CONSUMES[op_kind(op) as usize] & CONSUMES_QUERY != 0
}

/// Extract CIGAR operations from a raw record.
#[inline]
#[must_use]
pub fn get_cigar_ops(bam: &[u8]) -> Vec<u32> {
    let start = cigar_offset(bam);
    let end = start + n_cigar_op(bam) as usize * 4;
    if end > bam.len() {
        return Vec::new();
    }
    // CIGAR words are not guaranteed to be 4-byte aligned in the buffer.
    bam[start..end].chunks_exact(4).map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

/// Sum of reference-consuming op lengths (M, D, N, =, X), saturating at
/// `u32::MAX`.
#[inline]
#[must_use]
pub fn reference_span(cigar: &[u32]) -> u32 {
    saturating_span(cigar, consumes_reference)
}

/// Sum of query-consuming op lengths (M, I, S, =, X), saturating at
/// `u32::MAX`.
#[inline]
#[must_use]
pub fn query_span(cigar: &[u32]) -> u32 {
    saturating_span(cigar, consumes_query)
}

fn saturating_span(cigar: &[u32], counts: fn(u32) -> bool) -> u32 {
    cigar.iter().filter(|&&op| counts(op)).fold(0u32, |acc, &op| acc.saturating_add(op_len(op)))
}

/// True when both spans of `cigar` fit in a BAM position (`i32`).
#[must_use]
pub fn spans_fit_position(cigar: &[u32]) -> bool {
    const MAX_SPAN: u32 = 0x7fff_ffff;
    reference_span(cigar) <= MAX_SPAN && query_span(cigar) <= MAX_SPAN
}

/// Where a CIGAR crosses a reference offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarSplit {
    /// Leading ops that lie entirely within the first `n` reference bases.
    pub full_ops: usize,
    /// Reference bases still needed from the op at `full_ops`; 0 on an exact
    /// boundary or when the CIGAR ends first.
    pub partial_len: u32,
}

impl CigarSplit {
    /// The carved prefix: the whole ops plus the straddling op shortened to
    /// `partial_len`, keeping its kind.
    #[must_use]
    pub fn prefix(&self, cigar: &[u32]) -> Vec<u32> {
        let mut prefix = cigar[..self.full_ops].to_vec();
        if self.partial_len > 0 {
            prefix.push(make_op(op_kind(cigar[self.full_ops]), self.partial_len));
        }
        prefix
    }
}

/// Split `cigar` after its first `n` reference bases.
///
/// Ops that consume no reference are carried along with the prefix until the
/// next reference-consuming op that would cross `n`.
#[must_use]
pub fn split_at_reference_offset(cigar: &[u32], n: u32) -> CigarSplit {
    let mut ref_len = 0u32;
    for (i, &op) in cigar.iter().enumerate() {
        if consumes_reference(op) {
            if u64::from(ref_len) + u64::from(op_len(op)) > u64::from(n) {
                return CigarSplit { full_ops: i, partial_len: n - ref_len };
            }
            ref_len += op_len(op);
        }
    }
    CigarSplit { full_ops: cigar.len(), partial_len: 0 }
}

/// Turn leading and trailing query-only ops into soft clips.
///
/// Ops before the first and after the last reference-consuming op that
/// consume query (typically insertions) become `S`. Hard clips and pads
/// stay as they are. An empty CIGAR is left alone.
///
/// # Errors
/// Returns [`RecordError::NoReferenceOps`] if no op consumes reference.
pub fn normalize_boundary_ops(cigar: &mut [u32]) -> Result<()> {
    let Some((first, last)) = reference_bounds(cigar)? else {
        return Ok(());
    };
    let (head, rest) = cigar.split_at_mut(first);
    let tail = &mut rest[last + 1 - first..];
    for op in head.iter_mut().chain(tail.iter_mut()) {
        if consumes_query(*op) {
            *op = make_op(CIGAR_SOFT_CLIP, op_len(*op));
        }
    }
    Ok(())
}

/// Turn soft clips that sit between reference-consuming ops into insertions.
///
/// # Errors
/// Returns [`RecordError::NoReferenceOps`] if no op consumes reference.
pub fn demote_internal_softclips(cigar: &mut [u32]) -> Result<()> {
    let Some((first, last)) = reference_bounds(cigar)? else {
        return Ok(());
    };
    for op in &mut cigar[first..last] {
        if op_kind(*op) == CIGAR_SOFT_CLIP {
            *op = make_op(CIGAR_INS, op_len(*op));
        }
    }
    Ok(())
}

/// Merge runs of same-kind ops in place; returns the new op count.
///
/// A run is split where its length would exceed [`MAX_OP_LEN`].
///
/// Ops past the returned count are stale and should be discarded.
pub fn coalesce_adjacent(cigar: &mut [u32]) -> usize {
    if cigar.is_empty() {
        return 0;
    }
    let mut write = 0;
    for read in 1..cigar.len() {
        let op = cigar[read];
        let fused = op_len(cigar[write]) + op_len(op);
        if op_kind(op) == op_kind(cigar[write]) && fused <= MAX_OP_LEN {
            cigar[write] = make_op(op_kind(op), fused);
        } else {
            write += 1;
            cigar[write] = op;
        }
    }
    write + 1
}

/// Indices of the first and last reference-consuming ops, `None` for an
/// empty CIGAR.
fn reference_bounds(cigar: &[u32]) -> Result<Option<(usize, usize)>> {
    if cigar.is_empty() {
        return Ok(None);
    }
    let first = cigar.iter().position(|&op| consumes_reference(op));
    let last = cigar.iter().rposition(|&op| consumes_reference(op));
    match (first, last) {
        (Some(first), Some(last)) => Ok(Some((first, last))),
        _ => Err(RecordError::NoReferenceOps { cigar: cigar_to_string(cigar) }),
    }
}

/// Render packed ops as a SAM CIGAR string (`*` when empty).
#[must_use]
pub fn cigar_to_string(cigar: &[u32]) -> String {
    if cigar.is_empty() {
        return "*".to_string();
    }
    let mut out = String::with_capacity(cigar.len() * 4);
    for &op in cigar {
        out.push_str(&op_len(op).to_string());
        out.push(CIGAR_CHARS.get(op_kind(op) as usize).map_or('?', |&c| c as char));
    }
    out
}

/// Parse a SAM CIGAR string into packed ops.
///
/// # Errors
/// Returns [`RecordError::Malformed`] on an unknown op, a missing length, or
/// a length that does not fit in 28 bits.
pub fn parse_cigar(text: &str) -> Result<Vec<u32>> {
    if text == "*" {
        return Ok(Vec::new());
    }
    let mut ops = Vec::new();
    let mut len: u64 = 0;
    let mut has_digits = false;
    for c in text.bytes() {
        if c.is_ascii_digit() {
            len = len * 10 + u64::from(c - b'0');
            if len > u64::from(MAX_OP_LEN) {
                return Err(RecordError::malformed("cigar", format!("op length too large in {text}")));
            }
            has_digits = true;
            continue;
        }
        let Some(kind) = CIGAR_CHARS.iter().position(|&k| k == c) else {
            return Err(RecordError::malformed("cigar", format!("unknown op '{}' in {text}", c as char)));
        };
        if !has_digits {
            return Err(RecordError::malformed("cigar", format!("missing length in {text}")));
        }
        ops.push(make_op(kind as u32, len as u32));
        len = 0;
        has_digits = false;
    }
    if has_digits {
        return Err(RecordError::malformed("cigar", format!("trailing length in {text}")));
    }
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cig(text: &str) -> Vec<u32> {
        parse_cigar(text).unwrap()
    }

    // ========================================================================
    // Spans
    // ========================================================================

    #[test]
    fn test_spans() {
        // 5S10M2I3D4N6M1H: ref = 10+3+4+6, query = 5+10+2+6
        let ops = cig("5S10M2I3D4N6M1H");
        assert_eq!(reference_span(&ops), 23);
        assert_eq!(query_span(&ops), 23);
        assert_eq!(reference_span(&cig("3=2X")), 5);
        assert_eq!(query_span(&cig("4P5H")), 0);
    }

    #[test]
    fn test_spans_saturate_on_huge_cigars() {
        let ops = vec![make_op(CIGAR_REF_SKIP, MAX_OP_LEN); 17];
        assert_eq!(reference_span(&ops), u32::MAX);
        assert_eq!(query_span(&ops), 0);
        assert!(!spans_fit_position(&ops));
        assert!(spans_fit_position(&cig("100M5000N50M")));
    }

    #[test]
    fn test_parse_and_format() {
        let ops = cig("10M2I5D3N4S1H2P3=4X");
        assert_eq!(ops.len(), 9);
        assert_eq!(ops[0], make_op(CIGAR_MATCH, 10));
        assert_eq!(ops[8], make_op(CIGAR_DIFF, 4));
        assert_eq!(cigar_to_string(&ops), "10M2I5D3N4S1H2P3=4X");
        assert_eq!(cigar_to_string(&[]), "*");
        assert!(cig("*").is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_cigar("M").is_err());
        assert!(parse_cigar("10Q").is_err());
        assert!(parse_cigar("10M5").is_err());
        assert!(parse_cigar("999999999M").is_err());
    }

    // ========================================================================
    // split_at_reference_offset
    // ========================================================================

    #[test]
    fn test_split_inside_op() {
        let ops = cig("50M");
        let split = split_at_reference_offset(&ops, 20);
        assert_eq!(split, CigarSplit { full_ops: 0, partial_len: 20 });
        assert_eq!(split.prefix(&ops), cig("20M"));
    }

    #[test]
    fn test_split_exact_boundary_carries_insertion() {
        // 10M lands exactly on the boundary; the insertion consumes no reference
        let ops = cig("10M2I10M");
        let split = split_at_reference_offset(&ops, 10);
        assert_eq!(split, CigarSplit { full_ops: 2, partial_len: 0 });
        assert_eq!(split.prefix(&ops), cig("10M2I"));
    }

    #[test]
    fn test_split_straddling_deletion_keeps_kind() {
        let ops = cig("5S10M4D10M");
        let split = split_at_reference_offset(&ops, 12);
        assert_eq!(split, CigarSplit { full_ops: 2, partial_len: 2 });
        assert_eq!(split.prefix(&ops), cig("5S10M2D"));
    }

    #[test]
    fn test_split_beyond_end() {
        let ops = cig("10M");
        let split = split_at_reference_offset(&ops, 25);
        assert_eq!(split, CigarSplit { full_ops: 1, partial_len: 0 });
    }

    // ========================================================================
    // Rewrites
    // ========================================================================

    #[test]
    fn test_normalize_leaves_true_end_clips() {
        let mut ops = cig("5S40M5S");
        normalize_boundary_ops(&mut ops).unwrap();
        assert_eq!(ops, cig("5S40M5S"));
    }

    #[test]
    fn test_normalize_converts_external_insertions() {
        let mut ops = cig("3I2S40M4I1H");
        normalize_boundary_ops(&mut ops).unwrap();
        assert_eq!(ops, cig("3S2S40M4S1H"));
    }

    #[test]
    fn test_normalize_requires_reference_op() {
        let mut ops = cig("5S5I");
        let err = normalize_boundary_ops(&mut ops).unwrap_err();
        assert_eq!(err, RecordError::NoReferenceOps { cigar: "5S5I".to_string() });
        let mut empty: Vec<u32> = Vec::new();
        assert!(normalize_boundary_ops(&mut empty).is_ok());
    }

    #[test]
    fn test_demote_internal_softclip() {
        let mut ops = cig("5S20M3S17M5S");
        demote_internal_softclips(&mut ops).unwrap();
        assert_eq!(ops, cig("5S20M3I17M5S"));
    }

    #[test]
    fn test_demote_requires_reference_op() {
        let mut ops = cig("3S4I3S");
        assert!(demote_internal_softclips(&mut ops).is_err());
    }

    #[test]
    fn test_coalesce_adjacent() {
        let mut ops = cig("5S3S10M5M2I1I4M");
        let n = coalesce_adjacent(&mut ops);
        ops.truncate(n);
        assert_eq!(ops, cig("8S15M3I4M"));
    }

    #[test]
    fn test_coalesce_is_idempotent_and_preserves_spans() {
        let original = cig("2S3S10M10M4D1D3I3I20M1S");
        let mut once = original.clone();
        let n = coalesce_adjacent(&mut once);
        once.truncate(n);
        let mut twice = once.clone();
        let n2 = coalesce_adjacent(&mut twice);
        twice.truncate(n2);

        assert_eq!(once, twice);
        assert_eq!(reference_span(&once), reference_span(&original));
        assert_eq!(query_span(&once), query_span(&original));
    }

    #[test]
    fn test_coalesce_empty() {
        assert_eq!(coalesce_adjacent(&mut []), 0);
    }
}

//! Fragment synthesis from two mates.
//!
//! Every policy writes into a caller-owned destination record and leaves both
//! sources untouched. `a` is always the forward ("left") mate and `b` the
//! reverse ("right") mate, whose stored sequence is contributed reverse
//! complemented.
//!
//! | Policy                | Geometry                         | CIGAR                          |
//! |-----------------------|----------------------------------|--------------------------------|
//! | [`merge_non_overlap`] | `b` starts at or after `a` ends  | `a ++ N(spacer) ++ b`          |
//! | [`merge_overlap`]     | `b` starts inside `a`            | `a[..head] ++ b`               |
//! | [`truncate_overlap`]  | `b` starts before `a`            | `a[..overlap]`                 |
//! | [`keep_better_end`]   | both start together              | longer of `a` and `b`          |
//!
//! Merged records carry `NM` (sum of both mates, or just `a` when truncating)
//! and `CV` copied from `a`.

use fraguniq_raw_bam::{
    CIGAR_REF_SKIP, MAX_OP_LEN, RawRecord, RecordLayout, coalesce_adjacent, copy_packed_prefix,
    demote_internal_softclips, flags::FRAGMENT_MASK, make_op, merge_packed,
    normalize_boundary_ops, op_kind, op_len, query_span, reference_span,
    split_at_reference_offset,
};

use crate::errors::{FraguniqError, Result, read_name_of as read_name};

/// Mismatch count tag.
pub const NM_TAG: [u8; 2] = *b"NM";
/// Conversion type tag.
pub const CV_TAG: [u8; 2] = *b"CV";

/// Room reserved after the qualities for the `NM` and `CV` tags.
const FRAGMENT_AUX_BUDGET: usize = 8;

fn required_nm(rec: &RawRecord) -> Result<i64> {
    rec.int_tag(&NM_TAG).ok_or_else(|| FraguniqError::MissingTag {
        read_name: read_name(rec),
        tag: "NM".to_string(),
    })
}

fn required_cv(rec: &RawRecord) -> Result<u8> {
    rec.char_tag(&CV_TAG).ok_or_else(|| FraguniqError::MissingTag {
        read_name: read_name(rec),
        tag: "CV".to_string(),
    })
}

fn to_i32(rec: &RawRecord, field: &'static str, value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| FraguniqError::MalformedRecord {
        read_name: read_name(rec),
        field,
        reason: format!("value {value} does not fit in 32 bits"),
    })
}

/// Lay out the fragment header, name, CIGAR and an all-`N` sequence in `dst`.
fn write_fragment(a: &RawRecord, cigar: &[u32], query_length: usize, dst: &mut RawRecord) -> Result<()> {
    let template_length = to_i32(a, "tlen", i64::from(reference_span(cigar)))?;
    RecordLayout {
        name: a.query_name(),
        flags: a.flags(),
        ref_id: a.ref_id(),
        pos: a.pos(),
        mapq: a.mapq(),
        cigar,
        mate_ref_id: -1,
        mate_pos: -1,
        template_length,
        query_length,
        aux_budget: FRAGMENT_AUX_BUDGET,
    }
    .write_into(dst)?;
    Ok(())
}

fn write_fragment_tags(a: &RawRecord, nm: i64, cv: u8, dst: &mut RawRecord) -> Result<()> {
    dst.update_int_tag(&NM_TAG, to_i32(a, "NM", nm)?)?;
    dst.append_char_tag(&CV_TAG, cv)?;
    Ok(())
}

/// Join two mates separated by `spacer` unaligned reference bases.
///
/// The fragment CIGAR is `a`, then `N(spacer)`, then `b`; mates that abut
/// (`spacer == 0`) are joined without a skip op.
///
/// # Errors
/// Returns [`FraguniqError::MissingTag`] if either mate lacks `NM` or `a`
/// lacks `CV`, and [`FraguniqError::MalformedRecord`] if `spacer` cannot be
/// encoded as a CIGAR op length.
pub fn merge_non_overlap(a: &RawRecord, b: &RawRecord, spacer: u32, dst: &mut RawRecord) -> Result<()> {
    let nm = required_nm(a)? + required_nm(b)?;
    let cv = required_cv(a)?;
    if spacer > MAX_OP_LEN {
        return Err(FraguniqError::MalformedRecord {
            read_name: read_name(a),
            field: "cigar",
            reason: format!("spacer of {spacer} bases exceeds the CIGAR op length limit"),
        });
    }

    let a_cigar = a.cigar();
    let b_cigar = b.cigar();
    let mut cigar = Vec::with_capacity(a_cigar.len() + b_cigar.len() + 1);
    cigar.extend_from_slice(&a_cigar);
    if spacer > 0 {
        cigar.push(make_op(CIGAR_REF_SKIP, spacer));
    }
    cigar.extend_from_slice(&b_cigar);

    let a_len = a.query_length();
    let b_len = b.query_length();
    write_fragment(a, &cigar, a_len + b_len, dst)?;
    merge_packed(a.sequence(), a_len, b.sequence(), b_len, dst.sequence_mut())?;
    write_fragment_tags(a, nm, cv, dst)
}

/// Join two mates where `b` starts `head` reference bases into `a`.
///
/// `a` is carved after its first `head` reference bases; when the carved
/// prefix ends in the same op kind that `b` starts with, the two ops are
/// fused. The sequence is the part of `a` the prefix covers followed by `b`.
///
/// # Errors
/// Returns [`FraguniqError::MissingTag`] if a required tag is absent.
pub fn merge_overlap(a: &RawRecord, b: &RawRecord, head: u32, dst: &mut RawRecord) -> Result<()> {
    let nm = required_nm(a)? + required_nm(b)?;
    let cv = required_cv(a)?;

    let a_cigar = a.cigar();
    let b_cigar = b.cigar();
    let mut cigar = split_at_reference_offset(&a_cigar, head).prefix(&a_cigar);
    cigar.reserve(b_cigar.len());
    let a_used = query_span(&cigar) as usize;

    let mut rest = b_cigar.as_slice();
    if let (Some(last), Some(&first)) = (cigar.last_mut(), b_cigar.first()) {
        let fused = u64::from(op_len(*last)) + u64::from(op_len(first));
        if op_kind(*last) == op_kind(first) && fused <= u64::from(MAX_OP_LEN) {
            *last = make_op(op_kind(first), fused as u32);
            rest = &b_cigar[1..];
        }
    }
    cigar.extend_from_slice(rest);

    let b_len = b.query_length();
    write_fragment(a, &cigar, a_used + b_len, dst)?;
    merge_packed(a.sequence(), a_used, b.sequence(), b_len, dst.sequence_mut())?;
    write_fragment_tags(a, nm, cv, dst)
}

/// Keep only the part of `a` covering its first `overlap` reference bases.
///
/// `NM` is taken from `a` alone.
///
/// # Errors
/// Returns [`FraguniqError::MissingTag`] if `a` lacks `NM` or `CV`.
pub fn truncate_overlap(a: &RawRecord, overlap: u32, dst: &mut RawRecord) -> Result<()> {
    let nm = required_nm(a)?;
    let cv = required_cv(a)?;

    let a_cigar = a.cigar();
    let cigar = split_at_reference_offset(&a_cigar, overlap).prefix(&a_cigar);
    let len = query_span(&cigar) as usize;

    write_fragment(a, &cigar, len, dst)?;
    copy_packed_prefix(a.sequence(), len, dst.sequence_mut())?;
    write_fragment_tags(a, nm, cv, dst)
}

/// Copy whichever mate spans more reference (ties keep `a`) as a fragment.
///
/// Mate fields are cleared, pairing flags dropped and the template length set
/// to the copied record's reference span. Tags are kept as they are.
///
/// # Errors
/// Returns an allocation error if `dst` cannot grow.
pub fn keep_better_end(a: &RawRecord, b: &RawRecord, dst: &mut RawRecord) -> Result<()> {
    let better = if a.reference_span() >= b.reference_span() { a } else { b };
    dst.copy_from(better)?;
    dst.set_mate(-1, -1);
    dst.set_template_length(to_i32(better, "tlen", i64::from(better.reference_span()))?);
    dst.set_flags(better.flags() & FRAGMENT_MASK);
    Ok(())
}

/// Clean up a fragment CIGAR after merging.
///
/// Query-consuming ops outside the aligned core become soft clips, soft clips
/// inside it become insertions and same-kind neighbours are fused. Returns
/// the number of CIGAR bytes removed.
///
/// # Errors
/// Returns [`FraguniqError::Record`] if the CIGAR has no reference-consuming
/// op.
pub fn correct_cigar(rec: &mut RawRecord) -> Result<usize> {
    let original = rec.cigar();
    let mut cigar = original.clone();
    normalize_boundary_ops(&mut cigar)?;
    demote_internal_softclips(&mut cigar)?;
    let n_ops = coalesce_adjacent(&mut cigar);
    cigar.truncate(n_ops);

    if cigar != original {
        rec.set_cigar(&cigar)?;
    }
    Ok((original.len() - n_ops) * 4)
}

//! Helpers for building raw records in tests.

use crate::fields::padded_name_len;
use crate::sequence::pack_sequence;

/// Construct a raw record with a zeroed sequence and quality.
///
/// The name is NUL-padded to a multiple of four, as records loaded through
/// `RawRecord::from_bytes` are.
///
/// # Panics
///
/// Panics if the padded name exceeds 255 bytes, `cigar_ops` length exceeds
/// `u16::MAX`, or `seq_len` exceeds `u32::MAX`.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn make_bam_bytes(
    tid: i32,
    pos: i32,
    flag: u16,
    name: &[u8],
    cigar_ops: &[u32],
    seq_len: usize,
    mate_tid: i32,
    mate_pos: i32,
    aux_data: &[u8],
) -> Vec<u8> {
    let l_read_name = u8::try_from(padded_name_len(name.len())).unwrap();
    let n_cigar_op = u16::try_from(cigar_ops.len()).unwrap();
    let seq_bytes = seq_len.div_ceil(2);
    let total =
        32 + l_read_name as usize + cigar_ops.len() * 4 + seq_bytes + seq_len + aux_data.len();
    let mut buf = vec![0u8; total];

    buf[0..4].copy_from_slice(&tid.to_le_bytes());
    buf[4..8].copy_from_slice(&pos.to_le_bytes());
    buf[8] = l_read_name;
    buf[9] = 60; // mapq
    buf[12..14].copy_from_slice(&n_cigar_op.to_le_bytes());
    buf[14..16].copy_from_slice(&flag.to_le_bytes());
    buf[16..20].copy_from_slice(&u32::try_from(seq_len).unwrap().to_le_bytes());
    buf[20..24].copy_from_slice(&mate_tid.to_le_bytes());
    buf[24..28].copy_from_slice(&mate_pos.to_le_bytes());

    buf[32..32 + name.len()].copy_from_slice(name);

    let cigar_start = 32 + l_read_name as usize;
    for (i, &op) in cigar_ops.iter().enumerate() {
        let offset = cigar_start + i * 4;
        buf[offset..offset + 4].copy_from_slice(&op.to_le_bytes());
    }

    let aux_start = cigar_start + cigar_ops.len() * 4 + seq_bytes + seq_len;
    buf[aux_start..].copy_from_slice(aux_data);

    buf
}

/// Like [`make_bam_bytes`] but fills the packed sequence from ASCII `bases`
/// and sets every quality to 30.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn make_bam_bytes_with_seq(
    tid: i32,
    pos: i32,
    flag: u16,
    name: &[u8],
    cigar_ops: &[u32],
    bases: &[u8],
    mate_tid: i32,
    mate_pos: i32,
    aux_data: &[u8],
) -> Vec<u8> {
    let mut rec =
        make_bam_bytes(tid, pos, flag, name, cigar_ops, bases.len(), mate_tid, mate_pos, aux_data);
    let seq_start = 32 + rec[8] as usize + cigar_ops.len() * 4;
    let packed = pack_sequence(bases);
    rec[seq_start..seq_start + packed.len()].copy_from_slice(&packed);
    let qual_start = seq_start + packed.len();
    rec[qual_start..qual_start + bases.len()].fill(30);
    rec
}

/// Encode a single CIGAR op. `op_type`: M=0, I=1, D=2, N=3, S=4, H=5, P=6, `=7`, X=8.
///
/// # Panics
///
/// Panics if `len` exceeds `u32::MAX`.
#[must_use]
pub fn encode_op(op_type: u32, len: usize) -> u32 {
    (u32::try_from(len).unwrap() << 4) | op_type
}

/// Raw aux bytes holding an `NM:c` and a `CV:A` tag.
#[must_use]
pub fn nm_cv_aux(nm: i8, cv: u8) -> Vec<u8> {
    let mut aux = vec![b'N', b'M', b'c', nm.cast_unsigned()];
    aux.extend_from_slice(&[b'C', b'V', b'A', cv]);
    aux
}

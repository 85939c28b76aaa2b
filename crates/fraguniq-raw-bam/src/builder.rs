use crate::cigar::reference_span;
use crate::error::{RecordError, Result};
use crate::fields::{MAX_L_READ_NAME, flags::FRAGMENT_MASK, padded_name_len, reg2bin};
use crate::record::{RawRecord, reserve_pow2};
use crate::sequence::{MISSING_QUALITY, N_CODE};

// ============================================================================
// Fragment Record Synthesis
// ============================================================================

/// Bin for a record with no reference position (`reg2bin(-1, 0)`).
const UNMAPPED_BIN: u16 = 4680;

/// Everything needed to lay out a fresh record in a destination buffer.
///
/// The sequence is written as all `N` and qualities as absent (`0xFF`);
/// callers fill the sequence afterwards through [`RawRecord::sequence_mut`].
///
/// ```rust,ignore
/// let layout = RecordLayout {
///     name: a.query_name(),
///     flags: a.flags(),
///     ref_id: a.ref_id(),
///     pos: a.pos(),
///     mapq: a.mapq(),
///     cigar: &merged_cigar,
///     mate_ref_id: -1,
///     mate_pos: -1,
///     template_length: reference_span(&merged_cigar) as i32,
///     query_length: merged_len,
///     aux_budget: 8,
/// };
/// layout.write_into(&mut dst)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RecordLayout<'a> {
    /// Read name without any NUL.
    pub name: &'a [u8],
    /// Only first/last-segment and reverse bits are kept.
    pub flags: u16,
    pub ref_id: i32,
    pub pos: i32,
    pub mapq: u8,
    pub cigar: &'a [u32],
    pub mate_ref_id: i32,
    pub mate_pos: i32,
    pub template_length: i32,
    pub query_length: usize,
    /// Extra capacity reserved for tags appended later.
    pub aux_budget: usize,
}

impl RecordLayout<'_> {
    /// Bytes taken by name (with padding), CIGAR, sequence and qualities.
    #[must_use]
    pub fn variable_len(&self) -> usize {
        padded_name_len(self.name.len())
            + self.cigar.len() * 4
            + self.query_length.div_ceil(2)
            + self.query_length
    }

    /// Overwrite `dst` with a record described by this layout.
    ///
    /// Returns the number of variable-length bytes written (name + padding,
    /// CIGAR, sequence, qualities).
    ///
    /// # Errors
    /// Returns [`RecordError::Malformed`] for an empty or over-long name, too
    /// many CIGAR ops or an over-long sequence, and
    /// [`RecordError::Allocation`] if the buffer cannot grow.
    pub fn write_into(&self, dst: &mut RawRecord) -> Result<usize> {
        if self.name.is_empty() {
            return Err(RecordError::malformed("read_name", "query name is empty"));
        }
        let l_read_name = padded_name_len(self.name.len());
        if l_read_name > MAX_L_READ_NAME {
            return Err(RecordError::malformed(
                "read_name",
                format!("name of {} bytes is too long", self.name.len()),
            ));
        }
        let n_cigar_op = u16::try_from(self.cigar.len()).map_err(|_| {
            RecordError::malformed("n_cigar_op", format!("{} ops exceed u16", self.cigar.len()))
        })?;
        let l_seq = u32::try_from(self.query_length)
            .map_err(|_| RecordError::malformed("l_seq", "sequence too long"))?;
        let bin = if self.pos < 0 {
            UNMAPPED_BIN
        } else {
            let beg = i64::from(self.pos);
            let span = i64::from(reference_span(self.cigar)).max(1);
            reg2bin(beg, beg + span)
        };

        let var_len = self.variable_len();
        let buf = dst.buf_mut();
        buf.clear();
        reserve_pow2(buf, 32 + var_len + self.aux_budget)?;

        // === Fixed 32-byte header ===
        buf.extend_from_slice(&self.ref_id.to_le_bytes()); // ref_id
        buf.extend_from_slice(&self.pos.to_le_bytes()); // pos
        buf.push(l_read_name as u8); // l_read_name
        buf.push(self.mapq); // mapq
        buf.extend_from_slice(&bin.to_le_bytes()); // bin
        buf.extend_from_slice(&n_cigar_op.to_le_bytes()); // n_cigar_op
        buf.extend_from_slice(&(self.flags & FRAGMENT_MASK).to_le_bytes()); // flags
        buf.extend_from_slice(&l_seq.to_le_bytes()); // l_seq
        buf.extend_from_slice(&self.mate_ref_id.to_le_bytes()); // next_ref_id
        buf.extend_from_slice(&self.mate_pos.to_le_bytes()); // next_pos
        buf.extend_from_slice(&self.template_length.to_le_bytes()); // tlen

        // === Read name + NUL padding ===
        buf.extend_from_slice(self.name);
        buf.resize(buf.len() + l_read_name - self.name.len(), 0);

        // === CIGAR ===
        for op in self.cigar {
            buf.extend_from_slice(&op.to_le_bytes());
        }

        // === Sequence (all N) ===
        let seq_bytes = self.query_length.div_ceil(2);
        buf.resize(buf.len() + seq_bytes, (N_CODE << 4) | N_CODE);
        if self.query_length % 2 == 1 {
            let last = buf.len() - 1;
            buf[last] &= 0xF0;
        }

        // === Quality (absent) ===
        buf.resize(buf.len() + self.query_length, MISSING_QUALITY);

        Ok(var_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cigar::parse_cigar;
    use crate::fields::{self, flags};
    use crate::sequence::unpack_sequence;

    fn layout<'a>(name: &'a [u8], cigar: &'a [u32], len: usize) -> RecordLayout<'a> {
        RecordLayout {
            name,
            flags: flags::PAIRED | flags::PROPER_PAIR | flags::FIRST_SEGMENT | flags::MATE_REVERSE,
            ref_id: 3,
            pos: 1000,
            mapq: 42,
            cigar,
            mate_ref_id: -1,
            mate_pos: -1,
            template_length: 70,
            query_length: len,
            aux_budget: 8,
        }
    }

    #[test]
    fn test_write_into_lays_out_fragment() {
        let cigar = parse_cigar("5S65M").unwrap();
        let mut dst = RawRecord::new();
        let written = layout(b"frag1", &cigar, 70).write_into(&mut dst).unwrap();

        // "frag1" pads to 8, 1 op, 35 seq bytes, 70 quals
        assert_eq!(written, 8 + 4 + 35 + 70);
        assert_eq!(dst.len(), 32 + written);
        assert_eq!(dst.query_name(), b"frag1");
        assert_eq!(dst.ref_id(), 3);
        assert_eq!(dst.pos(), 1000);
        assert_eq!(dst.mapq(), 42);
        assert_eq!(dst.flags(), flags::FIRST_SEGMENT);
        assert_eq!(dst.mate_ref_id(), -1);
        assert_eq!(dst.mate_pos(), -1);
        assert_eq!(dst.template_length(), 70);
        assert_eq!(dst.cigar(), cigar);
        assert_eq!(fields::bin(&dst), reg2bin(1000, 1065));
        assert!(dst.quality().iter().all(|&q| q == 0xFF));
        assert!(dst.aux_data().is_empty());
        assert!(dst.capacity() >= dst.len() + 8);
    }

    #[test]
    fn test_sequence_prefilled_with_n_and_odd_nibble_clear() {
        let cigar = parse_cigar("5M").unwrap();
        let mut dst = RawRecord::new();
        layout(b"r", &cigar, 5).write_into(&mut dst).unwrap();
        assert_eq!(unpack_sequence(dst.sequence(), 5), b"NNNNN");
        assert_eq!(dst.sequence()[2], 0xF0);
    }

    #[test]
    fn test_write_into_replaces_previous_contents() {
        let long = parse_cigar("100M").unwrap();
        let short = parse_cigar("4M").unwrap();
        let mut dst = RawRecord::new();
        layout(b"first", &long, 100).write_into(&mut dst).unwrap();
        let cap = dst.capacity();
        layout(b"second", &short, 4).write_into(&mut dst).unwrap();
        assert_eq!(dst.query_name(), b"second");
        assert_eq!(dst.query_length(), 4);
        assert_eq!(dst.capacity(), cap);
    }

    #[test]
    fn test_write_into_rejects_bad_names() {
        let cigar = parse_cigar("4M").unwrap();
        let mut dst = RawRecord::new();
        assert!(layout(b"", &cigar, 4).write_into(&mut dst).is_err());
        let long = vec![b'x'; 252];
        let err = layout(&long, &cigar, 4).write_into(&mut dst).unwrap_err();
        assert!(matches!(err, RecordError::Malformed { field: "read_name", .. }));
    }

    #[test]
    fn test_unmapped_bin() {
        let mut dst = RawRecord::new();
        let mut l = layout(b"u", &[], 0);
        l.pos = -1;
        l.write_into(&mut dst).unwrap();
        assert_eq!(fields::bin(&dst), UNMAPPED_BIN);
    }
}

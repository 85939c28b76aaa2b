//! Build, write and read small coordinate-sorted BAM files.

use std::num::NonZeroUsize;
use std::path::Path;
use std::process::{Command, Output};

use fraguniq_lib::bam_io::{RecordSource, create_raw_bam_reader, create_raw_bam_writer};
use fraguniq_raw_bam::{RawRecord, make_bam_bytes, nm_cv_aux, parse_cigar, query_span};
use noodles::sam::Header;
use noodles::sam::header::record::value::Map;
use noodles::sam::header::record::value::map::header::tag::SORT_ORDER;
use noodles::sam::header::record::value::map::{Header as HeaderRecord, ReferenceSequence};

/// Header declaring `SO:coordinate` with the given references.
pub fn create_sorted_header(references: &[(&str, usize)]) -> Header {
    let hd = Map::<HeaderRecord>::builder()
        .insert(SORT_ORDER, "coordinate")
        .build()
        .expect("valid header map");
    let mut builder = Header::builder().set_header(hd);
    for &(name, length) in references {
        let reference = Map::<ReferenceSequence>::new(
            NonZeroUsize::new(length).expect("reference length must be non-zero"),
        );
        builder = builder.add_reference_sequence(name, reference);
    }
    builder.build()
}

/// A mapped record with an all-zero sequence of the CIGAR's query length.
pub fn mapped_record(
    name: &str,
    tid: i32,
    pos: i32,
    flag: u16,
    cigar: &str,
    mate: (i32, i32),
    aux: &[u8],
) -> RawRecord {
    let ops = parse_cigar(cigar).expect("valid CIGAR");
    let len = query_span(&ops) as usize;
    RawRecord::from_bytes(make_bam_bytes(tid, pos, flag, name.as_bytes(), &ops, len, mate.0, mate.1, aux))
        .expect("valid record")
}

/// A mate carrying `NM:c` and `CV:A` tags on reference 0.
pub fn mate_record(name: &str, pos: i32, flag: u16, cigar: &str, mate_pos: i32, nm: i8) -> RawRecord {
    mapped_record(name, 0, pos, flag, cigar, (0, mate_pos), &nm_cv_aux(nm, b'C'))
}

pub fn write_bam(path: &Path, header: &Header, records: &[RawRecord]) {
    let mut writer = create_raw_bam_writer(path, header, 1).expect("Failed to create BAM");
    for record in records {
        writer.write_raw_record(record.as_bytes()).expect("Failed to write record");
    }
    writer.finish().expect("Failed to finish BAM");
}

pub fn read_bam(path: &Path) -> (Header, Vec<RawRecord>) {
    let (mut reader, header) = create_raw_bam_reader(path, 1).expect("Failed to open BAM");
    let mut records = Vec::new();
    while let Some(record) = reader.read().expect("Failed to read record") {
        records.push(record);
    }
    (header, records)
}

pub fn run_fraguniq(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fraguniq"))
        .args(args)
        .output()
        .expect("Failed to run fraguniq")
}

pub fn names(records: &[RawRecord]) -> Vec<String> {
    records.iter().map(|r| String::from_utf8_lossy(r.query_name()).into_owned()).collect()
}

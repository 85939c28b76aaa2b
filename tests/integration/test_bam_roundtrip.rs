//! Library entry points over real BAM files, and compatibility of the
//! written records with the noodles BAM reader.

use fraguniq_lib::bam_io::{RecordSource, create_raw_bam_reader, create_raw_bam_writer};
use fraguniq_lib::mates::{MateMerger, merge_mate_stream};
use fraguniq_lib::uniq::{DuplicateGrouper, remove_duplicates};
use fraguniq_raw_bam::flags;
use noodles::bam;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

use crate::helpers::{create_sorted_header, mapped_record, mate_record, read_bam, write_bam};

#[test]
fn test_remove_duplicates_between_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    let header = create_sorted_header(&[("chr1", 1_000)]);
    let records: Vec<_> = (0..6)
        .map(|i| mapped_record(&format!("r{i}"), 0, 100 + (i / 3) * 50, 0, "20M", (-1, -1), &[]))
        .collect();
    write_bam(&input, &header, &records);

    let (mut reader, header) = create_raw_bam_reader(&input, 1).unwrap();
    assert_eq!(reader.target_count(), 1);
    let mut writer = create_raw_bam_writer(&output, &header, 1).unwrap();
    let metrics =
        remove_duplicates(&mut reader, &mut writer, DuplicateGrouper::new(StdRng::seed_from_u64(1)))
            .unwrap();
    writer.finish().unwrap();

    assert_eq!(metrics.input.reads, 6);
    assert_eq!(metrics.output.reads, 2);
    assert_eq!(metrics.histogram.get(&3), Some(&2));
    let (_, kept) = read_bam(&output);
    assert_eq!(kept.iter().map(|r| r.pos()).collect::<Vec<_>>(), vec![100, 150]);
}

#[test]
fn test_merged_records_read_by_noodles() {
    const FWD: u16 = flags::PAIRED | flags::FIRST_SEGMENT | flags::MATE_REVERSE;
    const REV: u16 = flags::PAIRED | flags::LAST_SEGMENT | flags::REVERSE;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    let header = create_sorted_header(&[("chr1", 1_000)]);
    let records = vec![
        mate_record("a", 100, FWD, "5S10M", 103, 1),
        mate_record("a", 103, REV, "12M3S", 100, 1),
        mate_record("b", 300, FWD, "10M", 320, 0),
        mate_record("b", 320, REV, "2I8M", 300, 0),
    ];
    write_bam(&input, &header, &records);

    let (mut reader, header) = create_raw_bam_reader(&input, 1).unwrap();
    let mut writer = create_raw_bam_writer(&output, &header, 1).unwrap();
    let metrics = merge_mate_stream(&mut reader, &mut writer, MateMerger::new(1000, 0)).unwrap();
    writer.finish().unwrap();
    assert_eq!(metrics.pairs_merged, 2);

    let mut reader = bam::io::reader::Builder.build_from_path(&output).expect("Failed to open BAM");
    let header = reader.read_header().expect("Failed to read header");
    let merged: Vec<_> =
        reader.record_bufs(&header).map(|r| r.expect("Failed to read record")).collect();

    assert_eq!(merged.len(), 2);
    for (record, (start, len)) in merged.iter().zip([(101, 23), (301, 20)]) {
        assert_eq!(record.alignment_start().map(|p| p.get()), Some(start));
        assert_eq!(record.sequence().len(), len);
        assert_eq!(record.cigar().as_ref().len(), if start == 101 { 3 } else { 4 });
    }
}

//! Integration tests for the merge command.

use fraguniq_raw_bam::{flags, parse_cigar};
use tempfile::TempDir;

use crate::helpers::{create_sorted_header, mate_record, names, read_bam, run_fraguniq, write_bam};

const FWD: u16 = flags::PAIRED | flags::FIRST_SEGMENT | flags::MATE_REVERSE;
const REV: u16 = flags::PAIRED | flags::LAST_SEGMENT | flags::REVERSE;

fn write_pairs(path: &std::path::Path) {
    let header = create_sorted_header(&[("chr1", 10_000)]);
    let records = vec![
        // overlapping by 5
        mate_record("p1", 100, FWD, "10M", 105, 1),
        mate_record("p1", 105, REV, "10M", 100, 2),
        // 10 bases apart
        mate_record("p2", 200, FWD, "10M", 220, 0),
        mate_record("p2", 220, REV, "10M", 200, 4),
        // mate far away
        mate_record("solo", 400, FWD, "10M", 5000, 0),
        // fragment of 110
        mate_record("far", 500, FWD, "10M", 600, 0),
        mate_record("far", 600, REV, "10M", 500, 0),
    ];
    write_bam(path, &header, &records);
}

#[test]
fn test_merge_pairs() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    write_pairs(&input);

    let result = run_fraguniq(&[
        "merge",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--max-frag-len",
        "100",
    ]);
    assert!(result.status.success(), "merge failed: {}", String::from_utf8_lossy(&result.stderr));

    let (header, records) = read_bam(&output);
    assert!(header.programs().as_ref().contains_key(b"fraguniq".as_slice()));
    assert_eq!(names(&records), vec!["p1", "p2", "solo", "far", "far"]);

    let p1 = &records[0];
    assert_eq!(p1.pos(), 100);
    assert_eq!(p1.cigar(), parse_cigar("15M").unwrap());
    assert_eq!(p1.query_length(), 15);
    assert_eq!(p1.int_tag(b"NM"), Some(3));
    assert_eq!(p1.char_tag(b"CV"), Some(b'C'));
    assert_eq!((p1.mate_ref_id(), p1.mate_pos()), (-1, -1));
    assert_eq!(p1.flags(), flags::FIRST_SEGMENT);
    assert_eq!(p1.template_length(), 15);

    let p2 = &records[1];
    assert_eq!(p2.cigar(), parse_cigar("10M10N10M").unwrap());
    assert_eq!(p2.query_length(), 20);
    assert_eq!(p2.int_tag(b"NM"), Some(4));
    assert_eq!(p2.template_length(), 30);

    // unmerged records are untouched
    assert_eq!(records[2].mate_pos(), 5000);
    assert_eq!(records[3].flags(), FWD);
    assert_eq!(records[4].flags(), REV);
}

#[test]
fn test_merge_suffix_len_pairs_numbered_names() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.bam");
    let header = create_sorted_header(&[("chr1", 10_000)]);
    let records = vec![
        mate_record("q/1", 100, FWD, "10M", 110, 0),
        mate_record("q/2", 110, REV, "10M", 100, 0),
    ];
    write_bam(&input, &header, &records);

    let strict = temp_dir.path().join("strict.bam");
    let result =
        run_fraguniq(&["merge", "-i", input.to_str().unwrap(), "-o", strict.to_str().unwrap()]);
    assert!(result.status.success());
    assert_eq!(read_bam(&strict).1.len(), 2);

    let relaxed = temp_dir.path().join("relaxed.bam");
    let result = run_fraguniq(&[
        "merge",
        "-i",
        input.to_str().unwrap(),
        "-o",
        relaxed.to_str().unwrap(),
        "--suffix-len",
        "2",
    ]);
    assert!(result.status.success());
    let merged = read_bam(&relaxed).1;
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].cigar(), parse_cigar("20M").unwrap());
}

#[test]
fn test_merge_missing_tag_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    let header = create_sorted_header(&[("chr1", 10_000)]);
    let records = vec![
        crate::helpers::mapped_record("t", 0, 100, FWD, "10M", (0, 105), &[]),
        crate::helpers::mapped_record("t", 0, 105, REV, "10M", (0, 100), &[]),
    ];
    write_bam(&input, &header, &records);

    let result =
        run_fraguniq(&["merge", "-i", input.to_str().unwrap(), "-o", output.to_str().unwrap()]);
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("missing required tag NM"), "unexpected error output: {stderr}");
}

#[test]
fn test_merge_rejects_zero_max_frag_len() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    write_pairs(&input);

    let result = run_fraguniq(&[
        "merge",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--max-frag-len",
        "0",
    ]);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("max-frag-len"));
}

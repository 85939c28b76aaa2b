//! Integration tests for the uniq command.

use std::fs;

use fraguniq_raw_bam::flags::REVERSE;
use tempfile::TempDir;

use crate::helpers::{create_sorted_header, mapped_record, names, read_bam, run_fraguniq, write_bam};

/// Seven reads: a duplicated pair at chr1:1000, a longer read and a reverse
/// read at the same start, a lone read, and a duplicated pair on chr2.
fn write_input(path: &std::path::Path) {
    let header = create_sorted_header(&[("chr1", 10_000), ("chr2", 5_000)]);
    let records = vec![
        mapped_record("a", 0, 1000, 0, "50M", (-1, -1), &[]),
        mapped_record("b", 0, 1000, 0, "50M", (-1, -1), &[]),
        mapped_record("c", 0, 1000, 0, "60M", (-1, -1), &[]),
        mapped_record("d", 0, 1000, REVERSE, "50M", (-1, -1), &[]),
        mapped_record("e", 0, 2000, 0, "40M", (-1, -1), &[]),
        mapped_record("f", 1, 10, 0, "30M", (-1, -1), &[]),
        mapped_record("g", 1, 10, 0, "30M", (-1, -1), &[]),
    ];
    write_bam(path, &header, &records);
}

#[test]
fn test_uniq_removes_duplicates_and_writes_reports() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    let stats = temp_dir.path().join("uniq.stats");
    let hist = temp_dir.path().join("uniq.hist");
    write_input(&input);

    let result = run_fraguniq(&[
        "uniq",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--stats",
        stats.to_str().unwrap(),
        "--hist",
        hist.to_str().unwrap(),
        "--seed",
        "42",
    ]);
    assert!(result.status.success(), "uniq failed: {}", String::from_utf8_lossy(&result.stderr));

    let (header, records) = read_bam(&output);
    assert_eq!(records.len(), 5);
    let kept = names(&records);
    assert!(kept[0] == "a" || kept[0] == "b");
    // ends sort before strand: (1050, +), (1050, -), (1060, +)
    assert_eq!(&kept[1..4], &["d", "c", "e"]);
    assert!(kept[4] == "f" || kept[4] == "g");
    assert!(header.programs().as_ref().contains_key(b"fraguniq".as_slice()));
    assert_eq!(header.reference_sequences().len(), 2);

    let stats = fs::read_to_string(&stats).expect("Failed to read stats");
    assert_eq!(
        stats,
        "total_reads: 7\n\
         total_bases: 310\n\
         unique_reads: 5\n\
         unique_read_bases: 230\n\
         non_duplicate_fraction: 0.428571\n\
         duplicate_reads: 2\n\
         reads_removed: 2\n\
         duplication_rate: 2\n"
    );
    let hist = fs::read_to_string(&hist).expect("Failed to read histogram");
    assert_eq!(hist, "1\t3\n2\t2\n");
}

#[test]
fn test_uniq_same_seed_same_output() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.bam");
    write_input(&input);

    let mut outputs = Vec::new();
    for run in 0..2 {
        let output = temp_dir.path().join(format!("output{run}.bam"));
        let result = run_fraguniq(&[
            "uniq",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--seed",
            "7",
            "--add-count",
        ]);
        assert!(result.status.success());
        outputs.push(read_bam(&output).1);
    }
    assert_eq!(outputs[0], outputs[1]);
    let counts: Vec<Option<i64>> = outputs[0].iter().map(|r| r.int_tag(b"DU")).collect();
    assert_eq!(counts, vec![Some(2), Some(1), Some(1), Some(1), Some(2)]);
}

#[test]
fn test_uniq_rejects_unsorted_input() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    let header = create_sorted_header(&[("chr1", 10_000)]);
    let records = vec![
        mapped_record("a", 0, 500, 0, "10M", (-1, -1), &[]),
        mapped_record("b", 0, 400, 0, "10M", (-1, -1), &[]),
    ];
    write_bam(&input, &header, &records);

    let result =
        run_fraguniq(&["uniq", "-i", input.to_str().unwrap(), "-o", output.to_str().unwrap()]);
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("sorted"), "unexpected error output: {stderr}");
}

#[test]
fn test_uniq_missing_input() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = temp_dir.path().join("output.bam");
    let result =
        run_fraguniq(&["uniq", "-i", "/nonexistent/input.bam", "-o", output.to_str().unwrap()]);
    assert!(!result.status.success());
    assert!(!output.exists());
}

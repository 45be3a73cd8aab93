//! End-to-end runs of orient, trim and merge on in-memory contigs.

mod common;

use common::{bases, parse_fasta, stores};
use noodles::bgzf;
use scaffold_merge::commands::create_output;
use scaffold_merge::commands::merge::run_merge;
use scaffold_merge::commands::orient::run_orient;
use scaffold_merge::commands::trim::run_trim;
use scaffold_merge::consensus::SpoaConsensus;
use scaffold_merge::context::ScaffoldContext;
use scaffold_merge::overlap::ExactOverlapAligner;
use scaffold_merge::scaffold::{read_paths, read_paths_file};
use scaffold_merge::sequence_index::reverse_complement;
use std::fs;
use std::io::{self, Read, Write};
use tempfile::TempDir;

/// c1 and c3 overlap c2 on either side; c2 is stored reverse-complemented.
fn joined_contigs() -> (Vec<u8>, Vec<(&'static str, Vec<u8>)>) {
    let o1 = bases(1, 40);
    let o2 = bases(2, 40);
    let c1 = [bases(3, 150), o1.clone()].concat();
    let c2 = [o1.clone(), bases(4, 120), o2.clone()].concat();
    let c3 = [o2.clone(), bases(5, 90)].concat();
    let expected = [bases(3, 150), o1, bases(4, 120), o2, bases(5, 90)].concat();
    (expected, vec![("c1", c1), ("c2", reverse_complement(&c2)), ("c3", c3)])
}

#[test]
fn test_merge_pipeline_orients_and_joins() -> io::Result<()> {
    let (expected, contigs) = joined_contigs();
    let refs: Vec<(&str, &[u8])> = contigs.iter().map(|(n, s)| (*n, s.as_slice())).collect();
    let (sequences, coverage) = stores(&refs, 20);
    let aligner = ExactOverlapAligner::default();
    let consensus = SpoaConsensus::default();
    let ctx = ScaffoldContext::new(&sequences, &aligner)
        .with_coverage(&coverage)
        .with_consensus(&consensus);

    let paths = read_paths("c1f\tc2u\tc3f\n".as_bytes())?;
    let mut fasta = Vec::new();
    let mut oriented = Vec::new();
    let stats = run_merge(&ctx, &paths, &mut fasta, Some(&mut oriented as &mut dyn Write))?;

    assert_eq!(String::from_utf8_lossy(&oriented), "scaffold_1\tc1f\tc2r\tc3f\n");
    assert_eq!((stats.links, stats.merges, stats.gaps), (2, 2, 0));

    let records = parse_fasta(&String::from_utf8_lossy(&fasta));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, "scaffold_1");
    assert_eq!(records[0].1.as_bytes(), expected.as_slice());
    assert!(String::from_utf8_lossy(&fasta).lines().all(|l| l.len() <= 60));
    Ok(())
}

#[test]
fn test_merge_pipeline_splits_unresolved() -> io::Result<()> {
    let c1 = bases(10, 100);
    let c2 = bases(11, 80);
    let c3 = bases(12, 70);
    let (sequences, coverage) = stores(
        &[("c1", c1.as_slice()), ("c2", c2.as_slice()), ("c3", c3.as_slice())],
        20,
    );
    let aligner = ExactOverlapAligner::default();
    let consensus = SpoaConsensus::default();
    let ctx = ScaffoldContext::new(&sequences, &aligner)
        .with_coverage(&coverage)
        .with_consensus(&consensus);

    let paths = read_paths("c1f\tc2u\n\nc3r\n".as_bytes())?;
    let mut fasta = Vec::new();
    let stats = run_merge(&ctx, &paths, &mut fasta, None)?;

    let records = parse_fasta(&String::from_utf8_lossy(&fasta));
    let names: Vec<&str> = records.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["scaffold_1", "scaffold_2", "scaffold_3"]);
    assert_eq!(records[0].1.as_bytes(), c1.as_slice());
    assert_eq!(records[1].1.as_bytes(), c2.as_slice());
    // Lone contigs are written as stored, even when tagged reverse
    assert_eq!(records[2].1.as_bytes(), c3.as_slice());
    assert_eq!((stats.links, stats.merges, stats.gaps), (0, 0, 0));
    Ok(())
}

#[test]
fn test_merge_pipeline_gap_between_unrelated_contigs() -> io::Result<()> {
    let c1 = bases(20, 90);
    let c2 = bases(21, 60);
    let (sequences, coverage) = stores(&[("c1", c1.as_slice()), ("c2", c2.as_slice())], 20);
    let aligner = ExactOverlapAligner::default();
    let consensus = SpoaConsensus::default();
    let ctx = ScaffoldContext::new(&sequences, &aligner)
        .with_coverage(&coverage)
        .with_consensus(&consensus);

    let paths = read_paths("c1f\tc2f\n".as_bytes())?;
    let mut fasta = Vec::new();
    let stats = run_merge(&ctx, &paths, &mut fasta, None)?;

    let records = parse_fasta(&String::from_utf8_lossy(&fasta));
    let expected = [c1, b"NNNNNNNNNN".to_vec(), c2].concat();
    assert_eq!(records[0].1.as_bytes(), expected.as_slice());
    assert_eq!(stats.merges + stats.gaps, stats.links);
    assert_eq!(stats.gaps, 1);
    Ok(())
}

#[test]
fn test_orient_from_path_file() -> io::Result<()> {
    let (_, contigs) = joined_contigs();
    let refs: Vec<(&str, &[u8])> = contigs.iter().map(|(n, s)| (*n, s.as_slice())).collect();
    let (sequences, _) = stores(&refs, 20);
    let aligner = ExactOverlapAligner::default();
    let ctx = ScaffoldContext::new(&sequences, &aligner);

    let dir = TempDir::new()?;
    let path_file = dir.path().join("paths.tsv");
    fs::write(&path_file, "c1f\tc2u\tc3f\nc3u\n")?;
    let paths = read_paths_file(path_file.to_str().unwrap())?;

    let mut out = Vec::new();
    let resolution = run_orient(&ctx, &paths, &mut out)?;
    assert_eq!(resolution.oriented_by_alignment, 1);
    assert_eq!(String::from_utf8_lossy(&out), "scaffold_1\tc1f\tc2r\tc3f\nscaffold_2\tc3f\n");
    Ok(())
}

#[test]
fn test_trim_reports_bed() -> io::Result<()> {
    let (_, contigs) = joined_contigs();
    let refs: Vec<(&str, &[u8])> = contigs.iter().map(|(n, s)| (*n, s.as_slice())).collect();
    let (sequences, mut coverage) = stores(&refs, 20);
    // c1 (190 bp) is poorly covered over its last 60 bases
    let mut depth = vec![20; 130];
    depth.extend(vec![1; 60]);
    coverage.insert("c1", depth);

    let aligner = ExactOverlapAligner::default();
    let ctx = ScaffoldContext::new(&sequences, &aligner).with_coverage(&coverage);
    let paths = read_paths("c1f\tc2r\tc3f\n".as_bytes())?;

    let mut bed = Vec::new();
    let ranges = run_trim(&ctx, &paths, &mut bed)?;
    assert_eq!(ranges.len(), 3);
    assert_eq!(String::from_utf8_lossy(&bed), "c1\t0\t130\nc2\t0\t200\nc3\t0\t130\n");
    Ok(())
}

#[test]
fn test_compressed_fasta_output() -> io::Result<()> {
    let c1 = bases(30, 130);
    let (sequences, coverage) = stores(&[("c1", c1.as_slice())], 20);
    let aligner = ExactOverlapAligner::default();
    let consensus = SpoaConsensus::default();
    let ctx = ScaffoldContext::new(&sequences, &aligner)
        .with_coverage(&coverage)
        .with_consensus(&consensus);
    let paths = read_paths("c1f\n".as_bytes())?;

    let dir = TempDir::new()?;
    let out_path = dir.path().join("merged.fa.gz");
    {
        let mut writer = create_output(out_path.to_str())?;
        run_merge(&ctx, &paths, &mut *writer, None)?;
        writer.flush()?;
    }

    let mut text = String::new();
    bgzf::io::Reader::new(fs::File::open(&out_path)?).read_to_string(&mut text)?;
    let records = parse_fasta(&text);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].1.as_bytes(), c1.as_slice());
    Ok(())
}

#[test]
fn test_merge_writes_paths_to_output_file() -> io::Result<()> {
    let (expected, contigs) = joined_contigs();
    let refs: Vec<(&str, &[u8])> = contigs.iter().map(|(n, s)| (*n, s.as_slice())).collect();
    let (sequences, coverage) = stores(&refs, 20);
    let aligner = ExactOverlapAligner::default();
    let consensus = SpoaConsensus::default();
    let ctx = ScaffoldContext::new(&sequences, &aligner)
        .with_coverage(&coverage)
        .with_consensus(&consensus);
    let paths = read_paths("c1f\tc2u\tc3f\n".as_bytes())?;

    let dir = TempDir::new()?;
    let fasta_path = dir.path().join("merged.fa");
    let paths_path = dir.path().join("oriented.tsv");
    {
        let mut fasta = create_output(fasta_path.to_str())?;
        let mut paths_writer = match paths_path.to_str() {
            Some(path) => Some(create_output(Some(path))?),
            None => None,
        };
        run_merge(
            &ctx,
            &paths,
            &mut *fasta,
            paths_writer.as_deref_mut().map(|w| w as &mut dyn Write),
        )?;
    }

    assert_eq!(fs::read_to_string(&paths_path)?, "scaffold_1\tc1f\tc2r\tc3f\n");
    let records = parse_fasta(&fs::read_to_string(&fasta_path)?);
    assert_eq!(records[0].1.as_bytes(), expected.as_slice());
    Ok(())
}

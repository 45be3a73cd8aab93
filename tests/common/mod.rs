#![allow(dead_code)]

use scaffold_merge::coverage::MemoryCoverage;
use scaffold_merge::sequence_index::MemorySequenceIndex;

/// Deterministic pseudo-random bases for a given seed.
pub fn bases(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 62) as usize]
        })
        .collect()
}

/// In-memory contigs, each with uniform coverage of `depth`.
pub fn stores(contigs: &[(&str, &[u8])], depth: u32) -> (MemorySequenceIndex, MemoryCoverage) {
    let mut sequences = MemorySequenceIndex::new();
    let mut coverage = MemoryCoverage::new();
    for (name, seq) in contigs {
        sequences.insert(name, seq);
        coverage.insert_uniform(name, seq.len(), depth);
    }
    (sequences, coverage)
}

/// Records of a FASTA file as (name, sequence) pairs.
pub fn parse_fasta(text: &str) -> Vec<(String, String)> {
    let mut records: Vec<(String, String)> = Vec::new();
    for line in text.lines() {
        if let Some(name) = line.strip_prefix('>') {
            records.push((name.to_string(), String::new()));
        } else if let Some((_, seq)) = records.last_mut() {
            seq.push_str(line);
        }
    }
    records
}

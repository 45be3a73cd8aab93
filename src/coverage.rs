//! Per-base read depth over contig ranges.
//!
//! Depth at a position counts reads whose aligned base there is one of
//! A/C/G/T, i.e. the sum of the four nucleotide channels. Deletions,
//! reference skips, unmapped/secondary/QC-failed/duplicate reads and bases
//! below the quality threshold do not count.

use rust_htslib::bam::{self, Read};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;

// Trait for per-base coverage queries
pub trait CoverageIndex {
    /// Depth at every position of `[start, end)`.
    fn count_coverage(&self, seq_name: &str, start: usize, end: usize) -> io::Result<Vec<u32>>;
}

thread_local! {
    static BAM_CACHE: RefCell<HashMap<String, bam::IndexedReader>> = RefCell::new(HashMap::new());
}

/// Coverage from a coordinate-sorted, indexed BAM file.
#[derive(Debug, Clone)]
pub struct BamCoverage {
    pub bam_path: String,
    pub min_base_quality: u8,
}

impl BamCoverage {
    pub fn new(bam_path: &str) -> io::Result<Self> {
        // Open once up front so a missing file or index fails early
        bam::IndexedReader::from_path(bam_path).map_err(|e| {
            io::Error::other(format!("Failed to open indexed BAM '{bam_path}': {e}"))
        })?;
        Ok(BamCoverage {
            bam_path: bam_path.to_string(),
            min_base_quality: 15,
        })
    }

    fn count_with(
        &self,
        reader: &mut bam::IndexedReader,
        seq_name: &str,
        start: usize,
        end: usize,
    ) -> io::Result<Vec<u32>> {
        let mut depth = vec![0u32; end - start];
        reader
            .fetch((seq_name, start as i64, end as i64))
            .map_err(|e| {
                io::Error::other(format!("Failed to fetch {seq_name}:{start}-{end}: {e}"))
            })?;

        let mut pileups = reader.pileup();
        pileups.set_max_depth(u32::MAX);
        for pileup in pileups {
            let pileup = pileup
                .map_err(|e| io::Error::other(format!("Pileup failed on {seq_name}: {e}")))?;
            let pos = pileup.pos() as usize;
            if pos < start || pos >= end {
                continue;
            }
            let count = pileup
                .alignments()
                .filter(|aln| {
                    let record = aln.record();
                    if record.is_unmapped()
                        || record.is_secondary()
                        || record.is_quality_check_failed()
                        || record.is_duplicate()
                    {
                        return false;
                    }
                    match aln.qpos() {
                        Some(qpos) => {
                            let base = record.seq()[qpos].to_ascii_uppercase();
                            matches!(base, b'A' | b'C' | b'G' | b'T')
                                && record.qual()[qpos] >= self.min_base_quality
                        }
                        None => false,
                    }
                })
                .count();
            depth[pos - start] = count as u32;
        }

        Ok(depth)
    }
}

impl CoverageIndex for BamCoverage {
    fn count_coverage(&self, seq_name: &str, start: usize, end: usize) -> io::Result<Vec<u32>> {
        if start >= end {
            return Ok(Vec::new());
        }
        BAM_CACHE.with(|cache_cell| -> io::Result<Vec<u32>> {
            let mut cache = cache_cell.borrow_mut();
            if !cache.contains_key(&self.bam_path) {
                let reader = bam::IndexedReader::from_path(&self.bam_path).map_err(|e| {
                    io::Error::other(format!("Failed to open indexed BAM '{}': {e}", self.bam_path))
                })?;
                cache.insert(self.bam_path.clone(), reader);
            }
            let reader = cache
                .get_mut(&self.bam_path)
                .ok_or_else(|| io::Error::other("BAM reader cache miss"))?;
            self.count_with(reader, seq_name, start, end)
        })
    }
}

/// Depth profiles held in memory; contigs without a profile have zero depth.
#[derive(Debug, Default)]
pub struct MemoryCoverage {
    depths: FxHashMap<String, Vec<u32>>,
}

impl MemoryCoverage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, seq_name: &str, depth: Vec<u32>) {
        self.depths.insert(seq_name.to_string(), depth);
    }

    /// Same depth at every one of `len` positions.
    pub fn insert_uniform(&mut self, seq_name: &str, len: usize, depth: u32) {
        self.insert(seq_name, vec![depth; len]);
    }
}

impl CoverageIndex for MemoryCoverage {
    fn count_coverage(&self, seq_name: &str, start: usize, end: usize) -> io::Result<Vec<u32>> {
        let profile = self.depths.get(seq_name);
        Ok((start..end)
            .map(|pos| profile.and_then(|p| p.get(pos)).copied().unwrap_or(0))
            .collect())
    }
}

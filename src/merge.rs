//! Building final sequences from oriented scaffolds.
//!
//! Contig ends facing a join are trimmed back to well-covered sequence, then
//! each scaffold is assembled left to right: consecutive contigs are merged
//! through their overlap when one is found and joined by a run of `N`
//! otherwise.

use crate::consensus::ConsensusBuilder;
use crate::context::ScaffoldContext;
use crate::coverage::CoverageIndex;
use crate::orient::longest;
use crate::overlap::{AlignmentCandidate, OverlapAligner};
use crate::scaffold::{OrientedContig, OrientedScaffold, ScaffoldError, Strand};
use crate::sequence_index::{fetch_oriented, require_length, SequenceIndex};
use crate::trim::{trim_side, Side, TrimOutcome, TrimmedRange};
use log::{debug, info, warn};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Configuration for sequence merging.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Bases of the merged sequence kept as reference for the next join.
    /// Default: 100000
    pub reference_tail: usize,

    /// Number of `N` inserted where no overlap is found.
    /// Default: 10
    pub gap_length: usize,

    /// How far (bp) an overlap may sit from the reference end and the
    /// query start.
    /// Default: 1000
    pub overlap_slack: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            reference_tail: 100_000,
            gap_length: 10,
            overlap_slack: 1000,
        }
    }
}

/// Join counters for a merge run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Joins attempted: the sum of `len - 1` over all scaffolds.
    pub links: usize,
    pub merges: usize,
    pub gaps: usize,
}

impl std::ops::AddAssign for MergeStats {
    fn add_assign(&mut self, other: Self) {
        self.links += other.links;
        self.merges += other.merges;
        self.gaps += other.gaps;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedScaffold {
    pub name: String,
    pub sequence: Vec<u8>,
}

/// Contig sides that face a join, given the contig's place in a scaffold.
pub fn sides_to_trim(position: usize, path_len: usize, strand: Strand) -> &'static [Side] {
    let first = position == 0;
    let last = position + 1 == path_len;
    match (first, last, strand) {
        (true, false, Strand::Forward) => &[Side::End],
        (true, false, Strand::Reverse) => &[Side::Start],
        (false, true, Strand::Forward) => &[Side::Start],
        (false, true, Strand::Reverse) => &[Side::End],
        _ => &[Side::Start, Side::End],
    }
}

/// Sides to trim for every contig of a multi-contig scaffold, in first-seen
/// order. A contig used in several places is trimmed on every side any of
/// its uses asks for.
pub fn plan_trims(scaffolds: &[OrientedScaffold]) -> Vec<(String, Vec<Side>)> {
    let mut order: Vec<String> = Vec::new();
    let mut sides: FxHashMap<String, Vec<Side>> = FxHashMap::default();

    for scaffold in scaffolds.iter().filter(|s| s.contigs.len() > 1) {
        for (position, contig) in scaffold.contigs.iter().enumerate() {
            let entry = sides.entry(contig.name.clone()).or_insert_with(|| {
                order.push(contig.name.clone());
                Vec::new()
            });
            for &side in sides_to_trim(position, scaffold.contigs.len(), contig.strand) {
                if !entry.contains(&side) {
                    entry.push(side);
                }
            }
        }
    }

    order
        .into_iter()
        .map(|name| {
            let mut planned = sides.remove(&name).unwrap_or_default();
            planned.sort_by_key(|side| *side == Side::End);
            (name, planned)
        })
        .collect()
}

fn trimmed_range<S, A, C, B>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    name: &str,
    sides: &[Side],
) -> Result<TrimmedRange, ScaffoldError>
where
    S: SequenceIndex + ?Sized,
    C: CoverageIndex + ?Sized,
    B: ?Sized,
{
    let len = require_length(ctx.sequences, name)?;
    let mut range = TrimmedRange::full(len);

    for &side in sides {
        match trim_side(ctx.sequences, ctx.coverage, name, side, &ctx.trim)? {
            TrimOutcome::Trim(n) => match side {
                Side::Start => range.start = n.min(range.end),
                Side::End => range.end = len.saturating_sub(n).max(range.start),
            },
            TrimOutcome::Unreachable => {
                warn!(
                    "Coverage never reaches the threshold at {:?} of {}; side left untrimmed",
                    side, name
                );
            }
        }
    }

    Ok(range)
}

/// Trimmed coordinates for every contig that takes part in a join.
pub fn compute_trimmed_ranges<S, A, C, B>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    scaffolds: &[OrientedScaffold],
) -> Result<FxHashMap<String, TrimmedRange>, ScaffoldError>
where
    S: SequenceIndex + Sync + ?Sized,
    A: Sync,
    C: CoverageIndex + Sync + ?Sized,
    B: Sync + ?Sized,
{
    plan_trims(scaffolds)
        .par_iter()
        .map(|(name, sides)| -> Result<(String, TrimmedRange), ScaffoldError> {
            let range = trimmed_range(ctx, name, sides)?;
            debug!("Trimmed {} to {}-{}", name, range.start, range.end);
            Ok((name.clone(), range))
        })
        .collect()
}

/// Best forward overlap of the end of `reference` with the start of `query`.
pub fn find_overlap<S, A, C, B>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    reference: &[u8],
    query: &[u8],
) -> Result<Option<AlignmentCandidate>, ScaffoldError>
where
    S: ?Sized,
    A: OverlapAligner,
    C: ?Sized,
    B: ?Sized,
{
    if reference.is_empty() || query.is_empty() {
        return Ok(None);
    }

    let index = ctx.aligner.build_index(&[("reference", reference)])?;
    let candidates = ctx.aligner.map(&index, query)?;
    let slack = ctx.merge.overlap_slack;
    let dovetails: Vec<&AlignmentCandidate> = candidates
        .iter()
        .filter(|aln| {
            aln.strand == Strand::Forward
                && aln.target_end + slack >= aln.target_len
                && aln.query_start <= slack
                && aln.target_start >= aln.query_start
                && aln.target_len.saturating_sub(aln.target_end)
                    <= aln.query_len.saturating_sub(aln.query_end)
                && aln.target_end <= reference.len()
                && aln.query_end <= query.len()
        })
        .collect();

    Ok(longest(&dovetails).cloned())
}

fn fetch_trimmed<S: SequenceIndex + ?Sized>(
    sequences: &S,
    contig: &OrientedContig,
    ranges: &FxHashMap<String, TrimmedRange>,
) -> Result<Vec<u8>, ScaffoldError> {
    let range = match ranges.get(&contig.name) {
        Some(range) => *range,
        None => TrimmedRange::full(require_length(sequences, &contig.name)?),
    };
    Ok(fetch_oriented(sequences, &contig.name, range.start, range.end, contig.strand)?)
}

/// Assemble one scaffold into a single sequence.
pub fn merge_scaffold<S, A, C, B>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    scaffold: &OrientedScaffold,
    ranges: &FxHashMap<String, TrimmedRange>,
) -> Result<(Vec<u8>, MergeStats), ScaffoldError>
where
    S: SequenceIndex + ?Sized,
    A: OverlapAligner,
    C: ?Sized,
    B: ConsensusBuilder + ?Sized,
{
    let mut stats = MergeStats {
        links: scaffold.links(),
        ..MergeStats::default()
    };

    let (first, rest) = match scaffold.contigs.split_first() {
        Some(split) => split,
        None => return Ok((Vec::new(), stats)),
    };

    // A lone contig is copied as stored, whatever its strand tag
    if rest.is_empty() {
        let len = require_length(ctx.sequences, &first.name)?;
        let sequence = ctx.sequences.fetch_sequence(&first.name, 0, len)?;
        return Ok((sequence, stats));
    }

    let mut merged = Vec::new();
    let mut reference = fetch_trimmed(ctx.sequences, first, ranges)?;

    for (i, contig) in rest.iter().enumerate() {
        let is_last = i + 1 == rest.len();
        let query = fetch_trimmed(ctx.sequences, contig, ranges)?;

        match find_overlap(ctx, &reference, &query)? {
            Some(alignment) => {
                let consensus = ctx.consensus.merge(&alignment, &reference, &query)?;
                if is_last {
                    merged.extend_from_slice(&consensus);
                } else {
                    // Only the tail is aligned against the next contig
                    let split = consensus.len().saturating_sub(ctx.merge.reference_tail);
                    merged.extend_from_slice(&consensus[..split]);
                    reference = consensus[split..].to_vec();
                }
                stats.merges += 1;
            }
            None => {
                merged.extend_from_slice(&reference);
                merged.extend(std::iter::repeat(b'N').take(ctx.merge.gap_length));
                if is_last {
                    merged.extend_from_slice(&query);
                } else {
                    reference = query;
                }
                stats.gaps += 1;
            }
        }
    }

    debug!(
        "{}: {} bp from {} contigs ({} merges, {} gaps)",
        scaffold.name,
        merged.len(),
        scaffold.contigs.len(),
        stats.merges,
        stats.gaps
    );
    Ok((merged, stats))
}

/// Trim, then merge every scaffold. Output keeps the input order.
pub fn merge_scaffolds<S, A, C, B>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    scaffolds: &[OrientedScaffold],
) -> Result<(Vec<MergedScaffold>, MergeStats), ScaffoldError>
where
    S: SequenceIndex + Sync + ?Sized,
    A: OverlapAligner + Sync,
    C: CoverageIndex + Sync + ?Sized,
    B: ConsensusBuilder + Sync + ?Sized,
{
    info!("Trimming contig ends...");
    let ranges = compute_trimmed_ranges(ctx, scaffolds)?;

    info!("Building linked contigs.");
    let links: usize = scaffolds.iter().map(OrientedScaffold::links).sum();
    info!("Number of links: {}", links);

    let results = scaffolds
        .par_iter()
        .map(|scaffold| {
            merge_scaffold(ctx, scaffold, &ranges).map(|(sequence, stats)| {
                (
                    MergedScaffold {
                        name: scaffold.name.clone(),
                        sequence,
                    },
                    stats,
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut stats = MergeStats::default();
    let mut merged = Vec::with_capacity(results.len());
    for (scaffold, scaffold_stats) in results {
        stats += scaffold_stats;
        merged.push(scaffold);
    }

    info!("Number of aligned merges: {}", stats.merges);
    info!("Number of gaps introduced: {}", stats.gaps);
    Ok((merged, stats))
}

//! Orientation of contigs whose strand the link graph could not decide.
//!
//! The unknown contig is aligned against its oriented neighbours. Only
//! alignments joining the neighbour's inner end (the end facing the unknown
//! contig) with either end of the unknown contig count as evidence.

use crate::context::ScaffoldContext;
use crate::overlap::{AlignmentCandidate, OverlapAligner};
use crate::scaffold::{ContigToken, Orientation, ScaffoldError, Strand};
use crate::sequence_index::{fetch_oriented, require_length, SequenceIndex};
use log::debug;

const LEFT: &str = "left";
const RIGHT: &str = "right";

/// Configuration for alignment-based orientation.
#[derive(Debug, Clone)]
pub struct OrientConfig {
    /// Distance (bp) from a contig end within which an alignment must lie.
    /// Default: 1000
    pub end_window: usize,
}

impl Default for OrientConfig {
    fn default() -> Self {
        OrientConfig { end_window: 1000 }
    }
}

/// Alignment lies within `end_window` of either end of the query.
fn near_query_end(aln: &AlignmentCandidate, query_len: usize, end_window: usize) -> bool {
    aln.query_start < end_window || aln.query_end > query_len.saturating_sub(end_window)
}

/// Split candidates into those supporting a join with the left neighbour's
/// end and those supporting a join with the right neighbour's start.
pub fn filter_candidates(
    candidates: &[AlignmentCandidate],
    query_len: usize,
    end_window: usize,
) -> (Vec<&AlignmentCandidate>, Vec<&AlignmentCandidate>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for aln in candidates {
        if !near_query_end(aln, query_len, end_window) {
            continue;
        }
        if aln.target_name == LEFT && aln.target_end > aln.target_len.saturating_sub(end_window) {
            left.push(aln);
        } else if aln.target_name == RIGHT && aln.target_start < end_window {
            right.push(aln);
        }
    }
    (left, right)
}

/// Same-strand pair with the greatest combined match count; the earliest
/// pair wins ties. `None` when the two sides never agree on a strand.
pub fn best_pair<'a>(
    left: &[&'a AlignmentCandidate],
    right: &[&'a AlignmentCandidate],
) -> Option<(&'a AlignmentCandidate, &'a AlignmentCandidate)> {
    let mut best: Option<(&AlignmentCandidate, &AlignmentCandidate)> = None;
    for &l in left {
        for &r in right.iter().filter(|r| r.strand == l.strand) {
            let better = match best {
                Some((bl, br)) => l.matches + r.matches > bl.matches + br.matches,
                None => true,
            };
            if better {
                best = Some((l, r));
            }
        }
    }
    best
}

/// Candidate with the most matches; the earliest wins ties.
pub fn longest<'a>(candidates: &[&'a AlignmentCandidate]) -> Option<&'a AlignmentCandidate> {
    candidates.iter().copied().fold(None, |best, aln| match best {
        Some(b) if b.matches >= aln.matches => Some(b),
        _ => Some(aln),
    })
}

/// Orientation implied by the surviving evidence, or `Unknown` without any.
pub fn choose_orientation(
    left: &[&AlignmentCandidate],
    right: &[&AlignmentCandidate],
) -> Orientation {
    let winner = match (left.is_empty(), right.is_empty()) {
        (false, false) => best_pair(left, right).map(|(l, _)| l),
        (false, true) => longest(left),
        (true, false) => longest(right),
        (true, true) => None,
    };
    winner.map_or(Orientation::Unknown, |aln| aln.strand.into())
}

fn neighbour_sequence<S: SequenceIndex + ?Sized>(
    sequences: &S,
    token: &ContigToken,
) -> Result<Vec<u8>, ScaffoldError> {
    let len = require_length(sequences, &token.name)?;
    // A neighbour that is itself unresolved is read as stored
    let strand = token.orientation.strand().unwrap_or(Strand::Forward);
    Ok(fetch_oriented(sequences, &token.name, 0, len, strand)?)
}

fn orient_by_alignment<S, A, C, B>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    left: Option<&ContigToken>,
    unknown: &str,
    right: Option<&ContigToken>,
) -> Result<Orientation, ScaffoldError>
where
    S: SequenceIndex + ?Sized,
    A: OverlapAligner,
    C: ?Sized,
    B: ?Sized,
{
    let unknown_len = require_length(ctx.sequences, unknown)?;
    let left_seq = left.map(|t| neighbour_sequence(ctx.sequences, t)).transpose()?;
    let right_seq = right.map(|t| neighbour_sequence(ctx.sequences, t)).transpose()?;
    let unknown_seq = ctx.sequences.fetch_sequence(unknown, 0, unknown_len)?;

    // References are named by side so a contig flanked twice by the same
    // neighbour still yields distinguishable evidence
    let mut references: Vec<(&str, &[u8])> = Vec::with_capacity(2);
    if let Some(seq) = &left_seq {
        references.push((LEFT, seq.as_slice()));
    }
    if let Some(seq) = &right_seq {
        references.push((RIGHT, seq.as_slice()));
    }
    if references.is_empty() || unknown_seq.is_empty() {
        return Ok(Orientation::Unknown);
    }

    let index = ctx.aligner.build_index(&references)?;
    let candidates = ctx.aligner.map(&index, &unknown_seq)?;
    let (left_keep, right_keep) =
        filter_candidates(&candidates, unknown_seq.len(), ctx.orient.end_window);
    let orientation = choose_orientation(&left_keep, &right_keep);

    debug!(
        "Orienting {}: {} alignments, {} left / {} right kept -> {}",
        unknown,
        candidates.len(),
        left_keep.len(),
        right_keep.len(),
        orientation.tag()
    );
    Ok(orientation)
}

/// Orient a contig flanked by oriented neighbours on both sides.
pub fn orient_middle<S, A, C, B>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    left: &ContigToken,
    middle: &str,
    right: &ContigToken,
) -> Result<Orientation, ScaffoldError>
where
    S: SequenceIndex + ?Sized,
    A: OverlapAligner,
    C: ?Sized,
    B: ?Sized,
{
    orient_by_alignment(ctx, Some(left), middle, Some(right))
}

/// Orient the first contig of a path from its right neighbour.
pub fn orient_first<S, A, C, B>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    first: &str,
    right: &ContigToken,
) -> Result<Orientation, ScaffoldError>
where
    S: SequenceIndex + ?Sized,
    A: OverlapAligner,
    C: ?Sized,
    B: ?Sized,
{
    orient_by_alignment(ctx, None, first, Some(right))
}

/// Orient the last contig of a path from its left neighbour.
pub fn orient_last<S, A, C, B>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    left: &ContigToken,
    last: &str,
) -> Result<Orientation, ScaffoldError>
where
    S: SequenceIndex + ?Sized,
    A: OverlapAligner,
    C: ?Sized,
    B: ?Sized,
{
    orient_by_alignment(ctx, Some(left), last, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::ExactOverlapAligner;
    use crate::sequence_index::{reverse_complement, MemorySequenceIndex};

    fn candidate(
        target: &str,
        strand: Strand,
        target_span: (usize, usize),
        query_span: (usize, usize),
        matches: usize,
    ) -> AlignmentCandidate {
        AlignmentCandidate {
            query_len: 5000,
            query_start: query_span.0,
            query_end: query_span.1,
            strand,
            target_name: target.to_string(),
            target_len: 5000,
            target_start: target_span.0,
            target_end: target_span.1,
            matches,
            block_len: matches,
            cigar: Vec::new(),
        }
    }

    #[test]
    fn test_filter_candidates() {
        let candidates = vec![
            // Left neighbour end, query start: kept
            candidate(LEFT, Strand::Forward, (4500, 5000), (0, 500), 480),
            // Left neighbour interior: dropped
            candidate(LEFT, Strand::Forward, (1000, 1500), (0, 500), 480),
            // Right neighbour start, query end: kept
            candidate(RIGHT, Strand::Reverse, (0, 400), (4600, 5000), 390),
            // Query interior: dropped
            candidate(RIGHT, Strand::Forward, (0, 400), (2000, 2400), 390),
            // Right neighbour end: dropped
            candidate(RIGHT, Strand::Forward, (4600, 5000), (0, 400), 390),
        ];
        let (left, right) = filter_candidates(&candidates, 5000, 1000);
        assert_eq!(left, vec![&candidates[0]]);
        assert_eq!(right, vec![&candidates[2]]);
    }

    #[test]
    fn test_best_pair_requires_same_strand() {
        let l1 = candidate(LEFT, Strand::Forward, (4500, 5000), (0, 500), 500);
        let l2 = candidate(LEFT, Strand::Reverse, (4500, 5000), (4500, 5000), 300);
        let r1 = candidate(RIGHT, Strand::Reverse, (0, 600), (0, 600), 600);
        let r2 = candidate(RIGHT, Strand::Forward, (0, 100), (4900, 5000), 100);

        // Forward pair: 600, reverse pair: 900
        let (l, r) = best_pair(&[&l1, &l2], &[&r1, &r2]).unwrap();
        assert_eq!(l, &l2);
        assert_eq!(r, &r1);

        assert!(best_pair(&[&l1], &[&r1]).is_none());
    }

    #[test]
    fn test_longest_prefers_first_on_tie() {
        let a = candidate(LEFT, Strand::Forward, (4500, 5000), (0, 500), 500);
        let b = candidate(LEFT, Strand::Reverse, (4500, 5000), (0, 500), 500);
        let c = candidate(LEFT, Strand::Reverse, (4500, 5000), (0, 500), 200);
        assert_eq!(longest(&[&a, &b, &c]), Some(&a));
        assert_eq!(longest(&[]), None);
    }

    #[test]
    fn test_choose_orientation() {
        let fwd = candidate(LEFT, Strand::Forward, (4500, 5000), (0, 500), 500);
        let rev = candidate(RIGHT, Strand::Reverse, (0, 500), (0, 500), 500);
        assert_eq!(choose_orientation(&[&fwd], &[]), Orientation::Forward);
        assert_eq!(choose_orientation(&[], &[&rev]), Orientation::Reverse);
        assert_eq!(choose_orientation(&[], &[]), Orientation::Unknown);
        // Conflicting sides with no common strand
        assert_eq!(choose_orientation(&[&fwd], &[&rev]), Orientation::Unknown);
    }

    const SHARED: &[u8] = b"ACGTTGCAAGGCTTACGGATCCATGCAATGCC";

    fn sequences(middle_reversed: bool) -> MemorySequenceIndex {
        let mut index = MemorySequenceIndex::new();
        index.insert("c1", &[b"TTTTTTTTTTTTTTTTTTTT".as_slice(), SHARED].concat());
        let middle = [SHARED, b"GGGGGGGGGGGGGGGGGGGG".as_slice()].concat();
        if middle_reversed {
            index.insert("c2", &reverse_complement(&middle));
        } else {
            index.insert("c2", &middle);
        }
        index.insert("c3", b"CACACACACACACACACACACACACACACA");
        index
    }

    #[test]
    fn test_orient_middle_forward_from_left_evidence() {
        let index = sequences(false);
        let aligner = ExactOverlapAligner::default();
        let ctx = ScaffoldContext::new(&index, &aligner);
        let left = ContigToken::new("c1", Orientation::Forward);
        let right = ContigToken::new("c3", Orientation::Forward);
        assert_eq!(orient_middle(&ctx, &left, "c2", &right).unwrap(), Orientation::Forward);
    }

    #[test]
    fn test_orient_last_reverse() {
        let index = sequences(true);
        let aligner = ExactOverlapAligner::default();
        let ctx = ScaffoldContext::new(&index, &aligner);
        let left = ContigToken::new("c1", Orientation::Forward);
        assert_eq!(orient_last(&ctx, &left, "c2").unwrap(), Orientation::Reverse);
    }

    #[test]
    fn test_orient_first_without_evidence() {
        let index = sequences(false);
        let aligner = ExactOverlapAligner::default();
        let ctx = ScaffoldContext::new(&index, &aligner);
        let right = ContigToken::new("c3", Orientation::Forward);
        assert_eq!(orient_first(&ctx, "c2", &right).unwrap(), Orientation::Unknown);
    }

    #[test]
    fn test_reversed_neighbour_is_complemented_first() {
        // c1 stored reversed and tagged 'r' reads the same as c1 forward
        let mut index = sequences(false);
        let c1 = index.fetch_full("c1").unwrap();
        index.insert("c1", &reverse_complement(&c1));
        let aligner = ExactOverlapAligner::default();
        let ctx = ScaffoldContext::new(&index, &aligner);
        let left = ContigToken::new("c1", Orientation::Reverse);
        assert_eq!(orient_last(&ctx, &left, "c2").unwrap(), Orientation::Forward);
    }

    #[test]
    fn test_missing_contig_is_graph_error() {
        let index = sequences(false);
        let aligner = ExactOverlapAligner::default();
        let ctx = ScaffoldContext::new(&index, &aligner);
        let left = ContigToken::new("c9", Orientation::Forward);
        assert!(matches!(
            orient_last(&ctx, &left, "c2"),
            Err(ScaffoldError::GraphIntegrity { contig }) if contig == "c9"
        ));
        let left = ContigToken::new("c1", Orientation::Forward);
        assert!(matches!(
            orient_last(&ctx, &left, "c8"),
            Err(ScaffoldError::GraphIntegrity { contig }) if contig == "c8"
        ));
    }
}

use crate::overlap::{AlignmentCandidate, CigarOp};
use log::debug;
use spoa_rs::{AlignmentEngine, AlignmentType as SpoaAlignmentType, Graph as SpoaGraph};
use std::io;

// Trait for merging two overlapping sequences into one
pub trait ConsensusBuilder {
    /// Merge `reference` and `query` given an alignment of the query's start
    /// onto the reference's end. The result runs from the start of
    /// `reference` to the end of `query`.
    fn merge(
        &self,
        alignment: &AlignmentCandidate,
        reference: &[u8],
        query: &[u8],
    ) -> io::Result<Vec<u8>>;
}

/// Collapse a two-row MSA into one sequence.
///
/// Agreeing columns keep the base, a gap in either row takes the other row's
/// base, and disagreeing bases take the first row's base.
pub fn column_consensus(first: &[u8], second: &[u8]) -> Vec<u8> {
    first
        .iter()
        .zip(second.iter())
        .filter_map(|(&a, &b)| match (a, b) {
            (b'-', b'-') => None,
            (b'-', b) => Some(b),
            (a, _) => Some(a),
        })
        .collect()
}

/// Walk a CIGAR over the two overlap blocks and emit one sequence.
///
/// Follows the same rule as [`column_consensus`] with the reference as first
/// row: matched and mismatched runs keep the reference bases, insertions add
/// the query bases and deletions keep the reference bases.
pub fn cigar_consensus(cigar: &[CigarOp], reference: &[u8], query: &[u8]) -> io::Result<Vec<u8>> {
    let target_len: usize = cigar.iter().map(CigarOp::target_delta).sum();
    let query_len: usize = cigar.iter().map(CigarOp::query_delta).sum();
    if target_len != reference.len() || query_len != query.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "CIGAR spans {}/{} bases but the overlap blocks are {}/{}",
                target_len,
                query_len,
                reference.len(),
                query.len()
            ),
        ));
    }

    let mut consensus = Vec::with_capacity(reference.len() + query.len());
    let (mut r, mut q) = (0, 0);
    for op in cigar {
        match op.op {
            b'I' => consensus.extend_from_slice(&query[q..q + op.len]),
            _ => consensus.extend_from_slice(&reference[r..r + op.target_delta()]),
        }
        r += op.target_delta();
        q += op.query_delta();
    }
    Ok(consensus)
}

fn check_bounds(alignment: &AlignmentCandidate, reference: &[u8], query: &[u8]) -> io::Result<()> {
    if alignment.target_start > alignment.target_end
        || alignment.target_end > reference.len()
        || alignment.query_start > alignment.query_end
        || alignment.query_end > query.len()
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Overlap {}-{} / {}-{} outside sequences of length {} / {}",
                alignment.target_start,
                alignment.target_end,
                alignment.query_start,
                alignment.query_end,
                reference.len(),
                query.len()
            ),
        ));
    }
    Ok(())
}

/// Consensus of the overlapping block.
///
/// The aligner's CIGAR is used when it has one. Otherwise SPOA aligns the two
/// blocks, but only when both fit in `max_poa_length`; longer blocks without a
/// CIGAR keep the reference bases.
pub struct SpoaConsensus {
    /// SPOA scoring parameters: (match, mismatch, gap_open1, gap_ext1, gap_open2, gap_ext2)
    /// Default: (5, 4, 6, 2, 24, 1)
    pub scoring_params: (u8, u8, u8, u8, u8, u8),
    /// Longest block handed to SPOA.
    pub max_poa_length: usize,
}

impl Default for SpoaConsensus {
    fn default() -> Self {
        SpoaConsensus {
            scoring_params: (5, 4, 6, 2, 24, 1),
            max_poa_length: 2000,
        }
    }
}

impl SpoaConsensus {
    fn overlap_consensus(
        &self,
        cigar: &[CigarOp],
        reference: &[u8],
        query: &[u8],
    ) -> io::Result<Vec<u8>> {
        if reference == query {
            return Ok(reference.to_vec());
        }
        if reference.is_empty() || query.is_empty() {
            return Ok(if reference.is_empty() { query.to_vec() } else { reference.to_vec() });
        }
        if !cigar.is_empty() {
            return cigar_consensus(cigar, reference, query);
        }
        if reference.len().max(query.len()) > self.max_poa_length {
            debug!(
                "Overlap of {}/{} bp has no CIGAR and exceeds the POA limit; keeping the reference",
                reference.len(),
                query.len()
            );
            return Ok(reference.to_vec());
        }
        Ok(self.poa_consensus(reference, query))
    }

    fn poa_consensus(&self, reference: &[u8], query: &[u8]) -> Vec<u8> {

        let (match_score, mismatch, gap_open1, gap_extend1, gap_open2, gap_extend2) =
            self.scoring_params;
        let mut graph = SpoaGraph::new();
        let mut engine = AlignmentEngine::new_convex(
            SpoaAlignmentType::kNW, // Both blocks span the whole overlap
            match_score as i8,
            -(mismatch as i8),
            -(gap_open1 as i8),
            -(gap_extend1 as i8),
            -(gap_open2 as i8),
            -(gap_extend2 as i8),
        );

        for seq in [reference, query] {
            let seq = String::from_utf8_lossy(seq).to_string();
            let weights = vec![1u32; seq.len()];
            let (_, alignment) = engine.align(&seq, &graph);
            graph.add_alignment_with_weights(alignment, &seq, &weights);
        }

        let msa = graph.generate_msa();
        column_consensus(msa[0].as_bytes(), msa[1].as_bytes())
    }
}

impl ConsensusBuilder for SpoaConsensus {
    fn merge(
        &self,
        alignment: &AlignmentCandidate,
        reference: &[u8],
        query: &[u8],
    ) -> io::Result<Vec<u8>> {
        check_bounds(alignment, reference, query)?;

        let block = self.overlap_consensus(
            &alignment.cigar,
            &reference[alignment.target_start..alignment.target_end],
            &query[alignment.query_start..alignment.query_end],
        )?;

        let mut merged = Vec::with_capacity(
            alignment.target_start + block.len() + query.len() - alignment.query_end,
        );
        merged.extend_from_slice(&reference[..alignment.target_start]);
        merged.extend_from_slice(&block);
        merged.extend_from_slice(&query[alignment.query_end..]);
        Ok(merged)
    }
}

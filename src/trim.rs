use crate::coverage::CoverageIndex;
use crate::scaffold::ScaffoldError;
use crate::sequence_index::{require_length, SequenceIndex};
use log::debug;

/// Configuration for coverage-based end trimming.
#[derive(Debug, Clone)]
pub struct TrimConfig {
    /// Window width (bp) scanned per step.
    /// Default: 30
    pub window: usize,

    /// Mean depth a window needs before scanning stops.
    /// Default: 5.0
    pub min_coverage: f64,

    /// Upper bound on windows scanned from one end. `None` scans until the
    /// window would leave the contig.
    pub max_windows: Option<usize>,
}

impl Default for TrimConfig {
    fn default() -> Self {
        TrimConfig {
            window: 30,
            min_coverage: 5.0,
            max_windows: None,
        }
    }
}

/// Contig end a trim applies to.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum Side {
    Start,
    End,
}

/// Result of scanning one contig end.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum TrimOutcome {
    /// Number of bases to drop from that end.
    Trim(usize),
    /// No window within the scan bound reached the threshold.
    Unreachable,
}

/// Half-open `[start, end)` range of a contig that survives trimming.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct TrimmedRange {
    pub start: usize,
    pub end: usize,
}

impl TrimmedRange {
    pub fn full(len: usize) -> Self {
        TrimmedRange { start: 0, end: len }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Mean depth over one window, normalized by the nominal window width.
fn window_coverage<C: CoverageIndex + ?Sized>(
    coverage: &C,
    seq_name: &str,
    start: usize,
    end: usize,
    window: usize,
) -> std::io::Result<f64> {
    let depth = coverage.count_coverage(seq_name, start, end)?;
    let total: u64 = depth.iter().map(|&d| d as u64).sum();
    Ok(total as f64 / window as f64)
}

/// Scan inward from `side` of `seq_name` in fixed windows until a window is
/// covered well enough, and report how many bases precede that window.
///
/// The start side stops at the first window with coverage `>= min_coverage`,
/// the end side only once coverage is strictly greater than `min_coverage`.
pub fn trim_side<S, C>(
    sequences: &S,
    coverage: &C,
    seq_name: &str,
    side: Side,
    config: &TrimConfig,
) -> Result<TrimOutcome, ScaffoldError>
where
    S: SequenceIndex + ?Sized,
    C: CoverageIndex + ?Sized,
{
    let len = require_length(sequences, seq_name)?;
    let window = config.window.max(1);
    let fitting = len.div_ceil(window);
    let max_windows = config.max_windows.map_or(fitting, |m| m.min(fitting));

    for step in 0..max_windows {
        let trimmed = step * window;
        let (start, end) = match side {
            Side::Start => (trimmed, (trimmed + window).min(len)),
            Side::End => ((len - trimmed).saturating_sub(window), len - trimmed),
        };
        let cov = window_coverage(coverage, seq_name, start, end, window)?;
        let covered = match side {
            Side::Start => cov >= config.min_coverage,
            Side::End => cov > config.min_coverage,
        };
        if covered {
            debug!(
                "Trimming {} bp from {:?} of {} (window {}-{}, coverage {:.2})",
                trimmed, side, seq_name, start, end, cov
            );
            return Ok(TrimOutcome::Trim(trimmed));
        }
    }

    Ok(TrimOutcome::Unreachable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::MemoryCoverage;
    use crate::sequence_index::MemorySequenceIndex;

    fn setup(depth: Vec<u32>) -> (MemorySequenceIndex, MemoryCoverage) {
        let mut sequences = MemorySequenceIndex::new();
        sequences.insert("c1", &vec![b'A'; depth.len()]);
        let mut coverage = MemoryCoverage::new();
        coverage.insert("c1", depth);
        (sequences, coverage)
    }

    #[test]
    fn test_well_covered_contig_is_not_trimmed() {
        let (sequences, coverage) = setup(vec![10; 300]);
        let config = TrimConfig::default();
        for side in [Side::Start, Side::End] {
            assert_eq!(
                trim_side(&sequences, &coverage, "c1", side, &config).unwrap(),
                TrimOutcome::Trim(0)
            );
        }
    }

    #[test]
    fn test_low_coverage_start_is_trimmed_in_windows() {
        let mut depth = vec![0; 60];
        depth.extend(vec![8; 240]);
        let (sequences, coverage) = setup(depth);
        assert_eq!(
            trim_side(&sequences, &coverage, "c1", Side::Start, &TrimConfig::default()).unwrap(),
            TrimOutcome::Trim(60)
        );
    }

    #[test]
    fn test_low_coverage_end_is_trimmed_in_windows() {
        let mut depth = vec![8; 210];
        depth.extend(vec![1; 90]);
        let (sequences, coverage) = setup(depth);
        assert_eq!(
            trim_side(&sequences, &coverage, "c1", Side::End, &TrimConfig::default()).unwrap(),
            TrimOutcome::Trim(90)
        );
    }

    #[test]
    fn test_threshold_is_inclusive_only_at_start() {
        // Exactly 5x everywhere: enough for the start side, not for the end side
        let (sequences, coverage) = setup(vec![5; 90]);
        let config = TrimConfig::default();
        assert_eq!(
            trim_side(&sequences, &coverage, "c1", Side::Start, &config).unwrap(),
            TrimOutcome::Trim(0)
        );
        assert_eq!(
            trim_side(&sequences, &coverage, "c1", Side::End, &config).unwrap(),
            TrimOutcome::Unreachable
        );
    }

    #[test]
    fn test_uncovered_contig_is_unreachable() {
        let (sequences, coverage) = setup(vec![0; 100]);
        assert_eq!(
            trim_side(&sequences, &coverage, "c1", Side::Start, &TrimConfig::default()).unwrap(),
            TrimOutcome::Unreachable
        );
    }

    #[test]
    fn test_max_windows_bounds_the_scan() {
        let mut depth = vec![0; 120];
        depth.extend(vec![10; 60]);
        let (sequences, coverage) = setup(depth);
        let config = TrimConfig {
            max_windows: Some(2),
            ..TrimConfig::default()
        };
        assert_eq!(
            trim_side(&sequences, &coverage, "c1", Side::Start, &config).unwrap(),
            TrimOutcome::Unreachable
        );
    }

    #[test]
    fn test_missing_contig_is_graph_error() {
        let (sequences, coverage) = setup(vec![10; 30]);
        assert!(matches!(
            trim_side(&sequences, &coverage, "c9", Side::Start, &TrimConfig::default()),
            Err(ScaffoldError::GraphIntegrity { .. })
        ));
    }
}

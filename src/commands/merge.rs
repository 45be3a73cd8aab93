use crate::consensus::ConsensusBuilder;
use crate::context::ScaffoldContext;
use crate::coverage::CoverageIndex;
use crate::merge::{merge_scaffolds, MergeStats, MergedScaffold};
use crate::overlap::OverlapAligner;
use crate::resolve::resolve_scaffolds;
use crate::scaffold::{write_paths, ScaffoldPath};
use crate::sequence_index::SequenceIndex;
use log::info;
use std::io::{self, Write};

pub const FASTA_LINE_WIDTH: usize = 60;

/// Write merged scaffolds as FASTA, wrapping sequence lines at `line_width`.
pub fn write_fasta<W: Write + ?Sized>(
    writer: &mut W,
    scaffolds: &[MergedScaffold],
    line_width: usize,
) -> io::Result<()> {
    for scaffold in scaffolds {
        writeln!(writer, ">{}", scaffold.name)?;
        for line in scaffold.sequence.chunks(line_width.max(1)) {
            writer.write_all(line)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

/// Resolve, trim and merge. Merged sequences go to `fasta`, and the
/// oriented paths they were built from to `paths_out` when given.
pub fn run_merge<S, A, C, B>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    paths: &[ScaffoldPath],
    fasta: &mut dyn Write,
    paths_out: Option<&mut dyn Write>,
) -> io::Result<MergeStats>
where
    S: SequenceIndex + Sync + ?Sized,
    A: OverlapAligner + Sync,
    C: CoverageIndex + Sync + ?Sized,
    B: ConsensusBuilder + Sync + ?Sized,
{
    let resolution = resolve_scaffolds(ctx, paths)?;
    if let Some(writer) = paths_out {
        write_paths(writer, &resolution.scaffolds)?;
        writer.flush()?;
    }

    let (merged, stats) = merge_scaffolds(ctx, &resolution.scaffolds)?;
    write_fasta(fasta, &merged, FASTA_LINE_WIDTH)?;
    fasta.flush()?;

    let total: usize = merged.iter().map(|s| s.sequence.len()).sum();
    info!("Wrote {} scaffolds ({} bp)", merged.len(), total);
    Ok(stats)
}

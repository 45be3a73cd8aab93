use crate::context::ScaffoldContext;
use crate::coverage::CoverageIndex;
use crate::merge::compute_trimmed_ranges;
use crate::overlap::OverlapAligner;
use crate::resolve::resolve_scaffolds;
use crate::scaffold::ScaffoldPath;
use crate::sequence_index::SequenceIndex;
use crate::trim::TrimmedRange;
use log::info;
use rustc_hash::FxHashMap;
use std::io::{self, Write};

/// Write trimmed ranges as BED, ordered naturally by contig name.
pub fn write_trimmed_bed<W: Write + ?Sized>(
    writer: &mut W,
    ranges: &FxHashMap<String, TrimmedRange>,
) -> io::Result<()> {
    let mut names: Vec<&String> = ranges.keys().collect();
    names.sort_by(|a, b| natord::compare(a, b));

    for name in names {
        let range = ranges[name];
        writeln!(writer, "{}\t{}\t{}", name, range.start, range.end)?;
    }
    Ok(())
}

/// Resolve the paths, then report how every joined contig would be trimmed.
pub fn run_trim<S, A, C, B, W>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    paths: &[ScaffoldPath],
    writer: &mut W,
) -> io::Result<FxHashMap<String, TrimmedRange>>
where
    S: SequenceIndex + Sync + ?Sized,
    A: OverlapAligner + Sync,
    C: CoverageIndex + Sync + ?Sized,
    B: Sync + ?Sized,
    W: Write + ?Sized,
{
    let resolution = resolve_scaffolds(ctx, paths)?;

    info!("Trimming contig ends...");
    let ranges = compute_trimmed_ranges(ctx, &resolution.scaffolds)?;
    let trimmed = ranges
        .iter()
        .filter(|(name, range)| {
            ctx.sequences
                .sequence_length(name)
                .is_some_and(|len| range.len() < len)
        })
        .count();
    info!("{} of {} joined contigs lose sequence to trimming", trimmed, ranges.len());

    write_trimmed_bed(writer, &ranges)?;
    writer.flush()?;
    Ok(ranges)
}

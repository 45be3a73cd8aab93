use crate::context::ScaffoldContext;
use crate::overlap::OverlapAligner;
use crate::resolve::{resolve_scaffolds, Resolution};
use crate::scaffold::{write_paths, ScaffoldPath};
use crate::sequence_index::SequenceIndex;
use log::info;
use std::io::{self, Write};

/// Resolve orientations and write the resulting paths.
pub fn run_orient<S, A, C, B, W>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    paths: &[ScaffoldPath],
    writer: &mut W,
) -> io::Result<Resolution>
where
    S: SequenceIndex + Sync + ?Sized,
    A: OverlapAligner + Sync,
    C: Sync + ?Sized,
    B: Sync + ?Sized,
    W: Write + ?Sized,
{
    info!("Resolving orientations for {} paths", paths.len());
    let resolution = resolve_scaffolds(ctx, paths)?;

    write_paths(writer, &resolution.scaffolds)?;
    writer.flush()?;

    info!(
        "Wrote {} scaffolds from {} paths",
        resolution.scaffolds.len(),
        paths.len()
    );
    Ok(resolution)
}

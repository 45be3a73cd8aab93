use crate::context::ScaffoldContext;
use crate::orient::{orient_first, orient_last, orient_middle};
use crate::overlap::OverlapAligner;
use crate::scaffold::{
    scaffold_name, ContigToken, Orientation, OrientedContig, OrientedScaffold, ScaffoldError,
    ScaffoldPath, Strand,
};
use crate::sequence_index::{require_length, SequenceIndex};
use log::{debug, info};
use rayon::prelude::*;

/// Outcome of resolving a set of scaffold paths.
#[derive(Debug)]
pub struct Resolution {
    /// Fully oriented scaffolds, named `scaffold_1..N` in emission order.
    pub scaffolds: Vec<OrientedScaffold>,
    /// Tokens whose orientation was inferred from alignments.
    pub oriented_by_alignment: usize,
}

/// Try to orient every unknown token of `tokens`, left to right. Tokens
/// oriented earlier in the walk serve as neighbours for later ones.
/// Returns the updated tokens and how many were oriented.
pub fn orient_path<S, A, C, B>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    tokens: &[ContigToken],
) -> Result<(Vec<ContigToken>, usize), ScaffoldError>
where
    S: SequenceIndex + ?Sized,
    A: OverlapAligner,
    C: ?Sized,
    B: ?Sized,
{
    for token in tokens {
        require_length(ctx.sequences, &token.name)?;
    }

    let mut resolved = tokens.to_vec();
    let mut oriented = 0;
    let last = resolved.len().saturating_sub(1);

    for idx in 0..resolved.len() {
        if !resolved[idx].is_unknown() || resolved.len() == 1 {
            continue;
        }
        let name = resolved[idx].name.clone();
        let orientation = if idx == 0 {
            orient_first(ctx, &name, &resolved[idx + 1])?
        } else if idx == last {
            orient_last(ctx, &resolved[idx - 1], &name)?
        } else {
            orient_middle(ctx, &resolved[idx - 1], &name, &resolved[idx + 1])?
        };
        resolved[idx].orientation = orientation;
        if orientation != Orientation::Unknown {
            oriented += 1;
        }
    }

    Ok((resolved, oriented))
}

/// Break a path at every token that is still unknown. The unknown token
/// becomes a scaffold of its own, read forward. Empty pieces are dropped.
pub fn split_unresolved(tokens: &[ContigToken]) -> Vec<Vec<OrientedContig>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();

    for token in tokens {
        match token.orientation.strand() {
            Some(strand) => current.push(OrientedContig::new(token.name.clone(), strand)),
            None => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                segments.push(vec![OrientedContig::new(token.name.clone(), Strand::Forward)]);
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

/// Orient what can be oriented, then split paths at whatever is left.
pub fn resolve_scaffolds<S, A, C, B>(
    ctx: &ScaffoldContext<'_, S, A, C, B>,
    paths: &[ScaffoldPath],
) -> Result<Resolution, ScaffoldError>
where
    S: SequenceIndex + Sync + ?Sized,
    A: OverlapAligner + Sync,
    C: Sync + ?Sized,
    B: Sync + ?Sized,
{
    let oriented_paths = paths
        .par_iter()
        .map(|path| {
            orient_path(ctx, &path.tokens).map_err(|e| {
                debug!("Failed to orient {}: {}", path.name, e);
                e
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let oriented_by_alignment: usize = oriented_paths.iter().map(|(_, n)| n).sum();
    info!("Tigs oriented by alignment: {}", oriented_by_alignment);

    let mut scaffolds = Vec::new();
    for (path, (tokens, _)) in paths.iter().zip(oriented_paths) {
        let segments = split_unresolved(&tokens);
        if segments.len() > 1 {
            debug!("Broke {} into {} scaffolds", path.name, segments.len());
        }
        for contigs in segments {
            scaffolds.push(OrientedScaffold {
                name: scaffold_name(scaffolds.len() + 1),
                contigs,
            });
        }
    }

    Ok(Resolution {
        scaffolds,
        oriented_by_alignment,
    })
}

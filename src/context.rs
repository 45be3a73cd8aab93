use crate::merge::MergeConfig;
use crate::orient::OrientConfig;
use crate::trim::TrimConfig;

/// Everything the resolver and merger need, built once per run.
///
/// Collaborators are borrowed; the ones a stage does not use can stay `()`
/// (e.g. orientation alone needs no coverage or consensus builder).
pub struct ScaffoldContext<'a, S: ?Sized, A, C: ?Sized = (), B: ?Sized = ()> {
    pub sequences: &'a S,
    pub aligner: &'a A,
    pub coverage: &'a C,
    pub consensus: &'a B,
    pub trim: TrimConfig,
    pub orient: OrientConfig,
    pub merge: MergeConfig,
}

impl<'a, S: ?Sized, A> ScaffoldContext<'a, S, A> {
    pub fn new(sequences: &'a S, aligner: &'a A) -> Self {
        ScaffoldContext {
            sequences,
            aligner,
            coverage: &(),
            consensus: &(),
            trim: TrimConfig::default(),
            orient: OrientConfig::default(),
            merge: MergeConfig::default(),
        }
    }
}

impl<'a, S: ?Sized, A, C: ?Sized, B: ?Sized> ScaffoldContext<'a, S, A, C, B> {
    pub fn with_coverage<C2: ?Sized>(self, coverage: &'a C2) -> ScaffoldContext<'a, S, A, C2, B> {
        ScaffoldContext {
            sequences: self.sequences,
            aligner: self.aligner,
            coverage,
            consensus: self.consensus,
            trim: self.trim,
            orient: self.orient,
            merge: self.merge,
        }
    }

    pub fn with_consensus<B2: ?Sized>(self, consensus: &'a B2) -> ScaffoldContext<'a, S, A, C, B2> {
        ScaffoldContext {
            sequences: self.sequences,
            aligner: self.aligner,
            coverage: self.coverage,
            consensus,
            trim: self.trim,
            orient: self.orient,
            merge: self.merge,
        }
    }

    pub fn with_trim_config(mut self, trim: TrimConfig) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_orient_config(mut self, orient: OrientConfig) -> Self {
        self.orient = orient;
        self
    }

    pub fn with_merge_config(mut self, merge: MergeConfig) -> Self {
        self.merge = merge;
        self
    }
}

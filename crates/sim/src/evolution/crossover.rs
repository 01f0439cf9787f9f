//! Crossover operators.
//!
//! [`SvlcCrossover`] is a synapsing variable-length crossover: common
//! segments shared by both parents act as fixed anchors, and every gap
//! between anchors is inherited from one parent or the other.

use crate::base::Chromosome;
use crate::errors::CrossoverError;
use coevo_align::{CommonSegment, SegmentMatcher};
use rand::RngCore;
use std::fmt;
use std::ops::Range;

/// Combines parents into offspring.
pub trait Crossover<C: Chromosome>: fmt::Debug + Send + Sync {
    /// Parents consumed by one call to [`cross`](Crossover::cross).
    fn parents_number(&self) -> usize;

    fn cross(&self, parents: &[C], rng: &mut dyn RngCore) -> Result<Vec<C>, CrossoverError>;
}

/// Largest segment count whose pattern space fits in a `u64` counter.
pub const MAX_SYNAPSING_SEGMENTS: usize = 62;

/// Synapsing variable-length crossover.
///
/// With `k` common segments there are `k + 1` gaps and
/// `2^(k + 1) - 2` children: one for every way of picking the parent of each
/// gap, except the two patterns that copy a parent unchanged.
///
/// The default is uncapped, so the child count grows exponentially with the
/// segments two parents share. Long parents over a small alphabet need
/// [`with_max_segments`](Self::with_max_segments). More than
/// [`MAX_SYNAPSING_SEGMENTS`] segments after the cap is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvlcCrossover {
    matcher: SegmentMatcher,
    max_segments: Option<usize>,
}

impl SvlcCrossover {
    pub fn new(matcher: SegmentMatcher) -> Self {
        Self {
            matcher,
            max_segments: None,
        }
    }

    /// Keep only the `max` longest segments before enumerating children.
    pub fn with_max_segments(mut self, max: usize) -> Self {
        self.max_segments = Some(max);
        self
    }

    pub fn matcher(&self) -> &SegmentMatcher {
        &self.matcher
    }

    pub fn max_segments(&self) -> Option<usize> {
        self.max_segments
    }

    /// Synapsing segments between two gene sequences, after applying the cap.
    pub fn segments<G: PartialEq>(&self, a: &[G], b: &[G]) -> Result<Vec<CommonSegment>, CrossoverError> {
        let mut segments = self.matcher.find(a, b)?;

        if let Some(max) = self.max_segments {
            if segments.len() > max {
                // Stable sort keeps earlier segments on equal length.
                segments.sort_by(|x, y| y.length.cmp(&x.length));
                segments.truncate(max);
                segments.sort_by_key(|s| s.index_in_a);
            }
        }

        Ok(segments)
    }
}

/// Gap `i` of a parent: the genes between segment `i - 1` and segment `i`.
fn gap(segments: &[CommonSegment], i: usize, len: usize, in_a: bool) -> Range<usize> {
    let start = match i {
        0 => 0,
        _ if in_a => segments[i - 1].end_in_a(),
        _ => segments[i - 1].end_in_b(),
    };
    let end = match segments.get(i) {
        None => len,
        Some(seg) if in_a => seg.start_in_a(),
        Some(seg) => seg.start_in_b(),
    };

    let start = start.min(len);
    start..end.clamp(start, len)
}

/// Genes of the child selected by `pattern`: bit `i` set takes gap `i` from B.
fn child_genes<G: Clone>(a: &[G], b: &[G], segments: &[CommonSegment], pattern: u64) -> Vec<G> {
    let mut genes = Vec::with_capacity(a.len().max(b.len()));

    for i in 0..=segments.len() {
        let from_b = pattern & (1 << i) != 0;
        if from_b {
            genes.extend_from_slice(&b[gap(segments, i, b.len(), false)]);
        } else {
            genes.extend_from_slice(&a[gap(segments, i, a.len(), true)]);
        }

        if let Some(seg) = segments.get(i) {
            genes.extend_from_slice(&a[seg.range_in_a()]);
        }
    }

    genes
}

impl<C: Chromosome> Crossover<C> for SvlcCrossover {
    fn parents_number(&self) -> usize {
        2
    }

    fn cross(&self, parents: &[C], _rng: &mut dyn RngCore) -> Result<Vec<C>, CrossoverError> {
        let [parent_a, parent_b] = parents else {
            return Err(CrossoverError::ParentCount {
                expected: 2,
                actual: parents.len(),
            });
        };

        let a = parent_a.genes();
        let b = parent_b.genes();
        let segments = self.segments(a, b)?;

        if segments.len() > MAX_SYNAPSING_SEGMENTS {
            return Err(CrossoverError::TooManySegments {
                segments: segments.len(),
                max: MAX_SYNAPSING_SEGMENTS,
            });
        }
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let all_from_b: u64 = (1 << (segments.len() + 1)) - 1;
        (1..all_from_b)
            .map(|pattern| -> Result<C, CrossoverError> {
                let genes = child_genes(a, b, &segments, pattern);
                let mut child = parent_a.create_new();
                child.resize(genes.len());
                child.replace_genes(0, &genes)?;
                Ok(child)
            })
            .collect()
    }
}

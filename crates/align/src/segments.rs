//! Recursive extraction of disjoint common segments.

use crate::error::AlignError;
use crate::table::{LcsTable, TableView};
use crate::DEFAULT_MINIMUM_COMMON_LENGTH;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A maximal matching run shared by two sequences.
///
/// `index_in_a` and `index_in_b` are the positions at which the run *ends*
/// (inclusive), as reported by the LCS table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommonSegment {
    pub length: usize,
    pub index_in_a: usize,
    pub index_in_b: usize,
}

impl CommonSegment {
    pub fn new(length: usize, index_in_a: usize, index_in_b: usize) -> Self {
        Self {
            length,
            index_in_a,
            index_in_b,
        }
    }

    /// First position of the run in sequence A.
    #[inline]
    pub fn start_in_a(&self) -> usize {
        self.index_in_a + 1 - self.length
    }

    /// One past the last position of the run in sequence A.
    #[inline]
    pub fn end_in_a(&self) -> usize {
        self.index_in_a + 1
    }

    /// First position of the run in sequence B.
    #[inline]
    pub fn start_in_b(&self) -> usize {
        self.index_in_b + 1 - self.length
    }

    /// One past the last position of the run in sequence B.
    #[inline]
    pub fn end_in_b(&self) -> usize {
        self.index_in_b + 1
    }

    #[inline]
    pub fn range_in_a(&self) -> Range<usize> {
        self.start_in_a()..self.end_in_a()
    }

    #[inline]
    pub fn range_in_b(&self) -> Range<usize> {
        self.start_in_b()..self.end_in_b()
    }
}

/// Finds synapsing segments longer than a configured minimum.
///
/// # Examples
///
/// ```
/// use coevo_align::SegmentMatcher;
///
/// let matcher = SegmentMatcher::new(2);
/// let segments = matcher.find(b"XBBBCY", b"ZBBBCY").unwrap();
///
/// assert_eq!(segments.len(), 1);
/// assert_eq!(segments[0].range_in_a(), 1..6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMatcher {
    minimum_common_length: usize,
}

impl Default for SegmentMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_COMMON_LENGTH)
    }
}

impl SegmentMatcher {
    /// Segments must be strictly longer than `minimum_common_length`.
    pub fn new(minimum_common_length: usize) -> Self {
        Self {
            minimum_common_length,
        }
    }

    pub fn minimum_common_length(&self) -> usize {
        self.minimum_common_length
    }

    /// Ordered, non-overlapping common segments of `a` and `b`.
    pub fn find<T: PartialEq>(&self, a: &[T], b: &[T]) -> Result<Vec<CommonSegment>, AlignError> {
        let table = LcsTable::build(a, b)?;
        Ok(self.find_in_table(&table))
    }

    /// Same as [`find`](Self::find) for a table that has already been built.
    pub fn find_in_table(&self, table: &LcsTable) -> Vec<CommonSegment> {
        let mut segments = Vec::new();
        self.extract(&table.full_view(), &mut segments);
        segments
    }

    /// Emits left region, the view's longest run, then right region.
    fn extract(&self, view: &TableView<'_>, out: &mut Vec<CommonSegment>) {
        let max = view.max_cell();
        if max.length <= self.minimum_common_length {
            return;
        }

        let segment = CommonSegment::new(max.length, max.row, max.col);

        let left = view.sub_view(
            view.rows.start..segment.start_in_a(),
            view.cols.start..segment.start_in_b(),
        );
        if self.is_searchable(&left) {
            self.extract(&left, out);
        }

        out.push(segment);

        let right = view.sub_view(
            segment.end_in_a()..view.rows.end,
            segment.end_in_b()..view.cols.end,
        );
        if self.is_searchable(&right) {
            self.extract(&right, out);
        }
    }

    /// A region can only hold a segment if both sides exceed the minimum.
    fn is_searchable(&self, view: &TableView<'_>) -> bool {
        view.height() > self.minimum_common_length && view.width() > self.minimum_common_length
    }
}

/// Convenience wrapper around [`SegmentMatcher::find`].
pub fn find_common_segments<T: PartialEq>(
    a: &[T],
    b: &[T],
    minimum_common_length: usize,
) -> Result<Vec<CommonSegment>, AlignError> {
    SegmentMatcher::new(minimum_common_length).find(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn assert_well_formed<T: PartialEq + std::fmt::Debug>(
        a: &[T],
        b: &[T],
        segments: &[CommonSegment],
        min: usize,
    ) {
        for seg in segments {
            assert!(seg.length > min, "segment {seg:?} is not longer than {min}");
            assert!(seg.start_in_a() >= 1 && seg.start_in_b() >= 1);
            assert_eq!(&a[seg.range_in_a()], &b[seg.range_in_b()]);
        }
        for pair in segments.windows(2) {
            assert!(pair[0].end_in_a() <= pair[1].start_in_a(), "overlap in A: {pair:?}");
            assert!(pair[0].end_in_b() <= pair[1].start_in_b(), "overlap in B: {pair:?}");
        }
    }

    #[test]
    fn test_boundary_policy_single_segment() {
        let segments = find_common_segments(b"XBBBCY", b"ZBBBCY", 2).unwrap();

        assert_eq!(segments.len(), 1);
        let seg = segments[0];
        assert!(seg.length >= 3);
        assert_ne!(seg.start_in_a(), 0);
        assert_ne!(seg.start_in_b(), 0);
        assert_eq!(seg, CommonSegment::new(5, 5, 5));
    }

    #[test]
    fn test_match_at_sequence_start_is_not_credited() {
        // Identical sequences: the run can only be counted from index 1.
        let segments = find_common_segments(b"ABCDEFG", b"ABCDEFG", 4).unwrap();

        assert_eq!(segments, vec![CommonSegment::new(6, 6, 6)]);
        assert_eq!(segments[0].range_in_a(), 1..7);
    }

    #[test]
    fn test_no_segment_at_or_below_minimum() {
        // Longest run (after index 0) is exactly 4 characters.
        let segments = find_common_segments(b"xABCDy", b"zABCDw", 4).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn test_empty_inputs() {
        assert!(find_common_segments::<u8>(&[], &[], 0).unwrap().is_empty());
        assert!(find_common_segments(b"", b"ABCDEF", 1).unwrap().is_empty());
    }

    #[test]
    fn test_three_segments_in_order() {
        let a = b"_ABCDEF12GHIJKL345MNOPQR";
        let b = b"-ABCDEF9GHIJKL88MNOPQR77";
        let segments = find_common_segments(a, b, 4).unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(&a[segments[0].range_in_a()], b"ABCDEF");
        assert_eq!(&a[segments[1].range_in_a()], b"GHIJKL");
        assert_eq!(&a[segments[2].range_in_a()], b"MNOPQR");
        assert_well_formed(a, b, &segments, 4);
    }

    #[test]
    fn test_crossed_segments_keep_only_consistent_order() {
        // ABCDEF precedes UVWXYZ in A but follows it in B: only one can be kept.
        let a = b"_ABCDEFGH__UVWXYZ";
        let b = b"_UVWXYZ__ABCDEFGH";
        let segments = find_common_segments(a, b, 4).unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(&a[segments[0].range_in_a()], b"ABCDEFGH");
        assert_well_formed(a, b, &segments, 4);
    }

    #[test]
    fn test_random_sequences_are_ordered_and_disjoint() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);

        for round in 0..50 {
            let len_a = rng.random_range(0..120);
            let len_b = rng.random_range(0..120);
            let a: Vec<u8> = (0..len_a).map(|_| rng.random_range(0..2)).collect();
            let b: Vec<u8> = (0..len_b).map(|_| rng.random_range(0..2)).collect();
            let min = round % 5;

            let segments = find_common_segments(&a, &b, min).unwrap();
            assert_well_formed(&a, &b, &segments, min);
        }
    }

    #[test]
    fn test_matcher_default_minimum() {
        let matcher = SegmentMatcher::default();
        assert_eq!(matcher.minimum_common_length(), DEFAULT_MINIMUM_COMMON_LENGTH);
    }
}

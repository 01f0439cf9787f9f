use crate::error::AlignError;
use std::ops::Range;

/// Longest-common-substring table between two sequences.
///
/// `get(i, j)` is the length of the matching run that ends at `a[i]` and
/// `b[j]`. Row 0 and column 0 are always zero: a match at the first position
/// of either sequence is never credited, so a run can only start at index 1
/// or later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LcsTable {
    rows: usize,
    cols: usize,
    cells: Vec<usize>,
}

impl LcsTable {
    /// Build the table for `a` (rows) against `b` (columns).
    pub fn build<T: PartialEq>(a: &[T], b: &[T]) -> Result<Self, AlignError> {
        let rows = a.len();
        let cols = b.len();
        let size = rows
            .checked_mul(cols)
            .ok_or(AlignError::TableTooLarge { rows, cols })?;

        let mut cells = vec![0usize; size];
        for i in 1..rows {
            for j in 1..cols {
                if a[i] == b[j] {
                    cells[i * cols + j] = cells[(i - 1) * cols + (j - 1)] + 1;
                }
            }
        }

        Ok(Self { rows, cols, cells })
    }

    /// Number of rows (length of the first sequence).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (length of the second sequence).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Run length ending at `(i, j)`, or `None` outside the table.
    pub fn get(&self, i: usize, j: usize) -> Option<usize> {
        if i < self.rows && j < self.cols {
            Some(self.cells[i * self.cols + j])
        } else {
            None
        }
    }

    /// A view over the whole table.
    pub(crate) fn full_view(&self) -> TableView<'_> {
        TableView {
            table: self,
            rows: 0..self.rows,
            cols: 0..self.cols,
        }
    }
}

/// Rectangular window into an [`LcsTable`] addressed in absolute coordinates.
#[derive(Debug, Clone)]
pub(crate) struct TableView<'a> {
    table: &'a LcsTable,
    pub(crate) rows: Range<usize>,
    pub(crate) cols: Range<usize>,
}

/// Strongest cell found by [`TableView::max_cell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MaxCell {
    pub(crate) row: usize,
    pub(crate) col: usize,
    pub(crate) length: usize,
}

impl<'a> TableView<'a> {
    pub(crate) fn height(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn width(&self) -> usize {
        self.cols.len()
    }

    /// Narrow the view to `rows` x `cols`, intersected with the current bounds.
    pub(crate) fn sub_view(&self, rows: Range<usize>, cols: Range<usize>) -> TableView<'a> {
        let row_start = rows.start.max(self.rows.start);
        let row_end = rows.end.min(self.rows.end).max(row_start);
        let col_start = cols.start.max(self.cols.start);
        let col_end = cols.end.min(self.cols.end).max(col_start);

        TableView {
            table: self.table,
            rows: row_start..row_end,
            cols: col_start..col_end,
        }
    }

    /// Run length at `(i, j)` counting only the part of the run inside the view.
    #[inline]
    fn clipped(&self, i: usize, j: usize) -> usize {
        let raw = self.table.cells[i * self.table.cols + j];
        raw.min(i - self.rows.start + 1).min(j - self.cols.start + 1)
    }

    /// First strictly-greatest cell in row-major order.
    pub(crate) fn max_cell(&self) -> MaxCell {
        let mut best = MaxCell {
            row: self.rows.start,
            col: self.cols.start,
            length: 0,
        };

        for i in self.rows.clone() {
            for j in self.cols.clone() {
                let length = self.clipped(i, j);
                if length > best.length {
                    best = MaxCell { row: i, col: j, length };
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_row_and_column_are_never_credited() {
        let table = LcsTable::build(b"AAA", b"AAA").unwrap();

        for k in 0..3 {
            assert_eq!(table.get(0, k), Some(0));
            assert_eq!(table.get(k, 0), Some(0));
        }
        assert_eq!(table.get(1, 1), Some(1));
        assert_eq!(table.get(2, 2), Some(2));
        assert_eq!(table.get(2, 1), Some(1));
    }

    #[test]
    fn test_get_out_of_range() {
        let table = LcsTable::build(b"AB", b"ABC").unwrap();
        assert_eq!(table.rows(), 2);
        assert_eq!(table.cols(), 3);
        assert_eq!(table.get(2, 0), None);
        assert_eq!(table.get(0, 3), None);
    }

    #[test]
    fn test_empty_sequences() {
        let table = LcsTable::build::<u8>(&[], b"ABC").unwrap();
        assert_eq!(table.rows(), 0);
        assert_eq!(table.full_view().max_cell().length, 0);
    }

    #[test]
    fn test_max_cell_prefers_first_in_row_major_order() {
        // Two runs of length 2: one ending at (2, 2), one ending at (5, 5).
        let table = LcsTable::build(b"xABxCD", b"yAByCD").unwrap();
        let max = table.full_view().max_cell();

        assert_eq!(max, MaxCell { row: 2, col: 2, length: 2 });
    }

    #[test]
    fn test_sub_view_clips_runs_entering_from_outside() {
        let table = LcsTable::build(b"xABCDE", b"yABCDE").unwrap();
        assert_eq!(table.get(5, 5), Some(5));

        let view = table.full_view().sub_view(3..6, 3..6);
        let max = view.max_cell();

        // Only C, D, E lie inside the window.
        assert_eq!(max, MaxCell { row: 5, col: 5, length: 3 });
    }

    #[test]
    fn test_sub_view_is_intersected_with_parent() {
        let table = LcsTable::build(b"abcd", b"abcd").unwrap();
        let view = table.full_view().sub_view(2..10, 3..1);

        assert_eq!(view.rows, 2..4);
        assert_eq!(view.height(), 2);
        assert_eq!(view.width(), 0);
    }
}

//! Dense source × target score matrices, one per partition.

use serde::Serialize;

use crate::concept::ConceptKind;
use crate::error::MatrixError;
use crate::mapping::Relation;

/// One above-threshold cell, as seen by the extractor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub row: usize,
    pub col: usize,
    pub score: f64,
}

/// Dense score matrix over one partition.
///
/// Cells hold `Some(score)` with `score ∈ [0, 1]`, or `None` for pairs that
/// were never scored or were excluded by the measure. Row and column order
/// follow the concept lists the matrix was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    kind: ConceptKind,
    relation: Relation,
    rows: usize,
    cols: usize,
    cells: Vec<Option<f64>>,
}

impl SimilarityMatrix {
    /// An all-unset matrix of equivalence scores.
    pub fn new(kind: ConceptKind, rows: usize, cols: usize) -> Self {
        Self {
            kind,
            relation: Relation::Equivalence,
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    /// Assemble from scored rows. Each row must have `cols` cells; short
    /// rows are padded with unset cells and long rows truncated.
    pub fn from_rows(kind: ConceptKind, cols: usize, rows: Vec<Vec<Option<f64>>>) -> Self {
        let n_rows = rows.len();
        let mut cells = Vec::with_capacity(n_rows * cols);
        for mut row in rows {
            row.resize(cols, None);
            cells.extend(row);
        }
        Self {
            kind,
            relation: Relation::Equivalence,
            rows: n_rows,
            cols,
            cells,
        }
    }

    /// Tag the relation every cell of this matrix asserts.
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relation = relation;
        self
    }

    pub fn kind(&self) -> ConceptKind {
        self.kind
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize, MatrixError> {
        if row >= self.rows || col >= self.cols {
            return Err(MatrixError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(row * self.cols + col)
    }

    /// The score at `(row, col)`; `None` if unset or out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let offset = self.offset(row, col).ok()?;
        self.cells[offset]
    }

    /// Set a cell. Scores must lie in `[0, 1]`.
    pub fn set(&mut self, row: usize, col: usize, score: f64) -> Result<(), MatrixError> {
        if !(0.0..=1.0).contains(&score) {
            return Err(MatrixError::ScoreOutOfRange { value: score });
        }
        let offset = self.offset(row, col)?;
        self.cells[offset] = Some(score);
        Ok(())
    }

    /// Reset a cell to unset.
    pub fn unset(&mut self, row: usize, col: usize) -> Result<(), MatrixError> {
        let offset = self.offset(row, col)?;
        self.cells[offset] = None;
        Ok(())
    }

    /// Number of cells holding a score.
    pub fn scored_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Number of cells never scored or excluded.
    pub fn unset_count(&self) -> usize {
        self.cells.len() - self.scored_count()
    }

    /// Cells with `score >= threshold`, in row-major order.
    pub fn candidates(&self, threshold: f64) -> Vec<Candidate> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| {
                let score = (*cell)?;
                (score >= threshold).then_some(Candidate {
                    row: i / self.cols,
                    col: i % self.cols,
                    score,
                })
            })
            .collect()
    }

    /// Summary counts for logs and reports.
    pub fn stats(&self, threshold: f64) -> MatrixStats {
        let scored = self.scored_count();
        MatrixStats {
            kind: self.kind,
            rows: self.rows,
            cols: self.cols,
            scored,
            unset: self.cells.len() - scored,
            above_threshold: self.candidates(threshold).len(),
        }
    }
}

/// Cell counts of one matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatrixStats {
    pub kind: ConceptKind,
    pub rows: usize,
    pub cols: usize,
    pub scored: usize,
    pub unset: usize,
    pub above_threshold: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_matrix_is_all_unset() {
        let m = SimilarityMatrix::new(ConceptKind::Class, 2, 3);
        assert_eq!(m.unset_count(), 6);
        assert_eq!(m.get(1, 2), None);
    }

    #[test]
    fn set_and_get_roundtrip_with_bounds() {
        let mut m = SimilarityMatrix::new(ConceptKind::Class, 2, 2);
        m.set(1, 0, 0.4).unwrap();
        assert_eq!(m.get(1, 0), Some(0.4));
        assert!(matches!(m.set(2, 0, 0.1), Err(MatrixError::OutOfBounds { .. })));
        assert!(matches!(
            m.set(0, 0, 1.5),
            Err(MatrixError::ScoreOutOfRange { .. })
        ));
        m.unset(1, 0).unwrap();
        assert_eq!(m.get(1, 0), None);
    }

    #[test]
    fn unset_differs_from_zero_score() {
        let m = SimilarityMatrix::from_rows(
            ConceptKind::Property,
            2,
            vec![vec![Some(0.0), None], vec![Some(0.9), Some(0.5)]],
        );
        assert_eq!(m.scored_count(), 3);
        assert_eq!(m.unset_count(), 1);
        assert_eq!(m.get(0, 0), Some(0.0));
        assert_eq!(m.get(0, 1), None);
    }

    #[test]
    fn candidates_are_row_major_and_inclusive() {
        let m = SimilarityMatrix::from_rows(
            ConceptKind::Class,
            2,
            vec![vec![Some(0.5), Some(0.7)], vec![Some(0.69), None]],
        );
        let c = m.candidates(0.5);
        let cells: Vec<(usize, usize)> = c.iter().map(|c| (c.row, c.col)).collect();
        assert_eq!(cells, [(0, 0), (0, 1), (1, 0)]);
        assert_eq!(m.stats(0.7).above_threshold, 1);
    }

    #[test]
    fn from_rows_pads_short_rows() {
        let m = SimilarityMatrix::from_rows(ConceptKind::Class, 3, vec![vec![Some(1.0)]]);
        assert_eq!(m.rows(), 1);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.unset_count(), 2);
    }
}

//! Sparse boolean matrix: the single substrate every algorithm in this crate
//! is expressed over.
//!
//! Storage is CSR (`row_ptr`/`col_idx`, no value array since every stored
//! entry is implicitly `true`). Construction goes through [`BoolMatrixBuilder`],
//! a DOK-style scratch buffer (`HashSet<(row, col)>`) that is cheap to mutate
//! one entry at a time; `build()` sorts and compacts it into CSR once, which
//! is the representation every algebraic operation below is written against.
//! A handful of call sites (`set`, `or_assign`) need to mutate an already-built
//! matrix; they do so by decompressing to row sets, mutating, and
//! recompressing — acceptable here because those call sites are always on the
//! cold construction path, never inside the hot fixed-point loops, which only
//! ever call `mxm`/`kronecker`/`nonzero_pairs` against already-built matrices.

use std::collections::BTreeSet;

/// A sparse `rows x cols` boolean matrix in CSR form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseBoolMatrix {
    rows: usize,
    cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
}

/// DOK-style construction buffer: cheap random-access `set`, compiled to CSR
/// via [`BoolMatrixBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct BoolMatrixBuilder {
    entries: BTreeSet<(usize, usize)>,
}

impl BoolMatrixBuilder {
    #[must_use]
    pub fn new() -> Self {
        BoolMatrixBuilder::default()
    }

    pub fn set(&mut self, i: usize, j: usize) -> &mut Self {
        self.entries.insert((i, j));
        self
    }

    #[must_use]
    pub fn build(&self, rows: usize, cols: usize) -> SparseBoolMatrix {
        SparseBoolMatrix::from_entries(rows, cols, self.entries.iter().copied())
    }
}

impl SparseBoolMatrix {
    /// The all-zero `rows x cols` matrix.
    #[must_use]
    pub fn empty(rows: usize, cols: usize) -> Self {
        SparseBoolMatrix {
            rows,
            cols,
            row_ptr: vec![0; rows + 1],
            col_idx: Vec::new(),
        }
    }

    /// The `n x n` identity matrix.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::with_capacity(n);
        for i in 0..n {
            row_ptr.push(i);
            col_idx.push(i);
        }
        row_ptr.push(n);
        SparseBoolMatrix {
            rows: n,
            cols: n,
            row_ptr,
            col_idx,
        }
    }

    /// Build a matrix directly from an (i, j) entry iterator; entries may be
    /// given in any order and may repeat.
    #[must_use]
    pub fn from_entries(
        rows: usize,
        cols: usize,
        entries: impl IntoIterator<Item = (usize, usize)>,
    ) -> Self {
        let mut per_row: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); rows];
        for (i, j) in entries {
            assert!(i < rows && j < cols, "entry ({i}, {j}) out of bounds for {rows}x{cols}");
            per_row[i].insert(j);
        }
        Self::from_row_sets(rows, cols, per_row)
    }

    fn from_row_sets(rows: usize, cols: usize, per_row: Vec<BTreeSet<usize>>) -> Self {
        let mut row_ptr = Vec::with_capacity(rows + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);
        for row in per_row {
            col_idx.extend(row.into_iter());
            row_ptr.push(col_idx.len());
        }
        SparseBoolMatrix {
            rows,
            cols,
            row_ptr,
            col_idx,
        }
    }

    fn to_row_sets(&self) -> Vec<BTreeSet<usize>> {
        (0..self.rows).map(|i| self.row(i).iter().copied().collect()).collect()
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> bool {
        self.row(i).binary_search(&j).is_ok()
    }

    /// Set `(i, j)` to `true` in place. See the module-level note on why this
    /// decompresses/recompresses rather than inserting directly into CSR.
    pub fn set(&mut self, i: usize, j: usize) {
        assert!(i < self.rows && j < self.cols, "index out of bounds");
        if self.get(i, j) {
            return;
        }
        let mut per_row = self.to_row_sets();
        per_row[i].insert(j);
        *self = Self::from_row_sets(self.rows, self.cols, per_row);
    }

    /// Column indices set in row `i`, in ascending order.
    #[must_use]
    pub fn row(&self, i: usize) -> &[usize] {
        &self.col_idx[self.row_ptr[i]..self.row_ptr[i + 1]]
    }

    /// Row indices that have a nonzero in column `j`.
    #[must_use]
    pub fn col(&self, j: usize) -> Vec<usize> {
        (0..self.rows).filter(|&i| self.get(i, j)).collect()
    }

    /// Number of stored (true) entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// All `(i, j)` with a `true` entry, row-major order.
    pub fn nonzero_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.rows).flat_map(move |i| self.row(i).iter().map(move |&j| (i, j)))
    }

    /// Element-wise OR of `other` into `self`. Returns whether `nnz`
    /// increased (used by fixed-point loops to detect convergence without a
    /// separate equality check).
    ///
    /// # Panics
    /// Panics if shapes differ.
    pub fn or_assign(&mut self, other: &SparseBoolMatrix) -> bool {
        assert_eq!(self.shape(), other.shape(), "or_assign shape mismatch");
        let before = self.nnz();
        let mut per_row = self.to_row_sets();
        for i in 0..self.rows {
            per_row[i].extend(other.row(i).iter().copied());
        }
        *self = Self::from_row_sets(self.rows, self.cols, per_row);
        self.nnz() > before
    }

    /// Boolean matrix product `self . other` (OR-of-ANDs).
    ///
    /// # Panics
    /// Panics if `self.cols() != other.rows()`.
    #[must_use]
    pub fn mxm(&self, other: &SparseBoolMatrix) -> SparseBoolMatrix {
        assert_eq!(
            self.cols, other.rows,
            "mxm: inner dimensions must agree ({} vs {})",
            self.cols, other.rows
        );
        let mut per_row: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.rows];
        for i in 0..self.rows {
            let mut acc: BTreeSet<usize> = BTreeSet::new();
            for &k in self.row(i) {
                acc.extend(other.row(k).iter().copied());
            }
            per_row[i] = acc;
        }
        Self::from_row_sets(self.rows, other.cols, per_row)
    }

    /// Kronecker product `self (x) other`, shape `(rows1*rows2, cols1*cols2)`.
    #[must_use]
    pub fn kronecker(&self, other: &SparseBoolMatrix) -> SparseBoolMatrix {
        let (r1, c1) = self.shape();
        let (r2, c2) = other.shape();
        let out_rows = r1 * r2;
        let out_cols = c1 * c2;
        let mut entries = Vec::with_capacity(self.nnz() * other.nnz());
        for (i1, j1) in self.nonzero_pairs() {
            for (i2, j2) in other.nonzero_pairs() {
                entries.push((i1 * r2 + i2, j1 * c2 + j2));
            }
        }
        SparseBoolMatrix::from_entries(out_rows, out_cols, entries)
    }

    /// Block-diagonal placement: `self` top-left, `other` bottom-right,
    /// off-diagonal blocks zero. Shape `(rows1+rows2, cols1+cols2)`.
    #[must_use]
    pub fn block_diag(&self, other: &SparseBoolMatrix) -> SparseBoolMatrix {
        let (r1, c1) = self.shape();
        let (r2, c2) = other.shape();
        let mut entries: Vec<(usize, usize)> = self.nonzero_pairs().collect();
        entries.extend(other.nonzero_pairs().map(|(i, j)| (i + r1, j + c1)));
        SparseBoolMatrix::from_entries(r1 + r2, c1 + c2, entries)
    }

    /// Element-wise OR, returning a new matrix (non-mutating sibling of
    /// [`or_assign`](Self::or_assign)).
    #[must_use]
    pub fn or(&self, other: &SparseBoolMatrix) -> SparseBoolMatrix {
        let mut out = self.clone();
        out.or_assign(other);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_matrix_has_no_nonzeros() {
        let m = SparseBoolMatrix::empty(3, 4);
        assert_eq!(m.shape(), (3, 4));
        assert_eq!(m.nnz(), 0);
    }

    #[test]
    fn identity_diagonal_only() {
        let m = SparseBoolMatrix::identity(3);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(m.get(i, j), i == j);
            }
        }
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut m = SparseBoolMatrix::empty(2, 2);
        m.set(0, 1);
        assert!(m.get(0, 1));
        assert!(!m.get(1, 0));
        assert_eq!(m.nnz(), 1);
    }

    #[test]
    fn or_assign_reports_growth() {
        let mut a = SparseBoolMatrix::empty(2, 2);
        a.set(0, 0);
        let mut b = SparseBoolMatrix::empty(2, 2);
        b.set(0, 0);
        b.set(1, 1);
        assert!(a.or_assign(&b));
        assert_eq!(a.nnz(), 2);
        assert!(!a.or_assign(&b));
    }

    #[test]
    fn mxm_is_boolean_or_of_ands() {
        // path: 0->1, 1->2 ; product should have 0->2
        let mut a = SparseBoolMatrix::empty(3, 3);
        a.set(0, 1);
        let mut b = SparseBoolMatrix::empty(3, 3);
        b.set(1, 2);
        let p = a.mxm(&b);
        assert!(p.get(0, 2));
        assert_eq!(p.nnz(), 1);
    }

    #[test]
    fn kronecker_shape_and_entries() {
        let mut a = SparseBoolMatrix::empty(2, 2);
        a.set(0, 1);
        let mut b = SparseBoolMatrix::empty(2, 2);
        b.set(1, 0);
        let k = a.kronecker(&b);
        assert_eq!(k.shape(), (4, 4));
        // (0,1) x (1,0) -> row 0*2+1=1, col 1*2+0=2
        assert!(k.get(1, 2));
        assert_eq!(k.nnz(), 1);
    }

    #[test]
    fn block_diag_keeps_blocks_separate() {
        let mut a = SparseBoolMatrix::empty(2, 2);
        a.set(0, 1);
        let mut b = SparseBoolMatrix::empty(2, 2);
        b.set(1, 0);
        let d = a.block_diag(&b);
        assert_eq!(d.shape(), (4, 4));
        assert!(d.get(0, 1));
        assert!(d.get(3, 2));
        assert!(!d.get(0, 2));
        assert!(!d.get(2, 1));
    }

    #[test]
    fn zero_dimension_matrix_ops_do_not_panic() {
        let a = SparseBoolMatrix::empty(0, 0);
        let b = SparseBoolMatrix::empty(0, 0);
        assert_eq!(a.mxm(&b).nnz(), 0);
        assert_eq!(a.kronecker(&b).shape(), (0, 0));
    }

    proptest! {
        #[test]
        fn or_is_commutative_and_idempotent(
            entries_a in prop::collection::vec((0usize..6, 0usize..6), 0..10),
            entries_b in prop::collection::vec((0usize..6, 0usize..6), 0..10),
        ) {
            let a = SparseBoolMatrix::from_entries(6, 6, entries_a.into_iter());
            let b = SparseBoolMatrix::from_entries(6, 6, entries_b.into_iter());
            prop_assert_eq!(a.or(&b), b.or(&a));
            prop_assert_eq!(a.or(&a), a.clone());
        }

        #[test]
        fn mxm_never_sets_an_entry_outside_its_declared_shape(
            entries_a in prop::collection::vec((0usize..5, 0usize..5), 0..8),
            entries_b in prop::collection::vec((0usize..5, 0usize..5), 0..8),
        ) {
            let a = SparseBoolMatrix::from_entries(5, 5, entries_a.into_iter());
            let b = SparseBoolMatrix::from_entries(5, 5, entries_b.into_iter());
            let product = a.mxm(&b);
            prop_assert_eq!(product.shape(), (5, 5));
            for (i, j) in product.nonzero_pairs() {
                prop_assert!(i < 5 && j < 5);
            }
        }
    }
}

//! Small dense linear algebra for the Newton solver
//!
//! Models here have at most a dozen parameters, so plain row-major storage
//! with Cholesky factorisation is sufficient.

/// Square matrix in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix {
    size: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    /// Matrix of zeros
    #[must_use]
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            data: vec![0.0; size * size],
        }
    }

    /// Number of rows (and columns)
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Element at row `i`, column `j`
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.size + j]
    }

    /// Set the element at row `i`, column `j`
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.size + j] = value;
    }

    /// Main diagonal
    #[must_use]
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.size).map(|i| self.get(i, i)).collect()
    }

    /// Whether every element is finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// Lower-triangular Cholesky factor `L` with `A = L Lᵀ`
#[derive(Debug, Clone)]
pub struct Cholesky {
    lower: SquareMatrix,
}

impl Cholesky {
    /// Factorise a symmetric matrix; `None` unless it is positive definite
    #[must_use]
    pub fn factorize(matrix: &SquareMatrix) -> Option<Self> {
        let n = matrix.size();
        let mut lower = SquareMatrix::zeros(n);

        for j in 0..n {
            let mut diag = matrix.get(j, j);
            for k in 0..j {
                diag -= lower.get(j, k) * lower.get(j, k);
            }
            if !diag.is_finite() || diag <= 0.0 {
                return None;
            }
            let pivot = diag.sqrt();
            lower.set(j, j, pivot);

            for i in (j + 1)..n {
                let mut value = matrix.get(i, j);
                for k in 0..j {
                    value -= lower.get(i, k) * lower.get(j, k);
                }
                lower.set(i, j, value / pivot);
            }
        }

        Some(Self { lower })
    }

    /// Solve `A x = b`
    #[must_use]
    pub fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let n = self.lower.size();

        // Forward substitution: L y = b
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut value = rhs[i];
            for k in 0..i {
                value -= self.lower.get(i, k) * y[k];
            }
            y[i] = value / self.lower.get(i, i);
        }

        // Back substitution: Lᵀ x = y
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut value = y[i];
            for k in (i + 1)..n {
                value -= self.lower.get(k, i) * x[k];
            }
            x[i] = value / self.lower.get(i, i);
        }
        x
    }

    /// Inverse of the factorised matrix
    #[must_use]
    pub fn inverse(&self) -> SquareMatrix {
        let n = self.lower.size();
        let mut inverse = SquareMatrix::zeros(n);
        let mut unit = vec![0.0; n];
        for j in 0..n {
            unit.iter_mut().for_each(|v| *v = 0.0);
            unit[j] = 1.0;
            for (i, value) in self.solve(&unit).into_iter().enumerate() {
                inverse.set(i, j, value);
            }
        }
        inverse
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Indices of columns that are linearly independent of the columns before them
///
/// Columns are screened left to right with Gram-Schmidt (two passes of
/// re-orthogonalisation). A column is rejected when the norm of its residual
/// falls below `tolerance` times its own norm, or when it is identically zero.
#[must_use]
pub fn independent_columns(columns: &[Vec<f64>], tolerance: f64) -> Vec<usize> {
    let mut basis: Vec<Vec<f64>> = Vec::new();
    let mut kept = Vec::new();

    for (idx, column) in columns.iter().enumerate() {
        let norm = dot(column, column).sqrt();
        if norm == 0.0 || !norm.is_finite() {
            continue;
        }

        let mut residual = column.clone();
        for _ in 0..2 {
            for q in &basis {
                let projection = dot(q, &residual);
                residual
                    .iter_mut()
                    .zip(q)
                    .for_each(|(r, qi)| *r -= projection * qi);
            }
        }

        let residual_norm = dot(&residual, &residual).sqrt();
        if residual_norm > tolerance * norm {
            residual.iter_mut().for_each(|r| *r /= residual_norm);
            basis.push(residual);
            kept.push(idx);
        }
    }

    kept
}

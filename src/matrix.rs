//! Dense decimal matrix kernel.
//!
//! Row-major `f64` matrix backed by `ndarray`. `multiply` is a plain
//! triple-loop product with no numerical stabilisation, rather than
//! delegating to `ndarray::Array2::dot`.

use ndarray::Array2;

use crate::error::{SimError, SimResult};
use crate::interrupt::{NeverInterrupt, YieldCheck};

#[derive(Debug, Clone, PartialEq)]
pub struct DecimalMatrix {
    data: Array2<f64>,
}

impl DecimalMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
        }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> SimResult<Self> {
        if rows.is_empty() {
            return Ok(Self::zeros(0, 0));
        }
        let cols = rows[0].len();
        if rows.iter().any(|r| r.len() != cols) {
            return Err(SimError::shape_mismatch(
                "from_rows: all rows must have equal length",
            ));
        }
        let mut data = Array2::zeros((rows.len(), cols));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, v) in row.into_iter().enumerate() {
                data[[i, j]] = v;
            }
        }
        Ok(Self { data })
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[[row, col]]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[[row, col]] = value;
    }

    pub fn row_subset(&self, row: usize) -> SimResult<Self> {
        if row >= self.rows() {
            return Err(SimError::invalid_argument(format!(
                "row_subset: row {row} out of range (0..{})",
                self.rows()
            )));
        }
        let mut out = Self::zeros(1, self.cols());
        for j in 0..self.cols() {
            out.data[[0, j]] = self.data[[row, j]];
        }
        Ok(out)
    }

    pub fn multiply(&self, other: &Self) -> SimResult<Self> {
        self.multiply_yielding(other, &mut NeverInterrupt)
    }

    pub fn multiply_yielding(&self, other: &Self, yield_check: &mut dyn YieldCheck) -> SimResult<Self> {
        if self.cols() != other.rows() {
            return Err(SimError::shape_mismatch(format!(
                "multiply: {}x{} incompatible with {}x{}",
                self.rows(),
                self.cols(),
                other.rows(),
                other.cols()
            )));
        }
        let mut out = Self::zeros(self.rows(), other.cols());
        for i in 0..self.rows() {
            yield_check.check()?;
            for j in 0..other.cols() {
                let mut sum = 0.0;
                for k in 0..self.cols() {
                    sum += self.data[[i, k]] * other.data[[k, j]];
                }
                out.data[[i, j]] = sum;
            }
        }
        Ok(out)
    }

    pub fn add_into(&mut self, other: &Self) -> SimResult<()> {
        if self.rows() != other.rows() || self.cols() != other.cols() {
            return Err(SimError::shape_mismatch(format!(
                "add_into: {}x{} incompatible with {}x{}",
                self.rows(),
                self.cols(),
                other.rows(),
                other.cols()
            )));
        }
        self.data += &other.data;
        Ok(())
    }

    /// Returns the matrix to the zero-sized sentinel state. Idempotent.
    /// `Drop` already reclaims the backing storage; this exists so callers
    /// can release a matrix explicitly and check `is_freed` afterwards.
    pub fn free(&mut self) {
        self.data = Array2::zeros((0, 0));
    }

    pub fn is_freed(&self) -> bool {
        self.rows() == 0 && self.cols() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_has_requested_shape_and_all_zero() {
        let m = DecimalMatrix::zeros(2, 3);
        assert_eq!((m.rows(), m.cols()), (2, 3));
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(m.get(i, j), 0.0);
            }
        }
    }

    #[test]
    fn row_subset_copies_the_requested_row() {
        let m = DecimalMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let sub = m.row_subset(1).unwrap();
        assert_eq!((sub.rows(), sub.cols()), (1, 2));
        assert_eq!(sub.get(0, 0), 3.0);
        assert_eq!(sub.get(0, 1), 4.0);
    }

    #[test]
    fn row_subset_out_of_range_fails() {
        let m = DecimalMatrix::zeros(2, 2);
        assert!(m.row_subset(5).is_err());
    }

    #[test]
    fn multiply_computes_standard_product() {
        let a = DecimalMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let b = DecimalMatrix::from_rows(vec![vec![5.0, 6.0], vec![7.0, 8.0]]).unwrap();
        let c = a.multiply(&b).unwrap();
        assert_eq!(c.get(0, 0), 19.0);
        assert_eq!(c.get(0, 1), 22.0);
        assert_eq!(c.get(1, 0), 43.0);
        assert_eq!(c.get(1, 1), 50.0);
    }

    #[test]
    fn multiply_shape_mismatch_fails() {
        let a = DecimalMatrix::zeros(2, 3);
        let b = DecimalMatrix::zeros(2, 3);
        assert!(a.multiply(&b).is_err());
    }

    #[test]
    fn add_into_accumulates_in_place() {
        let mut a = DecimalMatrix::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        let b = DecimalMatrix::from_rows(vec![vec![10.0, 20.0]]).unwrap();
        a.add_into(&b).unwrap();
        assert_eq!(a.get(0, 0), 11.0);
        assert_eq!(a.get(0, 1), 22.0);
    }

    #[test]
    fn free_leaves_zero_sized_sentinel() {
        let mut m = DecimalMatrix::zeros(4, 4);
        m.free();
        assert!(m.is_freed());
        m.free();
        assert!(m.is_freed());
    }
}

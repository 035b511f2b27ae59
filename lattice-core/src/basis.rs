//! Arbitrary-precision integer lattice bases.

use std::fmt;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::LatticeError;

/// A lattice basis as a list of integer row vectors.
///
/// Every row has the same length and the basis has at least one row. The type
/// is immutable: reductions and row operations produce a new basis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatticeBasis {
    rows: Vec<Vec<BigInt>>,
}

/// A floating-point view of a basis, used by the in-process approximations.
pub type FloatBasis = Vec<Vec<f64>>;

impl LatticeBasis {
    /// Build a basis from row vectors, rejecting empty or ragged input.
    pub fn from_rows(rows: Vec<Vec<BigInt>>) -> Result<Self, LatticeError> {
        let first = rows.first().ok_or(LatticeError::EmptyBasis)?;
        let dimension = first.len();
        if dimension == 0 {
            return Err(LatticeError::EmptyBasis);
        }
        if let Some((row, bad)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != dimension)
        {
            return Err(LatticeError::RaggedBasis {
                row,
                expected: dimension,
                found: bad.len(),
            });
        }
        Ok(Self { rows })
    }

    /// Convenience constructor from small integer rows.
    pub fn from_i64_rows(rows: &[Vec<i64>]) -> Result<Self, LatticeError> {
        Self::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|&v| BigInt::from(v)).collect())
                .collect(),
        )
    }

    /// Number of basis vectors.
    pub fn rank(&self) -> usize {
        self.rows.len()
    }

    /// Length of each basis vector (dimension of the ambient space).
    pub fn dimension(&self) -> usize {
        self.rows[0].len()
    }

    pub fn rows(&self) -> &[Vec<BigInt>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &[BigInt] {
        &self.rows[index]
    }

    pub fn into_rows(self) -> Vec<Vec<BigInt>> {
        self.rows
    }

    /// Exact squared Euclidean norm of row `index`.
    pub fn squared_norm(&self, index: usize) -> BigInt {
        squared_norm(&self.rows[index])
    }

    /// Index of the shortest row, ties broken by the lowest index.
    pub fn shortest_row(&self) -> (usize, BigInt) {
        let mut best = (0, self.squared_norm(0));
        for i in 1..self.rank() {
            let norm = self.squared_norm(i);
            if norm < best.1 {
                best = (i, norm);
            }
        }
        best
    }

    /// Exact Gram matrix G = B * B^T.
    pub fn gram_matrix(&self) -> Vec<Vec<BigInt>> {
        let n = self.rank();
        let mut gram = vec![vec![BigInt::zero(); n]; n];
        for i in 0..n {
            for j in 0..=i {
                let dot = inner_product(&self.rows[i], &self.rows[j]);
                gram[j][i] = dot.clone();
                gram[i][j] = dot;
            }
        }
        gram
    }

    /// Lossy f64 view of the basis.
    ///
    /// Entries beyond f64 range become infinite.
    pub fn to_float(&self) -> FloatBasis {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| {
                        v.to_f64().unwrap_or(if v.is_negative() {
                            f64::NEG_INFINITY
                        } else {
                            f64::INFINITY
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// Largest entry bit length, used to decide whether f64 arithmetic is exact.
    pub fn max_entry_bits(&self) -> u64 {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .map(|v| v.bits())
            .max()
            .unwrap_or(0)
    }

    /// New basis with rows reordered by `order` (a permutation of `0..rank`).
    pub fn permuted(&self, order: &[usize]) -> Result<Self, LatticeError> {
        let mut seen = vec![false; self.rank()];
        if order.len() != self.rank() {
            return Err(LatticeError::InvalidParameter(format!(
                "permutation has {} entries, basis has rank {}",
                order.len(),
                self.rank()
            )));
        }
        for &i in order {
            if i >= self.rank() || seen[i] {
                return Err(LatticeError::InvalidParameter(format!(
                    "{:?} is not a permutation of 0..{}",
                    order,
                    self.rank()
                )));
            }
            seen[i] = true;
        }
        Ok(Self {
            rows: order.iter().map(|&i| self.rows[i].clone()).collect(),
        })
    }

    /// New basis with `row[target] += factor * row[source]`, a unimodular step.
    pub fn with_row_added(
        &self,
        target: usize,
        source: usize,
        factor: &BigInt,
    ) -> Result<Self, LatticeError> {
        if target >= self.rank() || source >= self.rank() || target == source {
            return Err(LatticeError::InvalidParameter(format!(
                "cannot add row {} into row {} of a rank-{} basis",
                source,
                target,
                self.rank()
            )));
        }
        let mut rows = self.rows.clone();
        let addend: Vec<BigInt> = rows[source].iter().map(|v| v * factor).collect();
        for (entry, add) in rows[target].iter_mut().zip(addend) {
            *entry += add;
        }
        Ok(Self { rows })
    }

    /// New basis with row `index` negated.
    pub fn with_row_negated(&self, index: usize) -> Result<Self, LatticeError> {
        if index >= self.rank() {
            return Err(LatticeError::InvalidParameter(format!(
                "row {} out of range for rank {}",
                index,
                self.rank()
            )));
        }
        let mut rows = self.rows.clone();
        for entry in rows[index].iter_mut() {
            *entry = -&*entry;
        }
        Ok(Self { rows })
    }
}

impl fmt::Display for LatticeBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LatticeBasis ({}x{}):", self.rank(), self.dimension())?;
        for (i, row) in self.rows.iter().enumerate() {
            write!(f, "  b_{}: [", i)?;
            for (j, x) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", x)?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

/// Exact inner product of two integer vectors.
pub fn inner_product(a: &[BigInt], b: &[BigInt]) -> BigInt {
    a.iter()
        .zip(b.iter())
        .fold(BigInt::zero(), |acc, (x, y)| acc + x * y)
}

/// Exact squared Euclidean norm of an integer vector.
pub fn squared_norm(v: &[BigInt]) -> BigInt {
    inner_product(v, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_ragged_rows() {
        let err = LatticeBasis::from_i64_rows(&[vec![1, 2], vec![3]]).unwrap_err();
        assert!(matches!(
            err,
            LatticeError::RaggedBasis {
                row: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            LatticeBasis::from_rows(vec![]),
            Err(LatticeError::EmptyBasis)
        ));
        assert!(matches!(
            LatticeBasis::from_rows(vec![vec![]]),
            Err(LatticeError::EmptyBasis)
        ));
    }

    #[test]
    fn test_gram_matrix_is_symmetric() {
        let basis = LatticeBasis::from_i64_rows(&[vec![1, 2, 3], vec![-4, 5, 6]]).unwrap();
        let gram = basis.gram_matrix();
        assert_eq!(gram[0][0], BigInt::from(14));
        assert_eq!(gram[1][1], BigInt::from(77));
        assert_eq!(gram[0][1], BigInt::from(24));
        assert_eq!(gram[0][1], gram[1][0]);
    }

    #[test]
    fn test_row_operations_do_not_mutate_original() {
        let basis = LatticeBasis::from_i64_rows(&[vec![2, 0], vec![0, 3]]).unwrap();
        let added = basis.with_row_added(0, 1, &BigInt::from(1)).unwrap();
        assert_eq!(added.row(0), &[BigInt::from(2), BigInt::from(3)]);
        assert_eq!(basis.row(0), &[BigInt::from(2), BigInt::from(0)]);

        let negated = basis.with_row_negated(1).unwrap();
        assert_eq!(negated.row(1), &[BigInt::from(0), BigInt::from(-3)]);

        assert!(basis.permuted(&[0, 0]).is_err());
        let swapped = basis.permuted(&[1, 0]).unwrap();
        assert_eq!(swapped.row(0), basis.row(1));
    }

    #[test]
    fn test_to_float_saturates_huge_entries() {
        let huge: BigInt = BigInt::from(1) << 2000;
        let basis = LatticeBasis::from_rows(vec![vec![huge.clone(), BigInt::from(3)], vec![-huge, BigInt::from(-1)]])
            .unwrap();
        let float = basis.to_float();
        assert_eq!(float[0], vec![f64::INFINITY, 3.0]);
        assert_eq!(float[1], vec![f64::NEG_INFINITY, -1.0]);
    }

    #[test]
    fn test_shortest_row() {
        let basis =
            LatticeBasis::from_i64_rows(&[vec![5, 5], vec![1, -1], vec![0, 2]]).unwrap();
        let (index, norm) = basis.shortest_row();
        assert_eq!(index, 1);
        assert_eq!(norm, BigInt::from(2));
    }
}

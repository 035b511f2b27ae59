//! Lattice covolume: sqrt(det(B * B^T)).
//!
//! [`volume`] is exact: the Gram determinant is computed over the integers by
//! fraction-free (Bareiss) elimination, and the square root is taken in
//! arbitrary precision. [`approximate_volume`] is a fast f64 path and is
//! labeled as such everywhere it is used.

use std::fmt;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, ToPrimitive, Zero};

use crate::LatticeBasis;

/// Exact lattice volume, stored as its square det(B * B^T).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    gram_determinant: BigUint,
}

impl Volume {
    pub fn from_gram_determinant(gram_determinant: BigUint) -> Self {
        Self { gram_determinant }
    }

    /// det(B * B^T), the exact square of the volume.
    pub fn squared(&self) -> &BigUint {
        &self.gram_determinant
    }

    /// Zero for linearly dependent rows.
    pub fn is_zero(&self) -> bool {
        self.gram_determinant.is_zero()
    }

    /// floor(volume).
    pub fn floor(&self) -> BigUint {
        self.gram_determinant.sqrt()
    }

    /// Whether the volume is an integer (always true for full-rank square bases).
    pub fn is_integral(&self) -> bool {
        let root = self.floor();
        &root * &root == self.gram_determinant
    }

    /// log2(volume). Negative infinity for a zero volume.
    pub fn log2(&self) -> f64 {
        0.5 * log2_biguint(&self.gram_determinant)
    }

    /// Nearest f64, or infinity when the volume exceeds f64 range.
    pub fn to_f64(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        self.log2().exp2()
    }

    /// Decimal expansion truncated to `digits` fractional digits.
    pub fn to_decimal_string(&self, digits: usize) -> String {
        let scale = BigUint::from(10u32).pow(2 * digits as u32);
        let scaled_root = (&self.gram_determinant * scale).sqrt().to_string();
        if digits == 0 {
            return scaled_root;
        }
        let padded = format!("{:0>width$}", scaled_root, width = digits + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - digits);
        format!("{}.{}", int_part, frac_part)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integral() {
            write!(f, "{}", self.floor())
        } else {
            write!(f, "{}", self.to_decimal_string(6))
        }
    }
}

/// log2 of an arbitrary-precision unsigned integer, accurate to f64 precision.
pub fn log2_biguint(x: &BigUint) -> f64 {
    let bits = x.bits();
    if bits <= 64 {
        return x.to_u64().map_or(f64::NAN, |v| (v as f64).log2());
    }
    let shift = bits - 64;
    let top = (x >> shift).to_u64().unwrap_or(u64::MAX);
    (top as f64).log2() + shift as f64
}

/// Determinant of a square integer matrix by Bareiss fraction-free elimination.
///
/// Every intermediate division is exact, so no rational arithmetic is needed.
pub fn bareiss_determinant(mut a: Vec<Vec<BigInt>>) -> BigInt {
    let n = a.len();
    if n == 0 {
        return BigInt::one();
    }

    let mut negate = false;
    let mut prev = BigInt::one();

    for k in 0..n - 1 {
        if a[k][k].is_zero() {
            match (k + 1..n).find(|&i| !a[i][k].is_zero()) {
                Some(i) => {
                    a.swap(k, i);
                    negate = !negate;
                }
                None => return BigInt::zero(),
            }
        }

        let pivot_row = a[k].clone();
        let pivot = &pivot_row[k];
        for row in a.iter_mut().skip(k + 1) {
            let factor = row[k].clone();
            for j in k + 1..n {
                row[j] = (&row[j] * pivot - &factor * &pivot_row[j]) / &prev;
            }
            row[k] = BigInt::zero();
        }
        prev = pivot_row[k].clone();
    }

    let det = a[n - 1][n - 1].clone();
    if negate {
        -det
    } else {
        det
    }
}

/// Exact volume sqrt(det(B * B^T)).
pub fn volume(basis: &LatticeBasis) -> Volume {
    let det = bareiss_determinant(basis.gram_matrix());
    // A Gram determinant is never negative over the integers.
    let gram_determinant = match det.into_parts() {
        (Sign::Minus, _) => BigUint::zero(),
        (_, magnitude) => magnitude,
    };
    log::debug!(
        "exact volume for rank {}: log2 = {:.4}",
        basis.rank(),
        0.5 * log2_biguint(&gram_determinant)
    );
    Volume::from_gram_determinant(gram_determinant)
}

/// Approximate volume via f64 Gaussian elimination on the Gram matrix.
///
/// Fast but lossy: once the rank exceeds roughly 40-50 the accumulated
/// rounding error can dominate, and the computed determinant of a
/// (numerically) singular Gram matrix can come out as a tiny negative number
/// such as -1e-9. The determinant is clamped to its absolute value before the
/// square root so the result is always a non-negative (approximate) volume.
pub fn approximate_volume(basis: &LatticeBasis) -> f64 {
    let rows = basis.to_float();
    let n = rows.len();
    let mut g: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| rows[i].iter().zip(&rows[j]).map(|(x, y)| x * y).sum())
                .collect()
        })
        .collect();

    let mut det = 1.0;
    for k in 0..n {
        let pivot = (k..n)
            .max_by(|&a, &b| g[a][k].abs().total_cmp(&g[b][k].abs()))
            .unwrap_or(k);
        if g[pivot][k] == 0.0 {
            return 0.0;
        }
        if pivot != k {
            g.swap(pivot, k);
            det = -det;
        }
        det *= g[k][k];
        let (head, tail) = g.split_at_mut(k + 1);
        let pivot_row = &head[k];
        for row in tail.iter_mut() {
            let factor = row[k] / pivot_row[k];
            for j in k..n {
                row[j] -= factor * pivot_row[j];
            }
        }
    }

    det.abs().sqrt()
}

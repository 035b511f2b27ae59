//! Random lattice basis generation.
//!
//! All sampling goes through a caller-supplied `Rng + CryptoRng`; the
//! `*_os` helpers draw from the operating system's secure source.

use num_bigint::{BigInt, RandBigInt};
use num_traits::{One, Signed, Zero};
use rand::rngs::OsRng;
use rand::{CryptoRng, Rng};

use crate::{LatticeBasis, LatticeError};

/// Half-open integer range `[low, high)` for uniformly sampled entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRange {
    low: BigInt,
    high: BigInt,
}

impl EntryRange {
    /// Entries in `[-bound, bound]`.
    pub fn symmetric(bound: impl Into<BigInt>) -> Self {
        let bound = bound.into();
        Self {
            low: -&bound,
            high: bound + 1,
        }
    }

    /// Entries in `[0, bound)`.
    pub fn non_negative(bound: impl Into<BigInt>) -> Self {
        Self {
            low: BigInt::zero(),
            high: bound.into(),
        }
    }

    pub fn low(&self) -> &BigInt {
        &self.low
    }

    /// Exclusive upper end.
    pub fn high(&self) -> &BigInt {
        &self.high
    }

    fn validate(&self) -> Result<(), LatticeError> {
        if self.low >= self.high {
            return Err(LatticeError::InvalidParameter(format!(
                "entry range [{}, {}) is empty",
                self.low, self.high
            )));
        }
        Ok(())
    }

    fn sample<R: Rng + CryptoRng + ?Sized>(&self, rng: &mut R) -> BigInt {
        rng.gen_bigint_range(&self.low, &self.high)
    }
}

impl Default for EntryRange {
    fn default() -> Self {
        Self::symmetric(100)
    }
}

/// Build the (m+n) x (m+n) q-ary basis `[[q*I_m, A], [0, I_n]]` with A an
/// m x n matrix drawn uniformly from `[0, q)`.
pub fn qary_basis<R: Rng + CryptoRng + ?Sized>(
    n: usize,
    m: usize,
    q: &BigInt,
    rng: &mut R,
) -> Result<LatticeBasis, LatticeError> {
    if n < 1 || m < 1 {
        return Err(LatticeError::InvalidParameter(format!(
            "q-ary basis needs n >= 1 and m >= 1, got n={}, m={}",
            n, m
        )));
    }
    if !q.is_positive() {
        return Err(LatticeError::InvalidParameter(format!(
            "modulus q must be positive, got {}",
            q
        )));
    }

    let size = m + n;
    let entries = EntryRange::non_negative(q.clone());
    let mut rows = vec![vec![BigInt::zero(); size]; size];

    for (i, row) in rows.iter_mut().enumerate().take(m) {
        row[i] = q.clone();
        for cell in row[m..].iter_mut() {
            *cell = entries.sample(rng);
        }
    }
    for i in 0..n {
        rows[m + i][m + i] = BigInt::one();
    }

    LatticeBasis::from_rows(rows)
}

/// [`qary_basis`] with the operating system's random source.
pub fn qary_basis_os(n: usize, m: usize, q: &BigInt) -> Result<LatticeBasis, LatticeError> {
    qary_basis(n, m, q, &mut OsRng)
}

/// Square `rank` x `rank` basis with entries drawn uniformly from `range`.
///
/// Such a matrix is non-singular with overwhelming probability for ranges
/// wider than a handful of values, which makes it a "hard" unstructured lattice.
pub fn random_basis<R: Rng + CryptoRng + ?Sized>(
    rank: usize,
    range: &EntryRange,
    rng: &mut R,
) -> Result<LatticeBasis, LatticeError> {
    if rank < 1 {
        return Err(LatticeError::InvalidParameter(
            "random basis needs rank >= 1".to_string(),
        ));
    }
    range.validate()?;

    let rows = (0..rank)
        .map(|_| (0..rank).map(|_| range.sample(rng)).collect())
        .collect();
    LatticeBasis::from_rows(rows)
}

/// [`random_basis`] with the operating system's random source.
pub fn random_basis_os(rank: usize, range: &EntryRange) -> Result<LatticeBasis, LatticeError> {
    random_basis(rank, range, &mut OsRng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn check_qary_structure(basis: &LatticeBasis, n: usize, m: usize, q: &BigInt) {
        assert_eq!(basis.rank(), m + n);
        assert_eq!(basis.dimension(), m + n);
        for i in 0..m + n {
            for j in 0..m + n {
                let v = &basis.row(i)[j];
                if i < m && j < m {
                    let expected = if i == j { q.clone() } else { BigInt::zero() };
                    assert_eq!(v, &expected, "top-left block at ({}, {})", i, j);
                } else if i < m {
                    assert!(!v.is_negative() && v < q, "A entry {} out of [0, q)", v);
                } else if j < m {
                    assert!(v.is_zero(), "bottom-left block at ({}, {})", i, j);
                } else {
                    let expected = if i == j { BigInt::one() } else { BigInt::zero() };
                    assert_eq!(v, &expected, "bottom-right block at ({}, {})", i, j);
                }
            }
        }
    }

    #[test]
    fn test_qary_block_structure() {
        let mut rng = StdRng::seed_from_u64(7);
        for (n, m, q) in [(1, 1, 2u32), (3, 5, 131), (5, 3, 17), (30, 30, 131)] {
            let q = BigInt::from(q);
            let basis = qary_basis(n, m, &q, &mut rng).unwrap();
            check_qary_structure(&basis, n, m, &q);
        }
    }

    #[test]
    fn test_qary_with_huge_modulus() {
        let mut rng = StdRng::seed_from_u64(11);
        let q: BigInt = "340282366920938463463374607431768211507".parse().unwrap();
        let basis = qary_basis(4, 4, &q, &mut rng).unwrap();
        check_qary_structure(&basis, 4, 4, &q);
    }

    #[test]
    fn test_qary_rejects_bad_parameters() {
        let mut rng = StdRng::seed_from_u64(1);
        let q = BigInt::from(131);
        assert!(qary_basis(0, 3, &q, &mut rng).is_err());
        assert!(qary_basis(3, 0, &q, &mut rng).is_err());
        assert!(qary_basis(3, 3, &BigInt::zero(), &mut rng).is_err());
        assert!(qary_basis(3, 3, &BigInt::from(-5), &mut rng).is_err());
    }

    #[test]
    fn test_qary_modulus_one_has_zero_block() {
        let mut rng = StdRng::seed_from_u64(3);
        let basis = qary_basis(2, 2, &BigInt::one(), &mut rng).unwrap();
        for i in 0..2 {
            assert!(basis.row(i)[2..].iter().all(|v| v.is_zero()));
        }
    }

    #[test]
    fn test_random_basis_ranges() {
        let mut rng = StdRng::seed_from_u64(5);
        let symmetric = EntryRange::symmetric(100);
        let basis = random_basis(12, &symmetric, &mut rng).unwrap();
        assert_eq!(basis.rank(), 12);
        assert_eq!(basis.dimension(), 12);
        let bound = BigInt::from(100);
        for row in basis.rows() {
            assert!(row.iter().all(|v| v.abs() <= bound));
        }

        let one_sided = EntryRange::non_negative(10);
        let basis = random_basis(8, &one_sided, &mut rng).unwrap();
        for row in basis.rows() {
            assert!(row.iter().all(|v| !v.is_negative() && *v < BigInt::from(10)));
        }
    }

    #[test]
    fn test_random_basis_rejects_bad_parameters() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(random_basis(0, &EntryRange::default(), &mut rng).is_err());
        assert!(random_basis(3, &EntryRange::non_negative(0), &mut rng).is_err());
    }

    #[test]
    fn test_os_source_entry_points() {
        let basis = qary_basis_os(2, 3, &BigInt::from(131)).unwrap();
        check_qary_structure(&basis, 2, 3, &BigInt::from(131));
        assert_eq!(random_basis_os(4, &EntryRange::default()).unwrap().rank(), 4);
    }
}

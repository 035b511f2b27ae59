//! Floating-point Gram-Schmidt, LLL and basis quality metrics.
//!
//! These are in-process approximations over an f64 view of a basis. They are
//! adequate for small entries and moderate ranks; authoritative reductions
//! come from the external engine.

use crate::basis::FloatBasis;

/// Quality metrics for a lattice basis.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BasisQuality {
    /// Hermite factor: ||b_1|| / det(L)^(1/n).
    pub hermite_factor: f64,
    /// Orthogonality defect: product(||b_i||) / det(L). Equals 1 for an
    /// orthogonal basis.
    pub orthogonality_defect: f64,
    /// Euclidean norm of the first basis vector.
    pub first_vector_norm: f64,
}

/// LLL parameters.
#[derive(Debug, Clone)]
pub struct LllParams {
    /// Lovász condition parameter (typically 0.75)
    pub delta: f64,
}

impl Default for LllParams {
    fn default() -> Self {
        Self { delta: 0.75 }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Gram-Schmidt orthogonalization.
///
/// Returns the orthogonal vectors b_i* and the coefficients mu[i][j].
pub fn gram_schmidt(basis: &FloatBasis) -> (FloatBasis, Vec<Vec<f64>>) {
    let n = basis.len();
    let mut ortho = basis.clone();
    let mut mu = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..i {
            let dot_jj = dot(&ortho[j], &ortho[j]);
            mu[i][j] = if dot_jj > 1e-10 {
                dot(&basis[i], &ortho[j]) / dot_jj
            } else {
                0.0
            };
            let (done, rest) = ortho.split_at_mut(i);
            for (x, y) in rest[0].iter_mut().zip(&done[j]) {
                *x -= mu[i][j] * y;
            }
        }
    }

    (ortho, mu)
}

/// Squared norms ||b_i*||^2 of the Gram-Schmidt vectors.
pub fn gso_squared_norms(basis: &FloatBasis) -> Vec<f64> {
    let (ortho, _mu) = gram_schmidt(basis);
    ortho.iter().map(|v| dot(v, v)).collect()
}

/// LLL lattice basis reduction, in place.
pub fn lll_reduce(basis: &mut FloatBasis, params: &LllParams) {
    let n = basis.len();
    if n < 2 {
        return;
    }

    let mut k = 1;
    while k < n {
        let (ortho, mut mu) = gram_schmidt(basis);

        // Size reduction; mu[k][l] for l < j shifts with each subtraction.
        for j in (0..k).rev() {
            if mu[k][j].abs() > 0.5 {
                let r = mu[k][j].round();
                let (head, tail) = basis.split_at_mut(k);
                for (x, y) in tail[0].iter_mut().zip(&head[j]) {
                    *x -= r * y;
                }
                for l in 0..j {
                    mu[k][l] -= r * mu[j][l];
                }
                mu[k][j] -= r;
            }
        }

        // Size reduction leaves the b_i* untouched.
        let norm_k = dot(&ortho[k], &ortho[k]);
        let norm_k1 = dot(&ortho[k - 1], &ortho[k - 1]);

        if norm_k >= (params.delta - mu[k][k - 1].powi(2)) * norm_k1 {
            k += 1;
        } else {
            basis.swap(k, k - 1);
            k = (k - 1).max(1);
        }
    }
}

/// Compute quality metrics for a basis.
///
/// The determinant is the product of the Gram-Schmidt norms, accumulated in
/// log space.
pub fn basis_quality(basis: &FloatBasis) -> BasisQuality {
    let n = basis.len();
    if n == 0 {
        return BasisQuality {
            hermite_factor: 0.0,
            orthogonality_defect: 0.0,
            first_vector_norm: 0.0,
        };
    }

    let (ortho, _mu) = gram_schmidt(basis);
    let norms: Vec<f64> = basis.iter().map(|row| dot(row, row).sqrt()).collect();
    let ortho_norms: Vec<f64> = ortho.iter().map(|row| dot(row, row).sqrt()).collect();

    let first_vector_norm = norms[0];
    let log_det: f64 = ortho_norms.iter().map(|norm| norm.ln()).sum();
    let det_root_n = (log_det / n as f64).exp();

    let hermite_factor = if det_root_n > 1e-15 {
        first_vector_norm / det_root_n
    } else {
        f64::INFINITY
    };

    let log_product_norms: f64 = norms.iter().map(|norm| norm.ln()).sum();
    let orthogonality_defect = (log_product_norms - log_det).exp();

    BasisQuality {
        hermite_factor,
        orthogonality_defect,
        first_vector_norm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f64]) -> f64 {
        dot(v, v).sqrt()
    }

    #[test]
    fn test_gram_schmidt_orthogonal() {
        let basis = vec![
            vec![3.0, 1.0, 0.0],
            vec![2.0, 2.0, 1.0],
            vec![0.0, 1.0, 4.0],
        ];
        let (ortho, _mu) = gram_schmidt(&basis);
        for i in 0..3 {
            for j in 0..i {
                assert!(dot(&ortho[i], &ortho[j]).abs() < 1e-9);
            }
        }
        assert_eq!(ortho[0], basis[0]);
    }

    #[test]
    fn test_gso_norms_product_is_determinant() {
        // det = 2 * 3, so the product of squared GSO norms is 36.
        let basis = vec![vec![2.0, 3.0], vec![0.0, 3.0]];
        let norms = gso_squared_norms(&basis);
        assert!((norms.iter().product::<f64>() - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_lll_simple() {
        let mut basis = vec![
            vec![1.0, 1.0, 1.0],
            vec![-1.0, 0.0, 2.0],
            vec![3.0, 5.0, 6.0],
        ];
        let before = gso_squared_norms(&basis).iter().product::<f64>();
        lll_reduce(&mut basis, &LllParams::default());

        assert!(dot(&basis[0], &basis[0]) < 20.0);
        // Reduction is unimodular: the lattice determinant is unchanged.
        let after = gso_squared_norms(&basis).iter().product::<f64>();
        assert!((before - after).abs() < 1e-6 * before);
    }

    #[test]
    fn test_lll_finds_short_vector_in_skewed_basis() {
        let mut basis = vec![vec![1.0, 0.0], vec![1000.0, 1.0]];
        lll_reduce(&mut basis, &LllParams::default());
        assert!(norm(&basis[0]) <= 1.0 + 1e-9);
        assert!(norm(&basis[1]) <= 1.0 + 1e-9);
    }

    #[test]
    fn test_basis_quality_identity() {
        let identity = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let quality = basis_quality(&identity);
        assert!((quality.hermite_factor - 1.0).abs() < 1e-10);
        assert!((quality.orthogonality_defect - 1.0).abs() < 1e-10);
        assert!((quality.first_vector_norm - 1.0).abs() < 1e-10);

        let skewed = vec![
            vec![1.0, 1.0, 0.0],
            vec![0.0, 1.0, 1.0],
            vec![1.0, 0.0, 1.0],
        ];
        assert!(basis_quality(&skewed).orthogonality_defect >= 1.0 - 1e-10);
    }
}

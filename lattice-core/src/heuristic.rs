//! Gaussian Heuristic: predicted length of a shortest nonzero lattice vector.
//!
//! GH(L) = sqrt(n / (2 * pi * e)) * vol(L)^(1/n)

use std::f64::consts::{E, PI};

use crate::volume::Volume;
use crate::LatticeError;

fn check_rank(rank: usize) -> Result<(), LatticeError> {
    if rank < 1 {
        return Err(LatticeError::InvalidParameter(
            "Gaussian Heuristic needs rank >= 1".to_string(),
        ));
    }
    Ok(())
}

/// log2 of the rank-dependent factor sqrt(n / (2 * pi * e)).
fn log2_coefficient(rank: usize) -> f64 {
    0.5 * (rank as f64 / (2.0 * PI * E)).log2()
}

/// Gaussian Heuristic prediction from an f64 volume.
pub fn gaussian_heuristic(volume: f64, rank: usize) -> Result<f64, LatticeError> {
    check_rank(rank)?;
    if !(volume.is_finite() && volume > 0.0) {
        return Err(LatticeError::InvalidParameter(format!(
            "Gaussian Heuristic needs a finite positive volume, got {}",
            volume
        )));
    }
    let coefficient = (rank as f64 / (2.0 * PI * E)).sqrt();
    Ok(coefficient * volume.powf(1.0 / rank as f64))
}

/// log2 of the Gaussian Heuristic, given log2 of the volume.
///
/// Works for volumes far beyond f64 range.
pub fn gaussian_heuristic_log2(log2_volume: f64, rank: usize) -> Result<f64, LatticeError> {
    check_rank(rank)?;
    if !log2_volume.is_finite() {
        return Err(LatticeError::InvalidParameter(format!(
            "Gaussian Heuristic needs a finite positive volume, got log2 = {}",
            log2_volume
        )));
    }
    Ok(log2_coefficient(rank) + log2_volume / rank as f64)
}

/// Gaussian Heuristic prediction for an exact volume.
pub fn gaussian_heuristic_for(volume: &Volume, rank: usize) -> Result<f64, LatticeError> {
    if volume.is_zero() {
        return Err(LatticeError::InvalidParameter(
            "Gaussian Heuristic is undefined for a zero volume".to_string(),
        ));
    }
    Ok(gaussian_heuristic_log2(volume.log2(), rank)?.exp2())
}

//! Gaussian Heuristic and Geometric Series Assumption experiments.
//!
//! Each experiment row is independent: a row whose query fails records the
//! failure and the batch carries on.

use lattice_core::{
    basis_quality, gaussian_heuristic_for, qary_basis_os, random_basis_os, volume, BasisQuality, EntryRange,
};
use num_bigint::BigInt;
use rayon::prelude::*;
use reduction_oracle::{BackendKind, ErrorKind, OracleError, ReductionOracle, RelativeError, SvpOutcome};
use serde::Serialize;

/// Parameters for the Gaussian Heuristic sweep.
#[derive(Debug, Clone)]
pub struct GhConfig {
    pub n_min: usize,
    pub n_max: usize,
    pub n_step: usize,
    pub q: BigInt,
    /// Search radius as a multiple of the prediction.
    pub radius_factor: f64,
    /// Run rows on the rayon pool.
    pub parallel: bool,
}

impl Default for GhConfig {
    fn default() -> Self {
        Self {
            n_min: 30,
            n_max: 60,
            n_step: 2,
            q: BigInt::from(131),
            radius_factor: 1.5,
            parallel: false,
        }
    }
}

impl GhConfig {
    pub fn dimensions(&self) -> Vec<usize> {
        if self.n_step == 0 {
            return Vec::new();
        }
        (self.n_min..=self.n_max).step_by(self.n_step).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    Measured {
        squared_norm: f64,
        norm: f64,
        relative_error: RelativeError,
    },
    NotFound {
        radius: f64,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

impl RowOutcome {
    fn failed(err: &OracleError) -> Self {
        RowOutcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One dimension of the Gaussian Heuristic sweep (m = n, rank m + n).
#[derive(Debug, Clone, Serialize)]
pub struct GhRow {
    pub n: usize,
    pub m: usize,
    pub rank: usize,
    pub backend: BackendKind,
    pub log2_volume: Option<f64>,
    pub prediction: Option<f64>,
    pub outcome: RowOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct GhReport {
    pub backend: BackendKind,
    pub authoritative: bool,
    pub q: String,
    pub radius_factor: f64,
    pub rows: Vec<GhRow>,
}

impl GhReport {
    pub fn failures(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r.outcome, RowOutcome::Failed { .. }))
            .count()
    }
}

fn run_gh_row(oracle: &ReductionOracle, config: &GhConfig, n: usize) -> GhRow {
    let m = n;
    let mut row = GhRow {
        n,
        m,
        rank: m + n,
        backend: oracle.backend(),
        log2_volume: None,
        prediction: None,
        outcome: RowOutcome::NotFound { radius: 0.0 },
    };

    let basis = match qary_basis_os(n, m, &config.q) {
        Ok(basis) => basis,
        Err(e) => {
            row.outcome = RowOutcome::failed(&e.into());
            return row;
        }
    };
    let vol = volume(&basis);
    row.log2_volume = Some(vol.log2());

    let prediction = match gaussian_heuristic_for(&vol, row.rank) {
        Ok(p) => p,
        Err(e) => {
            row.outcome = RowOutcome::failed(&e.into());
            return row;
        }
    };
    row.prediction = Some(prediction);

    let radius = config.radius_factor * prediction;
    row.outcome = match oracle.query_shortest_vector(&basis, radius) {
        Ok(result) => match result.value {
            SvpOutcome::Found(found) => match found.relative_error(prediction) {
                Some(relative_error) => RowOutcome::Measured {
                    squared_norm: found.squared_norm,
                    norm: found.norm(),
                    relative_error,
                },
                None => RowOutcome::failed(&OracleError::ParseFailure(format!(
                    "squared norm {} has no relative error",
                    found.squared_norm
                ))),
            },
            SvpOutcome::NotFoundWithinRadius { radius } => RowOutcome::NotFound { radius },
        },
        Err(e) => {
            log::warn!("n={}: {}", n, e);
            RowOutcome::failed(&e)
        }
    };
    log::info!("n={} rank={} prediction={:.3} -> {:?}", n, row.rank, prediction, row.outcome);
    row
}

/// For each n in the configured range, build a q-ary basis with m = n, predict
/// its shortest vector with the Gaussian Heuristic, and measure it with the
/// oracle at `radius_factor` times the prediction.
pub fn run_gh_experiment(oracle: &ReductionOracle, config: &GhConfig) -> Result<GhReport, OracleError> {
    if config.n_step == 0 || config.n_min == 0 || config.n_min > config.n_max {
        return Err(OracleError::InvalidParameter(format!(
            "bad dimension range {}..={} step {}",
            config.n_min, config.n_max, config.n_step
        )));
    }
    if !(config.radius_factor.is_finite() && config.radius_factor > 0.0) {
        return Err(OracleError::InvalidParameter(format!(
            "radius factor must be positive, got {}",
            config.radius_factor
        )));
    }

    let dims = config.dimensions();
    let rows: Vec<GhRow> = if config.parallel {
        dims.par_iter().map(|&n| run_gh_row(oracle, config, n)).collect()
    } else {
        dims.iter().map(|&n| run_gh_row(oracle, config, n)).collect()
    };

    Ok(GhReport {
        backend: oracle.backend(),
        authoritative: oracle.backend().is_authoritative(),
        q: config.q.to_string(),
        radius_factor: config.radius_factor,
        rows,
    })
}

/// Parameters for the Geometric Series Assumption check.
#[derive(Debug, Clone)]
pub struct GsaConfig {
    pub rank: usize,
    /// Entries are drawn from [-bound, bound].
    pub bound: i64,
    pub block_size: usize,
}

impl Default for GsaConfig {
    fn default() -> Self {
        Self {
            rank: 30,
            bound: 100,
            block_size: 20,
        }
    }
}

/// Least-squares line through `(i, values[i])`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 1 for a perfect line.
    pub r_squared: f64,
}

pub fn fit_line(values: &[f64]) -> Option<LineFit> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    let slope = sxy / sxx;
    let r_squared = if syy == 0.0 { 1.0 } else { (sxy * sxy) / (sxx * syy) };
    Some(LineFit {
        slope,
        intercept: mean_y - slope * mean_x,
        r_squared,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GsaOutcome {
    Profile {
        log2_norms: Vec<f64>,
        non_increasing: bool,
        fit: Option<LineFit>,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct GsaReport {
    pub backend: BackendKind,
    pub authoritative: bool,
    pub rank: usize,
    pub block_size: usize,
    /// Quality of the unreduced input basis.
    pub input_quality: Option<BasisQuality>,
    pub outcome: GsaOutcome,
}

/// Reduce a random basis with block size `block_size` and report its
/// Gram-Schmidt profile, which the GSA predicts to be roughly linear.
pub fn run_gsa_experiment(oracle: &ReductionOracle, config: &GsaConfig) -> GsaReport {
    let mut report = GsaReport {
        backend: oracle.backend(),
        authoritative: oracle.backend().is_authoritative(),
        rank: config.rank,
        block_size: config.block_size,
        input_quality: None,
        outcome: GsaOutcome::Failed {
            kind: ErrorKind::InvalidParameter,
            message: String::new(),
        },
    };

    let result = random_basis_os(config.rank, &EntryRange::symmetric(config.bound))
        .map_err(OracleError::from)
        .and_then(|basis| {
            report.input_quality = Some(basis_quality(&basis.to_float()));
            oracle.query_reduced_profile(&basis, config.block_size)
        });

    report.outcome = match result {
        Ok(profile) => {
            let profile = profile.value;
            GsaOutcome::Profile {
                non_increasing: profile.is_non_increasing(1e-9),
                fit: fit_line(profile.log2_norms()),
                log2_norms: profile.log2_norms().to_vec(),
            }
        }
        Err(e) => {
            log::warn!("profile query failed: {}", e);
            GsaOutcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            }
        }
    };
    report
}

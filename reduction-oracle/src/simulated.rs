//! In-process stand-in for the reduction engine.
//!
//! Results are approximations and are always labeled
//! [`BackendKind::Simulated`]. The shortest-vector answer is the shortest
//! basis row, optionally after a floating-point LLL pass; the profile is one
//! Gram-Schmidt pass scaled by an artificial per-index decay.

use lattice_core::{gso_squared_norms, lll_reduce, squared_norm, LatticeBasis, LllParams};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};

use crate::oracle::{enter_phase, BackendKind, FoundVector, Profile, QueryPhase, ReductionBackend, SvpOutcome};
use crate::OracleError;

/// Entries above this many bits are not LLL-reduced in f64: intermediate
/// values could exceed the 53-bit mantissa and rounding back would no longer
/// give lattice vectors.
const MAX_LLL_ENTRY_BITS: u64 = 26;

#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Run a floating-point LLL pass with this delta before picking the
    /// shortest row. `None` keeps the input rows.
    pub lll_delta: Option<f64>,
    /// Per-index multiplier applied to the squared Gram-Schmidt norms.
    pub profile_decay: f64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            lll_delta: None,
            profile_decay: 0.99,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    config: SimulatedConfig,
}

impl SimulatedBackend {
    pub fn new(config: SimulatedConfig) -> Self {
        Self { config }
    }

    /// Candidate rows for the shortest-vector answer.
    fn candidate_rows(&self, basis: &LatticeBasis) -> Vec<Vec<BigInt>> {
        let delta = match self.config.lll_delta {
            Some(delta) if basis.max_entry_bits() <= MAX_LLL_ENTRY_BITS => delta,
            Some(_) => {
                log::debug!(
                    "simulated backend: entries of {} bits are too wide for f64 LLL, using input rows",
                    basis.max_entry_bits()
                );
                return basis.rows().to_vec();
            }
            None => return basis.rows().to_vec(),
        };

        let mut float = basis.to_float();
        lll_reduce(&mut float, &LllParams { delta });
        match round_rows(&float) {
            Some(rows) => rows,
            None => {
                log::warn!("simulated backend: LLL output was not integral, using input rows");
                basis.rows().to_vec()
            }
        }
    }
}

/// Convert reduced f64 rows back to integers, or `None` if any entry drifted
/// away from an integer.
fn round_rows(rows: &[Vec<f64>]) -> Option<Vec<Vec<BigInt>>> {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|&x| {
                    let r = x.round();
                    if (x - r).abs() > 1e-6 {
                        return None;
                    }
                    BigInt::from_f64(r)
                })
                .collect()
        })
        .collect()
}

impl ReductionBackend for SimulatedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Simulated
    }

    fn shortest_vector(&self, basis: &LatticeBasis, radius: f64) -> Result<SvpOutcome, OracleError> {
        enter_phase(self.kind(), QueryPhase::Invoking);
        let rows = self.candidate_rows(basis);

        enter_phase(self.kind(), QueryPhase::Parsing);
        let shortest = rows
            .into_iter()
            .map(|row| (squared_norm(&row), row))
            .filter(|(norm, _)| !norm.is_zero())
            .min_by(|a, b| a.0.cmp(&b.0));

        let Some((norm, vector)) = shortest else {
            return Ok(SvpOutcome::NotFoundWithinRadius { radius });
        };
        let squared = norm.to_f64().unwrap_or(f64::INFINITY);
        if squared > radius * radius {
            return Ok(SvpOutcome::NotFoundWithinRadius { radius });
        }
        Ok(SvpOutcome::Found(FoundVector {
            vector: Some(vector),
            squared_norm: squared,
        }))
    }

    fn reduced_profile(&self, basis: &LatticeBasis, _block_size: usize) -> Result<Profile, OracleError> {
        enter_phase(self.kind(), QueryPhase::Invoking);
        let norms = gso_squared_norms(&basis.to_float());

        enter_phase(self.kind(), QueryPhase::Parsing);
        let mut profile = Vec::with_capacity(norms.len());
        let mut scale = 1.0;
        for (i, norm) in norms.into_iter().enumerate() {
            let value = norm * scale;
            if !(value.is_finite() && value > 0.0) {
                return Err(OracleError::InvalidParameter(format!(
                    "basis is not full rank: Gram-Schmidt norm {} is {}",
                    i, norm
                )));
            }
            profile.push(0.5 * value.log2());
            scale *= self.config.profile_decay;
        }
        Ok(Profile::new(profile))
    }
}

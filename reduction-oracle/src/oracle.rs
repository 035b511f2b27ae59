//! The reduction oracle: backend-independent shortest-vector and
//! reduced-profile queries.
//!
//! Backends implement [`ReductionBackend`]. Callers go through
//! [`ReductionOracle`], which validates parameters, enforces the result
//! invariants shared by every backend, and labels each result with the backend
//! that produced it.

use std::fmt;
use std::str::FromStr;

use lattice_core::LatticeBasis;
use num_bigint::BigInt;
use serde::Serialize;

use crate::native::NativeConfig;
use crate::process::{ProcessBackend, ProcessConfig};
use crate::simulated::{SimulatedBackend, SimulatedConfig};
use crate::OracleError;

/// Which backend answered a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process approximation; never authoritative.
    #[default]
    Simulated,
    /// External engine run as a subprocess.
    Process,
    /// External engine called through its C library.
    Native,
}

impl BackendKind {
    /// Whether results come from the real reduction engine.
    pub fn is_authoritative(self) -> bool {
        !matches!(self, BackendKind::Simulated)
    }

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Simulated => "simulated",
            BackendKind::Process => "process",
            BackendKind::Native => "native",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Simulated => write!(f, "SIMULATED (non-authoritative)"),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl FromStr for BackendKind {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "sim" => Ok(BackendKind::Simulated),
            "process" | "subprocess" => Ok(BackendKind::Process),
            "native" | "ffi" => Ok(BackendKind::Native),
            other => Err(OracleError::InvalidParameter(format!(
                "unknown backend '{}' (expected simulated, process or native)",
                other
            ))),
        }
    }
}

/// Per-query lifecycle, reported in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    Idle,
    Serializing,
    Invoking,
    Parsing,
}

impl fmt::Display for QueryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryPhase::Idle => "idle",
            QueryPhase::Serializing => "serializing",
            QueryPhase::Invoking => "invoking",
            QueryPhase::Parsing => "parsing",
        };
        f.write_str(name)
    }
}

pub(crate) fn enter_phase(backend: BackendKind, phase: QueryPhase) {
    log::debug!("{} backend: {}", backend.name(), phase);
}

/// A result tagged with the backend that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Labeled<T> {
    pub backend: BackendKind,
    pub value: T,
}

impl<T> Labeled<T> {
    pub fn is_simulated(&self) -> bool {
        self.backend == BackendKind::Simulated
    }
}

/// Relative error of a measured norm against a prediction, in both units.
///
/// `norm` compares lengths, `|‖v‖ - gh| / ‖v‖`; `squared_norm` compares
/// squared lengths, `|‖v‖² - gh²| / ‖v‖²`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelativeError {
    pub norm: f64,
    pub squared_norm: f64,
}

/// A lattice vector found by a shortest-vector query.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundVector {
    /// Coordinates in the ambient space, when the backend reports them.
    pub vector: Option<Vec<BigInt>>,
    pub squared_norm: f64,
}

impl FoundVector {
    pub fn norm(&self) -> f64 {
        self.squared_norm.sqrt()
    }

    /// `None` unless the squared norm is finite and positive.
    pub fn relative_error(&self, prediction: f64) -> Option<RelativeError> {
        if !(self.squared_norm.is_finite() && self.squared_norm > 0.0) {
            return None;
        }
        let norm = self.norm();
        Some(RelativeError {
            norm: (norm - prediction).abs() / norm,
            squared_norm: (self.squared_norm - prediction * prediction).abs() / self.squared_norm,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SvpOutcome {
    Found(FoundVector),
    /// The search radius admitted no nonzero vector.
    NotFoundWithinRadius { radius: f64 },
}

/// log2 of the Gram-Schmidt norms of a reduced basis, one per basis vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    log2_norms: Vec<f64>,
}

impl Profile {
    pub fn new(log2_norms: Vec<f64>) -> Self {
        Self { log2_norms }
    }

    pub fn log2_norms(&self) -> &[f64] {
        &self.log2_norms
    }

    pub fn len(&self) -> usize {
        self.log2_norms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log2_norms.is_empty()
    }

    /// Whether the profile never rises by more than `tolerance`.
    ///
    /// Expected, not guaranteed, for a well-reduced basis.
    pub fn is_non_increasing(&self, tolerance: f64) -> bool {
        self.log2_norms.windows(2).all(|w| w[1] <= w[0] + tolerance)
    }
}

/// A reduction strategy.
///
/// Implementations may assume parameters were validated by
/// [`ReductionOracle`]; they must release every resource they acquire before
/// returning, on success and failure alike.
pub trait ReductionBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn shortest_vector(&self, basis: &LatticeBasis, radius: f64) -> Result<SvpOutcome, OracleError>;

    fn reduced_profile(&self, basis: &LatticeBasis, block_size: usize) -> Result<Profile, OracleError>;
}

/// Run-time backend selection.
#[derive(Debug, Clone, Default)]
pub struct OracleConfig {
    pub backend: BackendKind,
    pub simulated: SimulatedConfig,
    pub process: ProcessConfig,
    pub native: NativeConfig,
}

/// Backend-independent query interface.
pub struct ReductionOracle {
    backend: Box<dyn ReductionBackend>,
}

impl ReductionOracle {
    pub fn new(backend: Box<dyn ReductionBackend>) -> Self {
        Self { backend }
    }

    /// Build the backend named by `config.backend`.
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        let backend: Box<dyn ReductionBackend> = match config.backend {
            BackendKind::Simulated => Box::new(SimulatedBackend::new(config.simulated.clone())),
            BackendKind::Process => Box::new(ProcessBackend::new(config.process.clone())?),
            BackendKind::Native => crate::native::linked_backend(config.native.clone())?,
        };
        log::info!("reduction oracle using the {} backend", backend.kind());
        Ok(Self::new(backend))
    }

    pub fn simulated() -> Self {
        Self::new(Box::new(SimulatedBackend::default()))
    }

    pub fn backend(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Find a nonzero lattice vector of norm at most `radius`.
    pub fn query_shortest_vector(
        &self,
        basis: &LatticeBasis,
        radius: f64,
    ) -> Result<Labeled<SvpOutcome>, OracleError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(OracleError::InvalidParameter(format!(
                "search radius must be finite and positive, got {}",
                radius
            )));
        }
        let kind = self.backend.kind();
        let outcome = self.backend.shortest_vector(basis, radius);
        enter_phase(kind, QueryPhase::Idle);
        let outcome = outcome?;

        if let SvpOutcome::Found(found) = &outcome {
            if !(found.squared_norm.is_finite() && found.squared_norm > 0.0) {
                return Err(OracleError::ParseFailure(format!(
                    "{} backend reported squared norm {}",
                    kind.name(),
                    found.squared_norm
                )));
            }
            if let Some(vector) = &found.vector {
                if vector.len() != basis.dimension() {
                    return Err(OracleError::CardinalityMismatch {
                        expected: basis.dimension(),
                        actual: vector.len(),
                    });
                }
            }
        }

        Ok(Labeled {
            backend: kind,
            value: outcome,
        })
    }

    /// Reduce with block size `block_size` and return the Gram-Schmidt profile.
    ///
    /// The profile always has exactly `basis.rank()` entries.
    pub fn query_reduced_profile(
        &self,
        basis: &LatticeBasis,
        block_size: usize,
    ) -> Result<Labeled<Profile>, OracleError> {
        if block_size < 2 || block_size > basis.rank() {
            return Err(OracleError::InvalidParameter(format!(
                "block size must lie in 2..={} for a rank-{} basis, got {}",
                basis.rank(),
                basis.rank(),
                block_size
            )));
        }
        let kind = self.backend.kind();
        let profile = self.backend.reduced_profile(basis, block_size);
        enter_phase(kind, QueryPhase::Idle);
        let profile = profile?;

        if profile.len() != basis.rank() {
            return Err(OracleError::CardinalityMismatch {
                expected: basis.rank(),
                actual: profile.len(),
            });
        }
        Ok(Labeled {
            backend: kind,
            value: profile,
        })
    }
}

impl fmt::Debug for ReductionOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReductionOracle")
            .field("backend", &self.backend.kind())
            .finish()
    }
}

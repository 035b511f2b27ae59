//! Experiments on random lattices: does the Gaussian Heuristic predict the
//! shortest vector, and does a reduced basis follow the Geometric Series
//! Assumption?

pub mod experiment;

pub use experiment::{
    fit_line, run_gh_experiment, run_gsa_experiment, GhConfig, GhReport, GhRow, GsaConfig, GsaOutcome, GsaReport,
    LineFit, RowOutcome,
};

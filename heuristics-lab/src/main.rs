//! heuristics-lab CLI: lattice heuristic experiments.
//!
//! Modes:
//!   --mode=gh                 Gaussian Heuristic vs measured shortest vectors
//!   --mode=gsa                Reduced-basis profile of a random lattice
//!   --mode=all                Both (default)
//!
//! Options:
//!   --backend=<kind>          simulated | process | native (default: simulated)
//!   --engine=<path>           Engine executable for the process backend (default: fplll)
//!   --timeout-secs=<N>        Per-invocation engine timeout (default: 600)
//!   --n-min=<N> --n-max=<N> --n-step=<N>
//!                             Dimension sweep for gh mode (default: 30..=60 step 2)
//!   --q=<N>                   Modulus of the q-ary lattices (default: 131)
//!   --radius-factor=<F>       Search radius as a multiple of the prediction (default: 1.5)
//!   --rank=<N>                Rank of the gsa lattice (default: 30)
//!   --bound=<N>               Entries of the gsa lattice lie in [-N, N] (default: 100)
//!   --beta=<N>                Block size for gsa mode (default: 20)
//!   --parallel                Run gh rows on all cores
//!   --json                    Print reports as JSON instead of tables

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use num_bigint::BigInt;
use serde::Serialize;

use heuristics_lab::{run_gh_experiment, run_gsa_experiment, GhConfig, GhReport, GsaConfig, GsaOutcome, GsaReport, RowOutcome};
use reduction_oracle::{BackendKind, OracleConfig, ReductionOracle};

/// CLI configuration parsed from command-line arguments.
struct CliConfig {
    mode: Mode,
    backend: BackendKind,
    engine: Option<PathBuf>,
    timeout_secs: Option<u64>,
    gh: GhConfig,
    gsa: GsaConfig,
    json: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Gh,
    Gsa,
    All,
}

fn flag<T: FromStr>(args: &[String], name: &str) -> Option<T> {
    let prefix = format!("--{}=", name);
    let value = args.iter().find_map(|a| a.strip_prefix(prefix.as_str()))?;
    match value.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("Error: invalid value '{}' for --{}", value, name);
            std::process::exit(2);
        }
    }
}

fn parse_args() -> CliConfig {
    let args: Vec<String> = std::env::args().collect();

    let mode = match flag::<String>(&args, "mode").as_deref() {
        Some("gh") => Mode::Gh,
        Some("gsa") => Mode::Gsa,
        Some("all") | None => Mode::All,
        Some(other) => {
            eprintln!("Error: unknown mode '{}' (expected gh, gsa or all)", other);
            std::process::exit(2);
        }
    };

    let backend = flag::<BackendKind>(&args, "backend").unwrap_or_default();
    let engine = flag::<PathBuf>(&args, "engine");
    let timeout_secs = flag::<u64>(&args, "timeout-secs");

    let defaults = GhConfig::default();
    let gh = GhConfig {
        n_min: flag(&args, "n-min").unwrap_or(defaults.n_min),
        n_max: flag(&args, "n-max").unwrap_or(defaults.n_max),
        n_step: flag(&args, "n-step").unwrap_or(defaults.n_step),
        q: flag::<BigInt>(&args, "q").unwrap_or(defaults.q),
        radius_factor: flag(&args, "radius-factor").unwrap_or(defaults.radius_factor),
        parallel: args.iter().any(|a| a == "--parallel"),
    };

    let defaults = GsaConfig::default();
    let gsa = GsaConfig {
        rank: flag(&args, "rank").unwrap_or(defaults.rank),
        bound: flag(&args, "bound").unwrap_or(defaults.bound),
        block_size: flag(&args, "beta").unwrap_or(defaults.block_size),
    };

    CliConfig {
        mode,
        backend,
        engine,
        timeout_secs,
        gh,
        gsa,
        json: args.iter().any(|a| a == "--json"),
    }
}

fn oracle_config(config: &CliConfig) -> OracleConfig {
    let mut oracle = OracleConfig {
        backend: config.backend,
        ..OracleConfig::default()
    };
    if let Some(engine) = &config.engine {
        oracle.process.program = engine.clone();
    }
    if let Some(secs) = config.timeout_secs {
        oracle.process.timeout = Duration::from_secs(secs);
    }
    oracle
}

fn backend_note(backend: BackendKind) -> &'static str {
    if backend.is_authoritative() {
        ""
    } else {
        "  SIMULATED"
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: could not serialize report: {}", e),
    }
}

fn print_gh_report(report: &GhReport) {
    println!("--- Gaussian Heuristic ---");
    println!("  q = {}, radius = {} x prediction, backend: {}", report.q, report.radius_factor, report.backend);
    println!();
    println!(
        "  {:>4} | {:>5} | {:>13} | {:>13} | {:>11} | {:>11}",
        "n", "rank", "GH Prediction", "SVP Norm", "RelErr(%)", "RelErr²(%)"
    );
    println!("  {}", "-".repeat(75));

    for row in &report.rows {
        let prediction = row
            .prediction
            .map_or_else(|| "-".to_string(), |p| format!("{:.2}", p));
        match &row.outcome {
            RowOutcome::Measured {
                norm, relative_error, ..
            } => println!(
                "  {:>4} | {:>5} | {:>13} | {:>13.2} | {:>11.2} | {:>11.2}{}",
                row.n,
                row.rank,
                prediction,
                norm,
                relative_error.norm * 100.0,
                relative_error.squared_norm * 100.0,
                backend_note(row.backend)
            ),
            RowOutcome::NotFound { radius } => println!(
                "  {:>4} | {:>5} | {:>13} | none within {:.2}{}",
                row.n,
                row.rank,
                prediction,
                radius,
                backend_note(row.backend)
            ),
            RowOutcome::Failed { kind, message } => println!(
                "  {:>4} | {:>5} | {:>13} | FAILED {:?}: {}{}",
                row.n,
                row.rank,
                prediction,
                kind,
                message,
                backend_note(row.backend)
            ),
        }
    }

    if report.failures() > 0 {
        println!();
        println!("  {} of {} rows failed", report.failures(), report.rows.len());
    }
}

fn print_gsa_report(report: &GsaReport) {
    println!("--- Geometric Series Assumption ---");
    println!(
        "  rank {}, block size {}, backend: {}",
        report.rank, report.block_size, report.backend
    );
    if let Some(quality) = &report.input_quality {
        println!(
            "  input basis: hermite factor {:.4}, orthogonality defect {:.3e}",
            quality.hermite_factor, quality.orthogonality_defect
        );
    }
    println!();

    match &report.outcome {
        GsaOutcome::Profile {
            log2_norms,
            non_increasing,
            fit,
        } => {
            let values: Vec<String> = log2_norms.iter().map(|v| format!("{:.2}", v)).collect();
            println!("  Profile (log2 of Gram-Schmidt norms){}:", backend_note(report.backend));
            println!("  [{}]", values.join(", "));
            println!("  entries: {}, non-increasing: {}", log2_norms.len(), non_increasing);
            if let Some(fit) = fit {
                println!(
                    "  linear fit: slope {:.4}, intercept {:.3}, r² {:.4}",
                    fit.slope, fit.intercept, fit.r_squared
                );
            }
        }
        GsaOutcome::Failed { kind, message } => println!("  FAILED {:?}: {}", kind, message),
    }
}

#[derive(Serialize)]
struct Reports {
    #[serde(skip_serializing_if = "Option::is_none")]
    gh: Option<GhReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gsa: Option<GsaReport>,
}

fn main() {
    env_logger::init();

    let config = parse_args();

    let oracle = match ReductionOracle::from_config(&oracle_config(&config)) {
        Ok(oracle) => oracle,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("The process backend needs the reduction engine on PATH or --engine=/path/to/fplll.");
            eprintln!("The native backend needs a build with --features fplll.");
            eprintln!("Use --backend=simulated for in-process approximations.");
            std::process::exit(1);
        }
    };

    let gh = if config.mode != Mode::Gsa {
        match run_gh_experiment(&oracle, &config.gh) {
            Ok(report) => Some(report),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(2);
            }
        }
    } else {
        None
    };
    let gsa = (config.mode != Mode::Gh).then(|| run_gsa_experiment(&oracle, &config.gsa));

    if config.json {
        print_json(&Reports { gh, gsa });
        return;
    }

    println!("========================================");
    println!("  heuristics-lab: lattice heuristics");
    println!("========================================");
    println!();
    if !oracle.backend().is_authoritative() {
        println!("Backend: {}. Results are approximations, not engine output.", oracle.backend());
        println!();
    }

    if let Some(report) = &gh {
        print_gh_report(report);
        println!();
    }
    if let Some(report) = &gsa {
        print_gsa_report(report);
        println!();
    }

    println!("========================================");
    println!("  Done.");
    println!("========================================");
}

//! Scaling measurements for the lattice toolkit.
//!
//! For q-ary lattices of increasing rank, times the exact and floating-point
//! volume computations, the Gaussian Heuristic, and the simulated oracle, and
//! reports how far the floating-point volume drifts from the exact one.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use num_bigint::BigInt;
use rand::rngs::StdRng;
use rand::SeedableRng;

use lattice_core::{approximate_volume, gaussian_heuristic_for, qary_basis, volume, LatticeBasis};
use reduction_oracle::{encode_basis, ReductionOracle, SvpOutcome};

/// Maximum time per single measurement (seconds).
const TIMEOUT_SECS: u64 = 30;

/// Run a closure with a timeout. Returns None if timed out.
fn with_timeout<T: Send + 'static>(
    timeout: Duration,
    f: impl FnOnce() -> T + Send + 'static,
) -> Option<(T, Duration)> {
    let (tx, rx) = mpsc::channel();
    let start = Instant::now();
    std::thread::spawn(move || {
        let result = f();
        let _ = tx.send(result);
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => Some((result, start.elapsed())),
        Err(_) => None,
    }
}

fn main() {
    println!("================================================================");
    println!("  SCALING: exact vs floating-point lattice volume");
    println!("================================================================\n");

    let mut rng = StdRng::seed_from_u64(12345);
    let q = BigInt::from(131);
    let dims: Vec<usize> = vec![5, 10, 15, 20, 25, 30, 40, 50, 60];

    let mut bases: Vec<LatticeBasis> = Vec::new();
    for &n in &dims {
        match qary_basis(n, n, &q, &mut rng) {
            Ok(basis) => bases.push(basis),
            Err(e) => eprintln!("  n={}: {}", n, e),
        }
    }

    bench_volume(&bases);
    println!();
    bench_oracle(&bases);
}

fn bench_volume(bases: &[LatticeBasis]) {
    println!("Volume (q = 131, m = n):");
    println!(
        "  {:>4} | {:>12} | {:>12} | {:>14} | {:>10}",
        "rank", "exact (ms)", "float (ms)", "log2 drift", "GH"
    );
    println!("  {}", "-".repeat(64));

    for basis in bases {
        let rank = basis.rank();
        let exact_basis = basis.clone();
        let Some((exact, exact_time)) = with_timeout(Duration::from_secs(TIMEOUT_SECS), move || volume(&exact_basis))
        else {
            println!("  {:>4} | {:>12} |", rank, "timeout");
            continue;
        };

        let start = Instant::now();
        let approx = approximate_volume(basis);
        let approx_time = start.elapsed();

        // Exact log2 volume is n*log2(q); the float path loses this once
        // det(B B^T) leaves f64 range.
        let drift = if approx.is_finite() && approx > 0.0 {
            format!("{:.3e}", (approx.log2() - exact.log2()).abs())
        } else {
            "overflow".to_string()
        };
        let gh = gaussian_heuristic_for(&exact, rank)
            .map(|g| format!("{:.3}", g))
            .unwrap_or_else(|e| e.to_string());

        println!(
            "  {:>4} | {:>12.3} | {:>12.3} | {:>14} | {:>10}",
            rank,
            exact_time.as_secs_f64() * 1000.0,
            approx_time.as_secs_f64() * 1000.0,
            drift,
            gh
        );
    }
}

fn bench_oracle(bases: &[LatticeBasis]) {
    println!("Simulated oracle (radius = 1.5 x GH):");
    println!(
        "  {:>4} | {:>10} | {:>12} | {:>12} | {:>10}",
        "rank", "codec (B)", "svp (ms)", "profile (ms)", "norm"
    );
    println!("  {}", "-".repeat(60));

    let oracle = ReductionOracle::simulated();
    for basis in bases {
        let rank = basis.rank();
        let encoded = encode_basis(basis).len();
        let radius = gaussian_heuristic_for(&volume(basis), rank).map_or(1.0, |g| 1.5 * g);

        let start = Instant::now();
        let svp = oracle.query_shortest_vector(basis, radius);
        let svp_time = start.elapsed();

        let start = Instant::now();
        let profile = oracle.query_reduced_profile(basis, rank.min(20));
        let profile_time = start.elapsed();

        let norm = match svp.map(|r| r.value) {
            Ok(SvpOutcome::Found(found)) => format!("{:.3}", found.norm()),
            Ok(SvpOutcome::NotFoundWithinRadius { .. }) => "none".to_string(),
            Err(e) => format!("{:?}", e.kind()),
        };
        if let Err(e) = profile {
            eprintln!("  rank {}: profile failed: {}", rank, e);
        }

        println!(
            "  {:>4} | {:>10} | {:>12.3} | {:>12.3} | {:>10}",
            rank,
            encoded,
            svp_time.as_secs_f64() * 1000.0,
            profile_time.as_secs_f64() * 1000.0,
            norm
        );
    }
}

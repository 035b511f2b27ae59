//! End-to-end tests across lattice-core, reduction-oracle and heuristics-lab.

use num_bigint::BigInt;
use rand::rngs::StdRng;
use rand::SeedableRng;

use heuristics_lab::{run_gh_experiment, GhConfig, RowOutcome};
use lattice_core::{gaussian_heuristic_for, qary_basis, random_basis, volume, EntryRange, LatticeBasis};
use reduction_oracle::{
    decode_basis, encode_basis, BackendKind, ErrorKind, OracleConfig, ReductionOracle, SvpOutcome,
};

fn qary_60(seed: u64) -> LatticeBasis {
    let mut rng = StdRng::seed_from_u64(seed);
    qary_basis(30, 30, &BigInt::from(131), &mut rng).unwrap()
}

#[test]
fn test_qary_60_shortest_vector_at_gh_radius() {
    let basis = qary_60(1);
    assert_eq!(basis.rank(), 60);
    assert_eq!(basis.dimension(), 60);

    let vol = volume(&basis);
    assert_eq!(vol.floor(), num_bigint::BigUint::from(131u32).pow(30));
    let prediction = gaussian_heuristic_for(&vol, 60).unwrap();
    assert!(prediction > 0.0);

    let oracle = ReductionOracle::from_config(&OracleConfig::default()).unwrap();
    let result = oracle.query_shortest_vector(&basis, 1.5 * prediction).unwrap();
    assert_eq!(result.backend, BackendKind::Simulated);
    assert!(result.is_simulated());
    match result.value {
        SvpOutcome::Found(found) => {
            assert!(found.squared_norm >= 0.0);
            assert!(found.norm() <= 1.5 * prediction);
            let vector = found.vector.unwrap();
            assert_eq!(vector.len(), 60);
        }
        SvpOutcome::NotFoundWithinRadius { radius } => assert_eq!(radius, 1.5 * prediction),
    }
}

#[test]
fn test_profile_length_matches_rank() {
    let oracle = ReductionOracle::simulated();
    let basis = qary_60(2);
    let profile = oracle.query_reduced_profile(&basis, 20).unwrap();
    assert_eq!(profile.value.len(), 60);
    assert!(profile.is_simulated());

    let mut rng = StdRng::seed_from_u64(3);
    let random = random_basis(30, &EntryRange::symmetric(100), &mut rng).unwrap();
    let profile = oracle.query_reduced_profile(&random, 20).unwrap();
    assert_eq!(profile.value.len(), 30);
}

#[test]
fn test_codec_round_trip_preserves_volume() {
    let basis = qary_60(4);
    let decoded = decode_basis(&encode_basis(&basis)).unwrap();
    assert_eq!(decoded, basis);
    assert_eq!(volume(&decoded), volume(&basis));
}

#[test]
fn test_unbuilt_native_backend_is_unavailable() {
    let config = OracleConfig {
        backend: BackendKind::Native,
        ..OracleConfig::default()
    };
    match ReductionOracle::from_config(&config) {
        Ok(oracle) => assert_eq!(oracle.backend(), BackendKind::Native),
        Err(e) => assert_eq!(e.kind(), ErrorKind::BackendUnavailable),
    }
}

#[test]
fn test_gh_experiment_report() {
    let oracle = ReductionOracle::simulated();
    let config = GhConfig {
        n_min: 10,
        n_max: 20,
        n_step: 5,
        parallel: true,
        ..GhConfig::default()
    };
    let report = run_gh_experiment(&oracle, &config).unwrap();
    assert_eq!(report.rows.len(), 3);
    assert_eq!(report.failures(), 0);
    for row in &report.rows {
        assert_eq!(row.backend, BackendKind::Simulated);
        if let RowOutcome::Measured { squared_norm, .. } = row.outcome {
            assert!(squared_norm > 0.0);
        }
    }

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"backend\":\"simulated\""));
    assert!(json.contains("\"authoritative\":false"));
}

//! Engine output fixtures for protocol version 1.

use num_bigint::BigInt;
use reduction_oracle::protocol::OutputShape;
use reduction_oracle::{
    decode_basis, encode_basis, parse_profile_lines, parse_reduced_basis, parse_svp_output, ErrorKind, SvpOutput,
};

const SVP_LEGACY: &str = include_str!("fixtures/svp_legacy.txt");
const SVP_JSON: &str = include_str!("fixtures/svp_json.txt");
const SVP_JSON_NORM_ONLY: &str = include_str!("fixtures/svp_json_norm_only.txt");
const SVP_JSON_BIG_ENTRIES: &str = include_str!("fixtures/svp_json_big_entries.txt");
const SVP_NOT_FOUND: &str = include_str!("fixtures/svp_not_found.txt");
const SVP_FUTURE_VERSION: &str = include_str!("fixtures/svp_future_version.txt");
const MALFORMED_SVP: &str = include_str!("fixtures/malformed_svp.txt");
const PROFILE_LINES: &str = include_str!("fixtures/profile_lines.txt");
const PROFILE_LITERAL_I: &str = include_str!("fixtures/profile_literal_i.txt");
const BASIS: &str = include_str!("fixtures/basis.txt");
const MALFORMED_BASIS: &str = include_str!("fixtures/malformed_basis.txt");

fn expected_vector() -> Vec<BigInt> {
    [0, 1, -1, 3, 0, 2].iter().map(|&x| BigInt::from(x)).collect()
}

#[test]
fn test_legacy_vector() {
    match parse_svp_output(SVP_LEGACY).unwrap() {
        SvpOutput::Found(report) => {
            assert_eq!(report.shape, OutputShape::LegacyVector);
            assert_eq!(report.squared_norm, 15.0);
            assert_eq!(report.vector, Some(expected_vector()));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_json_object_agrees_with_legacy() {
    let legacy = match parse_svp_output(SVP_LEGACY).unwrap() {
        SvpOutput::Found(report) => report,
        other => panic!("unexpected {:?}", other),
    };
    match parse_svp_output(SVP_JSON).unwrap() {
        SvpOutput::Found(report) => {
            assert_eq!(report.shape, OutputShape::JsonObject);
            assert_eq!(report.squared_norm, legacy.squared_norm);
            assert_eq!(report.vector, legacy.vector);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_json_norm_only() {
    match parse_svp_output(SVP_JSON_NORM_ONLY).unwrap() {
        SvpOutput::Found(report) => {
            assert_eq!(report.squared_norm, 15.0);
            assert!(report.vector.is_none());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_json_entries_beyond_u64_keep_every_digit() {
    match parse_svp_output(SVP_JSON_BIG_ENTRIES).unwrap() {
        SvpOutput::Found(report) => {
            let big: BigInt = "1000000000000000000000000000000".parse().unwrap();
            assert_eq!(report.vector, Some(vec![big, BigInt::from(-3), BigInt::from(0)]));
            assert_eq!(report.squared_norm, 1e60);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_json_not_found() {
    assert_eq!(parse_svp_output(SVP_NOT_FOUND).unwrap(), SvpOutput::NotFound);
}

#[test]
fn test_rejected_svp_outputs() {
    for text in [SVP_FUTURE_VERSION, MALFORMED_SVP, ""] {
        assert_eq!(parse_svp_output(text).unwrap_err().kind(), ErrorKind::ParseFailure);
    }
}

#[test]
fn test_profile_lines_are_halved() {
    let expected = vec![6.25, 5.875, 5.5, 4.75];
    assert_eq!(parse_profile_lines(PROFILE_LINES, 4).unwrap(), expected);
    assert_eq!(parse_profile_lines(PROFILE_LITERAL_I, 4).unwrap(), expected);
}

#[test]
fn test_profile_length_must_match_rank() {
    let err = parse_profile_lines(PROFILE_LINES, 6).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CardinalityMismatch);
}

#[test]
fn test_reduced_basis() {
    let basis = parse_reduced_basis(BASIS, 4).unwrap();
    assert_eq!(basis.rank(), 4);
    assert_eq!(basis.dimension(), 6);
    assert_eq!(encode_basis(&basis), BASIS);
    assert_eq!(
        parse_reduced_basis(BASIS, 5).unwrap_err().kind(),
        ErrorKind::CardinalityMismatch
    );
}

#[test]
fn test_malformed_basis() {
    assert!(decode_basis(MALFORMED_BASIS).is_err());
    assert_eq!(
        parse_reduced_basis(MALFORMED_BASIS, 3).unwrap_err().kind(),
        ErrorKind::ParseFailure
    );
}

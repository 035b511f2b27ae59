//! Reduction engine output grammar, version 1.
//!
//! Accepted shapes:
//!
//! - **legacy vector** (`svp`): a single bracketed integer vector, `[0 1 -1 3]`.
//! - **JSON object** (`svp`): `{"norm": 42, "vector": [0, 1, -1], "found": true,
//!   "version": 1}`. Only `norm` is required; `norm` is the *squared* norm.
//!   `"found": false` reports that nothing was found within the radius.
//! - **profile lines** (`gso`): one `log(||b_i*||) = <value>` line per index in
//!   ascending order, where `<value>` is log2 of the squared Gram-Schmidt norm
//!   and `i` is either the literal letter or the decimal index.
//! - **basis** (`bkz`): the bracketed matrix grammar of [`crate::codec`].
//!
//! Parsing is strict: anything outside these shapes is a `ParseFailure`.

use lattice_core::{squared_norm, LatticeBasis};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use serde::Deserialize;

use crate::codec::{decode_basis, decode_vector};
use crate::OracleError;

/// Highest JSON protocol version this parser understands.
pub const PROTOCOL_VERSION: u32 = 1;

/// Which accepted shape a piece of engine output had.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    LegacyVector,
    JsonObject,
    ProfileLines,
    Basis,
}

/// A vector reported by the engine's shortest-vector mode.
#[derive(Debug, Clone, PartialEq)]
pub struct SvpReport {
    pub vector: Option<Vec<BigInt>>,
    pub squared_norm: f64,
    pub shape: OutputShape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SvpOutput {
    Found(SvpReport),
    NotFound,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SvpJson {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    found: Option<bool>,
    #[serde(default)]
    norm: Option<f64>,
    #[serde(default)]
    vector: Option<Vec<serde_json::Value>>,
}

fn parse_failure(message: impl Into<String>) -> OracleError {
    OracleError::ParseFailure(message.into())
}

fn json_integer(value: &serde_json::Value) -> Result<BigInt, OracleError> {
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => return Err(parse_failure(format!("vector entry {} is not an integer", other))),
    };
    let digits = text.strip_prefix('-').unwrap_or(&text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(parse_failure(format!("vector entry '{}' is not an integer", text)));
    }
    text.parse::<BigInt>()
        .map_err(|e| parse_failure(format!("vector entry '{}': {}", text, e)))
}

fn exact_squared_norm(vector: &[BigInt]) -> Result<f64, OracleError> {
    let norm = squared_norm(vector);
    if norm.is_zero() {
        return Err(parse_failure("engine returned the zero vector"));
    }
    norm.to_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| parse_failure("squared norm exceeds f64 range"))
}

fn parse_svp_json(text: &str) -> Result<SvpOutput, OracleError> {
    let parsed: SvpJson = serde_json::from_str(text)
        .map_err(|e| parse_failure(format!("invalid JSON result: {}", e)))?;

    if let Some(version) = parsed.version {
        if version == 0 || version > PROTOCOL_VERSION {
            return Err(parse_failure(format!(
                "unsupported protocol version {} (supported: 1..={})",
                version, PROTOCOL_VERSION
            )));
        }
    }
    if parsed.found == Some(false) {
        return Ok(SvpOutput::NotFound);
    }

    let vector = parsed
        .vector
        .as_deref()
        .map(|entries| entries.iter().map(json_integer).collect::<Result<Vec<_>, _>>())
        .transpose()?;
    let exact = vector.as_deref().map(exact_squared_norm).transpose()?;

    let squared_norm = match (parsed.norm, exact) {
        (Some(reported), exact) => {
            if !reported.is_finite() || reported <= 0.0 {
                return Err(parse_failure(format!(
                    "squared norm must be finite and positive, got {}",
                    reported
                )));
            }
            if let Some(exact) = exact {
                if (reported - exact).abs() > 1e-9 * exact.max(1.0) {
                    return Err(parse_failure(format!(
                        "reported squared norm {} disagrees with the vector's {}",
                        reported, exact
                    )));
                }
            }
            reported
        }
        (None, Some(exact)) => exact,
        (None, None) => return Err(parse_failure("JSON result carries neither norm nor vector")),
    };

    Ok(SvpOutput::Found(SvpReport {
        vector,
        squared_norm,
        shape: OutputShape::JsonObject,
    }))
}

/// Parse the output of the engine's shortest-vector mode.
pub fn parse_svp_output(text: &str) -> Result<SvpOutput, OracleError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(parse_failure("empty output from shortest-vector mode"));
    }
    if trimmed.starts_with('{') {
        return parse_svp_json(trimmed);
    }
    if trimmed.starts_with('[') {
        let vector = decode_vector(trimmed)?;
        let squared_norm = exact_squared_norm(&vector)?;
        return Ok(SvpOutput::Found(SvpReport {
            vector: Some(vector),
            squared_norm,
            shape: OutputShape::LegacyVector,
        }));
    }
    Err(parse_failure(format!(
        "unrecognised shortest-vector output: {:?}",
        first_line(trimmed)
    )))
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Parse one `log(||b_i*||) = value` line into (index label, value).
fn parse_profile_line(line: &str) -> Option<(&str, f64)> {
    let rest = line.strip_prefix("log(||b_")?;
    let end = rest.find("*||)")?;
    let label = &rest[..end];
    let value = rest[end + "*||)".len()..].trim_start().strip_prefix('=')?.trim();
    let value: f64 = value.parse().ok()?;
    Some((label, value))
}

/// Parse the engine's profile-extraction output for a basis of rank `rank`.
///
/// Returns log2 of each Gram-Schmidt norm, i.e. each reported log2 of the
/// squared norm halved.
pub fn parse_profile_lines(text: &str, rank: usize) -> Result<Vec<f64>, OracleError> {
    let mut profile = Vec::with_capacity(rank);
    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let (label, value) = parse_profile_line(line).ok_or_else(|| {
            parse_failure(format!("line {}: not a profile line: {:?}", line_no + 1, line))
        })?;
        if label != "i" {
            let index: usize = label.parse().map_err(|_| {
                parse_failure(format!("line {}: bad index '{}'", line_no + 1, label))
            })?;
            if index != profile.len() {
                return Err(parse_failure(format!(
                    "line {}: index {} out of order, expected {}",
                    line_no + 1,
                    index,
                    profile.len()
                )));
            }
        }
        if !value.is_finite() {
            return Err(parse_failure(format!(
                "line {}: non-finite value {}",
                line_no + 1,
                value
            )));
        }
        profile.push(value / 2.0);
    }

    if profile.is_empty() {
        return Err(parse_failure("empty output from profile mode"));
    }
    if profile.len() != rank {
        return Err(OracleError::CardinalityMismatch {
            expected: rank,
            actual: profile.len(),
        });
    }
    Ok(profile)
}

/// Parse a reduced basis and check it still has `rank` rows.
pub fn parse_reduced_basis(text: &str, rank: usize) -> Result<LatticeBasis, OracleError> {
    let basis = decode_basis(text)?;
    if basis.rank() != rank {
        return Err(OracleError::CardinalityMismatch {
            expected: rank,
            actual: basis.rank(),
        });
    }
    Ok(basis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_legacy_vector() {
        match parse_svp_output("[3 -4 0]\n").unwrap() {
            SvpOutput::Found(report) => {
                assert_eq!(report.squared_norm, 25.0);
                assert_eq!(report.shape, OutputShape::LegacyVector);
                assert_eq!(report.vector.unwrap().len(), 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_json_norm_only() {
        match parse_svp_output(r#"{"norm": 1234}"#).unwrap() {
            SvpOutput::Found(report) => {
                assert_eq!(report.squared_norm, 1234.0);
                assert!(report.vector.is_none());
                assert_eq!(report.shape, OutputShape::JsonObject);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_json_with_vector_and_version() {
        let text = r#"{"version": 1, "norm": 25, "vector": [3, "-4", 0]}"#;
        match parse_svp_output(text).unwrap() {
            SvpOutput::Found(report) => {
                assert_eq!(report.squared_norm, 25.0);
                assert_eq!(
                    report.vector.unwrap(),
                    vec![BigInt::from(3), BigInt::from(-4), BigInt::from(0)]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_json_not_found() {
        assert_eq!(
            parse_svp_output(r#"{"found": false}"#).unwrap(),
            SvpOutput::NotFound
        );
    }

    #[test]
    fn test_svp_rejections() {
        for text in [
            "",
            "   ",
            "Segmentation fault",
            r#"{"norm": -4}"#,
            r#"{"norm": 0}"#,
            r#"{"norm": 24, "vector": [3, 4]}"#,
            r#"{"version": 2, "norm": 4}"#,
            r#"{"vector": [1.5, 2]}"#,
            r#"{}"#,
            r#"{"norm": 4, "extra": true}"#,
            "[0 0 0]",
            "[1 2\n",
            "{not json",
        ] {
            let err = parse_svp_output(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ParseFailure, "accepted {:?}", text);
        }
    }

    #[test]
    fn test_profile_lines_are_halved() {
        let text = "log(||b_i*||) = 20.0\nlog(||b_i*||) = 18.5\n\nlog(||b_i*||) = 16\n";
        assert_eq!(parse_profile_lines(text, 3).unwrap(), vec![10.0, 9.25, 8.0]);
    }

    #[test]
    fn test_profile_lines_numeric_indices() {
        let text = "log(||b_0*||) = 4\nlog(||b_1*||) = 2\n";
        assert_eq!(parse_profile_lines(text, 2).unwrap(), vec![2.0, 1.0]);

        let out_of_order = "log(||b_1*||) = 4\nlog(||b_0*||) = 2\n";
        assert_eq!(
            parse_profile_lines(out_of_order, 2).unwrap_err().kind(),
            ErrorKind::ParseFailure
        );
    }

    #[test]
    fn test_profile_cardinality() {
        let text = "log(||b_i*||) = 4\nlog(||b_i*||) = 2\n";
        assert_eq!(
            parse_profile_lines(text, 3).unwrap_err(),
            OracleError::CardinalityMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_profile_rejections() {
        for text in [
            "",
            "log(||b_i*||) = abc",
            "log(||b_i*||) 4",
            "log(||b_x*||) = 4",
            "log(||b_i*||) = NaN",
            "log(||b_i*||) = 4\nwarning: something",
        ] {
            assert_eq!(
                parse_profile_lines(text, 1).unwrap_err().kind(),
                ErrorKind::ParseFailure,
                "accepted {:?}",
                text
            );
        }
    }

    #[test]
    fn test_reduced_basis_rank_check() {
        let text = "[[1 0]\n[0 1]\n]";
        assert_eq!(parse_reduced_basis(text, 2).unwrap().rank(), 2);
        assert_eq!(
            parse_reduced_basis(text, 3).unwrap_err().kind(),
            ErrorKind::CardinalityMismatch
        );
        assert_eq!(
            parse_reduced_basis("[[1 0]\n", 2).unwrap_err().kind(),
            ErrorKind::ParseFailure
        );
    }
}

//! Text codec for the reduction engine's matrix grammar.
//!
//! ```text
//! [[1 0 -3]
//! [0 1 12]
//! [0 0 131]
//! ]
//! ```
//!
//! An outer bracket holds one bracketed row per line, entries are
//! space-separated base-10 integers with an optional sign, and the closing
//! bracket sits on the final line. The decoder accepts any whitespace layout
//! (including the first row on its own line) but nothing else: every token
//! must be a bracket or an integer.

use std::fmt::Write as _;
use std::io::{self, Write};

use lattice_core::{LatticeBasis, LatticeError};
use num_bigint::BigInt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("no matrix found in empty input")]
    Empty,

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("malformed basis: {0}")]
    Shape(#[from] LatticeError),
}

/// Encode a basis in the engine's grammar.
pub fn encode_basis(basis: &LatticeBasis) -> String {
    let mut out = String::with_capacity(basis.rank() * basis.dimension() * 4);
    out.push('[');
    for row in basis.rows() {
        out.push('[');
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                out.push(' ');
            }
            // Writing into a String cannot fail.
            let _ = write!(out, "{}", value);
        }
        out.push_str("]\n");
    }
    out.push_str("]\n");
    out
}

/// Stream an encoded basis into `writer`.
pub fn write_basis<W: Write>(basis: &LatticeBasis, mut writer: W) -> io::Result<()> {
    writer.write_all(encode_basis(basis).as_bytes())?;
    writer.flush()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Int(BigInt),
}

fn parse_integer(word: &str, line: usize) -> Result<BigInt, CodecError> {
    let (negative, digits) = match word.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, word.strip_prefix('+').unwrap_or(word)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(syntax(line, format!("'{}' is not an integer", word)));
    }
    let magnitude = digits
        .parse::<BigInt>()
        .map_err(|e| syntax(line, format!("'{}': {}", word, e)))?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, CodecError> {
    let mut tokens = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let mut word_start: Option<usize> = None;
        for (pos, c) in line.char_indices() {
            let is_separator = c.is_whitespace() || c == '[' || c == ']';
            if is_separator {
                if let Some(start) = word_start.take() {
                    tokens.push((Token::Int(parse_integer(&line[start..pos], line_no)?), line_no));
                }
                match c {
                    '[' => tokens.push((Token::Open, line_no)),
                    ']' => tokens.push((Token::Close, line_no)),
                    _ => {}
                }
            } else if word_start.is_none() {
                word_start = Some(pos);
            }
        }
        if let Some(start) = word_start {
            tokens.push((Token::Int(parse_integer(&line[start..], line_no)?), line_no));
        }
    }
    Ok(tokens)
}

fn syntax(line: usize, message: impl Into<String>) -> CodecError {
    CodecError::Syntax {
        line,
        message: message.into(),
    }
}

/// Parse one bracketed row starting at `tokens[pos]`; returns the row and the
/// position after its closing bracket.
fn parse_row(tokens: &[(Token, usize)], mut pos: usize) -> Result<(Vec<BigInt>, usize), CodecError> {
    let open_line = tokens[pos].1;
    pos += 1;
    let mut row = Vec::new();
    loop {
        match tokens.get(pos) {
            Some((Token::Int(v), _)) => row.push(v.clone()),
            Some((Token::Close, line)) => {
                if row.is_empty() {
                    return Err(syntax(*line, "empty row"));
                }
                return Ok((row, pos + 1));
            }
            Some((Token::Open, line)) => return Err(syntax(*line, "nested bracket inside a row")),
            None => return Err(syntax(open_line, "unterminated row")),
        }
        pos += 1;
    }
}

/// Decode a basis written in the engine's grammar.
pub fn decode_basis(text: &str) -> Result<LatticeBasis, CodecError> {
    let tokens = tokenize(text)?;
    let (first, first_line) = tokens.first().ok_or(CodecError::Empty)?;
    if *first != Token::Open {
        return Err(syntax(*first_line, "expected '[' opening the matrix"));
    }

    let mut rows = Vec::new();
    let mut pos = 1;
    loop {
        match tokens.get(pos) {
            Some((Token::Open, _)) => {
                let (row, next) = parse_row(&tokens, pos)?;
                rows.push(row);
                pos = next;
            }
            Some((Token::Close, line)) => {
                if let Some((_, trailing)) = tokens.get(pos + 1) {
                    return Err(syntax(*trailing, "unexpected content after the matrix"));
                }
                if rows.is_empty() {
                    return Err(syntax(*line, "matrix has no rows"));
                }
                break;
            }
            Some((Token::Int(_), line)) => {
                return Err(syntax(*line, "integer outside of a row"));
            }
            None => {
                let line = tokens.last().map_or(1, |(_, l)| *l);
                return Err(syntax(line, "missing closing ']'"));
            }
        }
    }

    Ok(LatticeBasis::from_rows(rows)?)
}

/// Decode a single bracketed vector, `[v1 v2 ... vn]`.
pub fn decode_vector(text: &str) -> Result<Vec<BigInt>, CodecError> {
    let tokens = tokenize(text)?;
    let (first, first_line) = tokens.first().ok_or(CodecError::Empty)?;
    if *first != Token::Open {
        return Err(syntax(*first_line, "expected '[' opening the vector"));
    }
    let (row, next) = parse_row(&tokens, 0)?;
    if let Some((_, line)) = tokens.get(next) {
        return Err(syntax(*line, "unexpected content after the vector"));
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basis(rows: &[Vec<i64>]) -> LatticeBasis {
        LatticeBasis::from_i64_rows(rows).unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let b = basis(&[vec![1, 0, -3], vec![0, 1, 12]]);
        assert_eq!(encode_basis(&b), "[[1 0 -3]\n[0 1 12]\n]\n");
    }

    #[test]
    fn test_round_trip_preserves_big_entries() {
        let big: BigInt = "-123456789012345678901234567890123456789".parse().unwrap();
        let b = LatticeBasis::from_rows(vec![
            vec![big.clone(), BigInt::from(0), BigInt::from(7)],
            vec![BigInt::from(-1), big.clone(), BigInt::from(1)],
        ])
        .unwrap();
        assert_eq!(decode_basis(&encode_basis(&b)).unwrap(), b);
    }

    #[test]
    fn test_write_basis_matches_encode() {
        let b = basis(&[vec![2, 0], vec![0, 3]]);
        let mut out = Vec::new();
        write_basis(&b, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), encode_basis(&b));
    }

    #[test]
    fn test_decode_accepts_layouts() {
        let expected = basis(&[vec![1, 2], vec![3, -4]]);
        for text in [
            "[[1 2]\n[3 -4]\n]",
            "[\n[1 2]\n[3 -4]\n]\n",
            "  [[1  2]\n [3\t-4]]",
            "[[+1 2] [3 -4]]",
        ] {
            assert_eq!(decode_basis(text).unwrap(), expected, "layout {:?}", text);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_basis(""), Err(CodecError::Empty));
        assert_eq!(decode_basis("   \n "), Err(CodecError::Empty));
        for text in [
            "[[1 2]\n[3 x]\n]",
            "[[1 2.5]]",
            "[[1 2]\n[3 4]",
            "[[1 2]]\n[3 4]",
            "1 2 3",
            "[[]]",
            "[]",
            "[[1 [2]]]",
            "[[1 2] 3]",
            "[[- 2]]",
        ] {
            assert!(
                matches!(decode_basis(text), Err(CodecError::Syntax { .. })),
                "accepted {:?}",
                text
            );
        }
        assert!(matches!(
            decode_basis("[[1 2]\n[3]\n]"),
            Err(CodecError::Shape(LatticeError::RaggedBasis { .. }))
        ));
    }

    #[test]
    fn test_syntax_errors_report_line() {
        match decode_basis("[[1 2]\n[3 4]\n[5 oops]\n]") {
            Err(CodecError::Syntax { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_vector() {
        assert_eq!(
            decode_vector("[0 -1 5]\n").unwrap(),
            vec![BigInt::from(0), BigInt::from(-1), BigInt::from(5)]
        );
        assert!(decode_vector("[1 2] [3]").is_err());
        assert!(decode_vector("[]").is_err());
        assert!(decode_vector("").is_err());
    }
}

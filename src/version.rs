//! Loose version comparison
//!
//! Game versions in FOMOD files are free-form strings such as `1.9.32.0.8`
//! or `1.5.97a`. They are compared component by component: a version is cut
//! into maximal runs of digits and maximal runs of letters, everything else
//! acts as a separator.
//!
//! | Left | Right | Result |
//! |------|-------|--------|
//! | `1.2` | `1.10` | Less (numeric, not lexical) |
//! | `1.5` | `1.5.0` | Less (missing trailing piece) |
//! | `1.5a` | `1.5b` | Less (lexical letters) |
//! | `1.5` | `1.5a` | Less |
//! | `1.a` | `1.1` | Greater (numbers sort before letters) |

use std::cmp::Ordering;
use std::fmt;

/// One component of a version string
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Number(u128),
    /// Digit runs too long for `u128`, compared by length then digits
    BigNumber(String),
    Word(String),
}

impl Piece {
    fn number(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        match trimmed.parse::<u128>() {
            Ok(value) => Self::Number(value),
            Err(_) if trimmed.is_empty() => Self::Number(0),
            Err(_) => Self::BigNumber(trimmed.to_string()),
        }
    }
}

impl Ord for Piece {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            (Self::Number(_), Self::BigNumber(_)) => Ordering::Less,
            (Self::BigNumber(_), Self::Number(_)) => Ordering::Greater,
            (Self::BigNumber(a), Self::BigNumber(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Self::Word(a), Self::Word(b)) => a.cmp(b),
            (Self::Word(_), _) => Ordering::Greater,
            (_, Self::Word(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for Piece {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A parsed, comparable version string. Any input is accepted.
#[derive(Debug, Clone)]
pub struct LooseVersion {
    raw: String,
    pieces: Vec<Piece>,
}

impl LooseVersion {
    pub fn parse(raw: &str) -> Self {
        let mut pieces = Vec::new();
        let mut chars = raw.char_indices().peekable();

        while let Some(&(start, c)) = chars.peek() {
            if c.is_ascii_digit() {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    end = i + d.len_utf8();
                    chars.next();
                }
                pieces.push(Piece::number(&raw[start..end]));
            } else if c.is_alphabetic() {
                let mut end = start;
                while let Some(&(i, a)) = chars.peek() {
                    if !a.is_alphabetic() {
                        break;
                    }
                    end = i + a.len_utf8();
                    chars.next();
                }
                pieces.push(Piece::Word(raw[start..end].to_string()));
            } else {
                chars.next();
            }
        }

        Self {
            raw: raw.to_string(),
            pieces,
        }
    }

    /// The string this version was parsed from
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Slice ordering: element-wise, then a missing trailing piece is less
        self.pieces.cmp(&other.pieces)
    }
}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for LooseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LooseVersion {}

impl fmt::Display for LooseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compare two version strings with loose, component-wise semantics
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    LooseVersion::parse(left).cmp(&LooseVersion::parse(right))
}

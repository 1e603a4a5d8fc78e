//! Competency code (AAAAMM) validation.

use crate::error::CoreError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static COMPETENCIA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6}$").expect("valid regex"));

/// Six-digit billing competency (year + month), e.g. `202501`.
///
/// The wire contract is exactly six digits; the month is not range-checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Competencia(String);

impl Competencia {
    pub fn parse(value: &str) -> Result<Competencia, CoreError> {
        if COMPETENCIA_RE.is_match(value) {
            Ok(Competencia(value.to_string()))
        } else {
            Err(CoreError::InvalidCompetencia {
                value: value.to_string(),
            })
        }
    }

    pub fn is_valid(value: &str) -> bool {
        COMPETENCIA_RE.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn year(&self) -> &str {
        &self.0[..4]
    }

    pub fn month(&self) -> &str {
        &self.0[4..]
    }
}

impl fmt::Display for Competencia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exactly_six_digits() {
        assert!(Competencia::parse("202501").is_ok());
        assert!(Competencia::parse("2025-1").is_err());
        assert!(Competencia::parse("20251").is_err());
        assert!(Competencia::parse("2025012").is_err());
        assert!(Competencia::parse("").is_err());
        assert!(Competencia::parse("abcdef").is_err());
    }

    #[test]
    fn month_is_not_range_checked() {
        // The wire contract is "six digits"; 202513 passes through.
        let c = Competencia::parse("202513").unwrap();
        assert_eq!(c.year(), "2025");
        assert_eq!(c.month(), "13");
    }
}

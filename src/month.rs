// src/month.rs
//
// Campaign months are keyed by a canonical "mon yy" token (lowercase
// three-letter month abbreviation plus two-digit year, e.g. "jul 25").
// Caller input arrives in many shapes: ISO "2025-07", "07/2025",
// Portuguese month names ("julho/2025"), bare abbreviations ("Jul").
// Everything funnels through `MonthToken::normalize_at` before any
// campaign lookup or creation so equivalent inputs never fork campaigns.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FunilError, Result};

const MONTH_ABBR: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Canonical month token, e.g. `"jul 25"`. The uniqueness key for
/// campaigns; only constructed through normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthToken(String);

impl MonthToken {
    /// Normalize heterogeneous month input against the current clock.
    pub fn normalize(input: &str) -> Result<Self> {
        Self::normalize_at(input, Utc::now())
    }

    /// Normalize against an explicit "now" (empty or unrecognized
    /// textual input falls back to the current calendar month).
    pub fn normalize_at(input: &str, now: DateTime<Utc>) -> Result<Self> {
        let cleaned = input.trim().to_lowercase();
        if cleaned.is_empty() {
            return Ok(Self::from_parts(now.month(), now.year()));
        }

        let parts: Vec<&str> = cleaned
            .split(['/', '-', ' '])
            .filter(|p| !p.is_empty())
            .collect();

        if parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
            return Self::from_numeric(&parts, now);
        }

        let mut month = None;
        let mut year = None;
        for part in &parts {
            if part.chars().all(|c| c.is_ascii_digit()) {
                year = Some(parse_year(part)?);
            } else if month.is_none() {
                month = month_from_name(part);
            }
        }

        match month {
            Some(m) => Ok(Self::from_parts(m, year.unwrap_or(now.year()))),
            // Unrecognized names normalize to the current month.
            None => Ok(Self::from_parts(now.month(), now.year())),
        }
    }

    fn from_numeric(parts: &[&str], now: DateTime<Utc>) -> Result<Self> {
        let (month, year) = match parts {
            // A lone 4-digit part is a bare year; use its current month.
            [y] if y.len() == 4 => (now.month(), parse_year(y)?),
            [m] => (parse_month_number(m)?, now.year()),
            [a, b] if a.len() == 4 => (parse_month_number(b)?, parse_year(a)?),
            [a, b] => (parse_month_number(a)?, parse_year(b)?),
            _ => {
                return Err(FunilError::InvalidInput(format!(
                    "Unrecognized month format: {:?}",
                    parts.join(" ")
                )))
            }
        };
        Ok(Self::from_parts(month, year))
    }

    fn from_parts(month: u32, year: i32) -> Self {
        Self(format!(
            "{} {:02}",
            MONTH_ABBR[(month - 1) as usize],
            year.rem_euclid(100)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MonthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MonthToken {
    /// Wrap an already-canonical token read back from storage.
    fn from(s: String) -> Self {
        Self(s)
    }
}

fn parse_month_number(s: &str) -> Result<u32> {
    let n: u32 = s
        .parse()
        .map_err(|_| FunilError::InvalidInput(format!("Invalid month number: {}", s)))?;
    if (1..=12).contains(&n) {
        Ok(n)
    } else {
        Err(FunilError::InvalidInput(format!(
            "Month out of range: {}",
            n
        )))
    }
}

fn parse_year(s: &str) -> Result<i32> {
    match s.len() {
        4 => s
            .parse()
            .map_err(|_| FunilError::InvalidInput(format!("Invalid year: {}", s))),
        1 | 2 => s
            .parse::<i32>()
            .map(|y| 2000 + y)
            .map_err(|_| FunilError::InvalidInput(format!("Invalid year: {}", s))),
        _ => Err(FunilError::InvalidInput(format!("Invalid year: {}", s))),
    }
}

/// Month-name lookup covering English and Portuguese, full names and
/// abbreviations. The legacy store mixes both freely.
fn month_from_name(name: &str) -> Option<u32> {
    match name {
        "jan" | "january" | "janeiro" => Some(1),
        "feb" | "february" | "fev" | "fevereiro" => Some(2),
        "mar" | "march" | "março" | "marco" => Some(3),
        "apr" | "april" | "abr" | "abril" => Some(4),
        "may" | "mai" | "maio" => Some(5),
        "jun" | "june" | "junho" => Some(6),
        "jul" | "july" | "julho" => Some(7),
        "aug" | "august" | "ago" | "agosto" => Some(8),
        "sep" | "sept" | "september" | "set" | "setembro" => Some(9),
        "oct" | "october" | "out" | "outubro" => Some(10),
        "nov" | "november" | "novembro" => Some(11),
        "dec" | "december" | "dez" | "dezembro" => Some(12),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap()
    }

    fn norm(input: &str) -> String {
        MonthToken::normalize_at(input, at()).unwrap().to_string()
    }

    #[test]
    fn iso_input() {
        assert_eq!(norm("2025-07"), "jul 25");
        assert_eq!(norm("2024-1"), "jan 24");
    }

    #[test]
    fn slash_numeric_input() {
        assert_eq!(norm("07/2025"), "jul 25");
        assert_eq!(norm("7/2025"), "jul 25");
    }

    #[test]
    fn portuguese_names() {
        assert_eq!(norm("julho/2025"), "jul 25");
        assert_eq!(norm("Fevereiro 2026"), "feb 26");
        assert_eq!(norm("março"), "mar 25");
        assert_eq!(norm("dez/25"), "dec 25");
    }

    #[test]
    fn english_abbreviations() {
        assert_eq!(norm("Jul"), "jul 25");
        assert_eq!(norm("jul 25"), "jul 25");
        assert_eq!(norm("September 2025"), "sep 25");
    }

    #[test]
    fn equivalent_inputs_share_a_token() {
        let variants = ["2025-07", "07/2025", "julho/2025", "jul 25", "July 2025"];
        for v in variants {
            assert_eq!(norm(v), "jul 25", "input {:?}", v);
        }
    }

    #[test]
    fn bare_year_takes_current_month() {
        assert_eq!(norm("2025"), "mar 25");
        assert_eq!(norm("2026"), "mar 26");
        // A lone small number is still a month of the current year.
        assert_eq!(norm("7"), "jul 25");
    }

    #[test]
    fn empty_and_unknown_fall_back_to_current_month() {
        assert_eq!(norm(""), "mar 25");
        assert_eq!(norm("   "), "mar 25");
        assert_eq!(norm("whenever"), "mar 25");
    }

    #[test]
    fn impossible_numeric_month_is_invalid() {
        assert!(matches!(
            MonthToken::normalize_at("2025-13", at()),
            Err(FunilError::InvalidInput(_))
        ));
        assert!(matches!(
            MonthToken::normalize_at("0/2025", at()),
            Err(FunilError::InvalidInput(_))
        ));
    }
}

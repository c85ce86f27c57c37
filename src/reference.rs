//! Build order reference helpers.
//!
//! References look like `BO-0002`. The numeric part is stored alongside the
//! reference (`reference_int`) so listings can be ordered numerically.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const BUILD_REFERENCE_PREFIX: &str = "BO-";

/// Largest value that fits the `reference_int` column
const REFERENCE_INT_CLIP: i64 = i32::MAX as i64;

static REFERENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^BO-(\d+)$").unwrap());
static LEADING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)").unwrap());
static TRAILING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)$").unwrap());
static PREFIX_AND_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)(\d+)?$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("reference number of '{0}' is out of range")]
    Overflow(String),
}

/// `BO-{n:04}`
pub fn format_reference(n: i64) -> String {
    format!("{}{:04}", BUILD_REFERENCE_PREFIX, n)
}

/// Whether `reference` follows the build order pattern
pub fn is_valid_reference(reference: &str) -> bool {
    REFERENCE_PATTERN.is_match(reference.trim())
}

/// Number of a well formed reference, `None` when it does not fit `reference_int`
pub fn reference_number(reference: &str) -> Option<i32> {
    REFERENCE_PATTERN
        .captures(reference.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

/// Extract the integer part of a reference.
///
/// Digits at the start win over digits at the end; anything without digits
/// yields zero. Values are clipped to the `i32` range.
pub fn extract_int(reference: &str) -> i32 {
    let reference = reference.trim();
    if reference.is_empty() {
        return 0;
    }

    let digits = LEADING_DIGITS
        .captures(reference)
        .or_else(|| TRAILING_DIGITS.captures(reference))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());

    let value = match digits {
        Some(d) => d.parse::<i64>().unwrap_or(REFERENCE_INT_CLIP),
        None => 0,
    };

    value.min(REFERENCE_INT_CLIP) as i32
}

/// Increment the trailing number of `value`, keeping its zero padding.
///
/// `001` becomes `002`, `AB01` becomes `AB02`, `QQQ` is returned unchanged and
/// an empty value becomes `1`.
pub fn increment(value: &str) -> Result<String, ReferenceError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok("1".to_string());
    }

    let Some(captures) = PREFIX_AND_NUMBER.captures(value) else {
        return Ok(value.to_string());
    };
    let prefix = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let Some(number) = captures.get(2).map(|m| m.as_str()) else {
        return Ok(prefix.to_string());
    };

    let width = number.len();
    let next = number
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| ReferenceError::Overflow(value.to_string()))?;
    Ok(format!("{}{:0width$}", prefix, next, width = width))
}

/// Reference following the most recent one, or the first reference when none exist.
///
/// Fails once the next number no longer fits `reference_int`.
pub fn next_reference(latest: Option<&str>) -> Result<String, ReferenceError> {
    let next = match latest {
        Some(latest) if is_valid_reference(latest) => increment(latest)?,
        _ => format_reference(1),
    };
    match reference_number(&next) {
        Some(_) => Ok(next),
        None => Err(ReferenceError::Overflow(next)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_with_padding() {
        assert_eq!(format_reference(2), "BO-0002");
        assert_eq!(format_reference(12345), "BO-12345");
    }

    #[test]
    fn extracts_integers() {
        assert_eq!(extract_int("BO-0002"), 2);
        assert_eq!(extract_int("123-ABC"), 123);
        assert_eq!(extract_int("ABC"), 0);
        assert_eq!(extract_int(""), 0);
        assert_eq!(extract_int("BO-99999999999999999999"), i32::MAX);
    }

    #[test]
    fn validates_pattern() {
        assert!(is_valid_reference("BO-0001"));
        assert!(!is_valid_reference("BO-"));
        assert!(!is_valid_reference("PO-0001"));
        assert!(!is_valid_reference("BO-12a"));
    }

    #[test]
    fn increments_keep_width() {
        assert_eq!(increment("001").unwrap(), "002");
        assert_eq!(increment("AB01").unwrap(), "AB02");
        assert_eq!(increment("QQQ").unwrap(), "QQQ");
        assert_eq!(increment("").unwrap(), "1");
        assert_eq!(increment("BO-0099").unwrap(), "BO-0100");
        assert_eq!(increment("BO-9999").unwrap(), "BO-10000");
    }

    #[test]
    fn increment_reports_overflow() {
        assert_eq!(
            increment("BO-18446744073709551615"),
            Err(ReferenceError::Overflow("BO-18446744073709551615".into()))
        );
        assert!(increment("BO-99999999999999999999999").is_err());
    }

    #[test]
    fn reference_numbers_fit_the_column() {
        assert_eq!(reference_number("BO-0042"), Some(42));
        assert_eq!(reference_number("BO-2147483647"), Some(i32::MAX));
        assert_eq!(reference_number("BO-2147483648"), None);
        assert_eq!(reference_number("PO-0001"), None);
    }

    #[test]
    fn next_reference_starts_at_one() {
        assert_eq!(next_reference(None).unwrap(), "BO-0001");
        assert_eq!(next_reference(Some("garbage")).unwrap(), "BO-0001");
        assert_eq!(next_reference(Some("BO-0005")).unwrap(), "BO-0006");
    }

    #[test]
    fn next_reference_stops_at_column_limit() {
        assert_eq!(
            next_reference(Some("BO-2147483646")).unwrap(),
            "BO-2147483647"
        );
        assert!(next_reference(Some("BO-2147483647")).is_err());
    }

    proptest! {
        #[test]
        fn formatted_references_extract_back(n in 0i64..=i32::MAX as i64) {
            let reference = format_reference(n);
            prop_assert!(is_valid_reference(&reference));
            prop_assert_eq!(extract_int(&reference) as i64, n);
        }
    }
}

//! Missing-value tokens.
//!
//! Cohort exports spell "no value" in many ways. Every reader in the
//! workspace collapses them into one missing state, and every writer emits
//! the single BIDS marker [`MISSING_MARKER`].

/// Marker written for every missing cell in output tables.
pub const MISSING_MARKER: &str = "n/a";

/// Tokens treated as missing in every cohort (compared case-insensitively).
pub const DEFAULT_MISSING_TOKENS: &[&str] = &["", "n/a", "na", "nan", "none", "null"];

/// Returns true when `value` is one of the default missing tokens.
///
/// # Examples
///
/// ```
/// use pheno_common::is_missing_token;
///
/// assert!(is_missing_token(""));
/// assert!(is_missing_token("  NaN "));
/// assert!(is_missing_token("n/a"));
/// assert!(!is_missing_token("0"));
/// ```
pub fn is_missing_token(value: &str) -> bool {
    let trimmed = value.trim();
    DEFAULT_MISSING_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Returns true when `value` is a default missing token or one of `extra`.
///
/// Extra tokens are cohort specific (`.` in COMPASS-ND exports) and are
/// compared exactly after trimming.
pub fn is_missing_with(value: &str, extra: &[String]) -> bool {
    if is_missing_token(value) {
        return true;
    }
    let trimmed = value.trim();
    extra.iter().any(|token| token == trimmed)
}

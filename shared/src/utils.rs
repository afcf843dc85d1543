//! # Shared Utility Functions
//!
//! Small pure helpers used by both the network side and the foreground side.
//!
//! ## Account Masking
//!
//! - [`mask_account`] - Hide all but the last four characters of an account code
//!
//! ## Lenient Parsing
//!
//! Broker payloads carry numbers as display strings. A malformed value is
//! never an error at this layer; it becomes zero.
//!
//! - [`parse_volume`] - Decimal display string to whole units
//! - [`parse_amount`] - Decimal display string to `f64`
//!
//! ## Usage
//!
//! ```rust
//! use shared::utils::{mask_account, parse_volume};
//!
//! assert_eq!(mask_account("DU1234567"), "*****4567");
//! assert_eq!(parse_volume("1,250"), 1250);
//! assert_eq!(parse_volume("n/a"), 0);
//! ```

/// Mask an account code for logging, keeping only the last four characters.
///
/// Codes of four characters or fewer are fully masked.
///
/// # Examples
///
/// ```rust
/// use shared::utils::mask_account;
///
/// assert_eq!(mask_account("U9876543"), "****6543");
/// assert_eq!(mask_account("1234"), "****");
/// ```
pub fn mask_account(account: &str) -> String {
    let chars: Vec<char> = account.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

/// Parse a broker volume string into whole units.
///
/// Thousands separators are ignored and fractional volumes are truncated.
/// Anything unparseable (empty, `"n/a"`, sentinel text) yields `0`.
pub fn parse_volume(raw: &str) -> i64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if let Ok(v) = cleaned.parse::<i64>() {
        return v;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc() as i64,
        _ => 0,
    }
}

/// Parse a broker decimal string into `f64`, yielding `0.0` when malformed.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

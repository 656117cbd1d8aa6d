//! Static address checks: normalisation and the syntax gate.
//!
//! The accepted pattern is a simplified RFC 5322 subset:
//! `^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$`. Quoted local parts, comments and
//! internationalised domains are rejected.

mod types;

pub use types::Address;

use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("address pattern is a valid regex")
});

/// Trim surrounding whitespace and lower-case the address.
pub fn normalize_address(address: &str) -> Address {
    Address::new(address.trim().to_ascii_lowercase())
}

/// Returns `true` when `address` matches the supported pattern.
///
/// Pure and deterministic; a mismatch is a plain `false`, never an error.
pub fn check_syntax(address: &str) -> bool {
    ADDRESS_PATTERN.is_match(address)
}

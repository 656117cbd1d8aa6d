//! DNS MX resolution.
//!
//! [`resolve_mx`] queries any [`LookupMx`] implementation (the tokio trust-dns resolver in
//! production, stubs in tests) and returns the exchangers sorted by ascending priority.

mod error;
mod resolver;
mod types;

pub use error::MxError;
pub use resolver::{LookupMx, build_resolver, resolve_mx};
pub use types::MxRecord;

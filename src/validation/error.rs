use thiserror::Error;

use crate::config::ConfigError;
use crate::mx::MxError;

/// Failures that prevent a [`Validator`](super::Validator) from being built. Per-address
/// problems never surface here; they are recorded in the address's verdict.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("DNS resolver unavailable: {0}")]
    Resolver(#[from] MxError),
}

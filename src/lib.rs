#![forbid(unsafe_code)]
//! mailprobe_lib — email deliverability probing: syntax gate, MX lookup and SMTP `RCPT TO`
//! handshake, folded into one verdict per address.
//!
//! ```no_run
//! # async fn run() -> Result<(), mailprobe_lib::ValidatorError> {
//! use mailprobe_lib::{ProbeConfig, Validator};
//!
//! let validator = Validator::new(ProbeConfig::default())?;
//! let record = validator.validate_one("user@example.com").await;
//! println!("{}", serde_json::to_string_pretty(&record).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod mx;
pub mod smtp_verify;
pub mod validation;
pub mod validator;

pub use config::{ConfigError, ConfigFile, ProbeConfig};
pub use mx::{LookupMx, MxError, MxRecord, build_resolver, resolve_mx};
pub use smtp_verify::{
    AttemptOutcome, AttemptStage, ProbeOutcome, ProbeReport, ServerAttempt, SmtpEvent,
    SmtpProbeOptions, SmtpReply, probe_deliverability,
};
pub use validation::{FailureReason, SmtpDetail, ValidationRecord, Validator, ValidatorError};
pub use validator::{Address, check_syntax, normalize_address};

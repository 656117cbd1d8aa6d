//! SMTP handshake probing ("callout verification").
//!
//! [`probe_deliverability`] walks the MX candidates in priority order, runs
//! greeting → EHLO → `MAIL FROM` → `RCPT TO` → `QUIT` against each one and stops at the first
//! decisive reply. No `DATA` is ever sent.

mod error;
mod options;
mod probe;
mod session;
mod types;

pub use error::SessionError;
pub use options::{DEFAULT_HELO_DOMAIN, DEFAULT_SENDER, SmtpProbeOptions};
pub use probe::probe_deliverability;
pub use types::{
    AttemptOutcome, AttemptStage, ProbeOutcome, ProbeReport, ServerAttempt, SmtpEvent, SmtpReply,
};

#[cfg(test)]
pub(crate) use probe::tests as mock;

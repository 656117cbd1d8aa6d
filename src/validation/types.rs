use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::mx::{MxError, MxRecord};
use crate::smtp_verify::{AttemptOutcome, ProbeOutcome, ProbeReport, ServerAttempt};

pub(crate) const SYNTAX_ERROR: &str = "Invalid email format";
pub(crate) const NO_MX_ERROR: &str = "No MX records found for domain";
pub(crate) const REJECTED_ERROR: &str = "Email address does not exist";
pub(crate) const TEMPORARY_REASON: &str = "Temporary server issue";
pub(crate) const UNREACHABLE_ERROR: &str = "Unable to connect to any SMTP server";
pub(crate) const TIMEOUT_ERROR: &str = "SMTP servers timed out";
pub(crate) const INCONCLUSIVE_ERROR: &str = "No SMTP server gave a decisive answer";
pub(crate) const CANCELLED_ERROR: &str = "Validation cancelled before completion";

/// Which signal decided (or spoiled) a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InvalidSyntax,
    NoMxRecords,
    DnsUnavailable,
    SmtpConnectFailure,
    SmtpTimeout,
    SmtpRejected,
    /// 451/452 from `RCPT TO`; the address still counts as deliverable.
    SmtpTemporaryFailure,
    SmtpInconclusive,
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidSyntax => "invalid_syntax",
            Self::NoMxRecords => "no_mx_records",
            Self::DnsUnavailable => "dns_unavailable",
            Self::SmtpConnectFailure => "smtp_connect_failure",
            Self::SmtpTimeout => "smtp_timeout",
            Self::SmtpRejected => "smtp_rejected",
            Self::SmtpTemporaryFailure => "smtp_temporary_failure",
            Self::SmtpInconclusive => "smtp_inconclusive",
            Self::Cancelled => "cancelled",
        })
    }
}

/// What the SMTP stage reported, when it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpDetail {
    /// Exchange that produced the decisive reply.
    pub server: Option<String>,
    pub code: Option<u16>,
    pub message: Option<String>,
    /// Qualifies a verdict that is not a clean accept or reject.
    pub reason: Option<String>,
}

/// Verdict for one address. Built by the orchestrator and never modified after it is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRecord {
    pub address: String,
    pub syntax_ok: bool,
    pub dns_ok: bool,
    pub smtp_ok: bool,
    pub overall_valid: bool,
    /// Sorted by ascending priority; empty unless the DNS gate passed.
    pub mx_records: Vec<MxRecord>,
    pub smtp_detail: Option<SmtpDetail>,
    pub reason: Option<FailureReason>,
    pub syntax_error: Option<String>,
    pub dns_error: Option<String>,
    pub smtp_error: Option<String>,
    /// Per-server transcript, kept only when transcript recording is enabled.
    pub attempts: Vec<ServerAttempt>,
    pub cancelled: bool,
}

impl ValidationRecord {
    pub(crate) fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            syntax_ok: false,
            dns_ok: false,
            smtp_ok: false,
            overall_valid: false,
            mx_records: Vec::new(),
            smtp_detail: None,
            reason: None,
            syntax_error: None,
            dns_error: None,
            smtp_error: None,
            attempts: Vec::new(),
            cancelled: false,
        }
    }

    pub(crate) fn syntax_failed(mut self) -> Self {
        self.reason = Some(FailureReason::InvalidSyntax);
        self.syntax_error = Some(SYNTAX_ERROR.to_string());
        self.finish()
    }

    pub(crate) fn syntax_passed(mut self) -> Self {
        self.syntax_ok = true;
        self
    }

    pub(crate) fn dns_failed(mut self, err: &MxError) -> Self {
        if err.is_missing_mail_capability() {
            self.reason = Some(FailureReason::NoMxRecords);
            self.dns_error = Some(NO_MX_ERROR.to_string());
        } else {
            self.reason = Some(FailureReason::DnsUnavailable);
            self.dns_error = Some(format!("DNS lookup failed: {err}"));
        }
        self.finish()
    }

    pub(crate) fn dns_passed(mut self, records: Vec<MxRecord>) -> Self {
        self.dns_ok = true;
        self.mx_records = records;
        self
    }

    pub(crate) fn with_probe(mut self, report: ProbeReport, keep_transcript: bool) -> Self {
        let reply = report.outcome.reply();
        let mut detail = SmtpDetail {
            server: report.server.clone(),
            code: reply.map(|r| r.code),
            message: reply.map(|r| r.message.clone()),
            reason: None,
        };

        self.smtp_ok = report.outcome.is_deliverable();
        match &report.outcome {
            ProbeOutcome::Accepted(_) => {}
            ProbeOutcome::TemporaryFailure(_) => {
                self.reason = Some(FailureReason::SmtpTemporaryFailure);
                detail.reason = Some(TEMPORARY_REASON.to_string());
            }
            ProbeOutcome::Rejected(_) => {
                self.reason = Some(FailureReason::SmtpRejected);
                detail.reason = Some(REJECTED_ERROR.to_string());
                self.smtp_error = Some(REJECTED_ERROR.to_string());
            }
            ProbeOutcome::Unreachable => {
                let (reason, message) = exhausted_reason(&report.attempts);
                self.reason = Some(reason);
                detail.reason = Some(message.to_string());
                self.smtp_error = Some(message.to_string());
            }
        }

        self.smtp_detail = Some(detail);
        if keep_transcript {
            self.attempts = report.attempts;
        }
        self.finish()
    }

    pub(crate) fn probe_budget_exhausted(mut self, budget: Duration) -> Self {
        let message = format!("SMTP probe exceeded its {} ms budget", budget.as_millis());
        self.reason = Some(FailureReason::SmtpTimeout);
        self.smtp_detail = Some(SmtpDetail {
            server: None,
            code: None,
            message: None,
            reason: Some(message.clone()),
        });
        self.smtp_error = Some(message);
        self.finish()
    }

    /// Record for an address whose validation was cancelled. The pure syntax check still
    /// runs: a malformed address is reported as such, a well-formed one as cancelled with the
    /// network checks false.
    pub(crate) fn cancelled(address: &str) -> Self {
        let normalized = crate::validator::normalize_address(address);
        let mut record = Self::new(normalized.as_str());
        if !crate::validator::check_syntax(normalized.as_str()) {
            return record.syntax_failed();
        }
        record.syntax_ok = true;
        record.reason = Some(FailureReason::Cancelled);
        record.cancelled = true;
        record.finish()
    }

    fn finish(mut self) -> Self {
        self.overall_valid = self.syntax_ok && self.dns_ok && self.smtp_ok;
        self
    }

    /// The first error message in pipeline order, if any.
    pub fn error_message(&self) -> Option<&str> {
        if self.cancelled {
            return Some(CANCELLED_ERROR);
        }
        self.syntax_error
            .as_deref()
            .or(self.dns_error.as_deref())
            .or(self.smtp_error.as_deref())
    }
}

/// Why the MX list was exhausted without a decisive answer.
fn exhausted_reason(attempts: &[ServerAttempt]) -> (FailureReason, &'static str) {
    let network_only = attempts.iter().all(|a| {
        matches!(
            a.outcome,
            AttemptOutcome::Unreachable { .. } | AttemptOutcome::TimedOut { .. }
        )
    });
    if !network_only {
        return (FailureReason::SmtpInconclusive, INCONCLUSIVE_ERROR);
    }
    let any_timeout = attempts
        .iter()
        .any(|a| matches!(a.outcome, AttemptOutcome::TimedOut { .. }));
    if any_timeout {
        (FailureReason::SmtpTimeout, TIMEOUT_ERROR)
    } else {
        (FailureReason::SmtpConnectFailure, UNREACHABLE_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp_verify::{AttemptStage, SmtpReply};

    fn attempt(outcome: AttemptOutcome) -> ServerAttempt {
        let mut attempt = ServerAttempt::new("mx.example.com");
        attempt.outcome = outcome;
        attempt
    }

    #[test]
    fn exhausted_connect_failures() {
        let attempts = [attempt(AttemptOutcome::Unreachable {
            message: "refused".into(),
        })];
        assert_eq!(
            exhausted_reason(&attempts).0,
            FailureReason::SmtpConnectFailure
        );
    }

    #[test]
    fn exhausted_with_timeout() {
        let attempts = [
            attempt(AttemptOutcome::Unreachable {
                message: "refused".into(),
            }),
            attempt(AttemptOutcome::TimedOut {
                stage: AttemptStage::Greeting,
            }),
        ];
        assert_eq!(exhausted_reason(&attempts).0, FailureReason::SmtpTimeout);
    }

    #[test]
    fn exhausted_with_inconclusive_reply() {
        let attempts = [attempt(AttemptOutcome::SenderRefused {
            reply: SmtpReply::new(554, "no"),
        })];
        assert_eq!(exhausted_reason(&attempts).0, FailureReason::SmtpInconclusive);
    }

    #[test]
    fn temporary_failure_is_valid_but_flagged() {
        let report = ProbeReport {
            outcome: ProbeOutcome::TemporaryFailure(SmtpReply::new(452, "mailbox full")),
            server: Some("mx.example.com".into()),
            attempts: Vec::new(),
        };
        let record = ValidationRecord::new("user@example.com")
            .syntax_passed()
            .dns_passed(vec![MxRecord::new(10, "mx.example.com")])
            .with_probe(report, false);
        assert!(record.smtp_ok);
        assert!(record.overall_valid);
        assert_eq!(record.reason, Some(FailureReason::SmtpTemporaryFailure));
        assert_eq!(record.smtp_error, None);
        let detail = record.smtp_detail.expect("detail");
        assert_eq!(detail.code, Some(452));
        assert_eq!(detail.reason.as_deref(), Some(TEMPORARY_REASON));
    }

    #[test]
    fn cancelled_record_keeps_syntax_only() {
        let record = ValidationRecord::cancelled(" User@Example.com ");
        assert_eq!(record.address, "user@example.com");
        assert!(record.syntax_ok);
        assert!(!record.dns_ok && !record.smtp_ok && !record.overall_valid);
        assert_eq!(record.error_message(), Some(CANCELLED_ERROR));
    }

    #[test]
    fn cancelled_malformed_address_reports_syntax_failure() {
        let record = ValidationRecord::cancelled("not-an-email");
        assert!(!record.cancelled);
        assert!(!record.syntax_ok);
        assert_eq!(record.reason, Some(FailureReason::InvalidSyntax));
        assert_eq!(record.error_message(), Some(SYNTAX_ERROR));
    }
}

//! Orchestration: syntax gate, then MX lookup, then SMTP probe, folded into one
//! [`ValidationRecord`] per address.
//!
//! Each stage runs only when the previous one passed. Bulk validation probes up to
//! `max_concurrency` addresses at once and returns records in input order.

mod error;
mod report;
mod types;

pub use error::ValidatorError;
pub use types::{FailureReason, SmtpDetail, ValidationRecord};

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trust_dns_resolver::TokioAsyncResolver;

use crate::config::ProbeConfig;
use crate::mx::{LookupMx, build_resolver, resolve_mx};
use crate::smtp_verify::probe_deliverability;
use crate::validator::{check_syntax, normalize_address};

/// Validates addresses against one shared, read-only configuration.
pub struct Validator<R = TokioAsyncResolver> {
    resolver: R,
    config: ProbeConfig,
}

impl Validator<TokioAsyncResolver> {
    /// Validate `config` and build the system (or configured) DNS resolver.
    pub fn new(config: ProbeConfig) -> Result<Self, ValidatorError> {
        config.validate()?;
        let resolver = build_resolver(config.dns_timeout, &config.dns_servers)?;
        Ok(Self { resolver, config })
    }
}

impl<R: LookupMx> Validator<R> {
    /// Use a caller-supplied MX lookup. `config` is taken as-is.
    pub fn with_resolver(resolver: R, config: ProbeConfig) -> Self {
        Self { resolver, config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run the full pipeline for one address. Never fails; every problem is recorded in the
    /// returned verdict.
    pub async fn validate_one(&self, raw: &str) -> ValidationRecord {
        let address = normalize_address(raw);
        let record = ValidationRecord::new(address.as_str());

        let domain = match address.domain() {
            Some(domain) if check_syntax(address.as_str()) => domain,
            _ => {
                debug!(target: "validation", "{} failed syntax check", address);
                return record.syntax_failed();
            }
        };
        let record = record.syntax_passed();

        let mx_records = match resolve_mx(&self.resolver, domain, self.config.dns_timeout).await {
            Ok(records) => records,
            Err(err) => {
                debug!(target: "validation", "{}: MX lookup failed: {}", address, err);
                return record.dns_failed(&err);
            }
        };
        let record = record.dns_passed(mx_records);

        let probe = probe_deliverability(address.as_str(), &record.mx_records, &self.config.smtp);
        let report = match self.config.address_budget {
            Some(budget) => tokio::time::timeout(budget, probe)
                .await
                .map_err(|_| budget),
            None => Ok(probe.await),
        };
        let record = match report {
            Ok(report) => record.with_probe(report, self.config.record_transcript),
            Err(budget) => {
                warn!(
                    target: "validation",
                    "{}: SMTP probe exceeded {:?} budget", address, budget
                );
                record.probe_budget_exhausted(budget)
            }
        };

        info!(
            target: "validation",
            "{} valid={} reason={}",
            record.address,
            record.overall_valid,
            record
                .reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
        record
    }

    /// Validate every address, returning records in input order.
    pub async fn validate_bulk<S: AsRef<str>>(&self, addresses: &[S]) -> Vec<ValidationRecord> {
        self.validate_bulk_with_cancel(addresses, &CancellationToken::new())
            .await
    }

    /// Like [`validate_bulk`](Self::validate_bulk), but stops early once `cancel` fires.
    ///
    /// In-flight and not-yet-started addresses then resolve to cancelled records (malformed
    /// ones still report their syntax failure), so the output has one record per input
    /// address.
    pub async fn validate_bulk_with_cancel<S: AsRef<str>>(
        &self,
        addresses: &[S],
        cancel: &CancellationToken,
    ) -> Vec<ValidationRecord> {
        let limit = self.config.max_concurrency.max(1);
        debug!(
            target: "validation",
            "validating {} addresses with concurrency {}",
            addresses.len(),
            limit
        );
        stream::iter(addresses)
            .map(|address| self.validate_until_cancelled(address.as_ref(), cancel))
            .buffered(limit)
            .collect()
            .await
    }

    async fn validate_until_cancelled(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> ValidationRecord {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(target: "validation", "{} cancelled", address);
                ValidationRecord::cancelled(address)
            }
            record = self.validate_one(address) => record,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::mx::tests::StubResolver;
    use crate::mx::{MxError, MxRecord};
    use crate::smtp_verify::mock::{Script, spawn_mock_server, test_options};
    use crate::smtp_verify::{AttemptOutcome, AttemptStage};

    struct HangingResolver;

    #[async_trait]
    impl LookupMx for HangingResolver {
        async fn lookup_mx(&self, _domain: &str) -> Result<Vec<MxRecord>, MxError> {
            std::future::pending().await
        }
    }

    fn config_for_port(port: u16) -> ProbeConfig {
        ProbeConfig {
            dns_timeout: Duration::from_secs(2),
            smtp: test_options(port),
            ..ProbeConfig::default()
        }
    }

    fn no_mx() -> StubResolver {
        StubResolver::new(|domain| {
            Err(MxError::NoRecords {
                domain: domain.to_string(),
            })
        })
    }

    #[tokio::test]
    async fn invalid_syntax_skips_network() {
        let validator = Validator::with_resolver(no_mx(), ProbeConfig::default());
        let record = validator.validate_one("not-an-email").await;

        assert!(!record.syntax_ok && !record.dns_ok && !record.smtp_ok);
        assert!(!record.overall_valid);
        assert_eq!(record.reason, Some(FailureReason::InvalidSyntax));
        assert_eq!(record.syntax_error.as_deref(), Some("Invalid email format"));
        assert_eq!(validator.resolver.calls(), 0);
    }

    #[tokio::test]
    async fn missing_mx_stops_before_smtp() {
        let validator = Validator::with_resolver(no_mx(), ProbeConfig::default());
        let record = validator.validate_one("user@no-mx.example").await;

        assert!(record.syntax_ok);
        assert!(!record.dns_ok && !record.smtp_ok && !record.overall_valid);
        assert_eq!(record.reason, Some(FailureReason::NoMxRecords));
        assert_eq!(
            record.dns_error.as_deref(),
            Some("No MX records found for domain")
        );
        assert!(record.mx_records.is_empty());
        assert!(record.smtp_detail.is_none());
        assert!(record.attempts.is_empty());
    }

    #[tokio::test]
    async fn dns_failure_is_distinguished_from_missing_mx() {
        let stub = StubResolver::new(|_| {
            Err(MxError::lookup(
                trust_dns_resolver::error::ResolveError::from("SERVFAIL"),
            ))
        });
        let validator = Validator::with_resolver(stub, ProbeConfig::default());
        let record = validator.validate_one("user@example.com").await;

        assert!(!record.dns_ok);
        assert_eq!(record.reason, Some(FailureReason::DnsUnavailable));
        assert!(
            record
                .dns_error
                .as_deref()
                .is_some_and(|e| e.starts_with("DNS lookup failed"))
        );
    }

    #[tokio::test]
    async fn input_is_normalized_before_validation() {
        let validator = Validator::with_resolver(no_mx(), ProbeConfig::default());
        let record = validator.validate_one("  User@Example.COM ").await;
        assert_eq!(record.address, "user@example.com");
        assert!(record.syntax_ok);
    }

    #[tokio::test]
    async fn accepted_after_unreachable_primary() {
        let server = spawn_mock_server(vec![Script::rcpt("250 2.1.5 Ok\r\n")]).await;
        let stub = StubResolver::with_records(vec![
            MxRecord::new(20, "127.0.0.1"),
            MxRecord::new(10, "127.0.0.2"),
        ]);
        let mut config = config_for_port(server.port);
        config.record_transcript = true;
        let validator = Validator::with_resolver(stub, config);

        let record = validator.validate_one("user@example.com").await;

        assert!(record.overall_valid);
        assert_eq!(
            record.mx_records,
            vec![MxRecord::new(10, "127.0.0.2"), MxRecord::new(20, "127.0.0.1")]
        );
        let detail = record.smtp_detail.as_ref().expect("smtp detail");
        assert_eq!(detail.server.as_deref(), Some("127.0.0.1"));
        assert_eq!(detail.code, Some(250));
        assert_eq!(record.attempts.len(), 2);
        assert!(matches!(
            record.attempts[0].outcome,
            AttemptOutcome::Unreachable { .. } | AttemptOutcome::TimedOut { .. }
        ));
        assert!(matches!(
            record.attempts[1].outcome,
            AttemptOutcome::Accepted { .. }
        ));
    }

    #[tokio::test]
    async fn rejected_mailbox_is_invalid() {
        let server =
            spawn_mock_server(vec![Script::rcpt("550 5.1.1 User unknown\r\n")]).await;
        let stub = StubResolver::with_records(vec![MxRecord::new(10, "127.0.0.1")]);
        let validator = Validator::with_resolver(stub, config_for_port(server.port));

        let record = validator.validate_one("ghost@example.com").await;

        assert!(record.dns_ok);
        assert!(!record.smtp_ok && !record.overall_valid);
        assert_eq!(record.reason, Some(FailureReason::SmtpRejected));
        assert_eq!(
            record.smtp_error.as_deref(),
            Some("Email address does not exist")
        );
        assert!(record.attempts.is_empty(), "transcript is off by default");
    }

    #[tokio::test]
    async fn temporary_failure_counts_as_valid() {
        let server =
            spawn_mock_server(vec![Script::rcpt("451 4.7.1 Greylisted\r\n")]).await;
        let stub = StubResolver::with_records(vec![MxRecord::new(10, "127.0.0.1")]);
        let validator = Validator::with_resolver(stub, config_for_port(server.port));

        let record = validator.validate_one("user@example.com").await;

        assert!(record.smtp_ok && record.overall_valid);
        assert_eq!(record.reason, Some(FailureReason::SmtpTemporaryFailure));
        let detail = record.smtp_detail.expect("detail");
        assert_eq!(detail.code, Some(451));
        assert_eq!(detail.reason.as_deref(), Some("Temporary server issue"));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let server = spawn_mock_server(vec![Script::silent()]).await;
        let stub = StubResolver::with_records(vec![MxRecord::new(10, "127.0.0.1")]);
        let mut config = config_for_port(server.port);
        config.smtp.command_timeout = Duration::from_millis(200);
        config.record_transcript = true;
        let validator = Validator::with_resolver(stub, config);

        let record = validator.validate_one("user@example.com").await;

        assert!(!record.smtp_ok);
        assert_eq!(record.reason, Some(FailureReason::SmtpTimeout));
        assert!(matches!(
            record.attempts[0].outcome,
            AttemptOutcome::TimedOut {
                stage: AttemptStage::Greeting
            }
        ));
    }

    #[tokio::test]
    async fn address_budget_bounds_the_probe() {
        let server = spawn_mock_server(vec![Script::silent()]).await;
        let stub = StubResolver::with_records(vec![MxRecord::new(10, "127.0.0.1")]);
        let mut config = config_for_port(server.port);
        config.address_budget = Some(Duration::from_millis(100));
        let validator = Validator::with_resolver(stub, config);

        let started = std::time::Instant::now();
        let record = validator.validate_one("user@example.com").await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(record.dns_ok && !record.smtp_ok);
        assert_eq!(record.reason, Some(FailureReason::SmtpTimeout));
    }

    #[tokio::test]
    async fn bulk_preserves_input_order() {
        let stub = StubResolver::new(|domain| {
            Err(MxError::NoRecords {
                domain: domain.to_string(),
            })
        });
        let config = ProbeConfig {
            max_concurrency: 2,
            ..ProbeConfig::default()
        };
        let validator = Validator::with_resolver(stub, config);
        let inputs = ["a@one.example", "bogus", "c@three.example", "a@one.example"];

        let records = validator.validate_bulk(&inputs).await;

        let emails: Vec<_> = records.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(emails, inputs);
        assert!(!records[1].syntax_ok);
        assert!(records[0].syntax_ok && records[2].syntax_ok);
        assert_eq!(records[0], records[3]);
    }

    #[tokio::test]
    async fn bulk_of_nothing_is_empty() {
        let validator = Validator::with_resolver(no_mx(), ProbeConfig::default());
        let records = validator.validate_bulk::<&str>(&[]).await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn cancellation_returns_a_record_per_address() {
        let validator = Validator::with_resolver(HangingResolver, ProbeConfig::default());
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let inputs = ["a@hang.example", "not-an-email", "b@hang.example"];
        let records = tokio::time::timeout(
            Duration::from_secs(2),
            validator.validate_bulk_with_cancel(&inputs, &token),
        )
        .await
        .expect("cancellation ends the run promptly");

        assert_eq!(records.len(), 3);
        assert!(records[0].cancelled && records[2].cancelled);
        assert!(records[0].syntax_ok);
        assert!(!records[0].dns_ok && !records[0].overall_valid);
        assert!(!records[1].cancelled);
        assert_eq!(records[1].reason, Some(FailureReason::InvalidSyntax));
    }

    #[tokio::test]
    async fn pending_malformed_address_is_not_reported_cancelled() {
        let validator = Validator::with_resolver(HangingResolver, ProbeConfig::default());
        let token = CancellationToken::new();
        token.cancel();

        let records = validator
            .validate_bulk_with_cancel(&["a@hang.example", "not-an-email"], &token)
            .await;

        assert!(records[0].cancelled);
        assert_eq!(records[0].reason, Some(FailureReason::Cancelled));
        assert!(!records[1].cancelled);
        assert_eq!(records[1].reason, Some(FailureReason::InvalidSyntax));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = ProbeConfig {
            max_concurrency: 0,
            ..ProbeConfig::default()
        };
        assert!(matches!(
            Validator::new(config),
            Err(ValidatorError::Config(_))
        ));
    }
}

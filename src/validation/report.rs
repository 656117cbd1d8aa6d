//! JSON shape of a [`ValidationRecord`].
//!
//! ```json
//! {
//!   "email": "user@example.com",
//!   "valid": true,
//!   "checks": { "syntax": true, "dns": true, "smtp": true },
//!   "details": {
//!     "mx_records": [{ "priority": 10, "exchange": "mx.example.com" }],
//!     "smtp": { "valid": true, "mx_server": "mx.example.com", "smtp_code": 250, "message": "Ok" }
//!   }
//! }
//! ```
//!
//! Keys with nothing to report are omitted rather than written as `null`.

use serde::{Serialize, Serializer};

use super::types::{SmtpDetail, ValidationRecord};
use crate::mx::MxRecord;
use crate::smtp_verify::ServerAttempt;

#[derive(Serialize)]
struct RecordView<'a> {
    email: &'a str,
    valid: bool,
    checks: ChecksView,
    details: DetailsView<'a>,
}

#[derive(Serialize)]
struct ChecksView {
    syntax: bool,
    dns: bool,
    smtp: bool,
}

#[derive(Serialize)]
struct DetailsView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    syntax_error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dns_error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mx_records: Option<&'a [MxRecord]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    smtp: Option<SmtpView<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    smtp_error: Option<&'a str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    attempts: &'a [ServerAttempt],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    cancelled: bool,
}

#[derive(Serialize)]
struct SmtpView<'a> {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    mx_server: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    smtp_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

impl<'a> SmtpView<'a> {
    fn new(valid: bool, detail: &'a SmtpDetail) -> Self {
        Self {
            valid,
            mx_server: detail.server.as_deref(),
            smtp_code: detail.code,
            message: detail.message.as_deref(),
            reason: detail.reason.as_deref(),
        }
    }
}

impl<'a> From<&'a ValidationRecord> for RecordView<'a> {
    fn from(record: &'a ValidationRecord) -> Self {
        Self {
            email: &record.address,
            valid: record.overall_valid,
            checks: ChecksView {
                syntax: record.syntax_ok,
                dns: record.dns_ok,
                smtp: record.smtp_ok,
            },
            details: DetailsView {
                syntax_error: record.syntax_error.as_deref(),
                dns_error: record.dns_error.as_deref(),
                mx_records: record.dns_ok.then_some(record.mx_records.as_slice()),
                smtp: record
                    .smtp_detail
                    .as_ref()
                    .map(|detail| SmtpView::new(record.smtp_ok, detail)),
                smtp_error: record.smtp_error.as_deref(),
                attempts: &record.attempts,
                cancelled: record.cancelled,
            },
        }
    }
}

impl Serialize for ValidationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RecordView::from(self).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp_verify::{ProbeOutcome, ProbeReport, SmtpReply};
    use serde_json::json;

    #[test]
    fn invalid_syntax_shape() {
        let record = ValidationRecord::new("not-an-email").syntax_failed();
        insta::assert_json_snapshot!(record, @r###"
        {
          "email": "not-an-email",
          "valid": false,
          "checks": {
            "syntax": false,
            "dns": false,
            "smtp": false
          },
          "details": {
            "syntax_error": "Invalid email format"
          }
        }
        "###);
    }

    #[test]
    fn accepted_shape_has_mx_and_smtp_details() {
        let report = ProbeReport {
            outcome: ProbeOutcome::Accepted(SmtpReply::new(250, "2.1.5 Ok")),
            server: Some("mx1.example.com".into()),
            attempts: Vec::new(),
        };
        let record = ValidationRecord::new("user@example.com")
            .syntax_passed()
            .dns_passed(vec![
                MxRecord::new(10, "mx1.example.com"),
                MxRecord::new(20, "mx2.example.com"),
            ])
            .with_probe(report, false);

        let value = serde_json::to_value(&record).expect("serializes");
        assert_eq!(
            value,
            json!({
                "email": "user@example.com",
                "valid": true,
                "checks": { "syntax": true, "dns": true, "smtp": true },
                "details": {
                    "mx_records": [
                        { "priority": 10, "exchange": "mx1.example.com" },
                        { "priority": 20, "exchange": "mx2.example.com" }
                    ],
                    "smtp": {
                        "valid": true,
                        "mx_server": "mx1.example.com",
                        "smtp_code": 250,
                        "message": "2.1.5 Ok"
                    }
                }
            })
        );
    }

    #[test]
    fn unreachable_shape_reports_smtp_error() {
        let record = ValidationRecord::new("user@example.com")
            .syntax_passed()
            .dns_passed(vec![MxRecord::new(10, "mx1.example.com")])
            .with_probe(ProbeReport::unreachable(Vec::new()), false);

        let value = serde_json::to_value(&record).expect("serializes");
        assert_eq!(value["valid"], json!(false));
        assert_eq!(value["checks"]["smtp"], json!(false));
        assert_eq!(
            value["details"]["smtp_error"],
            json!("Unable to connect to any SMTP server")
        );
        assert!(value["details"]["smtp"].get("mx_server").is_none());
        assert!(value["details"].get("attempts").is_none());
    }

    #[test]
    fn cancelled_flag_only_on_cancelled_records() {
        let value = serde_json::to_value(ValidationRecord::cancelled("a@b.co")).expect("json");
        assert_eq!(value["details"]["cancelled"], json!(true));
        let value =
            serde_json::to_value(ValidationRecord::new("x").syntax_failed()).expect("json");
        assert!(value["details"].get("cancelled").is_none());
    }
}

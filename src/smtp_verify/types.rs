use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStage {
    Connect,
    Greeting,
    Ehlo,
    Helo,
    MailFrom,
    RcptTo,
    Quit,
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Ehlo => "EHLO",
            Self::Helo => "HELO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Quit => "QUIT",
        })
    }
}

/// A raw SMTP reply, preserving the numeric status code and message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// A recorded transcript event used for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SmtpEvent {
    Sent {
        stage: AttemptStage,
        command: String,
    },
    Received {
        stage: AttemptStage,
        reply: SmtpReply,
    },
    Error {
        stage: AttemptStage,
        message: String,
    },
}

/// Result of interrogating a single MX host.
///
/// Only `Accepted`, `Rejected` and `TemporaryFailure` end the MX iteration; everything else
/// moves on to the next candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted { reply: SmtpReply },
    Rejected { reply: SmtpReply },
    TemporaryFailure { reply: SmtpReply },
    /// `MAIL FROM` answered with something other than 250.
    SenderRefused { reply: SmtpReply },
    Inconclusive { stage: AttemptStage, reply: SmtpReply },
    Unreachable { message: String },
    TimedOut { stage: AttemptStage },
    ProtocolError { stage: AttemptStage, message: String },
}

impl AttemptOutcome {
    pub fn decisive(&self) -> Option<ProbeOutcome> {
        match self {
            Self::Accepted { reply } => Some(ProbeOutcome::Accepted(reply.clone())),
            Self::Rejected { reply } => Some(ProbeOutcome::Rejected(reply.clone())),
            Self::TemporaryFailure { reply } => Some(ProbeOutcome::TemporaryFailure(reply.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted { reply } => write!(f, "accepted ({})", reply.code),
            Self::Rejected { reply } => write!(f, "rejected ({} {})", reply.code, reply.message),
            Self::TemporaryFailure { reply } => {
                write!(f, "temporary failure ({} {})", reply.code, reply.message)
            }
            Self::SenderRefused { reply } => write!(f, "MAIL FROM refused ({})", reply.code),
            Self::Inconclusive { stage, reply } => {
                write!(f, "inconclusive {stage} reply ({})", reply.code)
            }
            Self::Unreachable { message } => write!(f, "unreachable: {message}"),
            Self::TimedOut { stage } => write!(f, "timed out during {stage}"),
            Self::ProtocolError { stage, message } => {
                write!(f, "protocol error during {stage}: {message}")
            }
        }
    }
}

/// Detailed report for a single SMTP server interrogation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerAttempt {
    pub exchange: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub events: Vec<SmtpEvent>,
    pub outcome: AttemptOutcome,
}

impl ServerAttempt {
    pub fn new(exchange: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            address: None,
            events: Vec::new(),
            outcome: AttemptOutcome::Unreachable {
                message: "not attempted".to_string(),
            },
        }
    }
}

/// Verdict of a whole probe session across the MX candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Accepted(SmtpReply),
    Rejected(SmtpReply),
    /// 451/452: counted as provisionally deliverable.
    TemporaryFailure(SmtpReply),
    Unreachable,
}

impl ProbeOutcome {
    /// `Accepted` and `TemporaryFailure` both count as deliverable.
    pub fn is_deliverable(&self) -> bool {
        matches!(self, Self::Accepted(_) | Self::TemporaryFailure(_))
    }

    pub fn reply(&self) -> Option<&SmtpReply> {
        match self {
            Self::Accepted(reply) | Self::Rejected(reply) | Self::TemporaryFailure(reply) => {
                Some(reply)
            }
            Self::Unreachable => None,
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted(_) => f.write_str("accepted"),
            Self::Rejected(reply) => write!(f, "rejected ({} {})", reply.code, reply.message),
            Self::TemporaryFailure(reply) => {
                write!(f, "temporary failure ({} {})", reply.code, reply.message)
            }
            Self::Unreachable => f.write_str("all servers unreachable"),
        }
    }
}

/// Final report produced by [`probe_deliverability`](super::probe_deliverability).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub outcome: ProbeOutcome,
    /// Exchange that gave the decisive answer.
    pub server: Option<String>,
    pub attempts: Vec<ServerAttempt>,
}

impl ProbeReport {
    pub fn unreachable(attempts: Vec<ServerAttempt>) -> Self {
        Self {
            outcome: ProbeOutcome::Unreachable,
            server: None,
            attempts,
        }
    }
}

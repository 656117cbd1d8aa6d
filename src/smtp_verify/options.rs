use std::time::Duration;

pub const DEFAULT_HELO_DOMAIN: &str = "emailvalidator.com";
pub const DEFAULT_SENDER: &str = "test@emailvalidator.com";

/// Configuration knobs for [`probe_deliverability`](super::probe_deliverability).
///
/// The HELO identity and envelope sender are generic on purpose: the probe never announces the
/// operator's own hostnames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpProbeOptions {
    pub port: u16,
    pub helo_domain: String,
    pub sender: String,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub max_mx: usize,
}

impl Default for SmtpProbeOptions {
    fn default() -> Self {
        Self {
            port: 25,
            helo_domain: DEFAULT_HELO_DOMAIN.to_string(),
            sender: DEFAULT_SENDER.to_string(),
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(10),
            max_mx: 5,
        }
    }
}

impl SmtpProbeOptions {
    pub fn ehlo_command(&self) -> String {
        format!("EHLO {}", self.helo_domain)
    }

    pub fn helo_command(&self) -> String {
        format!("HELO {}", self.helo_domain)
    }

    pub fn mail_from_command(&self) -> String {
        format!("MAIL FROM:<{}>", self.sender)
    }
}

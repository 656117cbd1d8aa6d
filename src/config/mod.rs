//! Runtime configuration for the prober: defaults, TOML overlay and validation.
//!
//! A [`ProbeConfig`] is built once and then shared read-only by every validation; nothing in
//! the library mutates it after construction.

mod error;
mod file;

pub use error::ConfigError;
pub use file::ConfigFile;

use std::path::Path;
use std::time::Duration;

use crate::smtp_verify::SmtpProbeOptions;

/// Everything a validation run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub dns_timeout: Duration,
    /// Explicit nameserver IPs; empty means the system resolver configuration.
    pub dns_servers: Vec<String>,
    pub smtp: SmtpProbeOptions,
    /// Addresses probed concurrently by bulk validation.
    pub max_concurrency: usize,
    /// Wall-clock ceiling for the SMTP stage of a single address.
    pub address_budget: Option<Duration>,
    /// Keep the per-server SMTP transcript in each record.
    pub record_transcript: bool,
    pub loaded_config_path: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            dns_timeout: Duration::from_secs(5),
            dns_servers: Vec::new(),
            smtp: SmtpProbeOptions::default(),
            max_concurrency: 8,
            address_budget: None,
            record_transcript: false,
            loaded_config_path: None,
        }
    }
}

impl ProbeConfig {
    /// Defaults overlaid with the TOML file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = ConfigFile::load(path)?;
        let mut config = Self::default();
        config.apply_file(&file);
        config.loaded_config_path = Some(path.display().to_string());
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Overwrite every field the file sets; unset fields keep their current value.
    pub fn apply_file(&mut self, file: &ConfigFile) {
        if let Some(ms) = file.dns.timeout_ms {
            self.dns_timeout = Duration::from_millis(ms);
        }
        if let Some(servers) = &file.dns.servers {
            self.dns_servers = servers.clone();
        }

        let smtp = &file.smtp;
        if let Some(port) = smtp.port {
            self.smtp.port = port;
        }
        if let Some(helo) = &smtp.helo_domain {
            self.smtp.helo_domain = helo.clone();
        }
        if let Some(sender) = &smtp.sender {
            self.smtp.sender = sender.clone();
        }
        if let Some(ms) = smtp.connect_timeout_ms {
            self.smtp.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = smtp.command_timeout_ms {
            self.smtp.command_timeout = Duration::from_millis(ms);
        }
        if let Some(max_mx) = smtp.max_mx {
            self.smtp.max_mx = max_mx;
        }

        if let Some(n) = file.bulk.max_concurrency {
            self.max_concurrency = n;
        }
        if let Some(ms) = file.bulk.address_budget_ms {
            self.address_budget = Some(Duration::from_millis(ms));
        }
        if let Some(record) = file.bulk.record_transcript {
            self.record_transcript = record;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dns_timeout.is_zero() {
            return Err(ConfigError::invalid("DNS timeout must be greater than zero"));
        }
        if self.smtp.connect_timeout.is_zero() || self.smtp.command_timeout.is_zero() {
            return Err(ConfigError::invalid("SMTP timeouts must be greater than zero"));
        }
        if self.address_budget.is_some_and(|budget| budget.is_zero()) {
            return Err(ConfigError::invalid("address budget must be greater than zero"));
        }
        if self.smtp.max_mx == 0 {
            return Err(ConfigError::invalid("max_mx must be at least 1"));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::invalid("max_concurrency must be at least 1"));
        }
        if self.smtp.port == 0 {
            return Err(ConfigError::invalid("SMTP port must be non-zero"));
        }
        let helo = self.smtp.helo_domain.trim();
        if helo.is_empty() || helo.contains(char::is_whitespace) {
            return Err(ConfigError::invalid(format!(
                "HELO domain '{}' is not a hostname",
                self.smtp.helo_domain
            )));
        }
        if !crate::validator::check_syntax(&self.smtp.sender) {
            return Err(ConfigError::invalid(format!(
                "sender '{}' is not a valid address",
                self.smtp.sender
            )));
        }
        Ok(())
    }
}

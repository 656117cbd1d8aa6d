//! Structure mirroring the TOML configuration file.
//!
//! ```toml
//! [dns]
//! timeout_ms = 3000
//! servers = ["1.1.1.1", "8.8.8.8"]
//!
//! [smtp]
//! port = 25
//! helo_domain = "probe.example"
//! sender = "probe@probe.example"
//! connect_timeout_ms = 5000
//! command_timeout_ms = 5000
//! max_mx = 3
//!
//! [bulk]
//! max_concurrency = 16
//! address_budget_ms = 30000
//! record_transcript = false
//! ```

use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub(crate) dns: DnsSection,
    #[serde(default)]
    pub(crate) smtp: SmtpSection,
    #[serde(default)]
    pub(crate) bulk: BulkSection,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct DnsSection {
    pub(crate) timeout_ms: Option<u64>,
    pub(crate) servers: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct SmtpSection {
    pub(crate) port: Option<u16>,
    pub(crate) helo_domain: Option<String>,
    pub(crate) sender: Option<String>,
    pub(crate) connect_timeout_ms: Option<u64>,
    pub(crate) command_timeout_ms: Option<u64>,
    pub(crate) max_mx: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct BulkSection {
    pub(crate) max_concurrency: Option<usize>,
    pub(crate) address_budget_ms: Option<u64>,
    pub(crate) record_transcript: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

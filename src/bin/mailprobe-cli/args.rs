use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};
use mailprobe_lib::ProbeConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Ndjson,
    Human,
    Csv,
}

#[derive(Parser, Debug)]
#[command(
    name = "mailprobe-cli",
    version,
    about = "Check whether email addresses can receive mail (syntax, MX, SMTP RCPT probe)"
)]
pub struct Cli {
    /// address(es) to validate
    #[arg(value_name = "ADDRESS", required_unless_present = "stdin")]
    pub addresses: Vec<String>,

    /// validate several addresses; reports keep input order
    #[arg(long)]
    pub bulk: bool,

    /// read addresses from stdin, one per line (implies --bulk)
    #[arg(long)]
    pub stdin: bool,

    /// output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    pub format: Format,

    /// write the report to a file instead of stdout
    #[arg(long)]
    pub out: Option<String>,

    /// TOML configuration file ([dns], [smtp], [bulk])
    #[arg(long, env = "MAILPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// SMTP connect and per-command timeout (ms)
    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    /// MX lookup timeout (ms)
    #[arg(long = "dns-timeout-ms")]
    pub dns_timeout_ms: Option<u64>,

    /// name announced in EHLO/HELO
    #[arg(long)]
    pub helo: Option<String>,

    /// envelope sender for MAIL FROM
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// maximum number of MX hosts tried per address
    #[arg(long = "max-mx")]
    pub max_mx: Option<usize>,

    /// SMTP port
    #[arg(long)]
    pub port: Option<u16>,

    /// addresses probed at once in bulk mode
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// nameserver IP to query instead of the system resolver (repeatable)
    #[arg(long = "dns-server")]
    pub dns_servers: Vec<String>,

    /// wall-clock budget for the SMTP stage of one address (ms)
    #[arg(long = "budget-ms")]
    pub budget_ms: Option<u64>,

    /// include the per-server SMTP transcript in reports
    #[arg(long)]
    pub transcript: bool,

    /// more logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn is_bulk(&self) -> bool {
        self.bulk || self.stdin
    }

    pub fn check_invocation(&self) -> Result<()> {
        if !self.is_bulk() && self.addresses.len() > 1 {
            bail!(
                "{} addresses given; pass --bulk to validate several",
                self.addresses.len()
            );
        }
        Ok(())
    }

    /// Log filter implied by `-v`/`-q`, if either was given.
    pub fn log_filter(&self) -> Option<&'static str> {
        if self.quiet {
            return Some("error");
        }
        match self.verbose {
            0 => None,
            1 => Some("info"),
            2 => Some("debug"),
            _ => Some("trace"),
        }
    }

    /// Defaults, then the config file, then command-line overrides.
    pub fn probe_config(&self) -> Result<ProbeConfig> {
        let mut config = match &self.config {
            Some(path) => ProbeConfig::from_file(path)
                .with_context(|| format!("load config {}", path.display()))?,
            None => ProbeConfig::default(),
        };

        if let Some(ms) = self.timeout_ms {
            config.smtp.connect_timeout = Duration::from_millis(ms);
            config.smtp.command_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.dns_timeout_ms {
            config.dns_timeout = Duration::from_millis(ms);
        }
        if let Some(helo) = &self.helo {
            config.smtp.helo_domain = helo.clone();
        }
        if let Some(from) = &self.mail_from {
            config.smtp.sender = from.clone();
        }
        if let Some(max_mx) = self.max_mx {
            config.smtp.max_mx = max_mx;
        }
        if let Some(port) = self.port {
            config.smtp.port = port;
        }
        if let Some(n) = self.concurrency {
            config.max_concurrency = n;
        }
        if !self.dns_servers.is_empty() {
            config.dns_servers = self.dns_servers.clone();
        }
        if let Some(ms) = self.budget_ms {
            config.address_budget = Some(Duration::from_millis(ms));
        }
        if self.transcript {
            config.record_transcript = true;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("resolver initialization failed: {message}")]
    ResolverInit { message: String },
    #[error("invalid DNS server address '{server}'")]
    InvalidNameServer { server: String },
    #[error("domain {domain} does not exist")]
    DomainNotFound { domain: String },
    #[error("no MX records found for {domain}")]
    NoRecords { domain: String },
    #[error("MX lookup for {domain} timed out")]
    Timeout { domain: String },
    #[error("MX lookup failed: {source}")]
    Lookup {
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
}

impl MxError {
    pub(crate) fn resolver_init<E: std::fmt::Display>(err: E) -> Self {
        Self::ResolverInit {
            message: err.to_string(),
        }
    }

    pub(crate) fn lookup(source: trust_dns_resolver::error::ResolveError) -> Self {
        Self::Lookup { source }
    }

    /// `true` when DNS answered authoritatively that the domain cannot receive mail,
    /// as opposed to the lookup itself failing.
    pub fn is_missing_mail_capability(&self) -> bool {
        matches!(
            self,
            Self::EmptyDomain | Self::DomainNotFound { .. } | Self::NoRecords { .. }
        )
    }
}

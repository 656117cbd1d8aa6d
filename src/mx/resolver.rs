use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    error::{ResolveError, ResolveErrorKind},
    proto::op::ResponseCode,
    system_conf,
};

use super::{MxError, MxRecord};

/// DNS capability consumed by the prober.
#[async_trait]
pub trait LookupMx: Send + Sync {
    /// Returns the raw MX answer for `domain`, in resolver order.
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, MxError>;
}

#[async_trait]
impl LookupMx for TokioAsyncResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, MxError> {
        let lookup = match TokioAsyncResolver::mx_lookup(self, domain).await {
            Ok(lookup) => lookup,
            Err(err) => return Err(classify_lookup_error(domain, err)),
        };
        let records = lookup
            .iter()
            .map(|mx| MxRecord::new(mx.preference(), mx.exchange().to_utf8()))
            .collect();
        Ok(records)
    }
}

/// Build the production resolver.
///
/// Uses the system configuration unless `servers` lists explicit nameserver IPs. Each query
/// gets a single attempt bounded by `timeout`.
pub fn build_resolver(timeout: Duration, servers: &[String]) -> Result<TokioAsyncResolver, MxError> {
    let (config, mut opts) = if servers.is_empty() {
        system_conf::read_system_conf().map_err(MxError::resolver_init)?
    } else {
        let ips = servers
            .iter()
            .map(|server| {
                server
                    .trim()
                    .parse::<IpAddr>()
                    .map_err(|_| MxError::InvalidNameServer {
                        server: server.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let group = NameServerConfigGroup::from_ips_clear(&ips, 53, true);
        (
            ResolverConfig::from_parts(None, Vec::new(), group),
            ResolverOpts::default(),
        )
    };
    opts.timeout = timeout;
    opts.attempts = 1;
    Ok(TokioAsyncResolver::tokio(config, opts))
}

/// Lookup MX records for `domain`, bounded by `timeout`.
///
/// Records come back normalised (trailing dot stripped, lower-cased) and sorted by ascending
/// priority; equal priorities keep resolver order. Null MX entries (`.`) are dropped. An empty
/// answer is reported as [`MxError::NoRecords`].
pub async fn resolve_mx<R>(
    resolver: &R,
    domain: &str,
    timeout: Duration,
) -> Result<Vec<MxRecord>, MxError>
where
    R: LookupMx + ?Sized,
{
    let domain = normalize_domain(domain)?;

    let answer = match tokio::time::timeout(timeout, resolver.lookup_mx(&domain)).await {
        Ok(answer) => answer,
        Err(_) => {
            warn!(target: "mx", "MX lookup for {} timed out after {:?}", domain, timeout);
            return Err(MxError::Timeout { domain });
        }
    };
    let mut records = match answer {
        Ok(records) => records,
        Err(err) => {
            warn!(target: "mx", "MX lookup for {} failed: {}", domain, err);
            return Err(err);
        }
    };

    for record in &mut records {
        record.exchange = normalize_exchange(&record.exchange);
    }
    records.retain(|record| !record.exchange.is_empty());
    records.sort_by_key(|record| record.priority);

    if records.is_empty() {
        return Err(MxError::NoRecords { domain });
    }
    debug!(target: "mx", "{} MX record(s) for {}", records.len(), domain);
    Ok(records)
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, MxError> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(MxError::EmptyDomain);
    }
    Ok(trimmed.to_ascii_lowercase())
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    exchange.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn classify_lookup_error(domain: &str, err: ResolveError) -> MxError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. }
            if *response_code == ResponseCode::NXDomain =>
        {
            MxError::DomainNotFound {
                domain: domain.to_string(),
            }
        }
        ResolveErrorKind::NoRecordsFound { .. } => MxError::NoRecords {
            domain: domain.to_string(),
        },
        ResolveErrorKind::Timeout => MxError::Timeout {
            domain: domain.to_string(),
        },
        _ => MxError::lookup(err),
    }
}

//! DNS resolution for deliverability checks.
//!
//! Implements MX record lookups with A/AAAA fallback per RFC 5321 section 5.1,
//! and recognises null MX records (RFC 7505) as an explicit "no mail" answer.
//!
//! # Caching Strategy
//!
//! Address lists tend to repeat a handful of domains, so answers are cached:
//!
//! - **DNS TTL by default**: positive answers live for the record TTL
//! - **Bounded TTLs**: clamped to `min_cache_ttl_secs..=max_cache_ttl_secs`
//! - **Optional override**: `cache_ttl_secs` replaces the DNS TTL for every entry
//! - **Negative answers**: definitive "no mail here" answers are kept for the
//!   minimum TTL; transient failures are never cached

use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use dashmap::DashMap;
use empath_common::Domain;
use hickory_resolver::{
    TokioResolver, config::ResolverOpts, name_server::TokioConnectionProvider, proto::rr::Name,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during DNS resolution.
#[derive(Debug, Error)]
pub enum DnsError {
    /// No MX, A, or AAAA records found for the domain.
    #[error("No mail servers found for domain: {0}")]
    NoMailServers(String),

    /// The domain publishes a null MX record and accepts no mail.
    #[error("Domain declares it accepts no mail (null MX): {0}")]
    NullMx(String),

    /// DNS query failed due to network or resolver issues.
    #[error("DNS lookup failed: {0}")]
    LookupFailed(#[from] hickory_resolver::ResolveError),

    /// Domain does not exist (NXDOMAIN).
    #[error("Domain does not exist: {0}")]
    DomainNotFound(String),

    /// DNS query timed out.
    #[error("DNS query timed out for domain: {0}")]
    Timeout(String),

    /// The domain cannot be encoded as a DNS name (e.g. a malformed `xn--` label).
    #[error("Domain is not a valid DNS name: {0}")]
    InvalidName(String),
}

impl DnsError {
    /// Returns `true` if this error is temporary and the domain might resolve later.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::LookupFailed(_))
    }
}

/// Configuration for the DNS resolver.
#[derive(Debug, Clone, Deserialize)]
pub struct DnsConfig {
    /// Upper bound for one domain lookup in seconds, MX and fallback together (default: 5)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Cache TTL override in seconds (optional)
    /// If set, overrides the DNS record's TTL for all cached entries
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    /// Minimum cache TTL in seconds (default: 60 = 1 minute)
    #[serde(default = "default_min_cache_ttl_secs")]
    pub min_cache_ttl_secs: u64,

    /// Maximum cache TTL in seconds (default: 3600 = 1 hour)
    #[serde(default = "default_max_cache_ttl_secs")]
    pub max_cache_ttl_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    5
}

const fn default_min_cache_ttl_secs() -> u64 {
    60
}

const fn default_max_cache_ttl_secs() -> u64 {
    3600
}

impl DnsConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            cache_ttl_secs: None,
            min_cache_ttl_secs: default_min_cache_ttl_secs(),
            max_cache_ttl_secs: default_max_cache_ttl_secs(),
        }
    }
}

/// A host that accepts mail for a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailServer {
    /// The hostname or IP address of the mail server.
    pub host: String,
    /// MX priority (lower value = higher priority). 0 for A/AAAA fallback.
    pub priority: u16,
}

impl MailServer {
    #[must_use]
    pub const fn new(host: String, priority: u16) -> Self {
        Self { host, priority }
    }
}

/// Looks up where mail for a domain would be delivered.
#[async_trait]
pub trait DnsResolver: Debug + Send + Sync {
    /// Resolve the mail servers for `domain`, best priority first.
    ///
    /// # Errors
    ///
    /// Returns `DnsError` if the domain cannot receive mail or the lookup fails.
    async fn resolve_mail_servers(&self, domain: &Domain)
    -> Result<Arc<Vec<MailServer>>, DnsError>;
}

/// Definitive negative answers, cheap to copy into the cache.
#[derive(Debug, Clone, Copy)]
enum NegativeAnswer {
    NoMailServers,
    NullMx,
    DomainNotFound,
    InvalidName,
}

impl NegativeAnswer {
    fn from_error(error: &DnsError) -> Option<Self> {
        match error {
            DnsError::NoMailServers(_) => Some(Self::NoMailServers),
            DnsError::NullMx(_) => Some(Self::NullMx),
            DnsError::DomainNotFound(_) => Some(Self::DomainNotFound),
            DnsError::InvalidName(_) => Some(Self::InvalidName),
            DnsError::LookupFailed(_) | DnsError::Timeout(_) => None,
        }
    }

    fn into_error(self, domain: &str) -> DnsError {
        let domain = domain.to_string();
        match self {
            Self::NoMailServers => DnsError::NoMailServers(domain),
            Self::NullMx => DnsError::NullMx(domain),
            Self::DomainNotFound => DnsError::DomainNotFound(domain),
            Self::InvalidName => DnsError::InvalidName(domain),
        }
    }
}

/// Encode `domain` as a fully qualified DNS name.
///
/// Fully qualified so resolver search domains are never appended. A name that
/// cannot be encoded is [`DnsError::InvalidName`], which is never temporary.
fn query_name(domain: &str) -> Result<Name, DnsError> {
    Name::from_utf8(format!("{}.", domain.trim_end_matches('.'))).map_err(|err| {
        debug!("Cannot encode {domain} as a DNS name: {err}");
        DnsError::InvalidName(domain.to_string())
    })
}

/// Cached DNS result with expiration time.
#[derive(Debug, Clone)]
struct CachedResult {
    answer: Result<Arc<Vec<MailServer>>, NegativeAnswer>,
    expires_at: Instant,
}

/// Resolver backed by the system DNS configuration via hickory.
#[derive(Debug)]
pub struct HickoryDnsResolver {
    resolver: TokioResolver,
    cache: DashMap<String, CachedResult>,
    config: DnsConfig,
}

impl HickoryDnsResolver {
    /// Creates a resolver from the system configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the system DNS configuration cannot be loaded.
    pub fn new(config: DnsConfig) -> Result<Self, DnsError> {
        let mut opts = ResolverOpts::default();
        opts.timeout = config.timeout();

        let resolver = TokioResolver::builder(TokioConnectionProvider::default())?
            .with_options(opts)
            .build();

        Ok(Self {
            resolver,
            cache: DashMap::new(),
            config,
        })
    }

    fn cached(&self, key: &str, domain: &str) -> Option<Result<Arc<Vec<MailServer>>, DnsError>> {
        let cached = self.cache.get(key)?;
        if cached.expires_at <= Instant::now() {
            debug!("Cache entry expired for {domain}");
            return None;
        }

        empath_common::internal!("Cache hit for {}", domain);
        Some(
            cached
                .answer
                .clone()
                .map_err(|negative| negative.into_error(domain)),
        )
    }

    fn store(&self, key: String, answer: Result<Arc<Vec<MailServer>>, NegativeAnswer>, ttl: u64) {
        let expires_at = Instant::now() + Duration::from_secs(ttl);
        self.cache.insert(key, CachedResult { answer, expires_at });
    }

    /// Performs an uncached lookup.
    ///
    /// Returns the servers and the minimum TTL across the records used.
    async fn resolve_uncached(&self, domain: &str) -> Result<(Vec<MailServer>, u32), DnsError> {
        let name = query_name(domain)?;

        match self.resolver.mx_lookup(name.clone()).await {
            Ok(mx_lookup) => {
                let min_ttl = mx_lookup
                    .as_lookup()
                    .records()
                    .iter()
                    .map(hickory_resolver::proto::rr::Record::ttl)
                    .min()
                    .unwrap_or(300);

                let records: Vec<_> = mx_lookup.iter().collect();
                if !records.is_empty() && records.iter().all(|mx| mx.exchange().is_root()) {
                    return Err(DnsError::NullMx(domain.to_string()));
                }

                let mut servers: Vec<MailServer> = records
                    .iter()
                    .filter(|mx| !mx.exchange().is_root())
                    .map(|mx| MailServer::new(mx.exchange().to_utf8(), mx.preference()))
                    .collect();

                if servers.is_empty() {
                    debug!("MX lookup returned no records, falling back to A/AAAA");
                    return self.fallback_to_a_aaaa(domain, name).await;
                }

                servers.sort_by_key(|s| s.priority);
                debug!(
                    "Resolved {} MX record(s) for {domain} with TTL {min_ttl}s",
                    servers.len()
                );
                Ok((servers, min_ttl))
            }
            Err(err) if err.is_nx_domain() => Err(DnsError::DomainNotFound(domain.to_string())),
            Err(err) if err.is_no_records_found() => {
                debug!("No MX records found for {domain}, falling back to A/AAAA");
                self.fallback_to_a_aaaa(domain, name).await
            }
            Err(err) => {
                warn!("MX lookup failed for {domain}: {err}");
                Err(DnsError::LookupFailed(err))
            }
        }
    }

    /// Falls back to A/AAAA records when no MX records exist (RFC 5321).
    async fn fallback_to_a_aaaa(
        &self,
        domain: &str,
        name: Name,
    ) -> Result<(Vec<MailServer>, u32), DnsError> {
        match self.resolver.lookup_ip(name).await {
            Ok(ip_lookup) => {
                #[allow(clippy::redundant_closure_for_method_calls)]
                let min_ttl = ip_lookup
                    .as_lookup()
                    .records()
                    .iter()
                    .map(|r| r.ttl())
                    .min()
                    .unwrap_or(300);

                let servers: Vec<MailServer> = ip_lookup
                    .iter()
                    .map(|ip| MailServer::new(ip.to_string(), 0))
                    .collect();

                if servers.is_empty() {
                    Err(DnsError::NoMailServers(domain.to_string()))
                } else {
                    debug!(
                        "Resolved {} A/AAAA record(s) for {domain} with TTL {min_ttl}s",
                        servers.len()
                    );
                    Ok((servers, min_ttl))
                }
            }
            Err(err) if err.is_nx_domain() => Err(DnsError::DomainNotFound(domain.to_string())),
            Err(err) if err.is_no_records_found() => {
                Err(DnsError::NoMailServers(domain.to_string()))
            }
            Err(err) => {
                warn!("A/AAAA lookup failed for {domain}: {err}");
                Err(DnsError::LookupFailed(err))
            }
        }
    }
}

#[async_trait]
impl DnsResolver for HickoryDnsResolver {
    async fn resolve_mail_servers(
        &self,
        domain: &Domain,
    ) -> Result<Arc<Vec<MailServer>>, DnsError> {
        let key = domain.cache_key();

        if let Some(answer) = self.cached(&key, domain) {
            return answer;
        }

        match self.resolve_uncached(domain).await {
            Ok((servers, dns_ttl)) => {
                let servers = Arc::new(servers);
                let ttl = self.config.cache_ttl_secs.unwrap_or_else(|| {
                    let min = self.config.min_cache_ttl_secs;
                    u64::from(dns_ttl).clamp(min, self.config.max_cache_ttl_secs.max(min))
                });
                self.store(key, Ok(Arc::clone(&servers)), ttl);
                Ok(servers)
            }
            Err(err) => {
                if let Some(negative) = NegativeAnswer::from_error(&err) {
                    let ttl = self
                        .config
                        .cache_ttl_secs
                        .unwrap_or(self.config.min_cache_ttl_secs);
                    self.store(key, Err(negative), ttl);
                }
                Err(err)
            }
        }
    }
}

/// Scripted answer for [`MockDnsResolver`].
#[derive(Debug, Clone)]
pub enum MockAnswer {
    Servers(Vec<MailServer>),
    NoMailServers,
    NullMx,
    DomainNotFound,
    Timeout,
    /// Never answers; only a caller-side timeout ends the lookup.
    Hang,
}

/// In-memory resolver with scripted answers, for tests and dry runs.
///
/// Domains without a scripted answer do not exist.
#[derive(Debug, Default)]
pub struct MockDnsResolver {
    answers: DashMap<String, MockAnswer>,
    lookups: AtomicUsize,
}

impl MockDnsResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the answer for a domain.
    #[must_use]
    pub fn with_answer(self, domain: &str, answer: MockAnswer) -> Self {
        self.answers.insert(domain.to_lowercase(), answer);
        self
    }

    /// Give a domain a single MX host.
    #[must_use]
    pub fn with_mx(self, domain: &str, host: &str) -> Self {
        self.with_answer(
            domain,
            MockAnswer::Servers(vec![MailServer::new(host.to_string(), 10)]),
        )
    }

    /// Number of lookups performed so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DnsResolver for MockDnsResolver {
    async fn resolve_mail_servers(
        &self,
        domain: &Domain,
    ) -> Result<Arc<Vec<MailServer>>, DnsError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        query_name(domain.as_str())?;

        let answer = self
            .answers
            .get(&domain.cache_key())
            .map(|entry| entry.value().clone());
        let name = domain.to_string();

        match answer {
            Some(MockAnswer::Servers(servers)) => Ok(Arc::new(servers)),
            Some(MockAnswer::NoMailServers) => Err(DnsError::NoMailServers(name)),
            Some(MockAnswer::NullMx) => Err(DnsError::NullMx(name)),
            Some(MockAnswer::DomainNotFound) | None => Err(DnsError::DomainNotFound(name)),
            Some(MockAnswer::Timeout) => Err(DnsError::Timeout(name)),
            Some(MockAnswer::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(DnsError::Timeout(name))
            }
        }
    }
}

//! Domain newtype for type safety
//!
//! Wraps domain strings so an address or a raw input line cannot be passed
//! where a domain is expected, and carries the few domain-level questions the
//! checks need to ask (is this a literal, is this a reserved name).

use std::{
    fmt::{self, Display},
    ops::Deref,
    sync::Arc,
};

use serde::{Deserialize, Serialize};

/// Top-level names reserved by RFC 2606 and RFC 6761 that never receive mail
const RESERVED_TLDS: &[&str] = &["test", "example", "invalid", "localhost", "local"];

/// Second-level names reserved for documentation by RFC 2606
const RESERVED_DOMAINS: &[&str] = &["example.com", "example.net", "example.org"];

/// A domain name string wrapper for type safety
///
/// # Examples
///
/// ```
/// use empath_common::Domain;
///
/// let domain = Domain::new("example.com");
/// assert_eq!(domain.as_str(), "example.com");
///
/// let domain: Domain = "mail.example.com".into();
/// assert_eq!(domain.tld(), Some("com"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Domain(Arc<str>);

impl Domain {
    /// Create a new `Domain` from any type that can be converted to `Arc<str>`
    #[must_use]
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        Self(s.into())
    }

    /// Get the domain as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for `[...]` address literals, which name a host directly.
    #[must_use]
    pub fn is_address_literal(&self) -> bool {
        self.0.starts_with('[') && self.0.ends_with(']')
    }

    /// Iterate over the dot-separated labels of a domain name.
    ///
    /// Address literals yield no labels.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        let name = if self.is_address_literal() { "" } else { &self.0 };
        name.split('.').filter(|label| !label.is_empty())
    }

    /// The last label of the domain, if any
    #[must_use]
    pub fn tld(&self) -> Option<&str> {
        self.labels().last()
    }

    /// Lower-cased key used for caching lookups, since DNS names are
    /// case-insensitive.
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.0.to_lowercase()
    }

    /// Returns `true` if the name is reserved for testing or documentation
    /// and can never receive mail.
    ///
    /// ```
    /// use empath_common::Domain;
    ///
    /// assert!(Domain::new("nonexistent-domain.test").is_reserved());
    /// assert!(Domain::new("EXAMPLE.com").is_reserved());
    /// assert!(!Domain::new("example.co.uk").is_reserved());
    /// ```
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        let key = self.cache_key();

        if RESERVED_DOMAINS
            .iter()
            .any(|reserved| key == *reserved || key.ends_with(&format!(".{reserved}")))
        {
            return true;
        }

        key.rsplit('.')
            .next()
            .is_some_and(|tld| RESERVED_TLDS.contains(&tld))
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for Domain {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<String> for Domain {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&str> for Domain {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

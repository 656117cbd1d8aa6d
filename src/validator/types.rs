use std::fmt;

/// A candidate mailbox, trimmed and lower-cased.
///
/// Built only through [`normalize_address`](super::normalize_address), so every check in the
/// pipeline sees the same normalised text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    pub(crate) fn new(normalized: String) -> Self {
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text before the last `@`, if any.
    pub fn local_part(&self) -> Option<&str> {
        self.0.rsplit_once('@').map(|(local, _)| local)
    }

    /// Text after the last `@`, if any.
    pub fn domain(&self) -> Option<&str> {
        self.0
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|domain| !domain.is_empty())
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

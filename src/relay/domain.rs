//! Merchant domain sanitization.
//!
//! Browser clients paste store domains in whatever shape the merchant typed
//! them: with or without a scheme, sometimes with a trailing slash. Every
//! outbound URL is built from the normalized form.

use std::fmt;

/// A store hostname with no leading `http://`/`https://` and no trailing `/`.
///
/// Construction never fails. Nothing here checks that the value is a well
/// formed hostname; a bad value surfaces later as a URL or connection error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedDomain(String);

impl NormalizedDomain {
    /// Normalize a raw, caller-supplied domain string.
    pub fn normalize(raw: &str) -> Self {
        Self(normalize(raw).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim whitespace, strip one leading scheme and one trailing slash.
///
/// The scheme keyword match is case-sensitive.
pub fn normalize(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.strip_suffix('/').unwrap_or(without_scheme)
}

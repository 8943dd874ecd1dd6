//! Data-loss prevention: PII redaction on ingress, secret detection on
//! egress.
//!
//! Both operations are pure string → string/findings functions over a
//! set of patterns compiled once from [`DlpConfig`].

mod pii;
mod secrets;

pub use secrets::SecretFinding;

use regex::Regex;

use wd_domain::config::DlpConfig;
use wd_domain::error::{Error, Result};

/// Compiled DLP pattern set.
#[derive(Debug)]
pub struct DlpScanner {
    email: Regex,
    ipv4: Regex,
    pci_candidate: Regex,
    rules: Vec<SecretRule>,
}

#[derive(Debug)]
struct SecretRule {
    kind: String,
    re: Regex,
    min_entropy: Option<f64>,
}

impl DlpScanner {
    /// Compile the scanner from config. Invalid configured patterns
    /// surface as [`Error::Config`].
    pub fn new(config: &DlpConfig) -> Result<Self> {
        let mut rules = Vec::with_capacity(config.secret_patterns.len());
        for p in &config.secret_patterns {
            let re = Regex::new(&p.pattern).map_err(|e| {
                Error::Config(format!("secret pattern \"{}\": {e}", p.pattern))
            })?;
            rules.push(SecretRule {
                kind: p.kind.clone(),
                re,
                min_entropy: p.min_entropy,
            });
        }

        Ok(Self {
            email: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
                .expect("hardcoded pattern compiles"),
            ipv4: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b")
                .expect("hardcoded pattern compiles"),
            // Candidate runs of 13-16 digits, optionally space/dash
            // separated; the Luhn checksum filters false positives.
            pci_candidate: Regex::new(r"\b\d(?:[ -]?\d){11,18}\b")
                .expect("hardcoded pattern compiles"),
            rules,
        })
    }

    /// Replace PII in `text` with redaction markers. Patterns apply in
    /// fixed order (email, IPv4, PCI); overlaps resolve to the first
    /// matching pattern.
    pub fn redact_pii(&self, text: &str) -> String {
        pii::redact(self, text)
    }

    /// Scan `text` for secrets, returning one finding per match.
    /// Findings on a line carrying the `allowlist secret` marker are
    /// suppressed.
    pub fn scan_secrets(&self, text: &str) -> Vec<SecretFinding> {
        secrets::scan(self, text)
    }

    pub(crate) fn email_re(&self) -> &Regex {
        &self.email
    }
    pub(crate) fn ipv4_re(&self) -> &Regex {
        &self.ipv4
    }
    pub(crate) fn pci_re(&self) -> &Regex {
        &self.pci_candidate
    }
    pub(crate) fn rules(&self) -> impl Iterator<Item = (&str, &Regex, Option<f64>)> {
        self.rules
            .iter()
            .map(|r| (r.kind.as_str(), &r.re, r.min_entropy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_compiles() {
        assert!(DlpScanner::new(&DlpConfig::default()).is_ok());
    }

    #[test]
    fn invalid_configured_pattern_is_a_config_error() {
        let mut cfg = DlpConfig::default();
        cfg.secret_patterns[0].pattern = "([".into();
        let err = DlpScanner::new(&cfg).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

mod approval;
mod dlp;
mod eviction;
mod risk;
mod runtime;
mod storage;
mod workspace;

pub use approval::*;
pub use dlp::*;
pub use eviction::*;
pub use risk::*;
pub use runtime::*;
pub use storage::*;
pub use workspace::*;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WardenConfig {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default)]
    pub eviction: EvictionConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub dlp: DlpConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl WardenConfig {
    /// Load config from a TOML file. Missing sections fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("parsing config: {e}")))
    }

    /// Validate the config, returning every problem found (not just the first).
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.approval.hmac_secret.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "approval.hmac_secret".into(),
                message: "hmac_secret must not be empty".into(),
            });
        }
        if self.approval.ttl_seconds <= 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "approval.ttl_seconds".into(),
                message: "ttl_seconds must be greater than 0".into(),
            });
        }

        if self.runtime.max_tries == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "runtime.max_tries".into(),
                message: "max_tries must be greater than 0".into(),
            });
        }

        if self.eviction.rehydration_limit_chars < self.eviction.threshold_chars {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "eviction.rehydration_limit_chars".into(),
                message: "rehydration limit below the eviction threshold means no \
                          evicted output can ever be rehydrated"
                    .into(),
            });
        }

        // Validate DLP secret patterns are valid regexes.
        for (i, pattern) in self.dlp.secret_patterns.iter().enumerate() {
            if let Err(e) = regex::Regex::new(&pattern.pattern) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("dlp.secret_patterns[{i}]"),
                    message: format!("invalid regex \"{}\": {e}", pattern.pattern),
                });
            }
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation diagnostics
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Warning => "warning",
            ConfigSeverity::Error => "error",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

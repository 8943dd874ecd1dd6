use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Data-loss prevention
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlpConfig {
    /// Redact PII from inbound user text before it reaches the
    /// reasoning core.
    #[serde(default = "d_true")]
    pub redact_ingress: bool,
    /// Secret-family detection rules applied to egress text.
    #[serde(default = "d_secret_patterns")]
    pub secret_patterns: Vec<SecretPattern>,
}

impl Default for DlpConfig {
    fn default() -> Self {
        Self {
            redact_ingress: true,
            secret_patterns: d_secret_patterns(),
        }
    }
}

/// One secret-family rule. `min_entropy`, when set, additionally gates
/// matches on Shannon entropy (bits per character) to cut noise from
/// broad patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretPattern {
    pub kind: String,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_entropy: Option<f64>,
}

fn d_true() -> bool {
    true
}

fn d_secret_patterns() -> Vec<SecretPattern> {
    vec![
        SecretPattern {
            kind: "provider_key".into(),
            pattern: r"\bsk-[A-Za-z0-9]{20,}\b".into(),
            min_entropy: None,
        },
        SecretPattern {
            kind: "aws_access_key".into(),
            pattern: r"\bAKIA[0-9A-Z]{16}\b".into(),
            min_entropy: None,
        },
        SecretPattern {
            kind: "github_token".into(),
            pattern: r"\bghp_[A-Za-z0-9]{36}\b".into(),
            min_entropy: None,
        },
        SecretPattern {
            kind: "pem_private_key".into(),
            pattern: r"-----BEGIN (?:[A-Z]+ )?PRIVATE KEY-----".into(),
            min_entropy: None,
        },
        SecretPattern {
            kind: "high_entropy".into(),
            pattern: r"\b[A-Za-z0-9+/=_-]{40,}\b".into(),
            min_entropy: Some(4.0),
        },
    ]
}

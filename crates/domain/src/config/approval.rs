use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Human-in-the-loop approval
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Approval tokens are valid for this many seconds after minting.
    #[serde(default = "d_300")]
    pub ttl_seconds: i64,
    /// Key for HMAC-SHA256 token signing. Must be set; validation fails
    /// on an empty secret.
    #[serde(default)]
    pub hmac_secret: String,
    /// When true, the signed token is surfaced in the approval prompt
    /// itself. Production deployments deliver the token out of band.
    #[serde(default)]
    pub dev_mode: bool,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            hmac_secret: String::new(),
            dev_mode: false,
        }
    }
}

fn d_300() -> i64 {
    300
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Risk levels / actions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// What the runtime does with a proposal at a given risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskAction {
    Allow,
    AuthRequired,
    Blocked,
}

impl RiskAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::AuthRequired => "auth_required",
            Self::Blocked => "blocked",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool descriptors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-tool risk descriptor. New tools are added through configuration;
/// tools absent from the map fall back to the unknown-tool default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolTier {
    pub level: RiskLevel,
    pub action: RiskAction,
    /// The tool can persist data outside the conversation (file writes,
    /// email, deploys). Secret findings in its arguments block it.
    #[serde(default)]
    pub writes: bool,
    /// The tool's arguments carry filesystem paths subject to the
    /// workspace sandbox.
    #[serde(default)]
    pub paths: bool,
    /// Per-tool execution timeout; falls back to the runtime default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Risk engine config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Decoy strings; their appearance anywhere in canonical arguments
    /// blocks the call at critical severity.
    #[serde(default)]
    pub honeytokens: Vec<String>,
    /// Decoy filenames; a path argument naming one blocks the call.
    #[serde(default)]
    pub honeyfiles: Vec<String>,
    /// Tool name → risk descriptor.
    #[serde(default = "d_tiers")]
    pub tiers: BTreeMap<String, ToolTier>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            honeytokens: Vec::new(),
            honeyfiles: Vec::new(),
            tiers: d_tiers(),
        }
    }
}

fn d_tiers() -> BTreeMap<String, ToolTier> {
    let mut tiers = BTreeMap::new();
    tiers.insert(
        "read_file".to_owned(),
        ToolTier {
            level: RiskLevel::Low,
            action: RiskAction::Allow,
            writes: false,
            paths: true,
            timeout_secs: None,
        },
    );
    tiers.insert(
        "list_files".to_owned(),
        ToolTier {
            level: RiskLevel::Low,
            action: RiskAction::Allow,
            writes: false,
            paths: true,
            timeout_secs: None,
        },
    );
    tiers.insert(
        "write_file".to_owned(),
        ToolTier {
            level: RiskLevel::Medium,
            action: RiskAction::AuthRequired,
            writes: true,
            paths: true,
            timeout_secs: None,
        },
    );
    tiers.insert(
        "send_email".to_owned(),
        ToolTier {
            level: RiskLevel::High,
            action: RiskAction::AuthRequired,
            writes: true,
            paths: false,
            timeout_secs: None,
        },
    );
    tiers.insert(
        "exec".to_owned(),
        ToolTier {
            level: RiskLevel::High,
            action: RiskAction::AuthRequired,
            writes: true,
            paths: false,
            timeout_secs: None,
        },
    );
    tiers.insert(
        "deploy_production".to_owned(),
        ToolTier {
            level: RiskLevel::Critical,
            action: RiskAction::AuthRequired,
            writes: true,
            paths: false,
            timeout_secs: None,
        },
    );
    tiers
}

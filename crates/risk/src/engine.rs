//! The tiered risk engine.
//!
//! Evaluates `(tool_name, canonical_args)` to one of Allow,
//! AuthRequired, or Blocked. Evaluation order, first match wins:
//! honeytoken trap, egress secret block, sandbox violation, tool tier
//! lookup, unknown-tool default. Every rule is a pure function of its
//! inputs — no clock, no randomness, no filesystem.

use std::path::PathBuf;

use serde_json::Value;

use wd_dlp::DlpScanner;
use wd_domain::config::{RiskAction, RiskConfig, RiskLevel, ToolTier};

// Decision reasons (stable identifiers, used in audit entries).
pub const REASON_HONEYTOKEN: &str = "HONEYTOKEN_TRIGGERED";
pub const REASON_SECRET_IN_ARGS: &str = "SECRET_IN_ARGS";
pub const REASON_PATH_ESCAPE: &str = "PATH_ESCAPE";
pub const REASON_MALFORMED_ARGS: &str = "MALFORMED_ARGS";
pub const REASON_TOOL_TIER: &str = "TOOL_TIER";
pub const REASON_UNKNOWN_TOOL: &str = "UNKNOWN_TOOL";

/// Argument keys treated as filesystem paths for honeyfile and sandbox
/// checks.
const PATH_KEYS: [&str; 6] = ["path", "file", "filename", "source", "destination", "target"];

/// Outcome of one risk evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskDecision {
    pub level: RiskLevel,
    pub decision: RiskAction,
    pub reason: String,
}

impl RiskDecision {
    fn blocked(level: RiskLevel, reason: &str) -> Self {
        Self {
            level,
            decision: RiskAction::Blocked,
            reason: reason.to_owned(),
        }
    }
}

pub struct RiskEngine {
    config: RiskConfig,
    workspace_root: PathBuf,
    scanner: DlpScanner,
}

impl RiskEngine {
    pub fn new(config: RiskConfig, workspace_root: PathBuf, scanner: DlpScanner) -> Self {
        Self {
            config,
            workspace_root,
            scanner,
        }
    }

    /// Evaluate a proposal. `canonical_args` must be the recomputed
    /// canonical form — never the executor's claim.
    pub fn evaluate(&self, tool_name: &str, canonical_args: &str) -> RiskDecision {
        let args: Value = match serde_json::from_str(canonical_args) {
            Ok(v) => v,
            Err(_) => return RiskDecision::blocked(RiskLevel::High, REASON_MALFORMED_ARGS),
        };

        // 1. Honeytoken trap.
        if self.trips_honeytoken(canonical_args, &args) {
            return RiskDecision::blocked(RiskLevel::Critical, REASON_HONEYTOKEN);
        }

        let tier = self.config.tiers.get(tool_name);

        // 2. Egress secret block for write-capable tools.
        if tier.is_some_and(|t| t.writes) && !self.scanner.scan_secrets(canonical_args).is_empty() {
            return RiskDecision::blocked(RiskLevel::High, REASON_SECRET_IN_ARGS);
        }

        // 3. Sandbox violation for path-taking tools.
        if tier.is_some_and(|t| t.paths) {
            for path in path_arguments(&args) {
                if crate::sandbox::resolve_within(&self.workspace_root, path).is_err() {
                    return RiskDecision::blocked(RiskLevel::High, REASON_PATH_ESCAPE);
                }
            }
        }

        // 4. Tool tier lookup.
        if let Some(ToolTier { level, action, .. }) = tier {
            return RiskDecision {
                level: *level,
                decision: *action,
                reason: REASON_TOOL_TIER.to_owned(),
            };
        }

        // 5. Unknown tool: a human gets the final say.
        RiskDecision {
            level: RiskLevel::Medium,
            decision: RiskAction::AuthRequired,
            reason: REASON_UNKNOWN_TOOL.to_owned(),
        }
    }

    fn trips_honeytoken(&self, canonical_args: &str, args: &Value) -> bool {
        if self
            .config
            .honeytokens
            .iter()
            .any(|h| !h.is_empty() && canonical_args.contains(h.as_str()))
        {
            return true;
        }

        self.config.honeyfiles.iter().any(|honeyfile| {
            path_arguments(args).into_iter().any(|p| {
                p == honeyfile
                    || std::path::Path::new(p)
                        .file_name()
                        .is_some_and(|name| name.to_string_lossy() == *honeyfile)
            })
        })
    }
}

/// Collect string values under path-like keys, recursively.
fn path_arguments(args: &Value) -> Vec<&str> {
    let mut paths = Vec::new();
    collect_paths(args, &mut paths);
    paths
}

fn collect_paths<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                if PATH_KEYS.contains(&key.as_str()) {
                    if let Value::String(s) = val {
                        out.push(s.as_str());
                    }
                }
                collect_paths(val, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_paths(item, out);
            }
        }
        _ => {}
    }
}

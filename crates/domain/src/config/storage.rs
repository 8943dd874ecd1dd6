use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Persistence roots
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Per-thread state snapshots live under this directory.
    #[serde(default = "d_state_dir")]
    pub state_dir: PathBuf,
    /// Append-only audit log file.
    #[serde(default = "d_audit_path")]
    pub audit_log: PathBuf,
    /// Root of the content-addressed eviction store.
    #[serde(default = "d_eviction_root")]
    pub eviction_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: d_state_dir(),
            audit_log: d_audit_path(),
            eviction_root: d_eviction_root(),
        }
    }
}

fn d_state_dir() -> PathBuf {
    PathBuf::from("./state")
}
fn d_audit_path() -> PathBuf {
    PathBuf::from("./state/audit.jsonl")
}
fn d_eviction_root() -> PathBuf {
    PathBuf::from("./state/evictions")
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The sandbox every path-taking tool is confined to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Root directory; resolved paths must stay under it.
    #[serde(default = "d_root")]
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self { root: d_root() }
    }
}

fn d_root() -> PathBuf {
    PathBuf::from("./workspace")
}

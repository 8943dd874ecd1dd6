use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool-output eviction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictionConfig {
    /// Outputs strictly larger than this are moved to the eviction store.
    #[serde(default = "d_10000")]
    pub threshold_chars: usize,
    /// Evicted outputs at most this large may be rehydrated inline later.
    #[serde(default = "d_50000")]
    pub rehydration_limit_chars: usize,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            threshold_chars: 10_000,
            rehydration_limit_chars: 50_000,
        }
    }
}

fn d_10000() -> usize {
    10_000
}
fn d_50000() -> usize {
    50_000
}

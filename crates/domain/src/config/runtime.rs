use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Graph runtime
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// A step failing this many times is escalated to a failed plan.
    #[serde(default = "d_3")]
    pub max_tries: u32,
    /// Hard timeout on each physical tool invocation (seconds).
    #[serde(default = "d_30")]
    pub tool_timeout_secs: u64,
    /// Safety cap on node dispatches per turn.
    #[serde(default = "d_64")]
    pub max_node_steps: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_tries: 3,
            tool_timeout_secs: 30,
            max_node_steps: 64,
        }
    }
}

fn d_3() -> u32 {
    3
}
fn d_30() -> u64 {
    30
}
fn d_64() -> u32 {
    64
}

//! Oracle boundaries: the reasoning core and the tool substrate.
//!
//! Both are external collaborators the runtime calls but never trusts.
//! The reasoning oracle proposes plans and tool invocations; the tool
//! substrate physically executes an approved invocation. Integrity and
//! policy enforcement stay on the runtime side of these seams.

mod scripted;

pub use scripted::{ScriptedOracle, ScriptedSubstrate};

use serde_json::Value;

use wd_domain::error::Result;
use wd_domain::graph::{GraphState, PlanStep};

/// A tool invocation as proposed by the reasoning oracle — just a name
/// and raw arguments. Canonicalization and hashing happen in the
/// runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolProposal {
    pub name: String,
    pub args: Value,
}

/// Raw outcome of one physical tool execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub success: bool,
    pub output: String,
}

impl ToolOutcome {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// The reasoning core. Its output is never trusted; the runtime
/// recomputes every integrity-relevant value it claims.
#[async_trait::async_trait]
pub trait ReasoningOracle: Send + Sync {
    /// Planner call site: propose an ordered list of steps for the
    /// latest user request.
    async fn propose_plan(&self, state: &GraphState) -> Result<Vec<PlanStep>>;

    /// Executor call site: propose the next tool invocation for the
    /// current step.
    async fn propose_tool(&self, state: &GraphState) -> Result<ToolProposal>;
}

/// The tool-execution substrate.
#[async_trait::async_trait]
pub trait ToolSubstrate: Send + Sync {
    async fn invoke(&self, name: &str, args: &Value) -> Result<ToolOutcome>;
}

//! Graph state — the per-thread snapshot unit.
//!
//! One [`GraphState`] exists per `thread_id`. It is loaded at the start of
//! a turn, mutated by the graph nodes, persisted after every node, and
//! survives process restarts through the state store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::message::ChatMessage;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intent / plan / step types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Routing hint supplied by ingress: plain chat vs. a multi-step task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    #[default]
    Conversation,
    Task,
}

/// One step of a plan, as proposed by the planner oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
}

impl PlanStep {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Done,
    Failed,
    Blocked,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool proposal / result
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A tool invocation proposed by the executor, pending integrity and
/// policy checks. The canonical form and its hash are computed by the
/// runtime; the risk gate recomputes both and trusts neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedTool {
    pub name: String,
    pub args: serde_json::Value,
    pub canonical_args: String,
    pub args_hash: String,
    pub tool_call_id: String,
    pub step_idx: usize,
    /// Unix seconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Failed,
}

/// Outcome of one physical tool execution, after interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    /// Inline output, or the `[EVICTED size=N] <pointer>` stand-in.
    pub output: String,
    #[serde(default)]
    pub evicted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// UTF-8 byte length of the original output, before any eviction.
    #[serde(default)]
    pub size_chars: usize,
    #[serde(default)]
    pub rehydration_allowed: bool,
    /// First 500 characters of the original output when evicted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Failure kind label (e.g. `IntegrityMismatch`, `UserRejected`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ToolResult {
    /// A failed result with a reason label and explanatory output.
    pub fn failed(reason: impl Into<String>, output: impl Into<String>) -> Self {
        let output = output.into();
        Self {
            status: ToolStatus::Failed,
            size_chars: output.len(),
            output,
            evicted: false,
            pointer: None,
            rehydration_allowed: true,
            summary: None,
            reason: Some(reason.into()),
        }
    }

    pub fn success(output: impl Into<String>) -> Self {
        let output = output.into();
        Self {
            status: ToolStatus::Success,
            size_chars: output.len(),
            output,
            evicted: false,
            pointer: None,
            rehydration_allowed: true,
            summary: None,
            reason: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Audit mirror
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compact in-state mirror of a persisted audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    /// Unix seconds.
    pub ts: i64,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GraphState
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Full execution-graph state for one thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    pub thread_id: String,
    pub user_id: String,
    #[serde(default)]
    pub intent: Intent,
    /// Append-only transcript.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub plan: Vec<PlanStep>,
    #[serde(default)]
    pub current_step: usize,
    #[serde(default)]
    pub step_status: BTreeMap<usize, StepStatus>,
    /// Retry counter per step index.
    #[serde(default)]
    pub tries: BTreeMap<usize, u32>,
    /// Present only between the executor and the interpreter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_tool: Option<ProposedTool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tool_result: Option<ToolResult>,
    /// True while paused on human approval.
    #[serde(default)]
    pub awaiting_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_hash: Option<String>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_expires_at: Option<i64>,
    #[serde(default)]
    pub audit_trail: Vec<AuditSummary>,
    #[serde(default)]
    pub cancelled: bool,
}

impl GraphState {
    pub fn new(thread_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            user_id: user_id.into(),
            intent: Intent::Conversation,
            messages: Vec::new(),
            plan: Vec::new(),
            current_step: 0,
            step_status: BTreeMap::new(),
            tries: BTreeMap::new(),
            proposed_tool: None,
            last_tool_result: None,
            awaiting_approval: false,
            approval_id: None,
            approval_hash: None,
            approval_expires_at: None,
            audit_trail: Vec::new(),
            cancelled: false,
        }
    }

    /// The most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::message::Role::User)
            .map(|m| m.content.as_str())
    }

    /// Clear the human-approval pause fields.
    pub fn clear_approval(&mut self) {
        self.awaiting_approval = false;
        self.approval_id = None;
        self.approval_expires_at = None;
    }

    /// Status of the current step, defaulting to `Pending`.
    pub fn current_step_status(&self) -> StepStatus {
        self.step_status
            .get(&self.current_step)
            .copied()
            .unwrap_or(StepStatus::Pending)
    }

    pub fn set_step_status(&mut self, idx: usize, status: StepStatus) {
        self.step_status.insert(idx, status);
    }

    /// Retry count of the current step.
    pub fn current_tries(&self) -> u32 {
        self.tries.get(&self.current_step).copied().unwrap_or(0)
    }
}

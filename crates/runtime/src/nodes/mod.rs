//! The graph nodes.
//!
//! Each node is a handler over [`GraphState`] returning the next node
//! (or `End`). The graph is cyclic, so nodes are a flat enum dispatched
//! by the turn driver rather than structures referencing each other.

mod approval;
mod executor;
mod finalizer;
mod interpreter;
mod planner;
mod risk_gate;
mod router;
mod supervisor;
mod tools;

pub(crate) use approval::{parse_approve, parse_reject};
pub use risk_gate::verify_proposal_integrity;

use std::fmt;

use wd_audit::{AuditEntry, AuditKind, AuditLog};
use wd_dlp::DlpScanner;
use wd_domain::config::WardenConfig;
use wd_domain::error::Result;
use wd_domain::graph::{AuditSummary, GraphState};
use wd_oracle::{ReasoningOracle, ToolSubstrate};
use wd_risk::RiskEngine;
use wd_store::EvictionStore;
use wd_tokens::TokenManager;

// Failure reason labels carried in `ToolResult::reason`.
pub const REASON_INTEGRITY_MISMATCH: &str = "IntegrityMismatch";
pub const REASON_USER_REJECTED: &str = "UserRejected";
pub const REASON_APPROVAL_EXPIRED: &str = "ApprovalExpired";
pub const REASON_APPROVAL_INVALID: &str = "ApprovalInvalid";
pub const REASON_ORACLE_FAILURE: &str = "OracleFailure";
pub const REASON_TOOL_TIMEOUT: &str = "ToolTimeout";
pub const REASON_TOOL_EXECUTION: &str = "ToolExecutionError";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Node identifiers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeId {
    Router,
    Planner,
    Supervisor,
    Executor,
    RiskGate,
    AwaitApproval,
    ApprovalHandler,
    Tools,
    Interpreter,
    Finalizer,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Router => "router",
            Self::Planner => "planner",
            Self::Supervisor => "supervisor",
            Self::Executor => "executor",
            Self::RiskGate => "risk_gate",
            Self::AwaitApproval => "await_approval",
            Self::ApprovalHandler => "approval_handler",
            Self::Tools => "tools",
            Self::Interpreter => "interpreter",
            Self::Finalizer => "finalizer",
        };
        f.write_str(name)
    }
}

/// Where to go after a node completes. `End` terminates the turn; state
/// is persisted and the next user message resumes through the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Node(NodeId),
    End,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Node context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything a node may touch besides the graph state itself.
pub(crate) struct NodeCtx<'a> {
    pub config: &'a WardenConfig,
    pub oracle: &'a dyn ReasoningOracle,
    pub substrate: &'a dyn ToolSubstrate,
    pub risk: &'a RiskEngine,
    pub tokens: &'a TokenManager,
    pub audit: &'a AuditLog,
    pub evictions: &'a EvictionStore,
    pub scanner: &'a DlpScanner,
}

impl NodeCtx<'_> {
    /// Start an audit entry scoped to this thread.
    pub fn entry(&self, state: &GraphState, kind: AuditKind) -> AuditEntry {
        AuditEntry::new(&state.thread_id, &state.user_id, kind)
    }

    /// Persist an audit entry and mirror it into the in-state trail.
    pub fn record(&self, state: &mut GraphState, entry: AuditEntry) -> Result<()> {
        state.audit_trail.push(AuditSummary {
            ts: entry.ts,
            kind: entry.kind.as_str().to_owned(),
            reason: entry.reason.clone(),
        });
        self.audit.append(&entry)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub(crate) async fn dispatch(
    node: NodeId,
    ctx: &NodeCtx<'_>,
    state: &mut GraphState,
) -> Result<Next> {
    match node {
        NodeId::Router => router::run(ctx, state),
        NodeId::Planner => planner::run(ctx, state).await,
        NodeId::Supervisor => supervisor::run(ctx, state),
        NodeId::Executor => executor::run(ctx, state).await,
        NodeId::RiskGate => risk_gate::run(ctx, state),
        NodeId::AwaitApproval => approval::await_approval(ctx, state),
        NodeId::ApprovalHandler => approval::handle(ctx, state),
        NodeId::Tools => tools::run(ctx, state).await,
        NodeId::Interpreter => interpreter::run(ctx, state),
        NodeId::Finalizer => finalizer::run(ctx, state),
    }
}

/// Reasons that mark a step `Blocked` rather than retryable `Failed`.
pub(crate) fn is_policy_block(reason: &str) -> bool {
    matches!(
        reason,
        wd_risk::REASON_HONEYTOKEN
            | wd_risk::REASON_SECRET_IN_ARGS
            | wd_risk::REASON_PATH_ESCAPE
            | wd_risk::REASON_MALFORMED_ARGS
            | REASON_USER_REJECTED
    )
}

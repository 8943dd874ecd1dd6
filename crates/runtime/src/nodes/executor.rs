//! Executor node: turn the oracle's raw tool proposal into an
//! integrity-bound [`ProposedTool`].
//!
//! Canonical form and hash are computed here, in the runtime — never
//! taken from the oracle. The risk gate recomputes both anyway; this
//! node's values are merely the executor's claim.

use wd_audit::AuditKind;
use wd_domain::error::Result;
use wd_domain::graph::{GraphState, ProposedTool, ToolResult};

use super::{Next, NodeCtx, NodeId, REASON_ORACLE_FAILURE};

pub(super) async fn run(ctx: &NodeCtx<'_>, state: &mut GraphState) -> Result<Next> {
    let proposal = match ctx.oracle.propose_tool(state).await {
        Ok(p) => p,
        Err(e) => return oracle_failure(ctx, state, &e.to_string()),
    };

    if !proposal.args.is_object() {
        return oracle_failure(ctx, state, "tool arguments must be a JSON object");
    }

    let (canonical_args, args_hash) = match wd_integrity::canonicalize_and_hash(&proposal.args) {
        Ok(pair) => pair,
        Err(e) => return oracle_failure(ctx, state, &e.to_string()),
    };

    let proposed = ProposedTool {
        name: proposal.name,
        args: proposal.args,
        canonical_args,
        args_hash,
        tool_call_id: uuid::Uuid::new_v4().to_string(),
        step_idx: state.current_step,
        created_at: chrono::Utc::now().timestamp(),
    };

    let entry = ctx
        .entry(state, AuditKind::ToolProposed)
        .tool(&proposed.name, &proposed.args_hash)
        .extra(serde_json::json!({
            "tool_call_id": proposed.tool_call_id,
            "step_idx": proposed.step_idx,
        }));
    state.proposed_tool = Some(proposed);
    ctx.record(state, entry)?;

    Ok(Next::Node(NodeId::RiskGate))
}

fn oracle_failure(ctx: &NodeCtx<'_>, state: &mut GraphState, detail: &str) -> Result<Next> {
    tracing::warn!(thread_id = %state.thread_id, detail, "executor oracle failure");
    let entry = ctx
        .entry(state, AuditKind::OracleFailure)
        .reason(REASON_ORACLE_FAILURE);
    ctx.record(state, entry)?;

    state.last_tool_result = Some(ToolResult::failed(
        REASON_ORACLE_FAILURE,
        "the executor could not produce a usable tool call",
    ));
    Ok(Next::Node(NodeId::Interpreter))
}

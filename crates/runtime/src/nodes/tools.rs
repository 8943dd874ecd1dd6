//! Tools node: physically execute an allowed (or approved) proposal.

use std::time::Duration;

use wd_audit::AuditKind;
use wd_domain::error::Result;
use wd_domain::graph::{GraphState, ToolResult, ToolStatus};

use super::{Next, NodeCtx, NodeId, REASON_TOOL_EXECUTION, REASON_TOOL_TIMEOUT};

pub(super) async fn run(ctx: &NodeCtx<'_>, state: &mut GraphState) -> Result<Next> {
    let Some(proposed) = state.proposed_tool.clone() else {
        return Ok(Next::Node(NodeId::Supervisor));
    };

    let timeout_secs = ctx
        .config
        .risk
        .tiers
        .get(&proposed.name)
        .and_then(|tier| tier.timeout_secs)
        .unwrap_or(ctx.config.runtime.tool_timeout_secs);
    let timeout = Duration::from_secs(timeout_secs);
    let invocation = ctx.substrate.invoke(&proposed.name, &proposed.args);

    let result = match tokio::time::timeout(timeout, invocation).await {
        Err(_) => ToolResult::failed(
            REASON_TOOL_TIMEOUT,
            format!(
                "tool '{}' timed out after {} s",
                proposed.name,
                timeout.as_secs()
            ),
        ),
        Ok(Err(e)) => {
            tracing::warn!(
                thread_id = %state.thread_id,
                tool = %proposed.name,
                error = %e,
                "tool invocation failed"
            );
            ToolResult::failed(REASON_TOOL_EXECUTION, format!("tool transport error: {e}"))
        }
        Ok(Ok(outcome)) if outcome.success => ToolResult::success(outcome.output),
        Ok(Ok(outcome)) => ToolResult::failed(REASON_TOOL_EXECUTION, outcome.output),
    };

    let entry = ctx
        .entry(state, AuditKind::ToolExecuted)
        .tool(&proposed.name, &proposed.args_hash)
        .decision(match result.status {
            ToolStatus::Success => "success",
            ToolStatus::Failed => "failed",
        })
        .extra(serde_json::json!({ "tool_call_id": proposed.tool_call_id }));
    ctx.record(state, entry)?;

    state.last_tool_result = Some(result);
    Ok(Next::Node(NodeId::Interpreter))
}

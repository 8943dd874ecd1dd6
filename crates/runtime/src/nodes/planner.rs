//! Planner node: ask the reasoning oracle for an ordered step list.

use wd_audit::AuditKind;
use wd_domain::error::Result;
use wd_domain::graph::{GraphState, StepStatus, ToolResult};

use super::{Next, NodeCtx, NodeId, REASON_ORACLE_FAILURE};

pub(super) async fn run(ctx: &NodeCtx<'_>, state: &mut GraphState) -> Result<Next> {
    let steps = match ctx.oracle.propose_plan(state).await {
        Ok(steps) if !steps.is_empty() => steps,
        Ok(_) => return oracle_failure(ctx, state, "planner returned an empty plan"),
        Err(e) => return oracle_failure(ctx, state, &e.to_string()),
    };

    tracing::debug!(
        thread_id = %state.thread_id,
        steps = steps.len(),
        "plan accepted"
    );

    state.current_step = 0;
    state.step_status = (0..steps.len()).map(|i| (i, StepStatus::Pending)).collect();
    state.tries = (0..steps.len()).map(|i| (i, 0)).collect();
    state.plan = steps;

    Ok(Next::Node(NodeId::Supervisor))
}

fn oracle_failure(ctx: &NodeCtx<'_>, state: &mut GraphState, detail: &str) -> Result<Next> {
    tracing::warn!(thread_id = %state.thread_id, detail, "planner oracle failure");
    let entry = ctx
        .entry(state, AuditKind::OracleFailure)
        .reason(REASON_ORACLE_FAILURE);
    ctx.record(state, entry)?;

    state.last_tool_result = Some(ToolResult::failed(
        REASON_ORACLE_FAILURE,
        "the planner could not produce a plan",
    ));
    Ok(Next::Node(NodeId::Finalizer))
}

//! Supervisor node: advance the plan, escalate exhausted steps, or hand
//! the current step to the executor.

use wd_audit::AuditKind;
use wd_domain::error::Result;
use wd_domain::graph::{GraphState, StepStatus};

use super::{Next, NodeCtx, NodeId};

pub(super) fn run(ctx: &NodeCtx<'_>, state: &mut GraphState) -> Result<Next> {
    if state.plan.is_empty() {
        return Ok(Next::Node(NodeId::Finalizer));
    }

    // Advance past completed steps.
    while state.current_step < state.plan.len()
        && state.current_step_status() == StepStatus::Done
    {
        state.current_step += 1;
    }
    if state.current_step >= state.plan.len() {
        return Ok(Next::Node(NodeId::Finalizer));
    }

    // A policy-blocked step is terminal: retrying would re-trip the
    // same rule.
    if state.current_step_status() == StepStatus::Blocked {
        return Ok(Next::Node(NodeId::Finalizer));
    }

    // Retry budget exhausted: mark failed and summarize the failure.
    if state.current_tries() >= ctx.config.runtime.max_tries {
        state.set_step_status(state.current_step, StepStatus::Failed);
        let entry = ctx
            .entry(state, AuditKind::StepFailed)
            .reason(format!(
                "step {} exhausted {} tries",
                state.current_step, ctx.config.runtime.max_tries
            ));
        ctx.record(state, entry)?;
        return Ok(Next::Node(NodeId::Finalizer));
    }

    let tries = state.current_tries() + 1;
    state.tries.insert(state.current_step, tries);
    state.set_step_status(state.current_step, StepStatus::Running);

    tracing::debug!(
        thread_id = %state.thread_id,
        step = state.current_step,
        attempt = tries,
        "dispatching step to executor"
    );
    Ok(Next::Node(NodeId::Executor))
}

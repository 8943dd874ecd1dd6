//! Finalizer node: compose the outbound assistant message from the
//! accumulated results and terminate the turn.

use wd_domain::error::Result;
use wd_domain::graph::{GraphState, Intent, StepStatus, ToolStatus};
use wd_domain::message::ChatMessage;

use super::{Next, NodeCtx};

pub(super) fn run(_ctx: &NodeCtx<'_>, state: &mut GraphState) -> Result<Next> {
    let text = compose(state);
    state.messages.push(ChatMessage::assistant(text));
    Ok(Next::End)
}

fn compose(state: &GraphState) -> String {
    // Planner never produced a plan for a task.
    if state.intent == Intent::Task && state.plan.is_empty() {
        return "I could not produce a plan for that request. Please try rephrasing it."
            .to_owned();
    }

    if state.intent == Intent::Conversation {
        return "Noted. Send a task and I will plan and execute it step by step.".to_owned();
    }

    // Report the first terminal problem, if any.
    for (idx, step) in state.plan.iter().enumerate() {
        match state.step_status.get(&idx) {
            Some(StepStatus::Blocked) => {
                let reason = state
                    .last_tool_result
                    .as_ref()
                    .and_then(|r| r.reason.clone())
                    .unwrap_or_else(|| "policy".to_owned());
                return format!(
                    "Step {} ('{}') was blocked ({reason}). The task cannot continue.",
                    idx + 1,
                    step.description
                );
            }
            Some(StepStatus::Failed) => {
                let tries = state.tries.get(&idx).copied().unwrap_or_default();
                return format!(
                    "Step {} ('{}') failed after {tries} attempt(s). The task was stopped.",
                    idx + 1,
                    step.description
                );
            }
            _ => {}
        }
    }

    // All steps done: summarize and include the last result.
    let done = state
        .step_status
        .values()
        .filter(|s| **s == StepStatus::Done)
        .count();
    let mut text = format!("Task complete: {done} step(s) executed.");

    if let Some(result) = &state.last_tool_result {
        if result.status == ToolStatus::Success {
            text.push_str("\n\n");
            text.push_str(&result.output);
            if let Some(summary) = &result.summary {
                text.push_str("\n\nPreview of the stored output:\n");
                text.push_str(summary);
            }
        }
    }
    text
}

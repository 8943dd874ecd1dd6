//! Entry node: decide where a fresh user message goes.

use wd_domain::error::Result;
use wd_domain::graph::{GraphState, Intent};

use super::{parse_approve, parse_reject, Next, NodeCtx, NodeId};

/// Decision table, evaluated top to bottom:
///
/// 1. Approval-format messages (`APROBAR <id> <token>` / `RECHAZAR <id>`)
///    go to the approval handler — also when no approval is pending, so
///    a stale or replayed approval is rejected and audited there rather
///    than silently treated as conversation.
/// 2. While awaiting approval, anything else is new information for the
///    supervisor.
/// 3. Conversation intent finalizes directly.
/// 4. A task without a plan goes to the planner; with a plan, to the
///    supervisor.
pub(super) fn run(_ctx: &NodeCtx<'_>, state: &mut GraphState) -> Result<Next> {
    let message = state.last_user_message().unwrap_or_default();

    if parse_approve(message).is_some() || parse_reject(message).is_some() {
        return Ok(Next::Node(NodeId::ApprovalHandler));
    }
    if state.awaiting_approval {
        return Ok(Next::Node(NodeId::Supervisor));
    }
    if state.intent == Intent::Conversation {
        return Ok(Next::Node(NodeId::Finalizer));
    }
    if state.plan.is_empty() {
        return Ok(Next::Node(NodeId::Planner));
    }
    Ok(Next::Node(NodeId::Supervisor))
}

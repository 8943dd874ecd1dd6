//! Human-in-the-loop approval: the pause node and the resolution node.
//!
//! A paused proposal is bound to `(thread_id, user_id, args_hash)`
//! through the token payload, so a token minted for one proposal cannot
//! approve a different proposal, thread, or user.

use std::sync::OnceLock;

use regex::Regex;

use wd_audit::AuditKind;
use wd_domain::error::Result;
use wd_domain::graph::{GraphState, StepStatus, ToolResult};
use wd_domain::message::ChatMessage;
use wd_domain::trace::TraceEvent;

use super::{
    Next, NodeCtx, NodeId, REASON_APPROVAL_EXPIRED, REASON_APPROVAL_INVALID, REASON_USER_REJECTED,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire format
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// Anchored with bounded character classes so approval text cannot be
// smuggled inside a longer message. The token class admits '.' for the
// `v1.<ts>.<nonce>.<sig>` structure.
fn approve_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^APROBAR ([A-Za-z0-9_-]{6,}) ([A-Za-z0-9._-]{6,})$")
            .expect("hardcoded pattern compiles")
    })
}

fn reject_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^RECHAZAR ([A-Za-z0-9_-]{6,})$").expect("hardcoded pattern compiles")
    })
}

/// Parse `APROBAR <id> <token>`, returning `(id, token)`.
pub(crate) fn parse_approve(message: &str) -> Option<(&str, &str)> {
    let caps = approve_re().captures(message)?;
    Some((
        caps.get(1).map(|m| m.as_str())?,
        caps.get(2).map(|m| m.as_str())?,
    ))
}

/// Parse `RECHAZAR <id>`, returning the id.
pub(crate) fn parse_reject(message: &str) -> Option<&str> {
    reject_re()
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// The exact binding string for approval tokens. Changing this
/// composition is a breaking protocol change.
fn approval_payload(state: &GraphState, approval_hash: &str) -> String {
    format!("{}:{}:{}", state.thread_id, state.user_id, approval_hash)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AwaitApproval
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Emit the approval prompt and terminate the turn. State is persisted;
/// the next user message resumes through the router.
pub(super) fn await_approval(ctx: &NodeCtx<'_>, state: &mut GraphState) -> Result<Next> {
    let approval_id = state.approval_id.clone().unwrap_or_default();
    let tool_name = state
        .proposed_tool
        .as_ref()
        .map(|p| p.name.clone())
        .unwrap_or_default();

    let mut text = format!(
        "Approval required to run '{tool_name}'.\n\
         Approval id: {approval_id} (valid for {} s).\n\
         Reply 'APROBAR {approval_id} <token>' to approve, or \
         'RECHAZAR {approval_id}' to reject.",
        ctx.config.approval.ttl_seconds
    );

    if ctx.config.approval.dev_mode {
        if let Some(hash) = state.approval_hash.as_deref() {
            let token = ctx.tokens.sign(&approval_payload(state, hash));
            text.push_str(&format!("\nAPROBAR {approval_id} {token}"));
        }
    }

    TraceEvent::ApprovalRequested {
        thread_id: state.thread_id.clone(),
        approval_id,
        expires_at: state.approval_expires_at.unwrap_or_default(),
    }
    .emit();

    state.messages.push(ChatMessage::assistant(text));
    Ok(Next::End)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ApprovalHandler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Resolve an approval-format message against the pending approval.
pub(super) fn handle(ctx: &NodeCtx<'_>, state: &mut GraphState) -> Result<Next> {
    let message = state.last_user_message().unwrap_or_default().to_owned();

    if let Some(id) = parse_reject(&message) {
        return handle_reject(ctx, state, id);
    }
    if let Some((id, token)) = parse_approve(&message) {
        let id = id.to_owned();
        let token = token.to_owned();
        return handle_approve(ctx, state, &id, &token);
    }
    // The router only sends approval-format messages here.
    Ok(Next::Node(NodeId::Supervisor))
}

fn handle_reject(ctx: &NodeCtx<'_>, state: &mut GraphState, id: &str) -> Result<Next> {
    if !state.awaiting_approval || state.approval_id.as_deref() != Some(id) {
        return fail(
            ctx,
            state,
            AuditKind::ApprovalInvalid,
            REASON_APPROVAL_INVALID,
            "no pending approval with that id",
        );
    }

    let entry = ctx
        .entry(state, AuditKind::ApprovalRejected)
        .reason(REASON_USER_REJECTED)
        .extra(serde_json::json!({ "approval_id": id }));
    ctx.record(state, entry)?;
    TraceEvent::ApprovalResolved {
        thread_id: state.thread_id.clone(),
        approval_id: id.to_owned(),
        outcome: "rejected".into(),
    }
    .emit();

    state.clear_approval();
    state.proposed_tool = None;
    // A human said no; do not retry this step.
    state.set_step_status(state.current_step, StepStatus::Blocked);
    state.last_tool_result = Some(ToolResult::failed(
        REASON_USER_REJECTED,
        "the proposed tool call was rejected by the user",
    ));
    Ok(Next::Node(NodeId::Supervisor))
}

/// Approval validation. Each factor must hold: matching id, unexpired
/// challenge, reconstructable payload, and an HMAC token that verifies
/// and consumes atomically (signature, freshness, and anti-replay in one
/// call).
fn handle_approve(
    ctx: &NodeCtx<'_>,
    state: &mut GraphState,
    id: &str,
    token: &str,
) -> Result<Next> {
    if !state.awaiting_approval || state.approval_id.as_deref() != Some(id) {
        return fail(
            ctx,
            state,
            AuditKind::ApprovalInvalid,
            REASON_APPROVAL_INVALID,
            "no pending approval with that id",
        );
    }

    let expires_at = state.approval_expires_at.unwrap_or(i64::MIN);
    if chrono::Utc::now().timestamp() > expires_at {
        return fail(
            ctx,
            state,
            AuditKind::ApprovalExpired,
            REASON_APPROVAL_EXPIRED,
            "the approval challenge expired",
        );
    }

    let Some(approval_hash) = state.approval_hash.clone() else {
        return fail(
            ctx,
            state,
            AuditKind::ApprovalInvalid,
            REASON_APPROVAL_INVALID,
            "approval state is incomplete",
        );
    };

    let payload = approval_payload(state, &approval_hash);
    if !ctx
        .tokens
        .verify_and_consume(token, &payload, ctx.config.approval.ttl_seconds)
    {
        return fail(
            ctx,
            state,
            AuditKind::ApprovalInvalid,
            REASON_APPROVAL_INVALID,
            "the approval token did not verify",
        );
    }

    // Approved: release the pause, keep the proposal for execution.
    let entry = ctx
        .entry(state, AuditKind::ApprovalApproved)
        .extra(serde_json::json!({ "approval_id": id }));
    ctx.record(state, entry)?;
    TraceEvent::ApprovalResolved {
        thread_id: state.thread_id.clone(),
        approval_id: id.to_owned(),
        outcome: "approved".into(),
    }
    .emit();

    state.awaiting_approval = false;
    state.approval_id = None;
    state.approval_expires_at = None;
    Ok(Next::Node(NodeId::Tools))
}

/// Shared failure path: audit the specific reason, clear the pause and
/// the proposal, record a failed result, and hand control back to the
/// supervisor.
fn fail(
    ctx: &NodeCtx<'_>,
    state: &mut GraphState,
    kind: AuditKind,
    reason: &str,
    detail: &str,
) -> Result<Next> {
    let entry = ctx.entry(state, kind).reason(reason);
    ctx.record(state, entry)?;
    tracing::warn!(
        thread_id = %state.thread_id,
        reason,
        detail,
        "approval resolution failed"
    );

    state.clear_approval();
    state.proposed_tool = None;
    state.last_tool_result = Some(ToolResult::failed(reason, detail));
    Ok(Next::Node(NodeId::Supervisor))
}

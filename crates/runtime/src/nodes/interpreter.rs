//! Interpreter node: size the raw output, evict when oversized, scan
//! egress for secrets, conclude the step, and clear the proposal.
//!
//! Clearing `proposed_tool` here is the double-execution guard: once a
//! result has been interpreted, no downstream node can run the same
//! proposal again.

use wd_audit::AuditKind;
use wd_domain::error::Result;
use wd_domain::graph::{GraphState, StepStatus, ToolStatus};
use wd_domain::trace::TraceEvent;

use super::{is_policy_block, Next, NodeCtx, NodeId};

/// Characters of the original output kept as a preview when evicting.
const SUMMARY_CHARS: usize = 500;

pub(super) fn run(ctx: &NodeCtx<'_>, state: &mut GraphState) -> Result<Next> {
    let Some(mut result) = state.last_tool_result.take() else {
        state.proposed_tool = None;
        return Ok(Next::Node(NodeId::Supervisor));
    };

    // Size is measured on the original output, before eviction.
    let size = result.output.len();
    result.size_chars = size;

    // Egress secret scan on the full original output.
    let findings = ctx.scanner.scan_secrets(&result.output);
    if !findings.is_empty() {
        let kinds: Vec<&str> = findings.iter().map(|f| f.kind.as_str()).collect();
        let entry = ctx
            .entry(state, AuditKind::SecretDetected)
            .reason(format!("secrets in tool output: {}", kinds.join(", ")))
            .critical();
        ctx.record(state, entry)?;
    }

    if size > ctx.config.eviction.threshold_chars {
        let pointer = ctx.evictions.save(&state.thread_id, &result.output)?;
        result.summary = Some(truncate_chars(&result.output, SUMMARY_CHARS));
        result.output = format!("[EVICTED size={size}] {pointer}");
        result.evicted = true;
        result.pointer = Some(pointer.clone());
        result.rehydration_allowed = size <= ctx.config.eviction.rehydration_limit_chars;

        TraceEvent::OutputEvicted {
            thread_id: state.thread_id.clone(),
            size_chars: size,
            pointer: pointer.clone(),
        }
        .emit();
        let entry = ctx
            .entry(state, AuditKind::OutputEvicted)
            .extra(serde_json::json!({ "size_chars": size, "pointer": pointer }));
        ctx.record(state, entry)?;
    } else {
        result.evicted = false;
        result.pointer = None;
        result.rehydration_allowed = true;
        result.summary = None;
    }

    // Conclude the step. Policy blocks are terminal; other failures
    // stay retryable.
    let status = match result.status {
        ToolStatus::Success => StepStatus::Done,
        ToolStatus::Failed
            if result.reason.as_deref().is_some_and(is_policy_block) =>
        {
            StepStatus::Blocked
        }
        ToolStatus::Failed => StepStatus::Failed,
    };
    state.set_step_status(state.current_step, status);

    let mut entry = ctx
        .entry(state, AuditKind::StepConcluded)
        .decision(match status {
            StepStatus::Done => "done",
            StepStatus::Blocked => "blocked",
            _ => "failed",
        });
    if let Some(reason) = &result.reason {
        entry = entry.reason(reason.clone());
    }
    ctx.record(state, entry)?;

    state.last_tool_result = Some(result);
    state.proposed_tool = None;
    Ok(Next::Node(NodeId::Supervisor))
}

/// First `limit` characters, respecting char boundaries.
fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "héllo wörld".repeat(100);
        let t = truncate_chars(&s, 500);
        assert_eq!(t.chars().count(), 500);
        assert!(s.starts_with(&t));
    }

    #[test]
    fn truncate_short_string_is_identity() {
        assert_eq!(truncate_chars("short", 500), "short");
    }
}

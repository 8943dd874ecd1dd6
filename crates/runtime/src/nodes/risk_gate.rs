//! Risk gate: the zero-trust chokepoint.
//!
//! Every proposal passes through here before anything physical happens.
//! The gate recomputes the canonical arguments and their hash from the
//! raw args, refuses proposals whose claimed values differ, and then
//! asks the risk engine for a policy decision.

use wd_audit::AuditKind;
use wd_domain::config::RiskAction;
use wd_domain::error::{Error, Result};
use wd_domain::graph::{GraphState, ProposedTool, ToolResult};
use wd_domain::trace::TraceEvent;
use wd_risk::{REASON_HONEYTOKEN, REASON_SECRET_IN_ARGS};

use super::{Next, NodeCtx, NodeId, REASON_INTEGRITY_MISMATCH};

/// Recompute canonical form and hash for a proposal and compare them
/// with the executor's claims.
pub fn verify_proposal_integrity(proposed: &ProposedTool) -> Result<String> {
    let (canonical, hash) = wd_integrity::canonicalize_and_hash(&proposed.args)?;
    if canonical != proposed.canonical_args || hash != proposed.args_hash {
        return Err(Error::Integrity(format!(
            "claimed hash {} does not match recomputed {hash}",
            proposed.args_hash
        )));
    }
    Ok(canonical)
}

pub(super) fn run(ctx: &NodeCtx<'_>, state: &mut GraphState) -> Result<Next> {
    let Some(proposed) = state.proposed_tool.clone() else {
        // Nothing to gate; hand control back.
        return Ok(Next::Node(NodeId::Supervisor));
    };

    // 1-2. Integrity: recompute, never trust.
    let canonical = match verify_proposal_integrity(&proposed) {
        Ok(canonical) => canonical,
        Err(e) => {
            let entry = ctx
                .entry(state, AuditKind::IntegrityMismatch)
                .tool(&proposed.name, &proposed.args_hash)
                .reason(e.to_string());
            ctx.record(state, entry)?;

            state.proposed_tool = None;
            state.last_tool_result = Some(ToolResult::failed(
                REASON_INTEGRITY_MISMATCH,
                "tool proposal failed integrity verification",
            ));
            return Ok(Next::Node(NodeId::Interpreter));
        }
    };

    // 3. Policy decision on the recomputed canonical form.
    let decision = ctx.risk.evaluate(&proposed.name, &canonical);

    TraceEvent::RiskEvaluated {
        thread_id: state.thread_id.clone(),
        tool_name: proposed.name.clone(),
        level: decision.level.as_str().to_owned(),
        decision: decision.decision.as_str().to_owned(),
        reason: decision.reason.clone(),
    }
    .emit();

    let mut entry = ctx
        .entry(state, AuditKind::RiskDecision)
        .tool(&proposed.name, &proposed.args_hash)
        .decision(decision.decision.as_str())
        .reason(decision.reason.clone());
    if matches!(
        decision.reason.as_str(),
        REASON_HONEYTOKEN | REASON_SECRET_IN_ARGS
    ) {
        entry = entry.critical();
    }
    ctx.record(state, entry)?;

    match decision.decision {
        RiskAction::Blocked => {
            state.last_tool_result = Some(ToolResult::failed(
                decision.reason,
                format!("tool '{}' was blocked by policy", proposed.name),
            ));
            Ok(Next::Node(NodeId::Interpreter))
        }
        RiskAction::AuthRequired => {
            let approval_id = fresh_approval_id();
            state.approval_id = Some(approval_id.clone());
            state.approval_hash = Some(proposed.args_hash.clone());
            state.approval_expires_at =
                Some(chrono::Utc::now().timestamp() + ctx.config.approval.ttl_seconds);
            state.awaiting_approval = true;

            let entry = ctx
                .entry(state, AuditKind::ApprovalRequested)
                .tool(&proposed.name, &proposed.args_hash)
                .reason(decision.reason)
                .extra(serde_json::json!({ "approval_id": approval_id }));
            ctx.record(state, entry)?;

            Ok(Next::Node(NodeId::AwaitApproval))
        }
        RiskAction::Allow => Ok(Next::Node(NodeId::Tools)),
    }
}

/// 16 url-safe characters.
fn fresh_approval_id() -> String {
    uuid::Uuid::new_v4().as_simple().to_string()[..16].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn proposal(args: serde_json::Value) -> ProposedTool {
        let (canonical_args, args_hash) = wd_integrity::canonicalize_and_hash(&args).unwrap();
        ProposedTool {
            name: "read_file".into(),
            args,
            canonical_args,
            args_hash,
            tool_call_id: "call-1".into(),
            step_idx: 0,
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn honest_proposal_verifies() {
        let p = proposal(json!({"path": "README.md"}));
        assert!(verify_proposal_integrity(&p).is_ok());
    }

    #[test]
    fn tampered_hash_is_detected() {
        let mut p = proposal(json!({"path": "README.md"}));
        p.args_hash = "00".repeat(32);
        assert!(matches!(
            verify_proposal_integrity(&p).unwrap_err(),
            Error::Integrity(_)
        ));
    }

    #[test]
    fn tampered_args_are_detected() {
        // Arguments swapped after hashing — the classic coerced-executor
        // shape: claimed canonical form and hash describe different args.
        let mut p = proposal(json!({"path": "README.md"}));
        p.args = json!({"path": "/etc/passwd"});
        assert!(verify_proposal_integrity(&p).is_err());
    }

    #[test]
    fn tampered_canonical_text_is_detected() {
        let mut p = proposal(json!({"path": "README.md"}));
        p.canonical_args = r#"{"path":"other.md"}"#.into();
        assert!(verify_proposal_integrity(&p).is_err());
    }

    #[test]
    fn approval_ids_are_url_safe() {
        let id = fresh_approval_id();
        assert_eq!(id.len(), 16);
        assert!(id.bytes().all(|b| b.is_ascii_alphanumeric()));
    }
}

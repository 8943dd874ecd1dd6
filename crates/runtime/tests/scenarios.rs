//! End-to-end scenarios over the full runtime with scripted oracles.

use std::sync::Arc;

use tempfile::TempDir;

use wd_audit::AuditKind;
use wd_domain::config::WardenConfig;
use wd_domain::graph::{Intent, StepStatus};
use wd_oracle::{ScriptedOracle, ScriptedSubstrate, ToolOutcome};
use wd_runtime::{InvokeRequest, InvokeOutcome, Runtime};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Harness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Harness {
    runtime: Runtime,
    oracle: Arc<ScriptedOracle>,
    substrate: Arc<ScriptedSubstrate>,
    config: WardenConfig,
    _tmp: TempDir,
}

fn harness() -> Harness {
    // One subscriber for the whole test binary; later calls are no-ops.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let tmp = TempDir::new().unwrap();

    let workspace = tmp.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();
    std::fs::write(workspace.join("README.md"), "# Title\nHello from the workspace.\n").unwrap();

    let mut config = WardenConfig::default();
    config.workspace.root = workspace;
    config.approval.hmac_secret = "test-secret".into();
    config.approval.dev_mode = true;
    config.risk.honeyfiles.push("admin_backup.json".into());
    config.risk.honeytokens.push("HONEY-ALPHA-7".into());
    config.storage.state_dir = tmp.path().join("state");
    config.storage.audit_log = tmp.path().join("state/audit.jsonl");
    config.storage.eviction_root = tmp.path().join("state/evictions");

    let oracle = Arc::new(ScriptedOracle::new());
    let substrate = Arc::new(ScriptedSubstrate::new());
    let runtime = Runtime::new(config.clone(), oracle.clone(), substrate.clone()).unwrap();

    Harness {
        runtime,
        oracle,
        substrate,
        config,
        _tmp: tmp,
    }
}

fn task(thread_id: &str, message: &str) -> InvokeRequest {
    InvokeRequest {
        thread_id: thread_id.into(),
        user_id: "u1".into(),
        message: message.into(),
        intent: Intent::Task,
    }
}

/// Extract the copyable `APROBAR <id> <token>` line from the approval
/// prompt (present in dev mode).
fn approval_line(outcome: &InvokeOutcome) -> String {
    outcome
        .messages
        .last()
        .unwrap()
        .lines()
        .find(|l| l.starts_with("APROBAR "))
        .expect("dev-mode prompt carries a ready approval line")
        .to_owned()
}

fn approval_id(outcome: &InvokeOutcome) -> String {
    let line = approval_line(outcome);
    line.split_whitespace().nth(1).unwrap().to_owned()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Seed scenarios
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn happy_path_reads_a_file() {
    let h = harness();
    h.oracle.push_plan(["read README.md"]);
    h.oracle
        .push_tool("read_file", serde_json::json!({"path": "README.md"}));
    h.substrate
        .enqueue("read_file", ToolOutcome::ok("# Title\nHello from the workspace."));

    let out = h.runtime.invoke(task("t1", "Read README.md")).await.unwrap();

    assert!(!out.awaiting_approval);
    assert!(out.messages.last().unwrap().contains("# Title"));
    assert_eq!(h.substrate.call_count(), 1);

    let snap = h.runtime.snapshot("t1").unwrap().unwrap();
    assert!(snap.proposed_tool.is_none());
    assert_eq!(snap.step_status[&0], StepStatus::Done);
    assert!(!snap.awaiting_approval);

    let executed: Vec<_> = h
        .runtime
        .audit_entries()
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == AuditKind::ToolExecuted)
        .collect();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].tool_name.as_deref(), Some("read_file"));
}

#[tokio::test]
async fn hitl_approval_pauses_then_executes() {
    let h = harness();
    h.oracle.push_plan(["send an email to the boss"]);
    h.oracle.push_tool(
        "send_email",
        serde_json::json!({"to": "boss@acme.com", "body": "hi"}),
    );

    let paused = h.runtime.invoke(task("t1", "Send the boss an email")).await.unwrap();

    assert!(paused.awaiting_approval);
    assert_eq!(h.substrate.call_count(), 0);
    let snap = h.runtime.snapshot("t1").unwrap().unwrap();
    assert!(snap.awaiting_approval);
    assert!(snap.approval_id.is_some());
    assert!(snap.approval_hash.is_some());
    assert!(snap.approval_expires_at.is_some());
    assert!(snap.proposed_tool.is_some());

    // Approve with the dev-mode token.
    h.substrate.enqueue("send_email", ToolOutcome::ok("sent"));
    let done = h
        .runtime
        .invoke(task("t1", &approval_line(&paused)))
        .await
        .unwrap();

    assert!(!done.awaiting_approval);
    assert_eq!(h.substrate.call_count(), 1);
    assert!(done.messages.last().unwrap().contains("Task complete"));

    let snap = h.runtime.snapshot("t1").unwrap().unwrap();
    assert!(snap.proposed_tool.is_none());
    assert_eq!(snap.step_status[&0], StepStatus::Done);
}

#[tokio::test]
async fn replayed_approval_is_rejected_and_audited() {
    let h = harness();
    h.oracle.push_plan(["send an email to the boss"]);
    h.oracle.push_tool(
        "send_email",
        serde_json::json!({"to": "boss@acme.com", "body": "hi"}),
    );

    let paused = h.runtime.invoke(task("t1", "Send the boss an email")).await.unwrap();
    let line = approval_line(&paused);

    h.substrate.enqueue("send_email", ToolOutcome::ok("sent"));
    h.runtime.invoke(task("t1", &line)).await.unwrap();
    assert_eq!(h.substrate.call_count(), 1);

    // Replay the identical approval message.
    let replay = h.runtime.invoke(task("t1", &line)).await.unwrap();

    // No second execution, and the replay is audited as invalid.
    assert_eq!(h.substrate.call_count(), 1);
    assert!(!replay.awaiting_approval);
    let invalid = h
        .runtime
        .audit_entries()
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == AuditKind::ApprovalInvalid)
        .count();
    assert_eq!(invalid, 1);
}

#[tokio::test]
async fn honeyfile_access_is_blocked_critical() {
    let h = harness();
    h.oracle.push_plan(["read the admin backup"]);
    h.oracle
        .push_tool("read_file", serde_json::json!({"path": "admin_backup.json"}));

    let out = h.runtime.invoke(task("t1", "Read the admin backup")).await.unwrap();

    assert_eq!(h.substrate.call_count(), 0);
    assert!(out.messages.last().unwrap().contains("blocked"));

    let snap = h.runtime.snapshot("t1").unwrap().unwrap();
    assert_eq!(snap.step_status[&0], StepStatus::Blocked);

    let trap = h
        .runtime
        .audit_entries()
        .unwrap()
        .into_iter()
        .find(|e| e.reason.as_deref() == Some("HONEYTOKEN_TRIGGERED"))
        .expect("honeytoken decision is audited");
    assert_eq!(trap.severity.as_deref(), Some("critical"));
    assert_eq!(trap.decision.as_deref(), Some("blocked"));
}

#[tokio::test]
async fn path_escape_is_blocked() {
    let h = harness();
    h.oracle.push_plan(["read a system file"]);
    h.oracle
        .push_tool("read_file", serde_json::json!({"path": "../../etc/passwd"}));

    let out = h.runtime.invoke(task("t1", "Read the password file")).await.unwrap();

    assert_eq!(h.substrate.call_count(), 0);
    assert!(out.messages.last().unwrap().contains("PATH_ESCAPE"));
    assert!(h
        .runtime
        .audit_entries()
        .unwrap()
        .iter()
        .any(|e| e.reason.as_deref() == Some("PATH_ESCAPE")));
}

#[tokio::test]
async fn rejection_stops_the_step() {
    let h = harness();
    h.oracle.push_plan(["send an email to the boss"]);
    h.oracle.push_tool(
        "send_email",
        serde_json::json!({"to": "boss@acme.com", "body": "hi"}),
    );

    let paused = h.runtime.invoke(task("t1", "Send the boss an email")).await.unwrap();
    let id = approval_id(&paused);

    let out = h
        .runtime
        .invoke(task("t1", &format!("RECHAZAR {id}")))
        .await
        .unwrap();

    assert_eq!(h.substrate.call_count(), 0);
    assert!(!out.awaiting_approval);
    assert!(out.messages.last().unwrap().contains("UserRejected"));

    let snap = h.runtime.snapshot("t1").unwrap().unwrap();
    assert!(snap.proposed_tool.is_none());
    assert_eq!(snap.step_status[&0], StepStatus::Blocked);
    assert!(h
        .runtime
        .audit_entries()
        .unwrap()
        .iter()
        .any(|e| e.kind == AuditKind::ApprovalRejected));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Eviction boundaries
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn run_read_with_output(h: &Harness, thread_id: &str, output: String) {
    h.oracle.push_plan(["read a large file"]);
    h.oracle
        .push_tool("read_file", serde_json::json!({"path": "README.md"}));
    h.substrate.enqueue("read_file", ToolOutcome::ok(output));
    h.runtime.invoke(task(thread_id, "Read it")).await.unwrap();
}

#[tokio::test]
async fn output_at_threshold_stays_inline() {
    let h = harness();
    run_read_with_output(&h, "t1", "a".repeat(10_000)).await;

    let result = h.runtime.snapshot("t1").unwrap().unwrap().last_tool_result.unwrap();
    assert!(!result.evicted);
    assert_eq!(result.size_chars, 10_000);
    assert!(result.rehydration_allowed);
    assert!(result.pointer.is_none());
}

#[tokio::test]
async fn output_over_threshold_is_evicted() {
    let h = harness();
    run_read_with_output(&h, "t1", "a".repeat(10_001)).await;

    let result = h.runtime.snapshot("t1").unwrap().unwrap().last_tool_result.unwrap();
    assert!(result.evicted);
    assert_eq!(result.size_chars, 10_001);
    assert!(result.rehydration_allowed);
    assert!(result.output.starts_with("[EVICTED size=10001] evict://t1/"));
    assert_eq!(result.summary.as_ref().unwrap().len(), 500);

    // The original content rehydrates from the pointer.
    let restored = h.runtime.rehydrate("t1").unwrap().unwrap();
    assert_eq!(restored.len(), 10_001);

    assert!(h
        .runtime
        .audit_entries()
        .unwrap()
        .iter()
        .any(|e| e.kind == AuditKind::OutputEvicted));
}

#[tokio::test]
async fn rehydration_boundary_is_50k() {
    let h = harness();
    run_read_with_output(&h, "ok", "a".repeat(50_000)).await;
    run_read_with_output(&h, "big", "a".repeat(50_001)).await;

    let at_limit = h.runtime.snapshot("ok").unwrap().unwrap().last_tool_result.unwrap();
    assert!(at_limit.rehydration_allowed);

    let over = h.runtime.snapshot("big").unwrap().unwrap().last_tool_result.unwrap();
    assert!(over.evicted);
    assert!(!over.rehydration_allowed);
    assert!(h.runtime.rehydrate("big").is_err());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Retries, restarts, administration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn three_failures_escalate_the_step() {
    let h = harness();
    h.oracle.push_plan(["read a flaky file"]);
    for _ in 0..3 {
        h.oracle
            .push_tool("read_file", serde_json::json!({"path": "README.md"}));
        h.substrate
            .enqueue("read_file", ToolOutcome::error("disk on fire"));
    }

    let out = h.runtime.invoke(task("t1", "Read the flaky file")).await.unwrap();

    assert_eq!(h.substrate.call_count(), 3);
    assert!(out.messages.last().unwrap().contains("failed after 3 attempt(s)"));

    let snap = h.runtime.snapshot("t1").unwrap().unwrap();
    assert_eq!(snap.tries[&0], 3);
    assert_eq!(snap.step_status[&0], StepStatus::Failed);
    assert!(h
        .runtime
        .audit_entries()
        .unwrap()
        .iter()
        .any(|e| e.kind == AuditKind::StepFailed));
}

#[tokio::test]
async fn approval_survives_process_restart() {
    let h = harness();
    h.oracle.push_plan(["send an email to the boss"]);
    h.oracle.push_tool(
        "send_email",
        serde_json::json!({"to": "boss@acme.com", "body": "hi"}),
    );

    let paused = h.runtime.invoke(task("t1", "Send the boss an email")).await.unwrap();
    let line = approval_line(&paused);

    // "Restart": a fresh runtime over the same storage directories.
    let restarted = Runtime::new(
        h.config.clone(),
        h.oracle.clone(),
        h.substrate.clone(),
    )
    .unwrap();

    h.substrate.enqueue("send_email", ToolOutcome::ok("sent"));
    let done = restarted.invoke(task("t1", &line)).await.unwrap();

    assert!(!done.awaiting_approval);
    assert_eq!(h.substrate.call_count(), 1);
    assert!(done.messages.last().unwrap().contains("Task complete"));
}

#[tokio::test]
async fn cancelled_thread_refuses_further_turns() {
    let h = harness();
    let req = InvokeRequest {
        thread_id: "t1".into(),
        user_id: "u1".into(),
        message: "hello".into(),
        intent: Intent::Conversation,
    };
    h.runtime.invoke(req.clone()).await.unwrap();

    assert!(h.runtime.cancel("t1").await.unwrap());
    assert!(!h.runtime.cancel("missing").await.unwrap());

    let out = h.runtime.invoke(req).await.unwrap();
    assert!(out.messages[0].contains("cancelled"));
    assert!(h
        .runtime
        .audit_entries()
        .unwrap()
        .iter()
        .any(|e| e.kind == AuditKind::ThreadCancelled));
}

#[tokio::test]
async fn ingress_pii_is_redacted_before_the_transcript() {
    let h = harness();
    let out = h
        .runtime
        .invoke(InvokeRequest {
            thread_id: "t1".into(),
            user_id: "u1".into(),
            message: "my address is bob@example.com at 10.0.0.1".into(),
            intent: Intent::Conversation,
        })
        .await
        .unwrap();
    assert!(!out.messages.is_empty());

    let history = h.runtime.history("t1").unwrap();
    assert!(history[0].content.contains("[REDACTED_EMAIL]"));
    assert!(history[0].content.contains("[REDACTED_IP]"));
    assert!(!history[0].content.contains("bob@example.com"));
}

#[tokio::test]
async fn delete_thread_removes_state_and_evictions() {
    let h = harness();
    run_read_with_output(&h, "t1", "a".repeat(20_000)).await;
    assert!(h.runtime.snapshot("t1").unwrap().is_some());

    h.runtime.delete_thread("t1").await.unwrap();

    assert!(h.runtime.snapshot("t1").unwrap().is_none());
    assert!(h.runtime.history("t1").unwrap().is_empty());
    assert!(h
        .runtime
        .audit_entries()
        .unwrap()
        .iter()
        .any(|e| e.kind == AuditKind::ThreadDeleted));
}

#[tokio::test]
async fn empty_secret_fails_construction() {
    let mut config = WardenConfig::default();
    config.approval.hmac_secret = String::new();
    let err = Runtime::new(
        config,
        Arc::new(ScriptedOracle::new()),
        Arc::new(ScriptedSubstrate::new()),
    )
    .unwrap_err();
    assert!(err.to_string().contains("hmac_secret"));
}

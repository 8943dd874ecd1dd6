use serde::Serialize;

/// Structured trace events emitted across all warden crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    NodeEntered {
        thread_id: String,
        node: String,
        step: usize,
    },
    TurnFinished {
        thread_id: String,
        nodes_visited: u32,
        awaiting_approval: bool,
    },
    RiskEvaluated {
        thread_id: String,
        tool_name: String,
        level: String,
        decision: String,
        reason: String,
    },
    ApprovalRequested {
        thread_id: String,
        approval_id: String,
        expires_at: i64,
    },
    ApprovalResolved {
        thread_id: String,
        approval_id: String,
        outcome: String,
    },
    OutputEvicted {
        thread_id: String,
        size_chars: usize,
        pointer: String,
    },
    SnapshotPersisted {
        thread_id: String,
        bytes: usize,
    },
    ThreadCancelled {
        thread_id: String,
    },
    ThreadQuarantined {
        thread_id: String,
        reason: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "wd_event");
    }
}

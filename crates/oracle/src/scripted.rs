//! Scripted oracle and substrate doubles.
//!
//! Deterministic stand-ins for the reasoning core and the tool
//! substrate: responses are queued up front and popped in order. Used by
//! the runtime's scenario suite and by embedders that want a dry-run
//! mode.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde_json::Value;

use wd_domain::error::{Error, Result};
use wd_domain::graph::{GraphState, PlanStep};

use crate::{ReasoningOracle, ToolOutcome, ToolProposal, ToolSubstrate};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ScriptedOracle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reasoning-core double with pre-queued plans and tool proposals.
#[derive(Default)]
pub struct ScriptedOracle {
    plans: Mutex<VecDeque<Vec<PlanStep>>>,
    proposals: Mutex<VecDeque<ToolProposal>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next plan to return from `propose_plan`.
    pub fn push_plan<I, S>(&self, steps: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plans
            .lock()
            .push_back(steps.into_iter().map(PlanStep::new).collect());
    }

    /// Queue the next tool proposal to return from `propose_tool`.
    pub fn push_tool(&self, name: impl Into<String>, args: Value) {
        self.proposals.lock().push_back(ToolProposal {
            name: name.into(),
            args,
        });
    }

    /// Proposals still queued (for exhaustion assertions).
    pub fn remaining_proposals(&self) -> usize {
        self.proposals.lock().len()
    }
}

#[async_trait::async_trait]
impl ReasoningOracle for ScriptedOracle {
    async fn propose_plan(&self, _state: &GraphState) -> Result<Vec<PlanStep>> {
        self.plans
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Oracle("plan script exhausted".into()))
    }

    async fn propose_tool(&self, _state: &GraphState) -> Result<ToolProposal> {
        self.proposals
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Oracle("tool script exhausted".into()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ScriptedSubstrate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tool-substrate double: per-tool outcome queues plus a record of every
/// invocation for assertions.
#[derive(Default)]
pub struct ScriptedSubstrate {
    outcomes: Mutex<HashMap<String, VecDeque<ToolOutcome>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedSubstrate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next outcome for `tool`.
    pub fn enqueue(&self, tool: impl Into<String>, outcome: ToolOutcome) {
        self.outcomes
            .lock()
            .entry(tool.into())
            .or_default()
            .push_back(outcome);
    }

    /// Every `(tool_name, args)` pair that reached the substrate.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait::async_trait]
impl ToolSubstrate for ScriptedSubstrate {
    async fn invoke(&self, name: &str, args: &Value) -> Result<ToolOutcome> {
        self.calls.lock().push((name.to_owned(), args.clone()));
        self.outcomes
            .lock()
            .get_mut(name)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| Error::ToolExecution(format!("no scripted outcome for '{name}'")))
    }
}

//! The graph runtime — the zero-trust execution core.
//!
//! [`Runtime`] wires the component stack (risk engine, token manager,
//! DLP scanner, audit log, eviction and state stores) around the node
//! graph and exposes the inbound contract: [`Runtime::invoke`] drives
//! one turn per user message, [`Runtime::cancel`] stops a thread,
//! [`Runtime::history`] and [`Runtime::snapshot`] read it back, and
//! [`Runtime::delete_thread`] removes it.
//!
//! Entry point: build a [`Runtime`] from a validated [`WardenConfig`]
//! plus a reasoning oracle and a tool substrate, then call `invoke` per
//! inbound message.

pub mod nodes;
pub mod thread_lock;

mod turn;

use std::sync::Arc;

use wd_audit::{AuditEntry, AuditKind, AuditLog};
use wd_dlp::DlpScanner;
use wd_domain::config::{ConfigSeverity, WardenConfig};
use wd_domain::error::{Error, Result};
use wd_domain::graph::{GraphState, Intent};
use wd_domain::message::{ChatMessage, Role};
use wd_domain::trace::TraceEvent;
use wd_oracle::{ReasoningOracle, ToolSubstrate};
use wd_risk::RiskEngine;
use wd_store::{EvictionStore, StateStore};
use wd_tokens::TokenManager;

use nodes::NodeCtx;
use thread_lock::ThreadLockMap;

/// Shown to the user when a thread cannot run; carries no internal
/// detail by design.
const GENERIC_FAILURE: &str =
    "This conversation is temporarily unavailable. An operator has been notified.";
const CANCELLED_NOTICE: &str = "This conversation was cancelled and accepts no further tasks.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound contract types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One inbound user message.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub thread_id: String,
    pub user_id: String,
    pub message: String,
    pub intent: Intent,
}

/// The outcome of one graph turn.
#[derive(Debug, Clone)]
pub struct InvokeOutcome {
    /// Assistant messages produced this turn, in order.
    pub messages: Vec<String>,
    /// True when the turn paused on human approval.
    pub awaiting_approval: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Runtime
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Runtime {
    config: WardenConfig,
    oracle: Arc<dyn ReasoningOracle>,
    substrate: Arc<dyn ToolSubstrate>,
    risk: RiskEngine,
    tokens: TokenManager,
    audit: AuditLog,
    evictions: EvictionStore,
    states: StateStore,
    scanner: DlpScanner,
    locks: ThreadLockMap,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl Runtime {
    /// Build the runtime from config and the two external collaborators.
    ///
    /// Fails on config validation errors; warnings are logged and
    /// tolerated.
    pub fn new(
        config: WardenConfig,
        oracle: Arc<dyn ReasoningOracle>,
        substrate: Arc<dyn ToolSubstrate>,
    ) -> Result<Self> {
        let problems = config.validate();
        for problem in &problems {
            match problem.severity {
                ConfigSeverity::Error => tracing::error!(config = %problem, "invalid config"),
                ConfigSeverity::Warning => tracing::warn!(config = %problem, "config warning"),
            }
        }
        if let Some(first) = problems
            .iter()
            .find(|p| p.severity == ConfigSeverity::Error)
        {
            return Err(Error::Config(first.to_string()));
        }

        let scanner = DlpScanner::new(&config.dlp)?;
        let risk = RiskEngine::new(
            config.risk.clone(),
            config.workspace.root.clone(),
            DlpScanner::new(&config.dlp)?,
        );
        let tokens = TokenManager::new(config.approval.hmac_secret.as_bytes().to_vec());
        let audit = AuditLog::open(&config.storage.audit_log)?;
        let evictions = EvictionStore::new(&config.storage.eviction_root)?;
        let states = StateStore::new(&config.storage.state_dir)?;

        Ok(Self {
            config,
            oracle,
            substrate,
            risk,
            tokens,
            audit,
            evictions,
            states,
            scanner,
            locks: ThreadLockMap::new(),
        })
    }

    /// Drive one graph turn to completion or to the next suspension
    /// point. Serialized per thread: a second call for the same
    /// `thread_id` waits for the first to finish.
    pub async fn invoke(&self, req: InvokeRequest) -> Result<InvokeOutcome> {
        let _permit = self.locks.acquire(&req.thread_id).await?;

        let mut state = match self.states.load(&req.thread_id) {
            Ok(Some(state)) => state,
            Ok(None) => GraphState::new(&req.thread_id, &req.user_id),
            Err(Error::StateCorruption(detail)) => {
                self.audit.append(
                    &AuditEntry::new(&req.thread_id, &req.user_id, AuditKind::ThreadQuarantined)
                        .reason(detail),
                )?;
                return Ok(InvokeOutcome {
                    messages: vec![GENERIC_FAILURE.to_owned()],
                    awaiting_approval: false,
                });
            }
            Err(e) => return Err(e),
        };

        if state.cancelled {
            return Ok(InvokeOutcome {
                messages: vec![CANCELLED_NOTICE.to_owned()],
                awaiting_approval: false,
            });
        }

        state.intent = req.intent;
        let ingress = if self.config.dlp.redact_ingress {
            self.scanner.redact_pii(&req.message)
        } else {
            req.message.clone()
        };
        state.messages.push(ChatMessage::user(ingress));
        let transcript_mark = state.messages.len();

        let ctx = self.node_ctx();
        turn::drive_turn(&ctx, &self.states, &mut state).await?;
        self.states.save(&state)?;

        let messages = state.messages[transcript_mark..]
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.clone())
            .collect();

        Ok(InvokeOutcome {
            messages,
            awaiting_approval: state.awaiting_approval,
        })
    }

    /// Administratively cancel a thread. The in-flight turn (if any)
    /// finishes first — the turn lock serializes us behind it. Pending
    /// approvals expire naturally through token freshness.
    pub async fn cancel(&self, thread_id: &str) -> Result<bool> {
        let _permit = self.locks.acquire(thread_id).await?;

        let Some(mut state) = self.states.load(thread_id)? else {
            return Ok(false);
        };
        if !state.cancelled {
            state.cancelled = true;
            self.states.save(&state)?;
            self.audit.append(&AuditEntry::new(
                thread_id,
                &state.user_id,
                AuditKind::ThreadCancelled,
            ))?;
            TraceEvent::ThreadCancelled {
                thread_id: thread_id.to_owned(),
            }
            .emit();
        }
        Ok(true)
    }

    /// The ordered transcript of a thread.
    pub fn history(&self, thread_id: &str) -> Result<Vec<ChatMessage>> {
        Ok(self
            .states
            .load(thread_id)?
            .map(|state| state.messages)
            .unwrap_or_default())
    }

    /// The full snapshot of a thread (operator tooling and tests).
    pub fn snapshot(&self, thread_id: &str) -> Result<Option<GraphState>> {
        self.states.load(thread_id)
    }

    /// Administrative delete: removes the snapshot, any quarantine
    /// marker, and all evicted outputs for the thread.
    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let _permit = self.locks.acquire(thread_id).await?;

        self.states.delete(thread_id)?;
        self.evictions.delete_thread(thread_id)?;
        self.audit.append(&AuditEntry::new(
            thread_id,
            "",
            AuditKind::ThreadDeleted,
        ))?;
        Ok(())
    }

    /// Read back the audit log (operator tooling and tests).
    pub fn audit_entries(&self) -> Result<Vec<AuditEntry>> {
        self.audit.read_all()
    }

    /// Load an evicted output by pointer, refusing rehydration when the
    /// original exceeded the configured limit.
    pub fn rehydrate(&self, thread_id: &str) -> Result<Option<String>> {
        let Some(state) = self.states.load(thread_id)? else {
            return Ok(None);
        };
        let Some(result) = state.last_tool_result else {
            return Ok(None);
        };
        if !result.evicted {
            return Ok(Some(result.output));
        }
        if !result.rehydration_allowed {
            return Err(Error::PolicyBlocked(format!(
                "output of {} chars exceeds the rehydration limit",
                result.size_chars
            )));
        }
        match result.pointer {
            Some(pointer) => Ok(Some(self.evictions.load(&pointer)?)),
            None => Ok(None),
        }
    }

    fn node_ctx(&self) -> NodeCtx<'_> {
        NodeCtx {
            config: &self.config,
            oracle: self.oracle.as_ref(),
            substrate: self.substrate.as_ref(),
            risk: &self.risk,
            tokens: &self.tokens,
            audit: &self.audit,
            evictions: &self.evictions,
            scanner: &self.scanner,
        }
    }
}

pub use nodes::{NodeId, verify_proposal_integrity};

//! Turns a free-text command into exactly one action invocation, or a status
//! line saying why nothing ran.
//!
//! Two strategies share one resolver state (query, status, loading):
//! [`CommandResolver::resolve_local`] scores declared actions by keyword
//! overlap, and [`CommandResolver::resolve_remote`] asks a completion endpoint
//! to pick from the indexed actions.

pub mod local;
pub mod remote;

use std::path::PathBuf;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::audit;
use crate::error::AgentError;
use crate::handler::Handler;

pub const STATUS_NO_MATCH: &str = "Sorry, I don't know how to do that.";
pub const STATUS_THINKING: &str = "Thinking...";
pub const STATUS_NO_SUITABLE_ACTION: &str = "No suitable action found.";
pub const STATUS_INVALID_ACTION_ID: &str = "LLM did not return a valid action ID.";

/// Outcome of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[cfg_attr(feature = "ts-bindings", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts-bindings", ts(export))]
pub enum Resolution {
    Executed { action_id: String, description: String },
    /// Nothing fit the query (zero local score, or the model said `"none"`).
    NoMatch,
    /// The model answered with an id that is empty or not in the registry.
    InvalidActionId { action_id: String },
    /// Transport, HTTP or handler failure; the message is also the status.
    Failed { message: String },
    /// Blank query; nothing happened.
    Ignored,
    /// A remote request is already outstanding.
    Busy,
}

/// What a UI bound to the resolver renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts-bindings", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts-bindings", ts(export))]
pub struct ResolverView {
    pub query: String,
    pub status: String,
    pub loading: bool,
}

#[derive(Debug, Default)]
pub struct CommandResolver {
    state: Mutex<ResolverView>,
    audit_dir: Option<PathBuf>,
}

impl CommandResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log every invocation to the JSONL audit under `app_config_dir`.
    pub fn with_audit_dir(mut self, app_config_dir: PathBuf) -> Self {
        self.audit_dir = Some(app_config_dir);
        self
    }

    /// Replace the query text. Ignored (returns false) while a remote request
    /// is outstanding, the same way a disabled input would be.
    pub fn set_query(&self, query: impl Into<String>) -> bool {
        let mut state = self.state.lock();
        if state.loading {
            return false;
        }
        state.query = query.into();
        true
    }

    pub fn query(&self) -> String {
        self.state.lock().query.clone()
    }

    pub fn status(&self) -> String {
        self.state.lock().status.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn view(&self) -> ResolverView {
        self.state.lock().clone()
    }

    fn set_status(&self, status: impl Into<String>) {
        self.state.lock().status = status.into();
    }

    fn clear_query(&self) {
        self.state.lock().query.clear();
    }

    /// Invoke a handler with no resolver lock held, so handlers may call back
    /// into the resolver.
    fn invoke(
        &self,
        strategy: &str,
        action_id: &str,
        handler: &Handler,
        args: &[Value],
    ) -> Result<(), AgentError> {
        let started = Instant::now();
        let result = handler.invoke(args);
        match &result {
            Ok(()) => tracing::info!(strategy, action_id, "action invoked"),
            Err(e) => tracing::warn!(strategy, action_id, error = %e, "action failed"),
        }
        if let Some(dir) = &self.audit_dir {
            let message = result.as_ref().err().map(ToString::to_string);
            audit::log_invocation(
                dir,
                strategy,
                action_id,
                args,
                message.as_deref().map_or(Ok("invoked"), Err),
                started.elapsed(),
            );
        }
        result
    }
}

pub(crate) fn execution_error_status(e: &AgentError) -> String {
    format!("Error executing action: {e}")
}

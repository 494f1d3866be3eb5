//! Model-assisted matching: send the query plus the indexed actions to a
//! completion endpoint and invoke whichever action it names.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::error::AgentError;
use crate::index::{IndexSnapshot, LlmActionMap, SemanticNode};
use crate::llm::{parse_response_content, CompletionRequest, CompletionTransport};

use super::{
    execution_error_status, CommandResolver, Resolution, ResolverView, STATUS_INVALID_ACTION_ID,
    STATUS_NO_SUITABLE_ACTION, STATUS_THINKING,
};

pub const SYSTEM_INSTRUCTION: &str = "You map a user's natural-language command onto exactly one \
action of a running user interface. You receive the user's query, a semantic outline of the \
interface, and a map of available actions keyed by action id, each with a description, the path \
of the component that owns it, identifying props and the handler's parameter names. Pick the \
single action that best fulfils the query and respond with only a JSON object of the form \
{\"actionId\": \"<id>\", \"parameters\": [<positional arguments>]}. Use an empty parameters array \
when the handler takes no input. If no action fits, respond with {\"actionId\": \"none\"}.";

/// User-role message body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePayload<'a> {
    pub query: &'a str,
    pub semantic_structure: Option<&'a SemanticNode>,
    pub llm_action_map: &'a LlmActionMap,
}

/// What the model picked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteChoice {
    pub action_id: String,
    pub parameters: Vec<Value>,
}

/// Read the model's answer. JSON objects give `actionId` and `parameters`;
/// anything that is not JSON is taken as a bare id with quotes stripped.
pub fn parse_choice(content: &str) -> RemoteChoice {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => RemoteChoice {
            action_id: map
                .get("actionId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            parameters: map
                .get("parameters")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        },
        Ok(Value::String(id)) => RemoteChoice {
            action_id: id.trim().to_string(),
            parameters: Vec::new(),
        },
        Ok(_) => RemoteChoice::default(),
        Err(_) => RemoteChoice {
            action_id: content.trim().replace(['"', '\''], ""),
            parameters: Vec::new(),
        },
    }
}

pub fn build_completion_request(
    query: &str,
    snapshot: &IndexSnapshot,
) -> Result<CompletionRequest, serde_json::Error> {
    let payload = RemotePayload {
        query,
        semantic_structure: snapshot.semantic_structure.as_ref(),
        llm_action_map: &snapshot.action_map,
    };
    Ok(CompletionRequest {
        system: SYSTEM_INSTRUCTION.to_string(),
        user: serde_json::to_string(&payload)?,
    })
}

/// Clears `loading` however the request ends, including when the future is
/// dropped mid-flight.
struct LoadingGuard<'a>(&'a Mutex<ResolverView>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().loading = false;
    }
}

impl CommandResolver {
    /// Ask `transport` to choose an action from `snapshot` for the current
    /// query. A blank query does nothing; a call while another is in flight
    /// is rejected.
    pub async fn resolve_remote<T: CompletionTransport>(
        &self,
        transport: &T,
        snapshot: &IndexSnapshot,
    ) -> Resolution {
        let query = {
            let mut state = self.state.lock();
            if state.loading {
                return Resolution::Busy;
            }
            if state.query.trim().is_empty() {
                return Resolution::Ignored;
            }
            state.loading = true;
            state.status = STATUS_THINKING.to_string();
            state.query.clone()
        };
        let _loading = LoadingGuard(&self.state);

        let request = match build_completion_request(&query, snapshot) {
            Ok(request) => request,
            Err(e) => return self.fail(format!("Error: {e}")),
        };
        tracing::debug!(
            actions = snapshot.action_map.len(),
            bytes = request.user.len(),
            "sending completion request"
        );

        let response = match transport.complete(&request).await {
            Ok(response) => response,
            Err(e) => return self.fail(format!("Error: {e}")),
        };
        if !response.is_success() {
            let refused = AgentError::HttpStatus {
                status: response.status,
                text: response.status_text.clone(),
            };
            tracing::warn!(error = %refused, "completion endpoint refused request");
            return self.fail(format!("Error: {}", response.status_text));
        }
        let content = match parse_response_content(&response.body) {
            Ok(content) => content,
            Err(e) => return self.fail(format!("Error: {e}")),
        };

        let choice = parse_choice(&content);
        tracing::info!(action_id = %choice.action_id, "model chose action");

        if choice.action_id == "none" {
            self.set_status(STATUS_NO_SUITABLE_ACTION);
            return Resolution::NoMatch;
        }
        let Some(action) = snapshot.registry.get(&choice.action_id) else {
            self.set_status(STATUS_INVALID_ACTION_ID);
            return Resolution::InvalidActionId {
                action_id: choice.action_id,
            };
        };

        match self.invoke("remote", &action.id, &action.handler, &choice.parameters) {
            Ok(()) => {
                self.set_status(format!("Executing: {}", action.description));
                self.clear_query();
                Resolution::Executed {
                    action_id: action.id.clone(),
                    description: action.description.clone(),
                }
            }
            Err(e) => self.fail(execution_error_status(&e)),
        }
    }

    fn fail(&self, message: String) -> Resolution {
        self.set_status(message.clone());
        Resolution::Failed { message }
    }
}

//! [`ActionRegistry`] → [`LlmActionMap`]: the serializable action list sent
//! to the completion endpoint.

use indexmap::IndexMap;
use serde::Serialize;

use super::extract::ActionRegistry;
use super::walker::NormalizedValue;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-bindings", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts-bindings", ts(export))]
pub struct LlmActionEntry {
    pub id: String,
    pub component: String,
    pub event: String,
    pub path: Vec<String>,
    pub semantic_id: String,
    #[cfg_attr(feature = "ts-bindings", ts(type = "Record<string, unknown>"))]
    pub identifying_props: IndexMap<String, NormalizedValue>,
    pub description: String,
    pub parameters: Vec<String>,
    pub signature: String,
}

/// Action map keyed by action id, in registry order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct LlmActionMap {
    entries: IndexMap<String, LlmActionEntry>,
}

impl LlmActionMap {
    pub fn get(&self, id: &str) -> Option<&LlmActionEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LlmActionEntry> {
        self.entries.values()
    }
}

pub fn build_action_map(registry: &ActionRegistry) -> LlmActionMap {
    let entries = registry
        .iter()
        .map(|action| {
            let raw = raw_parameter_list(action.handler.source()).unwrap_or("");
            let entry = LlmActionEntry {
                id: action.id.clone(),
                component: action.component.clone(),
                event: action.event.clone(),
                path: action.path.clone(),
                semantic_id: action.semantic_id.clone(),
                identifying_props: action.identifying_props.clone(),
                description: action.description.clone(),
                parameters: split_parameters(raw),
                signature: format!("{}({raw})", action.handler.name()),
            };
            (action.id.clone(), entry)
        })
        .collect();
    LlmActionMap { entries }
}

/// Text between the first `(` and the next `)` of a handler's source.
///
/// Best effort only: destructured, defaulted or nested parameter lists are
/// cut at the first closing parenthesis.
pub fn raw_parameter_list(source: &str) -> Option<&str> {
    let open = source.find('(')?;
    let rest = source.get(open + 1..)?;
    let close = rest.find(')')?;
    rest.get(..close)
}

pub fn split_parameters(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

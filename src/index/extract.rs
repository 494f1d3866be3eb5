//! Raw UI tree → [`ActionRegistry`].
//!
//! Every `on*` prop holding a function becomes one [`Action`]. Ids are dense
//! (`action_0`, `action_1`, ...) within one pass and mean nothing across
//! passes.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;

use super::walker::{normalize, NormalizedValue};
use crate::handler::Handler;
use crate::tree::{self, is_event_prop, NodeRef, Props, UiNode};

/// Props that identify which instance of a component an action belongs to.
pub const IDENTIFYING_PROPS: [&str; 6] = ["id", "num", "index", "value", "name", "className"];

/// Separator between path segments in action descriptions.
pub const PATH_SEPARATOR: &str = " > ";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    pub component: String,
    pub event: String,
    pub path: Vec<String>,
    pub semantic_id: String,
    pub identifying_props: IndexMap<String, NormalizedValue>,
    pub description: String,
    #[serde(skip)]
    pub handler: Handler,
}

/// All actions discovered by one pass, in discovery order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ActionRegistry {
    actions: IndexMap<String, Action>,
}

impl ActionRegistry {
    pub fn get(&self, id: &str) -> Option<&Action> {
        self.actions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }
}

pub fn extract_actions(root: Option<&NodeRef>) -> ActionRegistry {
    let mut extractor = Extractor::default();
    if let Some(node) = root {
        extractor.visit(node.as_ref(), &[]);
    }
    extractor.registry
}

#[derive(Default)]
struct Extractor {
    next_id: usize,
    /// Occurrences seen so far, keyed by (parent path, component name).
    occurrences: HashMap<(String, String), usize>,
    registry: ActionRegistry,
}

impl Extractor {
    fn visit(&mut self, node: &dyn UiNode, parent_path: &[String]) {
        let component = tree::display_name(node);
        let slot = self
            .occurrences
            .entry((parent_path.join("/"), component.clone()))
            .or_insert(0);
        let instance = *slot;
        *slot += 1;

        let label = if instance > 0 {
            format!("{component}[{instance}]")
        } else {
            component.clone()
        };
        let mut path = parent_path.to_vec();
        path.push(label);

        if let Some(props) = tree::resolve_props(node) {
            let semantic_id = semantic_id(props, node.key(), instance);
            let identifying_props: IndexMap<String, NormalizedValue> = IDENTIFYING_PROPS
                .iter()
                .filter_map(|k| props.get(*k).map(|v| ((*k).to_string(), normalize(v))))
                .collect();

            for (event, value) in props {
                let Some(handler) = value.as_handler() else {
                    continue;
                };
                if !is_event_prop(event) {
                    continue;
                }
                let id = format!("action_{}", self.next_id);
                self.next_id += 1;
                let action = Action {
                    id: id.clone(),
                    component: component.clone(),
                    event: event.clone(),
                    path: path.clone(),
                    description: describe(event, &component, &semantic_id, &path),
                    semantic_id: semantic_id.clone(),
                    identifying_props: identifying_props.clone(),
                    handler: handler.clone(),
                };
                self.registry.actions.insert(id, action);
            }
        }

        for child in tree::children(node) {
            self.visit(child.as_ref(), &path);
        }
    }
}

/// Disambiguator for an instance: the first of `num`, `index`, `id`, the
/// reconciliation key, or the repeat index, rendered as `[name=value]`.
fn semantic_id(props: &Props, key: Option<&str>, instance: usize) -> String {
    for name in ["num", "index", "id"] {
        if let Some(value) = props.get(name) {
            return format!("[{name}={}]", value.display());
        }
    }
    if let Some(key) = key {
        return format!("[key={key}]");
    }
    if instance > 0 {
        return format!("[instance={instance}]");
    }
    String::new()
}

fn describe(event: &str, component: &str, semantic_id: &str, path: &[String]) -> String {
    let at = path.join(PATH_SEPARATOR);
    if semantic_id.is_empty() {
        format!("{event} handler on {component} at {at}")
    } else {
        format!("{event} handler on {component} {semantic_id} at {at}")
    }
}

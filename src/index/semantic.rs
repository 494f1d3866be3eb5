//! [`ComponentTree`] → [`SemanticNode`], the compact view sent to the model.

use indexmap::IndexMap;
use serde::Serialize;

use super::walker::{ComponentTree, NormalizedValue};
use crate::tree::is_event_prop;

/// Props copied verbatim because they give the model context about a node.
pub const CONTEXT_PROPS: [&str; 5] = ["id", "type", "value", "placeholder", "href"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticNode {
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<NormalizedValue>,
    #[serde(flatten)]
    pub context: IndexMap<String, NormalizedValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionReference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SemanticNode>,
}

/// An event prop bound to a function on a semantic node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReference {
    pub event: String,
    pub handler: String,
    pub path: String,
}

pub fn create_semantic_structure(tree: &ComponentTree) -> SemanticNode {
    let mut node = SemanticNode {
        component: tree.name.clone(),
        text: None,
        class_name: None,
        context: IndexMap::new(),
        actions: Vec::new(),
        children: Vec::new(),
    };

    for (key, value) in &tree.props {
        match key.as_str() {
            "children" => node.text = value.as_str().map(str::to_string),
            "className" => node.class_name = Some(value.clone()),
            _ if is_event_prop(key) => {
                if let Some((handler, _)) = value.as_function() {
                    node.actions.push(ActionReference {
                        event: key.clone(),
                        handler: handler.to_string(),
                        path: format!("props.{key}"),
                    });
                }
            }
            _ if CONTEXT_PROPS.contains(&key.as_str()) => {
                node.context.insert(key.clone(), value.clone());
            }
            _ => {}
        }
    }

    node.children = tree.children.iter().map(create_semantic_structure).collect();
    node
}

//! Raw UI tree → [`ComponentTree`].

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::tree::{self, NodeRef, PropValue, UiNode};

/// Pruned, serializable copy of one UI node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentTree {
    pub name: String,
    pub props: IndexMap<String, NormalizedValue>,
    pub children: Vec<ComponentTree>,
}

/// A prop value reduced to something that is safe to serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedValue {
    Primitive(Value),
    Descriptor(Descriptor),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Descriptor {
    Function {
        name: String,
        #[serde(rename = "sourceText")]
        source_text: String,
    },
    /// Only the type name and top-level keys; objects are never deep-copied.
    Object {
        #[serde(rename = "typeName")]
        type_name: String,
        keys: Vec<String>,
    },
}

impl NormalizedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NormalizedValue::Primitive(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// `(name, source)` when this is a function descriptor.
    pub fn as_function(&self) -> Option<(&str, &str)> {
        match self {
            NormalizedValue::Descriptor(Descriptor::Function { name, source_text }) => {
                Some((name, source_text))
            }
            _ => None,
        }
    }
}

pub fn normalize(value: &PropValue) -> NormalizedValue {
    match value {
        PropValue::Null => NormalizedValue::Primitive(Value::Null),
        PropValue::Bool(b) => NormalizedValue::Primitive(Value::Bool(*b)),
        PropValue::Number(n) => NormalizedValue::Primitive(
            serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        ),
        PropValue::String(s) => NormalizedValue::Primitive(Value::String(s.clone())),
        PropValue::Function(h) => NormalizedValue::Descriptor(Descriptor::Function {
            name: h.name().to_string(),
            source_text: h.source().to_string(),
        }),
        PropValue::Array(items) => NormalizedValue::Descriptor(Descriptor::Object {
            type_name: "Array".to_string(),
            keys: (0..items.len()).map(|i| i.to_string()).collect(),
        }),
        PropValue::Object { type_name, fields } => NormalizedValue::Descriptor(Descriptor::Object {
            type_name: type_name.clone(),
            keys: fields.keys().cloned().collect(),
        }),
    }
}

/// Normalized copy of the node's resolved prop set (empty if it has none).
pub fn normalized_props(node: &dyn UiNode) -> IndexMap<String, NormalizedValue> {
    tree::resolve_props(node)
        .map(|props| props.iter().map(|(k, v)| (k.clone(), normalize(v))).collect())
        .unwrap_or_default()
}

/// Walk the raw tree depth-first. An absent root yields `None`.
pub fn walk(root: Option<&NodeRef>) -> Option<ComponentTree> {
    root.map(|node| walk_node(node.as_ref()))
}

fn walk_node(node: &dyn UiNode) -> ComponentTree {
    ComponentTree {
        name: tree::display_name(node),
        props: normalized_props(node),
        children: tree::children(node)
            .map(|child| walk_node(child.as_ref()))
            .collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::tree::ElementBuilder;

    #[test]
    fn absent_root_walks_to_none() {
        assert!(walk(None).is_none());
    }

    #[test]
    fn children_match_sibling_chain_in_order() {
        let root = ElementBuilder::component("App")
            .child(ElementBuilder::host("header"))
            .child(ElementBuilder::host("main").child(ElementBuilder::host("p")))
            .child(ElementBuilder::host("footer"))
            .build();

        let tree = walk(Some(&root)).unwrap();
        assert_eq!(tree.name, "App");
        let names: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["header", "main", "footer"]);
        assert_eq!(tree.children[1].children[0].name, "p");
        assert!(tree.children[0].children.is_empty());
    }

    #[test]
    fn functions_become_descriptors_with_source() {
        let handler = Handler::new("toggle", "function toggle(id) { flip(id); }", |_| Ok(()));
        let root = ElementBuilder::host("input")
            .prop("type", "checkbox")
            .prop("onChange", handler)
            .build();

        let tree = walk(Some(&root)).unwrap();
        assert_eq!(tree.props["type"].as_str(), Some("checkbox"));
        assert_eq!(
            tree.props["onChange"].as_function(),
            Some(("toggle", "function toggle(id) { flip(id); }"))
        );
    }

    #[test]
    fn objects_and_arrays_are_shallow_descriptors() {
        let mut fields = IndexMap::new();
        fields.insert("color".to_string(), PropValue::from("red"));
        fields.insert("margin".to_string(), PropValue::from(4.0));
        let root = ElementBuilder::host("div")
            .prop(
                "style",
                PropValue::Object {
                    type_name: "Object".to_string(),
                    fields,
                },
            )
            .prop("items", PropValue::Array(vec!["a".into(), "b".into()]))
            .build();

        let tree = walk(Some(&root)).unwrap();
        let json = serde_json::to_value(&tree.props).unwrap();
        assert_eq!(
            json["style"],
            serde_json::json!({ "kind": "object", "typeName": "Object", "keys": ["color", "margin"] })
        );
        assert_eq!(
            json["items"],
            serde_json::json!({ "kind": "object", "typeName": "Array", "keys": ["0", "1"] })
        );
    }

    #[test]
    fn function_descriptor_serializes_with_kind() {
        let value = normalize(&PropValue::Function(Handler::new("go", "go()", |_| Ok(()))));
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            serde_json::json!({ "kind": "function", "name": "go", "sourceText": "go()" })
        );
    }
}

//! JSON dumps of a UI tree, as exported by devtools-style tooling.
//!
//! ```json
//! { "type": { "function": { "name": "TodoItem" } }, "key": "t1",
//!   "props": { "onClick": { "$fn": { "name": "remove", "source": "function remove(id) {}" } } },
//!   "children": [] }
//! ```
//!
//! Function props cannot carry their closure across a dump, so each becomes a
//! stub handler that records its invocation in an [`InvocationLog`].

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ElementBuilder, ElementType, NodeRef, PropValue, Props};
use crate::error::AgentError;
use crate::handler::Handler;

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSnapshot {
    #[serde(default, rename = "type")]
    pub element_type: Option<TypeSnapshot>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub props: serde_json::Map<String, Value>,
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeSnapshot {
    Host(String),
    #[serde(rename_all = "camelCase")]
    Function {
        #[serde(default)]
        display_name: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Wrapped {
        #[serde(default)]
        display_name: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionSnapshot {
    #[serde(default)]
    name: String,
    #[serde(default)]
    source: String,
}

/// One call made to a stub handler.
#[derive(Debug, Clone, Serialize)]
pub struct Invocation {
    pub handler: String,
    pub args: Vec<Value>,
}

/// Shared record of stub-handler calls.
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    fn record(&self, handler: &str, args: &[Value]) {
        let args_json = Value::Array(args.to_vec());
        tracing::info!(handler, args = %args_json, "snapshot handler invoked");
        self.calls.lock().push(Invocation {
            handler: handler.to_string(),
            args: args.to_vec(),
        });
    }
}

pub fn parse(json: &str) -> Result<NodeSnapshot, AgentError> {
    serde_json::from_str(json).map_err(|e| AgentError::ValidationError {
        message: format!("Invalid tree snapshot: {e}"),
    })
}

pub fn load_file(path: &Path) -> Result<NodeSnapshot, AgentError> {
    let data = std::fs::read_to_string(path)?;
    parse(&data)
}

/// Build a node tree from a snapshot, wiring function props to `log`.
pub fn build(snapshot: &NodeSnapshot, log: &InvocationLog) -> NodeRef {
    builder_for(snapshot, log).build()
}

fn builder_for(snapshot: &NodeSnapshot, log: &InvocationLog) -> ElementBuilder {
    let mut builder = match &snapshot.element_type {
        Some(TypeSnapshot::Host(tag)) => ElementBuilder::host(tag.clone()),
        Some(TypeSnapshot::Function { display_name, name }) => {
            ElementBuilder::new(ElementType::Function {
                display_name: display_name.clone(),
                name: name.clone(),
            })
        }
        Some(TypeSnapshot::Wrapped { display_name, name }) => {
            ElementBuilder::new(ElementType::Wrapped {
                display_name: display_name.clone(),
                name: name.clone(),
            })
        }
        None => ElementBuilder::untyped(),
    };
    if let Some(key) = &snapshot.key {
        builder = builder.key(key.clone());
    }
    if !snapshot.props.is_empty() {
        let props: Props = snapshot
            .props
            .iter()
            .map(|(k, v)| (k.clone(), prop_value(v, log)))
            .collect();
        builder = builder.props_for(super::PropSource::Current, props);
    }
    builder.children(snapshot.children.iter().map(|c| builder_for(c, log)))
}

fn prop_value(value: &Value, log: &InvocationLog) -> PropValue {
    match value {
        Value::Null => PropValue::Null,
        Value::Bool(b) => PropValue::Bool(*b),
        Value::Number(n) => PropValue::Number(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => PropValue::String(s.clone()),
        Value::Array(items) => PropValue::Array(items.iter().map(|v| prop_value(v, log)).collect()),
        Value::Object(map) => {
            if let Some(func) = map.get("$fn") {
                let func: FunctionSnapshot =
                    serde_json::from_value(func.clone()).unwrap_or(FunctionSnapshot {
                        name: String::new(),
                        source: String::new(),
                    });
                let recorder = log.clone();
                let name = func.name.clone();
                return PropValue::Function(Handler::new(func.name, func.source, move |args| {
                    recorder.record(&name, args);
                    Ok(())
                }));
            }
            let type_name = map
                .get("$type")
                .and_then(Value::as_str)
                .unwrap_or("Object")
                .to_string();
            let fields: IndexMap<String, PropValue> = map
                .iter()
                .filter(|(k, _)| k.as_str() != "$type")
                .map(|(k, v)| (k.clone(), prop_value(v, log)))
                .collect();
            PropValue::Object { type_name, fields }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::tree::{children, display_name, resolve_props, UiNode};

    const TODO_LIST: &str = r#"{
        "type": { "function": { "name": "TodoList" } },
        "props": { "style": { "$type": "CSSProperties", "color": "red" } },
        "children": [
            {
                "type": { "host": "button" },
                "key": "add",
                "props": {
                    "children": "Add",
                    "onClick": { "$fn": { "name": "addTodo", "source": "function addTodo(text) {}" } }
                }
            },
            { "type": { "wrapped": {} } }
        ]
    }"#;

    #[test]
    fn builds_typed_nodes_with_keys() {
        let log = InvocationLog::new();
        let root = build(&parse(TODO_LIST).unwrap(), &log);

        assert_eq!(display_name(root.as_ref()), "TodoList");
        let kids: Vec<NodeRef> = children(root.as_ref()).collect();
        assert_eq!(kids.len(), 2);
        assert_eq!(display_name(kids[0].as_ref()), "button");
        assert_eq!(kids[0].key(), Some("add"));
        assert_eq!(display_name(kids[1].as_ref()), "ComplexComponent");
    }

    #[test]
    fn object_props_keep_type_name() {
        let root = build(&parse(TODO_LIST).unwrap(), &InvocationLog::new());
        let props = resolve_props(root.as_ref()).unwrap();
        match &props["style"] {
            PropValue::Object { type_name, fields } => {
                assert_eq!(type_name, "CSSProperties");
                assert_eq!(fields.keys().collect::<Vec<_>>(), ["color"]);
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn function_props_record_invocations() {
        let log = InvocationLog::new();
        let root = build(&parse(TODO_LIST).unwrap(), &log);
        let button = root.child().unwrap();
        let handler = resolve_props(button.as_ref()).unwrap()["onClick"]
            .as_handler()
            .unwrap()
            .clone();

        assert_eq!(handler.name(), "addTodo");
        assert_eq!(handler.source(), "function addTodo(text) {}");
        handler.invoke(&[Value::from("milk")]).unwrap();

        let calls = log.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].handler, "addTodo");
        assert_eq!(calls[0].args, vec![Value::from("milk")]);
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        assert!(matches!(parse("{"), Err(AgentError::ValidationError { .. })));
    }
}

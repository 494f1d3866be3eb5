use serde_json::Value;

use crate::index::{Descriptor, IndexSnapshot, LlmActionMap, NormalizedValue, SemanticNode};

/// Human-readable summary of a whole pass: semantic outline, then actions.
pub fn describe_snapshot(snapshot: &IndexSnapshot) -> String {
    let outline = match &snapshot.semantic_structure {
        Some(root) => describe_semantic(root),
        None => "(no UI root)".to_string(),
    };
    format!("{outline}\n\n{}", describe_actions(&snapshot.action_map))
}

/// Indented outline of the semantic structure, one node per line.
pub fn describe_semantic(root: &SemanticNode) -> String {
    let mut lines = Vec::new();
    outline(root, 0, &mut lines);
    lines.join("\n")
}

fn outline(node: &SemanticNode, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let mut line = format!("{indent}{}", node.component);

    if let Some(class_name) = &node.class_name {
        line.push_str(&format!(" .{}", value_text(class_name)));
    }
    for (key, value) in &node.context {
        line.push_str(&format!(" {key}={}", value_text(value)));
    }
    if let Some(text) = &node.text {
        line.push_str(&format!(" \"{text}\""));
    }
    for action in &node.actions {
        line.push_str(&format!(" [{} -> {}]", action.event, action.handler));
    }
    lines.push(line);

    for child in &node.children {
        outline(child, depth + 1, lines);
    }
}

/// One block per action map entry, in registry order.
pub fn describe_actions(map: &LlmActionMap) -> String {
    let mut lines = vec![format!("Actions ({})", map.len())];
    for entry in map.iter() {
        lines.push(format!("  {}  {}", entry.id, entry.description));
        lines.push(format!("      call: {}", entry.signature));
        if !entry.identifying_props.is_empty() {
            let props: Vec<String> = entry
                .identifying_props
                .iter()
                .map(|(k, v)| format!("{k}={}", value_text(v)))
                .collect();
            lines.push(format!("      props: {}", props.join(", ")));
        }
    }
    lines.join("\n")
}

fn value_text(value: &NormalizedValue) -> String {
    match value {
        NormalizedValue::Primitive(Value::String(s)) => s.clone(),
        NormalizedValue::Primitive(v) => v.to_string(),
        NormalizedValue::Descriptor(Descriptor::Function { name, .. }) => format!("fn {name}"),
        NormalizedValue::Descriptor(Descriptor::Object { type_name, .. }) => {
            format!("[object {type_name}]")
        }
    }
}

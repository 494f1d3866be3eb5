//! Read-only view of a rendered UI tree.
//!
//! The indexer never builds or reconciles trees; it only walks them through
//! [`UiNode`]. Nodes are linked the way render runtimes link them: each node
//! points at its first child and at its next sibling, so a node's children
//! are found by following `child` once and then chaining `sibling`.

pub mod element;
pub mod snapshot;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::handler::Handler;

pub use element::{Element, ElementBuilder};

pub type NodeRef = Arc<dyn UiNode>;

/// Ordered prop map, in declaration order.
pub type Props = IndexMap<String, PropValue>;

/// The capability set the indexer needs from a UI tree node.
pub trait UiNode: Send + Sync {
    /// What kind of element this node renders, if known.
    fn element_type(&self) -> Option<&ElementType>;

    /// The prop set recorded under `source`, if the node has one.
    fn props(&self, source: PropSource) -> Option<&Props>;

    /// Reconciliation key, when the author supplied one.
    fn key(&self) -> Option<&str> {
        None
    }

    fn child(&self) -> Option<NodeRef>;

    fn sibling(&self) -> Option<NodeRef>;
}

/// Element-type descriptor of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    /// A primitive element such as `button` or `div`.
    Host(String),
    /// A function component.
    Function {
        display_name: Option<String>,
        name: Option<String>,
    },
    /// A wrapped component descriptor (memo, forwardRef, context provider...).
    Wrapped {
        display_name: Option<String>,
        name: Option<String>,
    },
}

/// Which recorded prop set to read. Nodes may carry several during an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropSource {
    Current,
    Committed,
    Pending,
}

impl PropSource {
    /// Lookup order when resolving a node's props.
    pub const PRIORITY: [PropSource; 3] =
        [PropSource::Current, PropSource::Committed, PropSource::Pending];
}

/// A prop value as held by the UI runtime.
#[derive(Debug, Clone)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<PropValue>),
    Function(Handler),
    Object {
        type_name: String,
        fields: IndexMap<String, PropValue>,
    },
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            PropValue::Function(h) => Some(h),
            _ => None,
        }
    }

    /// String form used when a value is spliced into an identifier or a
    /// description. Whole numbers print without a fractional part.
    pub fn display(&self) -> String {
        match self {
            PropValue::Null => "null".to_string(),
            PropValue::Bool(b) => b.to_string(),
            PropValue::Number(n) => format_number(*n),
            PropValue::String(s) => s.clone(),
            PropValue::Array(items) => items
                .iter()
                .map(PropValue::display)
                .collect::<Vec<_>>()
                .join(","),
            PropValue::Function(h) => h.name().to_string(),
            PropValue::Object { type_name, .. } => format!("[object {type_name}]"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::String(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::String(s)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

impl From<f64> for PropValue {
    fn from(n: f64) -> Self {
        PropValue::Number(n)
    }
}

impl From<i64> for PropValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        PropValue::Number(n as f64)
    }
}

impl From<Handler> for PropValue {
    fn from(h: Handler) -> Self {
        PropValue::Function(h)
    }
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Event-like prop names: anything starting with `on`.
pub fn is_event_prop(key: &str) -> bool {
    key.starts_with("on")
}

/// The first non-empty prop set of `node`, in [`PropSource::PRIORITY`] order.
pub fn resolve_props(node: &dyn UiNode) -> Option<&Props> {
    PropSource::PRIORITY
        .iter()
        .filter_map(|source| node.props(*source))
        .find(|props| !props.is_empty())
}

/// Human-readable component name for a node.
///
/// Host tag, then declared display name, then function name, then a generic
/// label for the descriptor kind, then `"Unknown"`.
pub fn display_name(node: &dyn UiNode) -> String {
    fn named(display_name: Option<&String>, name: Option<&String>) -> Option<String> {
        display_name
            .filter(|n| !n.is_empty())
            .or(name.filter(|n| !n.is_empty()))
            .cloned()
    }

    match node.element_type() {
        Some(ElementType::Host(tag)) if !tag.is_empty() => tag.clone(),
        Some(ElementType::Function { display_name, name }) => {
            named(display_name.as_ref(), name.as_ref()).unwrap_or_else(|| "Component".to_string())
        }
        Some(ElementType::Wrapped { display_name, name }) => {
            named(display_name.as_ref(), name.as_ref())
                .unwrap_or_else(|| "ComplexComponent".to_string())
        }
        _ => "Unknown".to_string(),
    }
}

/// Iterates a node's children by chaining sibling links from its first child.
pub struct Children {
    next: Option<NodeRef>,
}

impl Iterator for Children {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let current = self.next.take()?;
        self.next = current.sibling();
        Some(current)
    }
}

pub fn children(node: &dyn UiNode) -> Children {
    Children { next: node.child() }
}

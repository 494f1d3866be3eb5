//! An immutable, child/sibling-linked tree for hosts that do not already
//! have one (tests, snapshot tooling, embedders driving their own render).

use std::sync::Arc;

use super::{ElementType, NodeRef, PropSource, PropValue, Props, UiNode};

pub struct Element {
    element_type: Option<ElementType>,
    key: Option<String>,
    current: Option<Props>,
    committed: Option<Props>,
    pending: Option<Props>,
    child: Option<NodeRef>,
    sibling: Option<NodeRef>,
}

impl UiNode for Element {
    fn element_type(&self) -> Option<&ElementType> {
        self.element_type.as_ref()
    }

    fn props(&self, source: PropSource) -> Option<&Props> {
        match source {
            PropSource::Current => self.current.as_ref(),
            PropSource::Committed => self.committed.as_ref(),
            PropSource::Pending => self.pending.as_ref(),
        }
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn child(&self) -> Option<NodeRef> {
        self.child.clone()
    }

    fn sibling(&self) -> Option<NodeRef> {
        self.sibling.clone()
    }
}

/// Builds an [`Element`] tree from nested child lists.
///
/// Siblings are linked at build time, last to first, since nodes are
/// immutable once constructed.
#[derive(Default)]
pub struct ElementBuilder {
    element_type: Option<ElementType>,
    key: Option<String>,
    current: Option<Props>,
    committed: Option<Props>,
    pending: Option<Props>,
    children: Vec<ElementBuilder>,
}

impl ElementBuilder {
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type: Some(element_type),
            ..Self::default()
        }
    }

    pub fn host(tag: impl Into<String>) -> Self {
        Self::new(ElementType::Host(tag.into()))
    }

    /// A function component known by its function name.
    pub fn component(name: impl Into<String>) -> Self {
        Self::new(ElementType::Function {
            display_name: None,
            name: Some(name.into()),
        })
    }

    /// A node with no element-type descriptor (root containers, text).
    pub fn untyped() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set a prop on the current prop set.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.current
            .get_or_insert_with(Props::new)
            .insert(name.into(), value.into());
        self
    }

    /// Replace the whole prop set recorded under `source`.
    pub fn props_for(mut self, source: PropSource, props: Props) -> Self {
        match source {
            PropSource::Current => self.current = Some(props),
            PropSource::Committed => self.committed = Some(props),
            PropSource::Pending => self.pending = Some(props),
        }
        self
    }

    pub fn child(mut self, child: ElementBuilder) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = ElementBuilder>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn build(self) -> NodeRef {
        self.build_linked(None)
    }

    fn build_linked(self, sibling: Option<NodeRef>) -> NodeRef {
        let mut next: Option<NodeRef> = None;
        for child in self.children.into_iter().rev() {
            next = Some(child.build_linked(next));
        }
        Arc::new(Element {
            element_type: self.element_type,
            key: self.key,
            current: self.current,
            committed: self.committed,
            pending: self.pending,
            child: next,
            sibling,
        })
    }
}

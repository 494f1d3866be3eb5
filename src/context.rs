//! Author-declared actions, registered imperatively by UI code instead of
//! being discovered from the tree.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::handler::Handler;

#[derive(Debug, Clone)]
pub struct DeclaredAction {
    pub id: String,
    pub description: String,
    pub handler: Handler,
}

impl DeclaredAction {
    pub fn new(id: impl Into<String>, description: impl Into<String>, handler: Handler) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            handler,
        }
    }
}

pub type DeclaredActions = IndexMap<String, DeclaredAction>;

/// Session-lifetime store of declared actions.
///
/// Every mutation publishes a new map; readers holding an earlier
/// [`ActionContext::actions`] snapshot keep seeing the old one, and a
/// changed `Arc` pointer means the set changed.
#[derive(Debug, Default)]
pub struct ActionContext {
    actions: RwLock<Arc<DeclaredActions>>,
}

impl ActionContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add or replace (last registration wins) an action.
    pub fn register(&self, action: DeclaredAction) {
        let mut current = self.actions.write();
        let mut next = DeclaredActions::clone(&current);
        tracing::debug!(id = %action.id, "action registered");
        next.insert(action.id.clone(), action);
        *current = Arc::new(next);
    }

    /// Remove an action. Absent ids are a no-op and publish nothing.
    pub fn unregister(&self, id: &str) {
        let mut current = self.actions.write();
        if !current.contains_key(id) {
            return;
        }
        let mut next = DeclaredActions::clone(&current);
        next.shift_remove(id);
        *current = Arc::new(next);
        tracing::debug!(id, "action unregistered");
    }

    /// Register `action` for as long as the returned guard lives.
    pub fn register_scoped(self: &Arc<Self>, action: DeclaredAction) -> Registration {
        let id = action.id.clone();
        self.register(action);
        Registration {
            context: Arc::clone(self),
            id,
        }
    }

    pub fn actions(&self) -> Arc<DeclaredActions> {
        Arc::clone(&self.actions.read())
    }

    pub fn len(&self) -> usize {
        self.actions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.read().is_empty()
    }
}

/// Unregisters its action on drop.
#[must_use = "dropping a Registration unregisters the action immediately"]
pub struct Registration {
    context: Arc<ActionContext>,
    id: String,
}

impl Registration {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.context.unregister(&self.id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn action(id: &str, description: &str) -> DeclaredAction {
        DeclaredAction::new(id, description, Handler::from_fn(id, |_| Ok(())))
    }

    #[test]
    fn starts_empty() {
        assert!(ActionContext::new().is_empty());
    }

    #[test]
    fn duplicate_registration_overwrites() {
        let ctx = ActionContext::new();
        ctx.register(action("clear", "clear completed"));
        ctx.register(action("clear", "clear all todos"));

        let actions = ctx.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions.get("clear").unwrap().description, "clear all todos");
    }

    #[test]
    fn unregister_absent_is_noop() {
        let ctx = ActionContext::new();
        ctx.register(action("a", "first"));
        let before = ctx.actions();

        ctx.unregister("missing");

        assert!(Arc::ptr_eq(&before, &ctx.actions()));
    }

    #[test]
    fn mutations_publish_a_new_map() {
        let ctx = ActionContext::new();
        let empty = ctx.actions();
        ctx.register(action("a", "first"));
        let one = ctx.actions();
        ctx.unregister("a");

        assert!(!Arc::ptr_eq(&empty, &one));
        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
        assert!(ctx.is_empty());
    }

    #[test]
    fn scoped_registration_unregisters_on_drop() {
        let ctx = ActionContext::new();
        {
            let guard = ctx.register_scoped(action("toggle", "toggle dark mode"));
            assert_eq!(guard.id(), "toggle");
            assert_eq!(ctx.len(), 1);
        }
        assert!(ctx.is_empty());
    }
}

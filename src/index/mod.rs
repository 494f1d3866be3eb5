//! One indexing pass: tree walk, semantic projection, action extraction and
//! action-map build, bundled into an immutable [`IndexSnapshot`].

pub mod action_map;
pub mod extract;
pub mod semantic;
pub mod walker;

use serde::Serialize;

use crate::tree::NodeRef;

pub use action_map::{build_action_map, LlmActionEntry, LlmActionMap};
pub use extract::{extract_actions, Action, ActionRegistry};
pub use semantic::{create_semantic_structure, ActionReference, SemanticNode};
pub use walker::{walk, ComponentTree, Descriptor, NormalizedValue};

/// The three artifacts of a pass. Replaced wholesale, never patched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSnapshot {
    pub semantic_structure: Option<SemanticNode>,
    pub registry: ActionRegistry,
    pub action_map: LlmActionMap,
}

impl IndexSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_actions(&self) -> bool {
        !self.registry.is_empty()
    }
}

/// Run a full pass over `root`. An absent root gives an empty snapshot.
pub fn index_tree(root: Option<&NodeRef>) -> IndexSnapshot {
    let semantic_structure = walk(root).map(|tree| create_semantic_structure(&tree));
    let registry = extract_actions(root);
    let action_map = build_action_map(&registry);
    IndexSnapshot {
        semantic_structure,
        registry,
        action_map,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::tree::ElementBuilder;

    #[test]
    fn absent_root_gives_empty_snapshot() {
        let snapshot = index_tree(None);
        assert!(snapshot.semantic_structure.is_none());
        assert!(!snapshot.has_actions());
        assert!(snapshot.action_map.is_empty());
    }

    #[test]
    fn map_and_registry_share_ids() {
        let root = ElementBuilder::component("App")
            .child(
                ElementBuilder::host("button").prop("onClick", Handler::from_fn("a", |_| Ok(()))),
            )
            .child(
                ElementBuilder::host("button").prop("onClick", Handler::from_fn("b", |_| Ok(()))),
            )
            .build();

        let snapshot = index_tree(Some(&root));
        assert_eq!(snapshot.registry.len(), 2);
        for action in snapshot.registry.iter() {
            assert_eq!(
                snapshot.action_map.get(&action.id).unwrap().description,
                action.description
            );
        }
        assert_eq!(snapshot.semantic_structure.unwrap().children.len(), 2);
    }

    #[test]
    fn demo_todo_app_indexes() {
        use crate::tree::snapshot::{build, parse, InvocationLog};

        let node = parse(include_str!("../../demos/todo-app.json")).unwrap();
        let root = build(&node, &InvocationLog::new());

        let snapshot = index_tree(Some(&root));
        let ids: Vec<&str> = snapshot.registry.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["action_0", "action_1", "action_2", "action_3", "action_4"]);

        let second_delete = snapshot.registry.get("action_3").unwrap();
        assert_eq!(second_delete.path.join(" > "), "TodoApp > ul > TodoItem[1] > button");
        assert_eq!(
            snapshot.registry.get("action_4").unwrap().description,
            "onClick handler on button [id=clear-completed] at TodoApp > button"
        );
        assert_eq!(snapshot.action_map.get("action_0").unwrap().signature, "addTodo(text)");
    }
}

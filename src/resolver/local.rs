//! Keyword-overlap matching against the declared actions.

use crate::context::{ActionContext, DeclaredAction, DeclaredActions};

use super::{execution_error_status, CommandResolver, Resolution, STATUS_NO_MATCH};

/// Lower-cased whitespace tokens of a query.
pub fn tokenize(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Number of tokens (repeats included) that occur anywhere in `description`.
pub fn score(tokens: &[String], description: &str) -> usize {
    let description = description.to_lowercase();
    tokens
        .iter()
        .filter(|token| description.contains(token.as_str()))
        .count()
}

/// Highest-scoring action; the earliest one wins a tie and a zero score is
/// no match.
pub fn best_match<'a>(query: &str, actions: &'a DeclaredActions) -> Option<&'a DeclaredAction> {
    let tokens = tokenize(query);
    let mut best: Option<(&DeclaredAction, usize)> = None;
    for action in actions.values() {
        let s = score(&tokens, &action.description);
        if s > best.map_or(0, |(_, top)| top) {
            best = Some((action, s));
        }
    }
    best.map(|(action, _)| action)
}

impl CommandResolver {
    /// Run the current query against `context` and invoke the best match.
    pub fn resolve_local(&self, context: &ActionContext) -> Resolution {
        if self.is_loading() {
            return Resolution::Busy;
        }
        let query = self.query();
        let actions = context.actions();

        let Some(action) = best_match(&query, &actions) else {
            self.set_status(STATUS_NO_MATCH);
            return Resolution::NoMatch;
        };

        self.set_status(action.description.clone());
        match self.invoke("local", &action.id, &action.handler, &[]) {
            Ok(()) => {
                self.clear_query();
                Resolution::Executed {
                    action_id: action.id.clone(),
                    description: action.description.clone(),
                }
            }
            Err(e) => {
                let message = execution_error_status(&e);
                self.set_status(message.clone());
                Resolution::Failed { message }
            }
        }
    }
}

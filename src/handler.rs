//! Event handlers as data: an opaque callable plus the text it was written as.
//!
//! The source text is only ever used for display (parameter lists and call
//! signatures in the LLM action map). It is never parsed as code.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::AgentError;

type Callable = dyn Fn(&[Value]) -> Result<(), AgentError> + Send + Sync;

/// A cloneable reference to an event handler. Clones share the same closure,
/// so invoking any clone has the original's side effects.
#[derive(Clone)]
pub struct Handler {
    name: String,
    source: String,
    callable: Arc<Callable>,
}

impl Handler {
    pub fn new<F>(name: impl Into<String>, source: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<(), AgentError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            source: source.into(),
            callable: Arc::new(f),
        }
    }

    /// A handler whose source text is just `name()`.
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<(), AgentError> + Send + Sync + 'static,
    {
        let name = name.into();
        let source = format!("{name}()");
        Self::new(name, source, f)
    }

    /// Function name, or `"anonymous"` when the handler was declared without one.
    pub fn name(&self) -> &str {
        if self.name.is_empty() {
            "anonymous"
        } else {
            &self.name
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Invoke with positional arguments.
    pub fn invoke(&self, args: &[Value]) -> Result<(), AgentError> {
        (self.callable)(args)
    }

    /// True when both handles refer to the same closure.
    pub fn same_callable(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.callable, &other.callable)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name())
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn clones_share_the_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = Handler::from_fn("bump", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let copy = handler.clone();

        copy.invoke(&[]).unwrap();
        handler.invoke(&[]).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(copy.same_callable(&handler));
    }

    #[test]
    fn empty_name_reads_as_anonymous() {
        let handler = Handler::new("", "() => {}", |_| Ok(()));
        assert_eq!(handler.name(), "anonymous");
    }

    #[test]
    fn failures_surface_as_errors() {
        let handler = Handler::from_fn("explode", |_| Err("boom".into()));
        let err = handler.invoke(&[]).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}

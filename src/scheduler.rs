//! Keeps the index fresh while the UI changes.
//!
//! A [`Reindexer`] runs a pass when it is mounted, when the located root
//! changes identity, and once after each burst of qualifying mutations. Bursts
//! are coalesced through a single timer slot: every qualifying mutation
//! cancels the pending timer and arms a new one, so the pass runs
//! `debounce` after the last mutation of the burst.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::index::{index_tree, IndexSnapshot};
use crate::inspect;
use crate::tree::NodeRef;

pub const REINDEX_DEBOUNCE: Duration = Duration::from_millis(100);

/// Element tags whose attribute changes can alter available actions.
pub const INTERACTIVE_TAGS: [&str; 3] = ["input", "button", "select"];

/// Attributes watched on interactive elements, besides any `data-*`.
pub const WATCHED_ATTRIBUTES: [&str; 5] = ["disabled", "value", "checked", "selected", "class"];

/// A structural change reported by the host's mutation observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Nodes were added or removed somewhere in the observed subtree.
    ChildList,
    /// An attribute changed on an element.
    Attribute { tag: String, name: String },
    /// Text content changed.
    CharacterData,
}

impl Mutation {
    pub fn attribute(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Mutation::Attribute {
            tag: tag.into(),
            name: name.into(),
        }
    }

    /// Whether this mutation should trigger a reindex.
    pub fn qualifies(&self) -> bool {
        match self {
            Mutation::ChildList => true,
            Mutation::Attribute { tag, name } => {
                INTERACTIVE_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t))
                    && (name.starts_with("data-") || WATCHED_ATTRIBUTES.contains(&name.as_str()))
            }
            Mutation::CharacterData => false,
        }
    }
}

pub type MutationSender = mpsc::UnboundedSender<Mutation>;
pub type MutationReceiver = mpsc::UnboundedReceiver<Mutation>;

/// Channel the host's observer pushes mutations into.
pub fn mutation_channel() -> (MutationSender, MutationReceiver) {
    mpsc::unbounded_channel()
}

/// Finds the current UI root. Called at the start of every pass.
pub trait RootLocator: Send + Sync {
    fn locate(&self) -> Option<NodeRef>;
}

impl<F> RootLocator for F
where
    F: Fn() -> Option<NodeRef> + Send + Sync,
{
    fn locate(&self) -> Option<NodeRef> {
        self()
    }
}

/// A root slot the host swaps whenever it re-renders.
#[derive(Default)]
pub struct SharedRoot {
    root: RwLock<Option<NodeRef>>,
}

impl SharedRoot {
    pub fn new(root: Option<NodeRef>) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }

    pub fn set(&self, root: Option<NodeRef>) {
        *self.root.write() = root;
    }
}

impl RootLocator for SharedRoot {
    fn locate(&self) -> Option<NodeRef> {
        self.root.read().clone()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReindexConfig {
    pub debounce: Duration,
    /// Publish each pass to [`inspect::latest`].
    pub publish_inspection: bool,
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            debounce: REINDEX_DEBOUNCE,
            publish_inspection: true,
        }
    }
}

/// Owner of the index artifacts. Dropping it tears it down.
pub struct Reindexer {
    inner: Arc<Inner>,
}

struct Inner {
    locator: Arc<dyn RootLocator>,
    config: ReindexConfig,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    timer: Mutex<TimerSlot>,
    /// Held for the whole of a pass (locate, index, publish) so passes never
    /// overlap and a pass located on an older root cannot land last.
    pass: Mutex<()>,
    observer: Mutex<Option<JoinHandle<()>>>,
    last_root: Mutex<Option<NodeRef>>,
    passes: AtomicU64,
}

/// At most one armed timer. `generation` lets a firing timer detect that it
/// was superseded after it already woke.
#[derive(Default)]
struct TimerSlot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl Reindexer {
    pub fn new(locator: Arc<dyn RootLocator>, config: ReindexConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                locator,
                config,
                snapshot: RwLock::new(Arc::new(IndexSnapshot::empty())),
                timer: Mutex::new(TimerSlot::default()),
                pass: Mutex::new(()),
                observer: Mutex::new(None),
                last_root: Mutex::new(None),
                passes: AtomicU64::new(0),
            }),
        }
    }

    /// Index immediately and start consuming `mutations`.
    ///
    /// Outside a Tokio runtime only the immediate pass runs; mutations are
    /// not observed.
    pub fn mount(&self, mutations: MutationReceiver) {
        self.inner.run_pass();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime for the mutation observer; indexed once");
            return;
        };
        let inner = Arc::clone(&self.inner);
        let task = runtime.spawn(async move {
            let mut mutations = mutations;
            while let Some(mutation) = mutations.recv().await {
                inner.notify(&mutation);
            }
            tracing::debug!("mutation feed closed");
        });
        if let Some(previous) = self.inner.observer.lock().replace(task) {
            previous.abort();
        }
    }

    /// Re-locate the root and run a pass right away if it is a different
    /// tree than the one last indexed. Returns whether a pass ran.
    pub fn refresh_if_root_changed(&self) -> bool {
        let _pass = self.inner.pass.lock();
        let current = self.inner.locator.locate();
        let changed = {
            let last = self.inner.last_root.lock();
            !same_root(last.as_ref(), current.as_ref())
        };
        if changed {
            self.inner.index(current);
        }
        changed
    }

    /// Feed one mutation; qualifying ones (re)arm the debounce timer.
    pub fn notify(&self, mutation: &Mutation) {
        self.inner.notify(mutation);
    }

    /// Cancel any pending pass and arm a new one.
    pub fn schedule(&self) {
        self.inner.schedule();
    }

    /// Run a pass now, bypassing the debounce.
    pub fn reindex_now(&self) -> Arc<IndexSnapshot> {
        self.inner.run_pass()
    }

    /// The artifacts of the latest pass.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.inner.snapshot.read())
    }

    pub fn pass_count(&self) -> u64 {
        self.inner.passes.load(Ordering::SeqCst)
    }

    pub fn has_pending_pass(&self) -> bool {
        self.inner
            .timer
            .lock()
            .handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop observing and cancel the pending timer. Waits for a pass that is
    /// already running; no timer pass publishes after this returns.
    /// Idempotent.
    pub fn teardown(&self) {
        if let Some(observer) = self.inner.observer.lock().take() {
            observer.abort();
        }
        let _pass = self.inner.pass.lock();
        let mut slot = self.inner.timer.lock();
        slot.generation += 1;
        if let Some(timer) = slot.handle.take() {
            timer.abort();
        }
    }
}

impl Drop for Reindexer {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Inner {
    fn notify(self: &Arc<Self>, mutation: &Mutation) {
        if mutation.qualifies() {
            self.schedule();
        }
    }

    fn schedule(self: &Arc<Self>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime for debounce timer; reindexing immediately");
            self.run_pass();
            return;
        };

        let mut slot = self.timer.lock();
        if let Some(previous) = slot.handle.take() {
            previous.abort();
        }
        slot.generation += 1;
        let generation = slot.generation;
        let inner = Arc::clone(self);
        slot.handle = Some(runtime.spawn(async move {
            tokio::time::sleep(inner.config.debounce).await;
            let _pass = inner.pass.lock();
            {
                let mut slot = inner.timer.lock();
                if slot.generation != generation {
                    return;
                }
                slot.handle = None;
            }
            inner.index(inner.locator.locate());
        }));
    }

    fn run_pass(&self) -> Arc<IndexSnapshot> {
        let _pass = self.pass.lock();
        self.index(self.locator.locate())
    }

    /// Index `root` and publish the result. Callers hold `pass`.
    fn index(&self, root: Option<NodeRef>) -> Arc<IndexSnapshot> {
        if root.is_none() {
            tracing::debug!("no UI root located; clearing index");
        }
        let snapshot = Arc::new(index_tree(root.as_ref()));
        *self.last_root.lock() = root;
        *self.snapshot.write() = Arc::clone(&snapshot);
        if self.config.publish_inspection {
            inspect::publish(Arc::clone(&snapshot));
        }
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(pass, actions = snapshot.registry.len(), "reindex pass complete");
        snapshot
    }
}

fn same_root(a: Option<&NodeRef>, b: Option<&NodeRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;
    use crate::handler::Handler;
    use crate::tree::ElementBuilder;

    fn todo_tree(items: &[&str]) -> NodeRef {
        ElementBuilder::component("TodoList")
            .children(items.iter().map(|item| {
                ElementBuilder::component("TodoItem")
                    .prop("id", *item)
                    .prop("onDelete", Handler::from_fn("remove", |_| Ok(())))
            }))
            .build()
    }

    fn reindexer_for(root: &Arc<SharedRoot>) -> Reindexer {
        let locator: Arc<dyn RootLocator> = root.clone();
        Reindexer::new(
            locator,
            ReindexConfig {
                publish_inspection: false,
                ..ReindexConfig::default()
            },
        )
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        tokio::task::yield_now().await;
    }

    #[test]
    fn qualifying_mutations() {
        assert!(Mutation::ChildList.qualifies());
        assert!(Mutation::attribute("BUTTON", "disabled").qualifies());
        assert!(Mutation::attribute("input", "value").qualifies());
        assert!(Mutation::attribute("select", "data-state").qualifies());
        assert!(!Mutation::attribute("div", "class").qualifies());
        assert!(!Mutation::attribute("button", "title").qualifies());
        assert!(!Mutation::CharacterData.qualifies());
    }

    #[tokio::test(start_paused = true)]
    async fn mount_indexes_immediately() {
        let root = Arc::new(SharedRoot::new(Some(todo_tree(&["a", "b"]))));
        let reindexer = reindexer_for(&root);
        let (_tx, rx) = mutation_channel();

        reindexer.mount(rx);

        assert_eq!(reindexer.pass_count(), 1);
        assert_eq!(reindexer.snapshot().registry.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_mutations_coalesces_into_one_pass() {
        let root = Arc::new(SharedRoot::new(Some(todo_tree(&["a"]))));
        let reindexer = reindexer_for(&root);
        let (_tx, rx) = mutation_channel();
        reindexer.mount(rx);
        root.set(Some(todo_tree(&["a", "b", "c"])));

        for _ in 0..5 {
            reindexer.notify(&Mutation::ChildList);
            wait(20).await;
        }
        // Last mutation at t=80ms; the pass is due at t=180ms.
        wait(78).await;
        assert_eq!(reindexer.pass_count(), 1);
        assert!(reindexer.has_pending_pass());

        wait(3).await;
        assert_eq!(reindexer.pass_count(), 2);
        assert_eq!(reindexer.snapshot().registry.len(), 3);

        wait(500).await;
        assert_eq!(reindexer.pass_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_qualifying_mutations_are_ignored() {
        let root = Arc::new(SharedRoot::new(Some(todo_tree(&["a"]))));
        let reindexer = reindexer_for(&root);
        let (_tx, rx) = mutation_channel();
        reindexer.mount(rx);

        reindexer.notify(&Mutation::attribute("div", "class"));
        reindexer.notify(&Mutation::CharacterData);
        wait(300).await;

        assert_eq!(reindexer.pass_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn observer_channel_drives_reindexing() {
        let root = Arc::new(SharedRoot::new(Some(todo_tree(&["a"]))));
        let reindexer = reindexer_for(&root);
        let (tx, rx) = mutation_channel();
        reindexer.mount(rx);

        tx.send(Mutation::attribute("button", "disabled")).unwrap();
        wait(150).await;

        assert_eq!(reindexer.pass_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_root_clears_artifacts() {
        let root = Arc::new(SharedRoot::new(Some(todo_tree(&["a", "b"]))));
        let reindexer = reindexer_for(&root);
        let (_tx, rx) = mutation_channel();
        reindexer.mount(rx);
        let before = reindexer.snapshot();

        root.set(None);
        reindexer.notify(&Mutation::ChildList);
        wait(150).await;

        let after = reindexer.snapshot();
        assert!(after.semantic_structure.is_none());
        assert!(after.registry.is_empty());
        assert!(after.action_map.is_empty());
        // The old snapshot is replaced, not mutated.
        assert_eq!(before.registry.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_pass() {
        let root = Arc::new(SharedRoot::new(Some(todo_tree(&["a"]))));
        let reindexer = reindexer_for(&root);
        let (tx, rx) = mutation_channel();
        reindexer.mount(rx);

        reindexer.notify(&Mutation::ChildList);
        reindexer.teardown();
        wait(300).await;
        assert_eq!(reindexer.pass_count(), 1);

        // The observer is gone too.
        let _ = tx.send(Mutation::ChildList);
        wait(300).await;
        assert_eq!(reindexer.pass_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn root_identity_change_reindexes_immediately() {
        let root = Arc::new(SharedRoot::new(Some(todo_tree(&["a"]))));
        let reindexer = reindexer_for(&root);
        let (_tx, rx) = mutation_channel();
        reindexer.mount(rx);

        assert!(!reindexer.refresh_if_root_changed());
        assert_eq!(reindexer.pass_count(), 1);

        root.set(Some(todo_tree(&["a", "b"])));
        assert!(reindexer.refresh_if_root_changed());
        assert_eq!(reindexer.pass_count(), 2);
        assert_eq!(reindexer.snapshot().registry.len(), 2);
    }

    #[test]
    fn mount_without_runtime_indexes_once() {
        let root = Arc::new(SharedRoot::new(Some(todo_tree(&["a", "b"]))));
        let reindexer = reindexer_for(&root);
        let (_tx, rx) = mutation_channel();

        reindexer.mount(rx);

        assert_eq!(reindexer.pass_count(), 1);
        assert_eq!(reindexer.snapshot().registry.len(), 2);
    }

    /// Hands out the current root, but when `stall` is set the next call
    /// captures the root and then blocks before returning it.
    #[derive(Default)]
    struct StallingRoot {
        root: Mutex<Option<NodeRef>>,
        stall: AtomicBool,
        stalled: AtomicBool,
    }

    impl RootLocator for StallingRoot {
        fn locate(&self) -> Option<NodeRef> {
            let root = self.root.lock().clone();
            if self.stall.swap(false, Ordering::SeqCst) {
                self.stalled.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(200));
            }
            root
        }
    }

    fn stalling_reindexer(locator: &Arc<StallingRoot>) -> Reindexer {
        let locator: Arc<dyn RootLocator> = locator.clone();
        Reindexer::new(
            locator,
            ReindexConfig {
                debounce: Duration::from_millis(10),
                publish_inspection: false,
            },
        )
    }

    async fn until_stalled(locator: &StallingRoot) {
        while !locator.stalled.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_timer_pass_cannot_overwrite_newer_snapshot() {
        let locator = Arc::new(StallingRoot::default());
        *locator.root.lock() = Some(todo_tree(&["a"]));
        let reindexer = stalling_reindexer(&locator);

        locator.stall.store(true, Ordering::SeqCst);
        reindexer.notify(&Mutation::ChildList);
        until_stalled(&locator).await;

        // The timer pass holds the old root; a newer tree arrives meanwhile.
        *locator.root.lock() = Some(todo_tree(&["a", "b", "c"]));
        assert_eq!(reindexer.reindex_now().registry.len(), 3);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(reindexer.pass_count(), 2);
        assert_eq!(reindexer.snapshot().registry.len(), 3);
        assert!(!reindexer.refresh_if_root_changed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn no_pass_publishes_after_teardown() {
        let locator = Arc::new(StallingRoot::default());
        *locator.root.lock() = Some(todo_tree(&["a"]));
        let reindexer = stalling_reindexer(&locator);

        locator.stall.store(true, Ordering::SeqCst);
        reindexer.notify(&Mutation::ChildList);
        until_stalled(&locator).await;

        reindexer.teardown();
        let passes = reindexer.pass_count();
        let snapshot = reindexer.snapshot();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(passes, 1);
        assert_eq!(reindexer.pass_count(), passes);
        assert!(Arc::ptr_eq(&reindexer.snapshot(), &snapshot));
        assert!(!reindexer.has_pending_pass());
    }

    #[test]
    fn schedule_without_runtime_runs_inline() {
        let root = Arc::new(SharedRoot::new(Some(todo_tree(&["a"]))));
        let reindexer = reindexer_for(&root);
        reindexer.notify(&Mutation::ChildList);
        assert_eq!(reindexer.pass_count(), 1);
    }
}

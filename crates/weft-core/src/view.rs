use std::cell::RefCell;
use std::fmt;

use crate::model::Model;

/// A node of the retained view tree, as seen by the binding core.
///
/// Implementations are cheap handles (`Rc` or an id into an arena) and use
/// interior mutability; the core only ever needs ordered child access.
pub trait ViewNode: Clone + 'static {
    fn child_count(&self) -> usize;

    fn append(&self, child: Self);

    /// Panics if `index > child_count()`, like `Vec::insert`.
    fn insert_at(&self, index: usize, child: Self);

    fn remove_at(&self, index: usize) -> Option<Self>;

    /// Removes `child` by identity. Returns `false` if it was not a child.
    fn remove(&self, child: &Self) -> bool;

    /// Builds the placeholder shown in place of a view that failed to bind.
    fn diagnostic(message: &str) -> Self;

    fn is_diagnostic(&self) -> bool {
        false
    }
}

/// Published once for every view the binding service hands out, including
/// diagnostic placeholders. `kind` is `None` when the component's kind could
/// not be determined.
pub struct ViewCreated<M: Model, V> {
    pub view: V,
    pub kind: Option<M::Kind>,
}

impl<M: Model, V: Clone> Clone for ViewCreated<M, V> {
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            kind: self.kind,
        }
    }
}

impl<M: Model, V> fmt::Debug for ViewCreated<M, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewCreated")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Fire-and-forget outlet for view creation notifications.
pub trait EventBus<M: Model, V> {
    fn publish(&self, event: ViewCreated<M, V>);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEventBus;

impl<M: Model, V> EventBus<M, V> for NoopEventBus {
    fn publish(&self, _event: ViewCreated<M, V>) {}
}

/// Remembers every notification.
pub struct EventRecorder<M: Model, V> {
    events: RefCell<Vec<ViewCreated<M, V>>>,
}

impl<M: Model, V> Default for EventRecorder<M, V> {
    fn default() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
        }
    }
}

impl<M: Model, V: Clone> EventRecorder<M, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewCreated<M, V>> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl<M: Model, V> EventBus<M, V> for EventRecorder<M, V> {
    fn publish(&self, event: ViewCreated<M, V>) {
        self.events.borrow_mut().push(event);
    }
}

//! A live, ordered collection that reports its edits.
//!
//! Every mutation of a [`ReactiveVec`] is described by one
//! [`CollectionChange`]. Observers receive changes synchronously and strictly
//! in mutation order; a change made from inside an observer is queued and
//! delivered once the current change has reached every observer.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::{SlotMap, new_key_type};

use crate::effects::{Busy, Dispose};

#[derive(Clone, Debug, PartialEq)]
pub enum CollectionChange<T> {
    Add { index: usize, value: T },
    Remove { index: usize },
    Move { old_index: usize, new_index: usize },
    Replace { index: usize, value: T },
    Reset,
}

impl<T> CollectionChange<T> {
    pub fn name(&self) -> &'static str {
        match self {
            CollectionChange::Add { .. } => "add",
            CollectionChange::Remove { .. } => "remove",
            CollectionChange::Move { .. } => "move",
            CollectionChange::Replace { .. } => "replace",
            CollectionChange::Reset => "reset",
        }
    }
}

new_key_type! { struct ObserverKey; }

type Observer<T> = Rc<dyn Fn(&CollectionChange<T>)>;

struct Registration<T> {
    /// First change sequence number this observer wants.
    since: u64,
    f: Observer<T>,
}

pub struct ReactiveVec<T>(Rc<Inner<T>>);

struct Inner<T> {
    items: RefCell<Vec<T>>,
    observers: RefCell<SlotMap<ObserverKey, Registration<T>>>,
    pending: RefCell<VecDeque<(u64, CollectionChange<T>)>>,
    next_seq: Cell<u64>,
    dispatching: Cell<bool>,
}

impl<T> Clone for ReactiveVec<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Clone + 'static> Default for ReactiveVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> From<Vec<T>> for ReactiveVec<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T: Clone + 'static> ReactiveVec<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self(Rc::new(Inner {
            items: RefCell::new(items),
            observers: RefCell::new(SlotMap::with_key()),
            pending: RefCell::new(VecDeque::new()),
            next_seq: Cell::new(0),
            dispatching: Cell::new(false),
        }))
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.0.items.borrow().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.0.items.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.0.items.borrow())
    }

    pub fn push(&self, value: T) {
        let index = self.len();
        self.insert(index, value);
    }

    /// # Panics
    /// If `index > len`.
    pub fn insert(&self, index: usize, value: T) {
        self.0.items.borrow_mut().insert(index, value.clone());
        self.emit(CollectionChange::Add { index, value });
    }

    /// # Panics
    /// If `index >= len`.
    pub fn remove(&self, index: usize) -> T {
        let removed = self.0.items.borrow_mut().remove(index);
        self.emit(CollectionChange::Remove { index });
        removed
    }

    /// Moves the item at `old_index` so that it ends up at `new_index`.
    ///
    /// # Panics
    /// If either index is out of range.
    pub fn move_item(&self, old_index: usize, new_index: usize) {
        {
            let mut items = self.0.items.borrow_mut();
            assert!(
                new_index < items.len(),
                "move target {new_index} out of range for {} items",
                items.len()
            );
            let item = items.remove(old_index);
            items.insert(new_index, item);
        }
        self.emit(CollectionChange::Move {
            old_index,
            new_index,
        });
    }

    /// # Panics
    /// If `index >= len`.
    pub fn replace(&self, index: usize, value: T) -> T {
        let previous = std::mem::replace(&mut self.0.items.borrow_mut()[index], value.clone());
        self.emit(CollectionChange::Replace { index, value });
        previous
    }

    pub fn clear(&self) {
        self.0.items.borrow_mut().clear();
        self.emit(CollectionChange::Reset);
    }

    /// Observes changes made from now on.
    pub fn observe(&self, f: impl Fn(&CollectionChange<T>) + 'static) -> Dispose {
        self.observe_with_snapshot(f).1
    }

    /// Returns the current items together with a subscription that starts
    /// exactly after them: no change is both in the snapshot and delivered.
    pub fn observe_with_snapshot(
        &self,
        f: impl Fn(&CollectionChange<T>) + 'static,
    ) -> (Vec<T>, Dispose) {
        let snapshot = self.to_vec();
        let key = self.0.observers.borrow_mut().insert(Registration {
            since: self.0.next_seq.get(),
            f: Rc::new(f),
        });
        let weak: Weak<Inner<T>> = Rc::downgrade(&self.0);
        let dispose = Dispose::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.observers.borrow_mut().remove(key);
            }
        });
        (snapshot, dispose)
    }

    pub fn observer_count(&self) -> usize {
        self.0.observers.borrow().len()
    }

    fn emit(&self, change: CollectionChange<T>) {
        let seq = self.0.next_seq.get();
        self.0.next_seq.set(seq + 1);
        self.0.pending.borrow_mut().push_back((seq, change));
        let Some(_busy) = Busy::enter(&self.0.dispatching) else {
            return;
        };

        loop {
            let next = self.0.pending.borrow_mut().pop_front();
            let Some((seq, change)) = next else { break };
            let targets: Vec<Observer<T>> = self
                .0
                .observers
                .borrow()
                .values()
                .filter(|r| r.since <= seq)
                .map(|r| r.f.clone())
                .collect();
            for f in targets {
                f(&change);
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.items.borrow().iter()).finish()
    }
}

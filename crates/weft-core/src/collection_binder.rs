//! Incremental reconciliation of a live collection into a run of children.
//!
//! A [`CollectionBinder`] owns the children of a container from position
//! `index_offset` onwards, one per item of a [`ReactiveVec`]. It never diffs:
//! each [`CollectionChange`] is applied as one targeted edit. Every item has a
//! slot holding the cancellation token its view was bound with; removing or
//! replacing the item fires that token.
//!
//! Changes are processed strictly in arrival order. A change raised while
//! another is being applied (a binder that edits the collection it is being
//! bound from, say) is queued behind it.
//!
//! Before any change is applied the tracked range must still fit inside the
//! container. If something else removed children, the change is logged and
//! dropped whole: no view is built, detached or torn down for it.
//!
//! Teardown order depends on who ends the slots. A collection reset detaches
//! the views first and then fires their tokens. Cancelling the owning context
//! fires the slot tokens first, since they are children of the context's
//! token, and the reset synthesized afterwards detaches the views. A reset
//! that fails the structural check leaves the views attached either way.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::cancel::CancelToken;
use crate::collection::{CollectionChange, ReactiveVec};
use crate::context::Context;
use crate::diagnostics::Diagnostics;
use crate::effects::Busy;
use crate::error::{BindError, panic_message};
use crate::model::Model;
use crate::service::BindingService;
use crate::view::ViewNode;

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_id() -> u64 {
    NEXT_ID.with(|id| {
        let v = id.get();
        id.set(v + 1);
        v
    })
}

/// Handle to a running collection binding.
///
/// Dropping the handle does not stop the binding; it ends when the context it
/// was created in is cancelled, at which point every tracked child is removed.
pub struct CollectionBinder<M: Model, V: ViewNode> {
    inner: Rc<State<M, V>>,
}

struct State<M: Model, V: ViewNode> {
    id: u64,
    service: BindingService<M, V>,
    context: Context<M>,
    container: V,
    index_offset: usize,
    slots: RefCell<Vec<CancelToken>>,
    pending: RefCell<VecDeque<CollectionChange<M>>>,
    busy: Cell<bool>,
    active: Cell<bool>,
    diagnostics: Diagnostics,
}

impl<M: Model, V: ViewNode> Clone for CollectionBinder<M, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M: Model, V: ViewNode> CollectionBinder<M, V> {
    pub(crate) fn bind(
        service: &BindingService<M, V>,
        context: &Context<M>,
        container: &V,
        items: &ReactiveVec<M>,
    ) -> Self {
        let id = next_id();
        let state = Rc::new(State {
            id,
            service: service.clone(),
            context: context.clone(),
            container: container.clone(),
            index_offset: container.child_count(),
            slots: RefCell::new(Vec::new()),
            pending: RefCell::new(VecDeque::new()),
            busy: Cell::new(false),
            active: Cell::new(false),
            diagnostics: context
                .diagnostics()
                .for_scope(format!("CollectionBinder#{id}")),
        });

        if context.is_cancelled() {
            state
                .diagnostics
                .warn(format_args!("context is already cancelled; nothing bound"));
            return Self { inner: state };
        }
        state.active.set(true);

        let (snapshot, subscription) = {
            let state = state.clone();
            items.observe_with_snapshot(move |change| state.receive(change.clone()))
        };
        state.enqueue_all(
            snapshot
                .into_iter()
                .enumerate()
                .map(|(index, value)| CollectionChange::Add { index, value }),
        );

        subscription.run_on(context.cancel_token());
        {
            let state = state.clone();
            context.on_cancel(move || state.shut_down());
        }
        Self { inner: state }
    }

    /// Number of items currently tracked.
    pub fn tracked_count(&self) -> usize {
        self.inner.slots.borrow().len()
    }

    /// Number of container children that precede the tracked range.
    pub fn index_offset(&self) -> usize {
        self.inner.index_offset
    }

    /// `false` once the owning context has been cancelled.
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Token the view at tracked position `index` was bound with.
    pub fn slot_token(&self, index: usize) -> Option<CancelToken> {
        self.inner.slots.borrow().get(index).cloned()
    }
}

impl<M: Model, V: ViewNode> fmt::Debug for CollectionBinder<M, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionBinder")
            .field("id", &self.inner.id)
            .field("index_offset", &self.inner.index_offset)
            .field("tracked", &self.tracked_count())
            .field("active", &self.is_active())
            .finish()
    }
}

impl<M: Model, V: ViewNode> State<M, V> {
    /// Live changes from the collection; ignored once shut down.
    fn receive(&self, change: CollectionChange<M>) {
        if self.active.get() && !self.context.is_cancelled() {
            self.enqueue_all(std::iter::once(change));
        }
    }

    fn shut_down(&self) {
        if self.active.replace(false) {
            self.enqueue_all(std::iter::once(CollectionChange::Reset));
        }
    }

    fn enqueue_all(&self, changes: impl IntoIterator<Item = CollectionChange<M>>) {
        self.pending.borrow_mut().extend(changes);
        let Some(_busy) = Busy::enter(&self.busy) else {
            return;
        };

        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(change) = next else { break };
            self.process(change);
        }
    }

    fn process(&self, change: CollectionChange<M>) {
        if self.service.config().trace_changes {
            self.diagnostics.verbose(format_args!(
                "{} {change:?} (tracking {})",
                change.name(),
                self.slots.borrow().len()
            ));
        }

        let result = if self.service.config().catch_panics {
            catch_unwind(AssertUnwindSafe(|| self.apply(&change).map_err(anyhow::Error::from)))
                .unwrap_or_else(|payload| {
                    Err(anyhow::anyhow!("panicked: {}", panic_message(&*payload)))
                })
        } else {
            self.apply(&change).map_err(anyhow::Error::from)
        };

        if let Err(err) = result {
            self.diagnostics
                .error(format_args!("{} failed! {change:?}: {err:#}", change.name()));
        }
    }

    fn apply(&self, change: &CollectionChange<M>) -> Result<(), BindError> {
        self.check_structure()?;
        match change {
            CollectionChange::Add { index, value } => self.add(*index, value),
            CollectionChange::Remove { index } => self.remove(*index),
            CollectionChange::Move {
                old_index,
                new_index,
            } => self.move_slot(*old_index, *new_index),
            CollectionChange::Replace { index, value } => self.replace(*index, value),
            CollectionChange::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    /// The tracked range must still fit inside the container.
    fn check_structure(&self) -> Result<(), BindError> {
        let expected = self.index_offset + self.slots.borrow().len();
        let actual = self.container.child_count();
        if expected > actual {
            Err(BindError::StructuralInvariantViolation { expected, actual })
        } else {
            Ok(())
        }
    }

    fn in_range(&self, index: usize, allow_end: bool) -> Result<(), BindError> {
        let len = self.slots.borrow().len();
        if index < len || (allow_end && index == len) {
            Ok(())
        } else {
            Err(BindError::EventOutOfRange { index, len })
        }
    }

    fn bind_slot(&self, value: &M) -> (CancelToken, V) {
        let token = self.context.cancel_token().child();
        let view = self.service.create_bound_view(&self.context, value, &token);
        (token, view)
    }

    fn detach(&self, index: usize) -> Result<V, BindError> {
        self.container
            .remove_at(self.index_offset + index)
            .ok_or_else(|| BindError::StructuralInvariantViolation {
                expected: self.index_offset + index + 1,
                actual: self.container.child_count(),
            })
    }

    fn add(&self, index: usize, value: &M) -> Result<(), BindError> {
        self.in_range(index, true)?;
        let (token, view) = self.bind_slot(value);
        self.container.insert_at(self.index_offset + index, view);
        self.slots.borrow_mut().insert(index, token);
        Ok(())
    }

    fn remove(&self, index: usize) -> Result<(), BindError> {
        self.in_range(index, false)?;
        let token = self.slots.borrow()[index].clone();
        token.cancel();
        self.detach(index)?;
        self.slots.borrow_mut().remove(index);
        Ok(())
    }

    fn move_slot(&self, old_index: usize, new_index: usize) -> Result<(), BindError> {
        self.in_range(old_index, false)?;
        self.in_range(new_index, false)?;
        if old_index == new_index {
            return Ok(());
        }
        let view = self.detach(old_index)?;
        self.container.insert_at(self.index_offset + new_index, view);

        let mut slots = self.slots.borrow_mut();
        let slot = slots.remove(old_index);
        slots.insert(new_index, slot);
        Ok(())
    }

    fn replace(&self, index: usize, value: &M) -> Result<(), BindError> {
        self.in_range(index, false)?;
        let previous = self.slots.borrow()[index].clone();
        previous.cancel();

        let (token, view) = self.bind_slot(value);
        self.detach(index)?;
        self.container.insert_at(self.index_offset + index, view);
        self.slots.borrow_mut()[index] = token;
        Ok(())
    }

    fn reset(&self) {
        let count = self.slots.borrow().len();
        for index in (0..count).rev() {
            self.container.remove_at(self.index_offset + index);
        }
        let slots = std::mem::take(&mut *self.slots.borrow_mut());
        for slot in slots {
            slot.cancel();
        }
    }
}

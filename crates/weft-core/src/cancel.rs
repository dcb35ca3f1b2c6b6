//! Single-fire cancellation tokens.
//!
//! A [`CancelToken`] is the only teardown mechanism in weft. Tokens form a
//! tree: [`CancelToken::child`] derives a token that fires when its parent
//! fires, and [`CancelToken::merge`] derives one that fires when either of two
//! tokens fires. Firing is idempotent and only ever travels downward.
//!
//! ```rust
//! use weft_core::CancelToken;
//!
//! let root = CancelToken::new();
//! let local = CancelToken::new();
//! let merged = root.merge(&local);
//!
//! local.cancel();
//! assert!(merged.is_cancelled());
//! assert!(!root.is_cancelled());
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

/// Handle to a callback registered with [`CancelToken::on_cancel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

type Callback = Box<dyn FnOnce()>;

#[derive(Clone)]
pub struct CancelToken {
    inner: Rc<TokenInner>,
}

struct TokenInner {
    fired: Cell<bool>,
    next_callback: Cell<u64>,
    callbacks: RefCell<SmallVec<[(u64, Callback); 2]>>,
    children: RefCell<Vec<CancelToken>>,
    parents: RefCell<SmallVec<[Weak<TokenInner>; 2]>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(TokenInner {
                fired: Cell::new(false),
                next_callback: Cell::new(0),
                callbacks: RefCell::new(SmallVec::new()),
                children: RefCell::new(Vec::new()),
                parents: RefCell::new(SmallVec::new()),
            }),
        }
    }

    /// A token that has already fired.
    pub fn cancelled() -> Self {
        let token = Self::new();
        token.inner.fired.set(true);
        token
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.fired.get()
    }

    /// Fires the token. Derived tokens fire first, then this token's own
    /// callbacks in registration order. Later calls are no-ops.
    pub fn cancel(&self) {
        if self.inner.fired.replace(true) {
            return;
        }
        self.detach_from_parents();

        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in children {
            child.cancel();
        }

        let callbacks = std::mem::take(&mut *self.inner.callbacks.borrow_mut());
        for (_, callback) in callbacks {
            callback();
        }
    }

    /// Registers `f` to run when the token fires.
    ///
    /// On an already fired token `f` runs immediately and `None` is returned.
    pub fn on_cancel(&self, f: impl FnOnce() + 'static) -> Option<CallbackId> {
        if self.is_cancelled() {
            f();
            return None;
        }
        let id = self.inner.next_callback.get();
        self.inner.next_callback.set(id + 1);
        self.inner.callbacks.borrow_mut().push((id, Box::new(f)));
        Some(CallbackId(id))
    }

    /// Drops a pending callback without running it.
    pub fn remove_callback(&self, id: CallbackId) -> bool {
        let mut callbacks = self.inner.callbacks.borrow_mut();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id.0);
        callbacks.len() != before
    }

    /// Derives a token that fires whenever this one does.
    pub fn child(&self) -> CancelToken {
        if self.is_cancelled() {
            return CancelToken::cancelled();
        }
        let child = CancelToken::new();
        self.adopt(&child);
        child
    }

    /// Derives a token that fires when either `self` or `other` fires,
    /// whichever comes first.
    pub fn merge(&self, other: &CancelToken) -> CancelToken {
        if self.is_cancelled() || other.is_cancelled() {
            return CancelToken::cancelled();
        }
        let merged = CancelToken::new();
        self.adopt(&merged);
        if !self.same_as(other) {
            other.adopt(&merged);
        }
        merged
    }

    pub fn same_as(&self, other: &CancelToken) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn adopt(&self, child: &CancelToken) {
        self.inner.children.borrow_mut().push(child.clone());
        child
            .inner
            .parents
            .borrow_mut()
            .push(Rc::downgrade(&self.inner));
    }

    fn detach_from_parents(&self) {
        let parents = std::mem::take(&mut *self.inner.parents.borrow_mut());
        for parent in parents.iter().filter_map(Weak::upgrade) {
            parent
                .children
                .borrow_mut()
                .retain(|c| !Rc::ptr_eq(&c.inner, &self.inner));
        }
    }

    #[cfg(test)]
    pub(crate) fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("callbacks", &self.inner.callbacks.borrow().len())
            .field("children", &self.inner.children.borrow().len())
            .finish()
    }
}

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::cancel::CancelToken;

/// Cleanup handle returned by subscriptions.
#[derive(Clone)]
#[must_use = "dropping a Dispose leaves the subscription alive; call `run` or `run_on`"]
pub struct Dispose(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// Runs at most once (safe to call multiple times).
    pub fn run(&self) {
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.0.borrow().is_none()
    }

    /// Runs when `token` fires (or right away if it already has).
    pub fn run_on(self, token: &CancelToken) {
        token.on_cancel(move || self.run());
    }
}

/// Raised busy flag; lowered again on drop, unwinding included.
pub(crate) struct Busy<'a>(&'a Cell<bool>);

impl<'a> Busy<'a> {
    /// `None` if `flag` is already raised.
    pub(crate) fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use slotmap::{SlotMap, new_key_type};

use crate::cancel::CancelToken;
use crate::context::Context;
use crate::effects::Dispose;
use crate::model::Model;

new_key_type! { pub struct SubId; }

type Subscriber<T> = Rc<dyn Fn(&T)>;

/// Latest-value stream. Subscribers are called synchronously on every write.
pub struct Signal<T>(Rc<Inner<T>>);

struct Inner<T> {
    value: RefCell<T>,
    subs: RefCell<SlotMap<SubId, Subscriber<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Clone + 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(Inner {
            value: RefCell::new(value),
            subs: RefCell::new(SlotMap::with_key()),
        }))
    }

    pub fn get(&self) -> T {
        self.0.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.value.borrow())
    }

    pub fn set(&self, v: T) {
        *self.0.value.borrow_mut() = v.clone();
        self.notify(&v);
    }

    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        let v = {
            let mut value = self.0.value.borrow_mut();
            f(&mut value);
            value.clone()
        };
        self.notify(&v);
    }

    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> Dispose {
        let id = self.0.subs.borrow_mut().insert(Rc::new(f));
        let weak: Weak<Inner<T>> = Rc::downgrade(&self.0);
        Dispose::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.subs.borrow_mut().remove(id);
            }
        })
    }

    /// Subscribes until `token` fires.
    pub fn subscribe_until(&self, token: &CancelToken, f: impl Fn(&T) + 'static) {
        if token.is_cancelled() {
            return;
        }
        self.subscribe(f).run_on(token);
    }

    /// Forwards every write to `target` until `context` is cancelled.
    /// The current value is not forwarded.
    pub fn bind_to<M: Model>(&self, target: &Signal<T>, context: &Context<M>) {
        let target = target.clone();
        self.subscribe_until(context.cancel_token(), move |v| target.set(v.clone()));

        let diagnostics = context.diagnostics().clone();
        context.on_cancel(move || {
            diagnostics.verbose(format_args!(
                "binding of {} has completed",
                std::any::type_name::<T>()
            ))
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.subs.borrow().len()
    }

    fn notify(&self, v: &T) {
        let subs: Vec<Subscriber<T>> = self.0.subs.borrow().values().cloned().collect();
        for s in subs {
            s(v);
        }
    }
}

pub fn signal<T: Clone + 'static>(t: T) -> Signal<T> {
    Signal::new(t)
}

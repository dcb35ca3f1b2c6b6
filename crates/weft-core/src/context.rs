use std::fmt;
use std::rc::{Rc, Weak};

use crate::cancel::{CallbackId, CancelToken};
use crate::diagnostics::Diagnostics;
use crate::error::BindError;
use crate::model::Model;

/// A lifecycle scope: one per bound item.
///
/// Carries the cancellation token that tears the item down, the component the
/// scope was created for (if any), a weak link to the parent scope for
/// ancestor lookups, and the diagnostics to report through.
pub struct Context<M: Model> {
    inner: Rc<ContextInner<M>>,
}

struct ContextInner<M: Model> {
    parent: Option<Weak<ContextInner<M>>>,
    component: Option<M>,
    cancel: CancelToken,
    diagnostics: Diagnostics,
}

impl<M: Model> Clone for Context<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M: Model> Context<M> {
    pub fn root(cancel: CancelToken, diagnostics: Diagnostics) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                parent: None,
                component: None,
                cancel,
                diagnostics,
            }),
        }
    }

    /// Child scope that ends when either this scope or `local_cancel` ends.
    pub fn create_child(&self, local_cancel: &CancelToken) -> Self {
        self.derive(
            None,
            self.inner.cancel.merge(local_cancel),
            self.inner.diagnostics.clone(),
        )
    }

    /// Scope for one bound item. It stays alive until `cancel` fires, so
    /// scopes created below it can still reach it through their weak parent
    /// link after the binder has returned.
    pub(crate) fn for_component(
        &self,
        component: M,
        cancel: CancelToken,
        diagnostics: Diagnostics,
    ) -> Self {
        let context = self.derive(Some(component), cancel, diagnostics);
        let keep_alive = context.clone();
        context.inner.cancel.on_cancel(move || drop(keep_alive));
        context
    }

    fn derive(&self, component: Option<M>, cancel: CancelToken, diagnostics: Diagnostics) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                parent: Some(Rc::downgrade(&self.inner)),
                component,
                cancel,
                diagnostics,
            }),
        }
    }

    pub fn parent(&self) -> Option<Context<M>> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Context { inner })
    }

    pub fn component(&self) -> Option<&M> {
        self.inner.component.as_ref()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.inner.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    pub fn on_cancel(&self, f: impl FnOnce() + 'static) -> Option<CallbackId> {
        self.inner.cancel.on_cancel(f)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    /// Walks up from the parent and returns the first component `select`
    /// accepts.
    ///
    /// ```rust,ignore
    /// let board: BoardModel = ctx.ancestor(|m| match m {
    ///     Ui::Board(b) => Some(b.clone()),
    ///     _ => None,
    /// })?;
    /// ```
    pub fn ancestor<T>(&self, mut select: impl FnMut(&M) -> Option<T>) -> Result<T, BindError> {
        let mut current = self.parent();
        while let Some(ctx) = current {
            if let Some(found) = ctx.component().and_then(&mut select) {
                return Ok(found);
            }
            current = ctx.parent();
        }
        Err(BindError::AncestorNotFound {
            wanted: std::any::type_name::<T>(),
        })
    }

    pub fn ancestor_of_kind(&self, kind: M::Kind) -> Result<M, BindError> {
        let mut current = self.parent();
        while let Some(ctx) = current {
            if let Some(component) = ctx.component()
                && component.kind() == kind
            {
                return Ok(component.clone());
            }
            current = ctx.parent();
        }
        Err(BindError::AncestorNotFound {
            wanted: std::any::type_name::<M::Kind>(),
        })
    }
}

impl<M: Model> fmt::Debug for Context<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("component", &self.inner.component)
            .field("cancelled", &self.is_cancelled())
            .field("scope", &self.inner.diagnostics.scope())
            .finish()
    }
}

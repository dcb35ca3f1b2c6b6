use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::context::Context;
use crate::diagnostics::LOG_TARGET;
use crate::error::BindError;
use crate::model::Model;
use crate::service::BindingService;
use crate::view::ViewNode;

/// Builds the view for one kind of component.
///
/// Binders are stateless and reused for every component of their kind. The
/// service is passed in so a binder can populate nested children.
pub trait Binder<M: Model, V: ViewNode> {
    fn create_bound_view(
        &self,
        component: &M,
        context: &Context<M>,
        service: &BindingService<M, V>,
    ) -> anyhow::Result<V>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Binder backed by a closure. See [`binder_fn`].
pub struct FnBinder<F> {
    name: &'static str,
    f: F,
}

impl<M, V, F> Binder<M, V> for FnBinder<F>
where
    M: Model,
    V: ViewNode,
    F: Fn(&M, &Context<M>, &BindingService<M, V>) -> anyhow::Result<V>,
{
    fn create_bound_view(
        &self,
        component: &M,
        context: &Context<M>,
        service: &BindingService<M, V>,
    ) -> anyhow::Result<V> {
        (self.f)(component, context, service)
    }

    fn name(&self) -> &str {
        self.name
    }
}

pub fn binder_fn<M, V, F>(name: &'static str, f: F) -> FnBinder<F>
where
    M: Model,
    V: ViewNode,
    F: Fn(&M, &Context<M>, &BindingService<M, V>) -> anyhow::Result<V>,
{
    FnBinder { name, f }
}

/// Binds components that already carry their view; the view is returned
/// untouched.
pub struct StaticBinder<F> {
    extract: F,
}

impl<F> StaticBinder<F> {
    pub fn new(extract: F) -> Self {
        Self { extract }
    }
}

impl<M, V, F> Binder<M, V> for StaticBinder<F>
where
    M: Model,
    V: ViewNode,
    F: Fn(&M) -> Option<V>,
{
    fn create_bound_view(
        &self,
        component: &M,
        _context: &Context<M>,
        _service: &BindingService<M, V>,
    ) -> anyhow::Result<V> {
        (self.extract)(component)
            .ok_or_else(|| anyhow::anyhow!("{:?} carries no prebuilt view", component.kind()))
    }

    fn name(&self) -> &str {
        "StaticBinder"
    }
}

/// Component kind → binder table. At most one binder per kind.
///
/// Shared (`Rc`) between the [`BindingService`] that reads it and whatever
/// installs binders; every mutation completes before the call returns, so a
/// lookup never sees half of a registration.
pub struct BinderRegistry<M: Model, V: ViewNode> {
    binders: RefCell<HashMap<M::Kind, Rc<dyn Binder<M, V>>>>,
}

impl<M: Model, V: ViewNode> Default for BinderRegistry<M, V> {
    fn default() -> Self {
        Self {
            binders: RefCell::new(HashMap::new()),
        }
    }
}

impl<M: Model, V: ViewNode> BinderRegistry<M, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: M::Kind, binder: Rc<dyn Binder<M, V>>) -> Result<(), BindError> {
        self.register_all(&[kind], binder)
    }

    /// Registers `binder` for every kind in `kinds`, or for none of them.
    pub fn register_all(
        &self,
        kinds: &[M::Kind],
        binder: Rc<dyn Binder<M, V>>,
    ) -> Result<(), BindError> {
        let mut binders = self.binders.borrow_mut();
        let mut seen = HashSet::new();
        for kind in kinds {
            if let Some(existing) = binders.get(kind) {
                return Err(BindError::DuplicateRegistration {
                    kind: format!("{kind:?}"),
                    existing: existing.name().to_string(),
                    incoming: binder.name().to_string(),
                });
            }
            if !seen.insert(*kind) {
                return Err(BindError::DuplicateRegistration {
                    kind: format!("{kind:?}"),
                    existing: binder.name().to_string(),
                    incoming: binder.name().to_string(),
                });
            }
        }
        for kind in kinds {
            log::debug!(target: LOG_TARGET, "binder '{}' handles {kind:?}", binder.name());
            binders.insert(*kind, binder.clone());
        }
        Ok(())
    }

    pub fn deregister(&self, kind: M::Kind) -> Result<Rc<dyn Binder<M, V>>, BindError> {
        let removed = self.binders.borrow_mut().remove(&kind);
        removed.ok_or_else(|| BindError::unresolved(&kind))
    }

    pub fn resolve(&self, kind: M::Kind) -> Result<Rc<dyn Binder<M, V>>, BindError> {
        self.binders
            .borrow()
            .get(&kind)
            .cloned()
            .ok_or_else(|| BindError::unresolved(&kind))
    }

    pub fn contains(&self, kind: M::Kind) -> bool {
        self.binders.borrow().contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<M::Kind> {
        self.binders.borrow().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.binders.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.binders.borrow().is_empty()
    }
}

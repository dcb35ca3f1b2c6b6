use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::diagnostics::LOG_TARGET;
use crate::error::BindError;
use crate::model::Model;
use crate::registry::{Binder, BinderRegistry};
use crate::view::ViewNode;

/// Installs binders into a registry as named units and removes them again.
///
/// A unit is one binder serving one or more component kinds. Installing is
/// all-or-nothing: if any kind is already taken the registry is left exactly
/// as it was.
pub struct BinderInstaller<M: Model, V: ViewNode> {
    registry: Rc<BinderRegistry<M, V>>,
    units: RefCell<HashMap<String, Vec<M::Kind>>>,
}

impl<M: Model, V: ViewNode> BinderInstaller<M, V> {
    pub fn new(registry: Rc<BinderRegistry<M, V>>) -> Self {
        Self {
            registry,
            units: RefCell::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Rc<BinderRegistry<M, V>> {
        &self.registry
    }

    pub fn install(
        &self,
        name: impl Into<String>,
        kinds: &[M::Kind],
        binder: Rc<dyn Binder<M, V>>,
    ) -> Result<(), BindError> {
        let name = name.into();
        if self.units.borrow().contains_key(&name) {
            return Err(BindError::DuplicateUnit(name));
        }
        self.registry.register_all(kinds, binder)?;
        log::info!(target: LOG_TARGET, "installed binder unit '{name}' for {kinds:?}");
        self.units.borrow_mut().insert(name, kinds.to_vec());
        Ok(())
    }

    /// Removes every kind the unit registered.
    pub fn uninstall(&self, name: &str) -> Result<(), BindError> {
        let kinds = self
            .units
            .borrow_mut()
            .remove(name)
            .ok_or_else(|| BindError::UnknownUnit(name.to_string()))?;
        for kind in kinds {
            if let Err(err) = self.registry.deregister(kind) {
                log::warn!(target: LOG_TARGET, "uninstalling '{name}': {err}");
            }
        }
        log::info!(target: LOG_TARGET, "uninstalled binder unit '{name}'");
        Ok(())
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.units.borrow().contains_key(name)
    }

    /// Installed unit names, sorted.
    pub fn units(&self) -> Vec<String> {
        let mut names: Vec<String> = self.units.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

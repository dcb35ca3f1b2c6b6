use std::any::Any;

use thiserror::Error;

/// Everything that can go wrong while wiring components to views.
///
/// Registration and resolution errors are returned straight to the caller.
/// Construction failures and structural violations are caught inside the
/// binding service and only ever reach the diagnostic sink.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("binder '{incoming}' cannot handle {kind}: '{existing}' is already registered for it")]
    DuplicateRegistration {
        kind: String,
        existing: String,
        incoming: String,
    },

    #[error("no binder was registered to handle component kind {kind}")]
    UnresolvedBinder { kind: String },

    #[error("no ancestor found matching '{wanted}'")]
    AncestorNotFound { wanted: &'static str },

    #[error("binder '{binder}' failed to create a view for {kind}")]
    BindingConstructionFailure {
        kind: String,
        binder: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "fewer children present than expected: expected at least {expected}, found {actual}. \
         Children of a container with a bound collection may only be appended after the bound range; \
         never remove bound children externally"
    )]
    StructuralInvariantViolation { expected: usize, actual: usize },

    #[error("index {index} is out of range for {len} tracked children")]
    EventOutOfRange { index: usize, len: usize },

    #[error("binder unit '{0}' is already installed")]
    DuplicateUnit(String),

    #[error("binder unit '{0}' is not installed")]
    UnknownUnit(String),
}

impl BindError {
    pub(crate) fn unresolved(kind: &impl std::fmt::Debug) -> Self {
        BindError::UnresolvedBinder {
            kind: format!("{kind:?}"),
        }
    }
}

/// Turns a `catch_unwind` payload into something printable.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}

//! # Components, Binders, and Contexts
//!
//! Weft turns plain data (components) into nodes of a retained view tree and
//! keeps the two in step. There are four main pieces:
//!
//! - [`Context`]: a lifecycle scope with a cancellation token and a link to
//!   its parent scope.
//! - [`BinderRegistry`]: which [`Binder`] builds the view for which kind of
//!   component.
//! - [`BindingService`]: builds views and attaches them to containers.
//! - [`CollectionBinder`]: mirrors a live [`ReactiveVec`] into a run of
//!   children, one targeted edit per change.
//!
//! ## Binding a component
//!
//! Components are a closed enum; [`Model::kind`] returns the tag the registry
//! dispatches on.
//!
//! ```rust
//! use std::rc::Rc;
//! use weft_core::prelude::*;
//!
//! #[derive(Clone, Debug)]
//! enum Ui {
//!     Text(&'static str),
//! }
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! enum UiKind {
//!     Text,
//! }
//!
//! impl Model for Ui {
//!     type Kind = UiKind;
//!     fn kind(&self) -> UiKind {
//!         UiKind::Text
//!     }
//! }
//!
//! let registry = Rc::new(BinderRegistry::new());
//! registry
//!     .register(
//!         UiKind::Text,
//!         Rc::new(binder_fn("text", |ui: &Ui, _: &Context<Ui>, _: &BindingService<Ui, HeadlessNode>| {
//!             let Ui::Text(text) = ui;
//!             Ok(HeadlessNode::new(*text))
//!         })),
//!     )
//!     .unwrap();
//!
//! let service = BindingService::new(registry, Rc::new(NoopEventBus), Diagnostics::default());
//! let root = Context::root(CancelToken::new(), Diagnostics::default());
//! let panel = HeadlessNode::new("panel");
//!
//! service.populate_child(&root, &panel, &Ui::Text("hello"));
//! assert_eq!(panel.child_labels(), ["hello"]);
//!
//! root.cancel_token().cancel();
//! assert_eq!(panel.child_count(), 0);
//! ```
//!
//! ## Live collections
//!
//! [`BindingService::populate_children_reactive`] appends one child per item
//! after whatever the container already holds, then applies every
//! [`CollectionChange`] as it happens: adds insert, removes and replaces
//! cancel the item's slot token, moves relocate the existing view, and a reset
//! clears the tracked range. Cancelling the context resets the range and
//! stops listening.
//!
//! ## Failures
//!
//! Registry mistakes ([`BindError::DuplicateRegistration`],
//! [`BindError::UnresolvedBinder`] from `resolve`) are returned to the caller.
//! A binder that fails or panics while a tree is being built does not: its
//! view is replaced by a [`ViewNode::diagnostic`] placeholder and the error
//! goes to the [`Diagnostics`] sink.

pub mod cancel;
pub mod collection;
pub mod collection_binder;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod effects;
pub mod error;
pub mod headless;
pub mod installer;
pub mod model;
pub mod prelude;
pub mod registry;
pub mod service;
pub mod signal;
pub mod view;

pub use cancel::{CallbackId, CancelToken};
pub use collection::{CollectionChange, ReactiveVec};
pub use collection_binder::CollectionBinder;
pub use config::BindingConfig;
pub use context::Context;
pub use diagnostics::{DiagnosticSink, Diagnostics, LogSink, RecordingSink};
pub use effects::Dispose;
pub use error::BindError;
pub use headless::HeadlessNode;
pub use installer::BinderInstaller;
pub use model::Model;
pub use registry::{Binder, BinderRegistry, FnBinder, StaticBinder, binder_fn};
pub use service::BindingService;
pub use signal::{Signal, signal};
pub use view::{EventBus, EventRecorder, NoopEventBus, ViewCreated, ViewNode};

#[cfg(test)]
mod tests;

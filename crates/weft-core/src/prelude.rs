pub use crate::cancel::{CallbackId, CancelToken};
pub use crate::collection::{CollectionChange, ReactiveVec};
pub use crate::collection_binder::CollectionBinder;
pub use crate::config::BindingConfig;
pub use crate::context::Context;
pub use crate::diagnostics::{DiagnosticSink, Diagnostics, Level, LogSink, RecordingSink};
pub use crate::effects::Dispose;
pub use crate::error::BindError;
pub use crate::headless::HeadlessNode;
pub use crate::installer::BinderInstaller;
pub use crate::model::Model;
pub use crate::registry::{Binder, BinderRegistry, StaticBinder, binder_fn};
pub use crate::service::BindingService;
pub use crate::signal::{Signal, signal};
pub use crate::view::{EventBus, EventRecorder, NoopEventBus, ViewCreated, ViewNode};

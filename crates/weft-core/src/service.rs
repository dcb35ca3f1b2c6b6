use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::cancel::CancelToken;
use crate::collection::ReactiveVec;
use crate::collection_binder::CollectionBinder;
use crate::config::BindingConfig;
use crate::context::Context;
use crate::diagnostics::Diagnostics;
use crate::effects::Busy;
use crate::error::{BindError, panic_message};
use crate::model::Model;
use crate::registry::BinderRegistry;
use crate::signal::Signal;
use crate::view::{EventBus, ViewCreated, ViewNode};

/// Creates bound views and attaches them to containers.
///
/// Cheap to clone; clones share the registry, the event bus and the
/// configuration. Every `populate_*` call ties the lifetime of what it
/// attaches to the given context: when the context's token fires, the views
/// are detached again.
pub struct BindingService<M: Model, V: ViewNode> {
    inner: Rc<ServiceInner<M, V>>,
}

struct ServiceInner<M: Model, V: ViewNode> {
    registry: Rc<BinderRegistry<M, V>>,
    events: Rc<dyn EventBus<M, V>>,
    diagnostics: Diagnostics,
    config: BindingConfig,
}

/// What is known about a binding attempt when it goes wrong.
struct Attempt<K> {
    kind: Option<K>,
    binder: Option<String>,
}

impl<M: Model, V: ViewNode> Clone for BindingService<M, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M: Model, V: ViewNode> BindingService<M, V> {
    pub fn new(
        registry: Rc<BinderRegistry<M, V>>,
        events: Rc<dyn EventBus<M, V>>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self::with_config(registry, events, diagnostics, BindingConfig::default())
    }

    pub fn with_config(
        registry: Rc<BinderRegistry<M, V>>,
        events: Rc<dyn EventBus<M, V>>,
        diagnostics: Diagnostics,
        config: BindingConfig,
    ) -> Self {
        Self {
            inner: Rc::new(ServiceInner {
                registry,
                events,
                diagnostics: diagnostics.for_scope("BindingService"),
                config,
            }),
        }
    }

    pub fn registry(&self) -> &Rc<BinderRegistry<M, V>> {
        &self.inner.registry
    }

    pub fn config(&self) -> BindingConfig {
        self.inner.config
    }

    /// Builds the view for `component` inside a new context below `parent`
    /// that lives until `teardown` fires.
    ///
    /// Never fails: a missing binder, a binder error or a binder panic is
    /// logged and answered with a [`ViewNode::diagnostic`] placeholder so one
    /// bad component cannot take the surrounding tree down.
    pub fn create_bound_view(
        &self,
        parent: &Context<M>,
        component: &M,
        teardown: &CancelToken,
    ) -> V {
        let mut attempt = Attempt {
            kind: None,
            binder: None,
        };
        let result = if self.inner.config.catch_panics {
            catch_unwind(AssertUnwindSafe(|| {
                self.try_create_bound_view(parent, component, teardown, &mut attempt)
            }))
            .unwrap_or_else(|payload| {
                Err(BindError::BindingConstructionFailure {
                    kind: describe_kind(attempt.kind.as_ref()),
                    binder: attempt.binder.clone().unwrap_or_else(|| "<none>".into()),
                    source: anyhow::anyhow!("panicked: {}", panic_message(&*payload)),
                })
            })
        } else {
            self.try_create_bound_view(parent, component, teardown, &mut attempt)
        };

        let view = match result {
            Ok(view) => view,
            Err(err) => {
                let text = format!("{:#}", anyhow::Error::from(err));
                self.inner.diagnostics.error(format_args!(
                    "error creating a bound view for {component:?}: {text}"
                ));
                V::diagnostic(&format!(
                    "Error creating a bound view for {}!\n{text}",
                    describe_kind(attempt.kind.as_ref())
                ))
            }
        };

        self.inner.events.publish(ViewCreated {
            view: view.clone(),
            kind: attempt.kind,
        });
        view
    }

    fn try_create_bound_view(
        &self,
        parent: &Context<M>,
        component: &M,
        teardown: &CancelToken,
        attempt: &mut Attempt<M::Kind>,
    ) -> Result<V, BindError> {
        let kind = component.kind();
        attempt.kind = Some(kind);
        let binder = self.inner.registry.resolve(kind)?;
        attempt.binder = Some(binder.name().to_string());

        let context = parent.for_component(
            component.clone(),
            teardown.clone(),
            parent.diagnostics().for_scope(binder.name()),
        );
        binder
            .create_bound_view(component, &context, self)
            .map_err(|source| BindError::BindingConstructionFailure {
                kind: format!("{kind:?}"),
                binder: binder.name().to_string(),
                source,
            })
    }

    /// Appends the view for `component`; it is removed when `context` ends.
    pub fn populate_child(&self, context: &Context<M>, container: &V, component: &M) {
        if self.skip_cancelled(context, "populate_child") {
            return;
        }
        let child = self.create_bound_view(context, component, context.cancel_token());
        container.append(child.clone());

        let container = container.clone();
        context.on_cancel(move || {
            container.remove(&child);
        });
    }

    /// Keeps one child bound to the latest value of `models`.
    ///
    /// The current value is bound right away. Each later value first tears
    /// down the previous child, then attaches the new one, so two children
    /// are never visible together. Values written while a binder is running
    /// are queued and bound once it returns. When `context` ends the
    /// subscription is dropped and the last child removed.
    pub fn populate_child_stream(&self, context: &Context<M>, container: &V, models: &Signal<M>) {
        if self.skip_cancelled(context, "populate_child_stream") {
            return;
        }
        let slot: Rc<StreamSlot<M>> = Rc::new(StreamSlot::new());
        let bind = {
            let service = self.clone();
            let context = context.clone();
            let container = container.clone();
            move |component: &M| {
                slot.pending.borrow_mut().push_back(component.clone());
                let Some(_busy) = Busy::enter(&slot.busy) else {
                    return;
                };
                loop {
                    let next = slot.pending.borrow_mut().pop_front();
                    let Some(component) = next else { break };
                    if context.is_cancelled() {
                        slot.pending.borrow_mut().clear();
                        break;
                    }
                    let previous = slot.current.borrow_mut().take();
                    if let Some(previous) = previous {
                        previous.cancel();
                    }

                    let teardown = context.cancel_token().child();
                    let child = service.create_bound_view(&context, &component, &teardown);
                    container.append(child.clone());
                    {
                        let container = container.clone();
                        teardown.on_cancel(move || {
                            container.remove(&child);
                        });
                    }
                    *slot.current.borrow_mut() = Some(teardown);
                }
            }
        };

        bind(&models.get());
        models.subscribe_until(context.cancel_token(), bind);
    }

    /// Appends one child per model, in order. The children are never
    /// reconciled afterwards and are all removed when `context` ends.
    pub fn populate_children(&self, context: &Context<M>, container: &V, models: &[M]) {
        if self.skip_cancelled(context, "populate_children") {
            return;
        }
        let children: Vec<V> = models
            .iter()
            .map(|model| self.create_bound_view(context, model, context.cancel_token()))
            .collect();
        for child in &children {
            container.append(child.clone());
        }

        let container = container.clone();
        context.on_cancel(move || {
            for child in &children {
                container.remove(child);
            }
        });
    }

    /// Keeps a contiguous run of children in step with `items`, appended
    /// after whatever `container` holds right now.
    pub fn populate_children_reactive(
        &self,
        context: &Context<M>,
        container: &V,
        items: &ReactiveVec<M>,
    ) -> CollectionBinder<M, V> {
        CollectionBinder::bind(self, context, container, items)
    }

    fn skip_cancelled(&self, context: &Context<M>, op: &str) -> bool {
        let cancelled = context.is_cancelled();
        if cancelled {
            self.inner
                .diagnostics
                .warn(format_args!("{op}: context is already cancelled; nothing bound"));
        }
        cancelled
    }
}

fn describe_kind<K: std::fmt::Debug>(kind: Option<&K>) -> String {
    match kind {
        Some(kind) => format!("{kind:?}"),
        None => "<unknown>".to_string(),
    }
}

/// The one child of a stream binding plus the values still waiting for it.
struct StreamSlot<M> {
    current: RefCell<Option<CancelToken>>,
    pending: RefCell<VecDeque<M>>,
    busy: Cell<bool>,
}

impl<M> StreamSlot<M> {
    fn new() -> Self {
        Self {
            current: RefCell::new(None),
            pending: RefCell::new(VecDeque::new()),
            busy: Cell::new(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Level;
    use crate::headless::HeadlessNode;
    use crate::registry::{Binder, binder_fn};
    use crate::signal::signal;
    use crate::tests::fixtures::{Harness, Item, ItemKind};

    #[test]
    fn bound_view_is_built_by_registered_binder() {
        let h = Harness::new();
        let view = h
            .service
            .create_bound_view(&h.root, &Item::Label("a"), h.root.cancel_token());
        assert_eq!(view.label(), "a");
        assert_eq!(h.journal(), ["build a"]);

        let events = h.events.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, Some(ItemKind::Label));
        assert_eq!(events[0].view, view);
    }

    #[test]
    fn missing_binder_becomes_placeholder() {
        let h = Harness::new();
        let view = h
            .service
            .create_bound_view(&h.root, &Item::Orphan, h.root.cancel_token());
        assert!(view.is_diagnostic());
        assert!(view.label().starts_with("Error creating a bound view for Orphan!"));
        assert_eq!(h.sink.count(Level::Error), 1);
        assert_eq!(h.events.len(), 1);
    }

    #[test]
    fn binder_error_and_panic_become_placeholders() {
        let h = Harness::new();
        let failed = h
            .service
            .create_bound_view(&h.root, &Item::Broken("x"), h.root.cancel_token());
        assert!(failed.is_diagnostic());
        assert!(failed.label().contains("refusing to bind x"));

        let panicked = h
            .service
            .create_bound_view(&h.root, &Item::Panicky, h.root.cancel_token());
        assert!(panicked.is_diagnostic());
        assert!(panicked.label().contains("panicked: binder blew up"));
        assert_eq!(h.sink.count(Level::Error), 2);
    }

    #[test]
    fn binder_context_carries_component_and_teardown() {
        let h = Harness::new();
        let teardown = h.root.cancel_token().child();
        h.service
            .create_bound_view(&h.root, &Item::Label("a"), &teardown);
        teardown.cancel();
        assert_eq!(h.journal(), ["build a", "drop a"]);
    }

    #[test]
    fn single_child_is_removed_once_on_cancel() {
        let h = Harness::new();
        let container = HeadlessNode::new("box");
        container.append(HeadlessNode::new("header"));
        let scope = h.root.create_child(&CancelToken::new());

        h.service.populate_child(&scope, &container, &Item::Label("a"));
        assert_eq!(container.child_labels(), ["header", "a"]);

        scope.cancel_token().cancel();
        scope.cancel_token().cancel();
        assert_eq!(container.child_labels(), ["header"]);
        assert_eq!(h.journal(), ["build a", "drop a"]);
    }

    #[test]
    fn stream_tears_down_before_attaching() {
        let h = Harness::new();
        let container = HeadlessNode::new("slot");
        let scope = h.root.create_child(&CancelToken::new());
        let model = signal(Item::Label("first"));

        let counts = Rc::new(RefCell::new(Vec::new()));
        {
            // Child count seen by each binder call: never two children at once.
            let counts = counts.clone();
            let container = container.clone();
            h.on_build(move || counts.borrow_mut().push(container.child_count()));
        }

        h.service.populate_child_stream(&scope, &container, &model);
        assert_eq!(container.child_labels(), ["first"]);

        model.set(Item::Label("second"));
        assert_eq!(container.child_labels(), ["second"]);
        assert_eq!(*counts.borrow(), vec![0, 0]);
        assert_eq!(h.journal(), ["build first", "drop first", "build second"]);

        scope.cancel_token().cancel();
        assert_eq!(container.child_count(), 0);
        assert_eq!(model.subscriber_count(), 0);

        model.set(Item::Label("third"));
        assert_eq!(container.child_count(), 0);
    }

    #[test]
    fn fixed_list_is_appended_and_removed_together() {
        let h = Harness::new();
        let container = HeadlessNode::new("list");
        container.append(HeadlessNode::new("title"));
        let scope = h.root.create_child(&CancelToken::new());

        h.service.populate_children(
            &scope,
            &container,
            &[Item::Label("a"), Item::Orphan, Item::Label("c")],
        );
        let labels = container.child_labels();
        assert_eq!(labels.len(), 4);
        assert_eq!(labels[1], "a");
        assert!(container.child(2).unwrap().is_diagnostic());
        assert_eq!(labels[3], "c");

        scope.cancel_token().cancel();
        assert_eq!(container.child_labels(), ["title"]);
    }

    #[test]
    fn cancelled_context_binds_nothing() {
        let h = Harness::new();
        let container = HeadlessNode::new("box");
        let scope = h.root.create_child(&CancelToken::cancelled());

        h.service.populate_child(&scope, &container, &Item::Label("a"));
        h.service
            .populate_children(&scope, &container, &[Item::Label("b")]);
        assert_eq!(container.child_count(), 0);
        assert!(h.journal().is_empty());
        assert_eq!(h.sink.count(Level::Warn), 2);
    }

    #[test]
    fn nested_binders_see_their_ancestors() {
        let h = Harness::new();
        let container = HeadlessNode::new("root");
        let children = ReactiveVec::from_vec(vec![Item::Label("inner")]);
        h.service
            .populate_child(&h.root, &container, &Item::Group("outer", children));

        let group = container.child(0).unwrap();
        assert_eq!(group.label(), "outer");
        assert_eq!(group.child_labels(), ["inner (in outer)"]);
    }

    #[test]
    fn stream_value_written_during_a_build_is_bound_next() {
        let h = Harness::new();
        let slot = HeadlessNode::new("slot");
        let current = signal(Item::Label("v0"));
        h.service.populate_child_stream(&h.root, &slot, &current);
        let armed = Rc::new(Cell::new(true));
        {
            let current = current.clone();
            let armed = armed.clone();
            h.on_build(move || {
                if armed.replace(false) {
                    current.set(Item::Label("v2"));
                }
            });
        }
        h.clear_journal();

        current.set(Item::Label("v1"));
        assert_eq!(slot.child_labels(), ["v2"]);
        assert_eq!(h.journal(), ["drop v0", "build v1", "drop v1", "build v2"]);

        h.root.cancel_token().cancel();
        assert_eq!(slot.child_count(), 0);
    }

    #[test]
    fn bound_item_keeps_its_ancestors_reachable() {
        let h = Harness::new();
        h.registry.deregister(ItemKind::Broken).unwrap();
        let outer: Rc<dyn Binder<Item, HeadlessNode>> = Rc::new(binder_fn(
            "outer",
            |_: &Item, context: &Context<Item>, service: &BindingService<Item, HeadlessNode>| {
                let node = HeadlessNode::new("outer");
                service.populate_child(context, &node, &Item::Orphan);
                Ok(node)
            },
        ));
        h.registry.register(ItemKind::Broken, outer).unwrap();
        let stashed: Rc<RefCell<Option<Context<Item>>>> = Rc::default();
        let inner: Rc<dyn Binder<Item, HeadlessNode>> = {
            let stashed = stashed.clone();
            Rc::new(binder_fn(
                "inner",
                move |_: &Item, context: &Context<Item>, _: &BindingService<Item, HeadlessNode>| {
                    *stashed.borrow_mut() = Some(context.clone());
                    Ok(HeadlessNode::new("inner"))
                },
            ))
        };
        h.registry.register(ItemKind::Orphan, inner).unwrap();

        let container = HeadlessNode::new("root");
        h.service
            .populate_child(&h.root, &container, &Item::Broken("outer"));
        let inner = stashed.borrow_mut().take().unwrap();
        assert!(!inner.is_cancelled());
        assert!(matches!(
            inner.ancestor_of_kind(ItemKind::Broken),
            Ok(Item::Broken("outer"))
        ));

        h.root.cancel_token().cancel();
        assert!(inner.is_cancelled());
        assert_eq!(container.child_count(), 0);
        assert!(inner.parent().is_none());
    }
}

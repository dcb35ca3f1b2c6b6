pub(crate) mod fixtures {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::prelude::*;

    #[derive(Clone, Debug)]
    pub enum Item {
        Label(&'static str),
        /// Its binder returns an error.
        Broken(&'static str),
        /// Its binder panics.
        Panicky,
        /// A labelled container bound to a live list of children.
        Group(&'static str, ReactiveVec<Item>),
        /// No binder is ever registered for it.
        Orphan,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum ItemKind {
        Label,
        Broken,
        Panicky,
        Group,
        Orphan,
    }

    impl Model for Item {
        type Kind = ItemKind;

        fn kind(&self) -> ItemKind {
            match self {
                Item::Label(_) => ItemKind::Label,
                Item::Broken(_) => ItemKind::Broken,
                Item::Panicky => ItemKind::Panicky,
                Item::Group(..) => ItemKind::Group,
                Item::Orphan => ItemKind::Orphan,
            }
        }
    }

    impl Item {
        pub fn title(&self) -> &'static str {
            match self {
                Item::Label(t) | Item::Broken(t) | Item::Group(t, _) => *t,
                Item::Panicky => "panicky",
                Item::Orphan => "orphan",
            }
        }
    }

    pub fn label_binder(
        item: &Item,
        context: &Context<Item>,
        service: &BindingService<Item, HeadlessNode>,
    ) -> anyhow::Result<HeadlessNode> {
        match item {
            Item::Broken(t) => anyhow::bail!("refusing to bind {t}"),
            Item::Panicky => panic!("binder blew up"),
            Item::Group(title, children) => {
                let node = HeadlessNode::new(*title);
                service.populate_children_reactive(context, &node, children);
                Ok(node)
            }
            other => {
                let group = context.ancestor(|m| match m {
                    Item::Group(title, _) => Some(*title),
                    _ => None,
                });
                Ok(match group {
                    Ok(group) => HeadlessNode::new(format!("{} (in {group})", other.title())),
                    Err(_) => HeadlessNode::new(other.title()),
                })
            }
        }
    }

    /// What the binders did, in order, plus hooks run before every build.
    #[derive(Clone, Default)]
    pub struct Journal {
        lines: Rc<RefCell<Vec<String>>>,
        hooks: Rc<RefCell<Vec<Rc<dyn Fn()>>>>,
    }

    impl Journal {
        fn push(&self, line: String) {
            self.lines.borrow_mut().push(line);
        }

        fn run_hooks(&self) {
            let hooks: Vec<Rc<dyn Fn()>> = self.hooks.borrow().clone();
            for hook in hooks {
                hook();
            }
        }
    }

    pub struct Harness {
        pub sink: Rc<RecordingSink>,
        pub events: Rc<EventRecorder<Item, HeadlessNode>>,
        pub registry: Rc<BinderRegistry<Item, HeadlessNode>>,
        pub service: BindingService<Item, HeadlessNode>,
        pub root: Context<Item>,
        journal: Journal,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_config(BindingConfig::new().trace_changes(false))
        }

        pub fn with_config(config: BindingConfig) -> Self {
            let sink = Rc::new(RecordingSink::new());
            let diagnostics = Diagnostics::new(sink.clone(), "test");
            let events = Rc::new(EventRecorder::new());
            let registry = Rc::new(BinderRegistry::new());
            let journal = Journal::default();

            let binder = {
                let journal = journal.clone();
                binder_fn("journaling", move |item: &Item, context: &Context<Item>, service: &BindingService<Item, HeadlessNode>| {
                    journal.run_hooks();
                    let view = label_binder(item, context, service)?;
                    if let Item::Label(title) = item {
                        journal.push(format!("build {title}"));
                        let journal = journal.clone();
                        let title = *title;
                        context.on_cancel(move || journal.push(format!("drop {title}")));
                    }
                    Ok(view)
                })
            };
            let binder: Rc<dyn Binder<Item, HeadlessNode>> = Rc::new(binder);
            registry
                .register_all(
                    &[ItemKind::Label, ItemKind::Broken, ItemKind::Panicky, ItemKind::Group],
                    binder,
                )
                .expect("fresh registry");

            let service = BindingService::with_config(
                registry.clone(),
                events.clone(),
                diagnostics.clone(),
                config,
            );
            Self {
                sink,
                events,
                registry,
                service,
                root: Context::root(CancelToken::new(), diagnostics),
                journal,
            }
        }

        pub fn journal(&self) -> Vec<String> {
            self.journal.lines.borrow().clone()
        }

        pub fn clear_journal(&self) {
            self.journal.lines.borrow_mut().clear();
        }

        pub fn on_build(&self, hook: impl Fn() + 'static) {
            self.journal.hooks.borrow_mut().push(Rc::new(hook));
        }
    }
}

use std::rc::Rc;

use crate::prelude::*;
use fixtures::{Harness, Item, ItemKind};

fn items(titles: &[&'static str]) -> ReactiveVec<Item> {
    ReactiveVec::from_vec(titles.iter().copied().map(Item::Label).collect())
}

#[test]
fn tracked_range_mirrors_arbitrary_edits() {
    let h = Harness::new();
    let container = HeadlessNode::new("list");
    container.append(HeadlessNode::new("header"));
    let list = ReactiveVec::new();
    let binder = h
        .service
        .populate_children_reactive(&h.root, &container, &list);

    let pool = ["a", "b", "c", "d", "e", "f", "g"];
    // Deterministic walk over every kind of edit.
    let mut seed = 7usize;
    for step in 0..60 {
        seed = seed.wrapping_mul(31).wrapping_add(step);
        let len = list.len();
        let title = pool[seed % pool.len()];
        match seed % 5 {
            0 | 1 => list.insert(if len == 0 { 0 } else { seed % (len + 1) }, Item::Label(title)),
            2 if len > 0 => {
                list.remove(seed % len);
            }
            3 if len > 1 => list.move_item(seed % len, (seed / 3) % len),
            4 if len > 0 => {
                list.replace(seed % len, Item::Label(title));
            }
            _ if step % 17 == 0 => list.clear(),
            _ => list.push(Item::Label(title)),
        }

        let tracked: Vec<String> = container.child_labels().into_iter().skip(1).collect();
        let logical: Vec<String> = list.to_vec().iter().map(|i| i.title().to_string()).collect();
        assert_eq!(tracked, logical, "diverged at step {step}");
        assert_eq!(binder.tracked_count(), list.len());
    }
    assert_eq!(container.child_labels()[0], "header");
}

#[test]
fn move_carries_the_slot_with_the_item() {
    let h = Harness::new();
    let container = HeadlessNode::new("list");
    let list = items(&["A", "B", "C"]);
    let binder = h
        .service
        .populate_children_reactive(&h.root, &container, &list);
    let slot_of_a = binder.slot_token(0).unwrap();
    let slot_of_b = binder.slot_token(1).unwrap();

    list.move_item(0, 2);
    assert_eq!(container.child_labels(), ["B", "C", "A"]);
    assert!(binder.slot_token(0).unwrap().same_as(&slot_of_b));
    assert!(binder.slot_token(2).unwrap().same_as(&slot_of_a));

    list.remove(2);
    assert!(slot_of_a.is_cancelled());
    assert!(!slot_of_b.is_cancelled());
}

#[test]
fn cancel_leaves_leading_siblings_alone() {
    let h = Harness::new();
    let container = HeadlessNode::new("list");
    container.append(HeadlessNode::new("title"));
    container.append(HeadlessNode::new("subtitle"));
    let scope = h.root.create_child(&CancelToken::new());
    let _binder = h
        .service
        .populate_children_reactive(&scope, &container, &items(&["a", "b", "c"]));
    insta::assert_debug_snapshot!(container, @r#"
    Node {
        label: "list",
        children: [
            "title",
            "subtitle",
            "a",
            "b",
            "c",
        ],
    }
    "#);

    scope.cancel_token().cancel();
    insta::assert_debug_snapshot!(container, @r#"
    Node {
        label: "list",
        children: [
            "title",
            "subtitle",
        ],
    }
    "#);
}

#[test]
fn replace_rebuilds_only_the_replaced_item() {
    let h = Harness::new();
    let container = HeadlessNode::new("list");
    let list = items(&["A", "B", "C"]);
    let _binder = h
        .service
        .populate_children_reactive(&h.root, &container, &list);
    let a = container.child(0).unwrap();
    let c = container.child(2).unwrap();
    h.clear_journal();

    list.replace(1, Item::Label("X"));
    assert_eq!(container.child_labels(), ["A", "X", "C"]);
    assert_eq!(h.journal(), ["drop B", "build X"]);
    assert_eq!(container.child(0).unwrap(), a);
    assert_eq!(container.child(2).unwrap(), c);
}

#[test]
fn registry_errors_surface_to_the_caller() {
    let h = Harness::new();
    assert!(matches!(
        h.registry.resolve(ItemKind::Orphan),
        Err(BindError::UnresolvedBinder { .. })
    ));

    let second: Rc<dyn Binder<Item, HeadlessNode>> =
        Rc::new(binder_fn("second", fixtures::label_binder));
    assert!(matches!(
        h.registry.register(ItemKind::Label, second),
        Err(BindError::DuplicateRegistration { .. })
    ));
    assert_eq!(h.registry.resolve(ItemKind::Label).unwrap().name(), "journaling");
}

#[test]
fn shrunken_container_blocks_remove() {
    let h = Harness::new();
    let container = HeadlessNode::new("list");
    container.append(HeadlessNode::new("header"));
    let list = items(&["a", "b", "c"]);
    let binder = h
        .service
        .populate_children_reactive(&h.root, &container, &list);
    let tokens: Vec<CancelToken> = (0..3).filter_map(|i| binder.slot_token(i)).collect();

    container.remove_at(0);
    h.sink.clear();
    list.remove(1);

    assert_eq!(container.child_labels(), ["a", "b", "c"]);
    assert_eq!(binder.tracked_count(), 3);
    assert!(tokens.iter().all(|t| !t.is_cancelled()));
    assert_eq!(h.sink.entries().len(), 1);
    assert_eq!(h.sink.count(Level::Error), 1);
}

#[test]
fn nested_groups_tear_down_from_the_root() {
    let h = Harness::new();
    let container = HeadlessNode::new("board");
    let scope = h.root.create_child(&CancelToken::new());
    let todo = items(&["write", "review"]);
    let done = items(&["plan"]);
    let columns = ReactiveVec::from_vec(vec![
        Item::Group("todo", todo.clone()),
        Item::Group("done", done.clone()),
    ]);
    let _binder = h
        .service
        .populate_children_reactive(&scope, &container, &columns);

    todo.move_item(1, 0);
    done.push(Item::Orphan);
    insta::assert_debug_snapshot!(container, @r#"
    Node {
        label: "board",
        children: [
            Node {
                label: "todo",
                children: [
                    "review (in todo)",
                    "write (in todo)",
                ],
            },
            Node {
                label: "done",
                children: [
                    "plan (in done)",
                    "Error creating a bound view for Orphan!\nno binder was registered to handle component kind Orphan",
                ],
            },
        ],
    }
    "#);

    scope.cancel_token().cancel();
    assert_eq!(container.child_count(), 0);
    assert_eq!(todo.observer_count(), 0);
    assert_eq!(done.observer_count(), 0);
    let mut dropped: Vec<String> = h
        .journal()
        .into_iter()
        .filter(|l| l.starts_with("drop"))
        .collect();
    dropped.sort();
    assert_eq!(dropped, ["drop plan", "drop review", "drop write"]);
}

#[test]
fn stream_follows_the_latest_model() {
    let h = Harness::new();
    let slot = HeadlessNode::new("slot");
    let current = signal(Item::Label("loading"));
    h.service.populate_child_stream(&h.root, &slot, &current);

    current.set(Item::Broken("fetch"));
    assert!(slot.child(0).unwrap().is_diagnostic());
    current.set(Item::Label("ready"));
    assert_eq!(slot.child_labels(), ["ready"]);
    assert_eq!(h.events.len(), 3);
}

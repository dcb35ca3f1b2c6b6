//! Developer tools for looking at what a binding produced.
//!
//! [`Inspector`] sits on the event bus and counts every view the binding
//! service hands out; [`Hud`] turns those counts into a one-line summary and
//! [`dump_tree`] prints a headless tree as an outline.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

use weft_core::{EventBus, HeadlessNode, Model, ViewCreated, ViewNode};

pub struct Hud {
    pub enabled: bool,
    refreshes: Cell<u64>,
}

impl Default for Hud {
    fn default() -> Self {
        Self::new()
    }
}

impl Hud {
    pub fn new() -> Self {
        Self {
            enabled: true,
            refreshes: Cell::new(0),
        }
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// How many times [`Hud::line`] produced output.
    pub fn refreshes(&self) -> u64 {
        self.refreshes.get()
    }

    pub fn line(&self, metrics: &Metrics) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.refreshes.set(self.refreshes.get() + 1);
        let mut parts = vec![
            format!("views: {}", metrics.views_created),
            format!("diagnostics: {}", metrics.diagnostics),
        ];
        if !metrics.per_kind.is_empty() {
            let kinds: Vec<String> = metrics
                .per_kind
                .iter()
                .map(|(kind, n)| format!("{kind} {n}"))
                .collect();
            parts.push(kinds.join(", "));
        }
        Some(parts.join("  |  "))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metrics {
    pub views_created: usize,
    pub diagnostics: usize,
    /// Views per component kind, sorted by kind name. Views whose kind could
    /// not be determined are listed as `?`.
    pub per_kind: Vec<(String, usize)>,
}

/// Event bus that keeps statistics and optionally forwards to another bus.
pub struct Inspector<M: Model, V> {
    pub hud: Hud,
    counts: RefCell<HashMap<Option<M::Kind>, usize>>,
    diagnostics: Cell<usize>,
    next: Option<Rc<dyn EventBus<M, V>>>,
}

impl<M: Model, V> Default for Inspector<M, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model, V> Inspector<M, V> {
    pub fn new() -> Self {
        Self {
            hud: Hud::new(),
            counts: RefCell::new(HashMap::new()),
            diagnostics: Cell::new(0),
            next: None,
        }
    }

    pub fn forwarding_to(next: Rc<dyn EventBus<M, V>>) -> Self {
        Self {
            next: Some(next),
            ..Self::new()
        }
    }

    pub fn metrics(&self) -> Metrics {
        let counts = self.counts.borrow();
        let mut per_kind: Vec<(String, usize)> = counts
            .iter()
            .map(|(kind, n)| {
                let name = match kind {
                    Some(kind) => format!("{kind:?}"),
                    None => "?".to_string(),
                };
                (name, *n)
            })
            .collect();
        per_kind.sort();
        Metrics {
            views_created: counts.values().sum(),
            diagnostics: self.diagnostics.get(),
            per_kind,
        }
    }

    /// The HUD line for the current metrics, or `None` while the HUD is off.
    pub fn summary(&self) -> Option<String> {
        self.hud.line(&self.metrics())
    }

    pub fn reset(&self) {
        self.counts.borrow_mut().clear();
        self.diagnostics.set(0);
    }
}

impl<M: Model, V: ViewNode> EventBus<M, V> for Inspector<M, V> {
    fn publish(&self, event: ViewCreated<M, V>) {
        *self.counts.borrow_mut().entry(event.kind).or_default() += 1;
        if event.view.is_diagnostic() {
            self.diagnostics.set(self.diagnostics.get() + 1);
            log::debug!(target: "weft::devtools", "diagnostic view created for {:?}", event.kind);
        }
        if let Some(next) = &self.next {
            next.publish(event);
        }
    }
}

/// Indented outline of `root`, one node per line. Diagnostic placeholders
/// are marked with `!` and only their first line is shown.
pub fn dump_tree(root: &HeadlessNode) -> String {
    let mut out = String::new();
    dump_node(root, 0, &mut out);
    out
}

fn dump_node(node: &HeadlessNode, depth: usize, out: &mut String) {
    let label = node.label();
    let first = label.lines().next().unwrap_or_default();
    let marker = if node.is_diagnostic() { "!" } else { "-" };
    let _ = writeln!(out, "{:indent$}{marker} {first}", "", indent = depth * 2);
    for child in node.children() {
        dump_node(&child, depth + 1, out);
    }
}

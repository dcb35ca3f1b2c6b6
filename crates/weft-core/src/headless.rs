//! An in-memory view tree.
//!
//! `HeadlessNode` implements [`ViewNode`] without any rendering backend. It
//! backs the tests, the devtools outline and the demo, and is a reasonable
//! starting point for snapshotting what a binding produced.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::view::ViewNode;

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_id() -> u64 {
    NEXT_ID.with(|id| {
        let v = id.get();
        id.set(v + 1);
        v
    })
}

#[derive(Clone)]
pub struct HeadlessNode(Rc<NodeData>);

struct NodeData {
    id: u64,
    label: RefCell<String>,
    diagnostic: bool,
    children: RefCell<Vec<HeadlessNode>>,
}

impl HeadlessNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self::build(label.into(), false)
    }

    fn build(label: String, diagnostic: bool) -> Self {
        Self(Rc::new(NodeData {
            id: next_id(),
            label: RefCell::new(label),
            diagnostic,
            children: RefCell::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn label(&self) -> String {
        self.0.label.borrow().clone()
    }

    pub fn set_label(&self, label: impl Into<String>) {
        *self.0.label.borrow_mut() = label.into();
    }

    pub fn children(&self) -> Vec<HeadlessNode> {
        self.0.children.borrow().clone()
    }

    pub fn child(&self, index: usize) -> Option<HeadlessNode> {
        self.0.children.borrow().get(index).cloned()
    }

    pub fn child_labels(&self) -> Vec<String> {
        self.0.children.borrow().iter().map(|c| c.label()).collect()
    }

    /// Builder-style append.
    pub fn with_children(self, children: impl IntoIterator<Item = HeadlessNode>) -> Self {
        self.0.children.borrow_mut().extend(children);
        self
    }
}

impl ViewNode for HeadlessNode {
    fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    fn append(&self, child: Self) {
        self.0.children.borrow_mut().push(child);
    }

    fn insert_at(&self, index: usize, child: Self) {
        self.0.children.borrow_mut().insert(index, child);
    }

    fn remove_at(&self, index: usize) -> Option<Self> {
        let mut children = self.0.children.borrow_mut();
        (index < children.len()).then(|| children.remove(index))
    }

    fn remove(&self, child: &Self) -> bool {
        let mut children = self.0.children.borrow_mut();
        match children.iter().position(|c| c == child) {
            Some(i) => {
                children.remove(i);
                true
            }
            None => false,
        }
    }

    fn diagnostic(message: &str) -> Self {
        Self::build(message.to_string(), true)
    }

    fn is_diagnostic(&self) -> bool {
        self.0.diagnostic
    }
}

impl PartialEq for HeadlessNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for HeadlessNode {}

impl fmt::Debug for HeadlessNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let children = self.0.children.borrow();
        if children.is_empty() {
            write!(f, "{:?}", self.0.label.borrow())
        } else {
            f.debug_struct("Node")
                .field("label", &self.0.label.borrow())
                .field("children", &*children)
                .finish()
        }
    }
}

//! Headless host adapter.
//!
//! An in-memory node tree satisfying [`HostAdapter`], used by the test
//! suite. Besides the tree itself it records an operation log, which is
//! how tests assert move counts and notification-driven writes.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::host::HostAdapter;

/// One recorded host operation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum HostOp {
    Create { id: u64, tag: String },
    Insert { parent: u64, node: u64, anchor: Option<u64> },
    Remove { node: u64 },
    SetAttribute { node: u64, key: String, value: String },
    SetText { node: u64, value: String },
}

struct NodeInner {
    id: u64,
    tag: String,
    text: RefCell<String>,
    attributes: RefCell<BTreeMap<String, String>>,
    children: RefCell<Vec<HeadlessNode>>,
    parent: RefCell<Option<Weak<NodeInner>>>,
}

/// Handle to one node of the headless tree.
#[derive(Clone)]
pub struct HeadlessNode {
    inner: Rc<NodeInner>,
}

impl HeadlessNode {
    fn new(id: u64, tag: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                id,
                tag: tag.into(),
                text: RefCell::new(String::new()),
                attributes: RefCell::new(BTreeMap::new()),
                children: RefCell::new(Vec::new()),
                parent: RefCell::new(None),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    pub fn text(&self) -> String {
        self.inner.text.borrow().clone()
    }

    pub fn attribute(&self, key: &str) -> Option<String> {
        self.inner.attributes.borrow().get(key).cloned()
    }

    pub fn ptr_eq(&self, other: &HeadlessNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    pub fn child(&self, index: usize) -> Option<HeadlessNode> {
        self.inner.children.borrow().get(index).cloned()
    }

    pub fn children(&self) -> Vec<HeadlessNode> {
        self.inner.children.borrow().clone()
    }

    /// Tags of all children, anchors included (anchors use `#anchor`).
    pub fn child_tags(&self) -> Vec<String> {
        self.inner
            .children
            .borrow()
            .iter()
            .map(|child| child.tag().to_string())
            .collect()
    }

    /// Depth-first search for the first descendant with `tag`.
    pub fn find(&self, tag: &str) -> Option<HeadlessNode> {
        for child in self.children() {
            if child.tag() == tag {
                return Some(child);
            }
            if let Some(found) = child.find(tag) {
                return Some(found);
            }
        }
        None
    }

    /// Children that render something (elements and text, not anchors).
    pub fn visible_children(&self) -> Vec<HeadlessNode> {
        self.children()
            .into_iter()
            .filter(|child| child.tag() != ANCHOR_TAG)
            .collect()
    }

    fn detach(&self) {
        let parent = self.inner.parent.borrow_mut().take();
        if let Some(parent) = parent.and_then(|weak| weak.upgrade()) {
            parent
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(&child.inner, &self.inner));
        }
    }
}

impl fmt::Debug for HeadlessNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessNode")
            .field("id", &self.inner.id)
            .field("tag", &self.inner.tag)
            .field("children", &self.child_count())
            .finish()
    }
}

pub const ANCHOR_TAG: &str = "#anchor";
pub const TEXT_TAG: &str = "#text";
pub const ROOT_TAG: &str = "#root";

/// In-memory host platform for tests.
pub struct HeadlessAdapter {
    root: HeadlessNode,
    next_id: Cell<u64>,
    targets: RefCell<FxHashMap<String, HeadlessNode>>,
    ops: RefCell<Vec<HostOp>>,
}

impl HeadlessAdapter {
    pub fn new() -> Self {
        Self {
            root: HeadlessNode::new(0, ROOT_TAG),
            next_id: Cell::new(1),
            targets: RefCell::new(FxHashMap::default()),
            ops: RefCell::new(Vec::new()),
        }
    }

    /// Register a node under a name for `resolve_target` lookups.
    pub fn register_target(&self, name: impl Into<String>, node: HeadlessNode) {
        self.targets.borrow_mut().insert(name.into(), node);
    }

    /// The recorded operation log since the last [`Self::take_ops`].
    pub fn ops(&self) -> Vec<HostOp> {
        self.ops.borrow().clone()
    }

    /// Drain the operation log.
    pub fn take_ops(&self) -> Vec<HostOp> {
        self.ops.borrow_mut().drain(..).collect()
    }

    /// Count of insert operations in the current log. Reinsertion of an
    /// existing node is a move, so after a list update with no fresh
    /// items this equals the move count.
    pub fn insert_count(&self) -> usize {
        self.ops
            .borrow()
            .iter()
            .filter(|op| matches!(op, HostOp::Insert { .. }))
            .count()
    }

    fn allocate(&self, tag: &str) -> HeadlessNode {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.ops.borrow_mut().push(HostOp::Create {
            id,
            tag: tag.to_string(),
        });
        HeadlessNode::new(id, tag)
    }
}

impl Default for HeadlessAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HostAdapter for HeadlessAdapter {
    type Node = HeadlessNode;

    fn create_node(&self, tag: &str) -> HeadlessNode {
        self.allocate(tag)
    }

    fn create_text(&self, content: &str) -> HeadlessNode {
        let node = self.allocate(TEXT_TAG);
        *node.inner.text.borrow_mut() = content.to_string();
        node
    }

    fn create_anchor(&self) -> HeadlessNode {
        self.allocate(ANCHOR_TAG)
    }

    fn remove_node(&self, node: &HeadlessNode) {
        self.ops.borrow_mut().push(HostOp::Remove { node: node.id() });
        node.detach();
    }

    fn insert_before(&self, parent: &HeadlessNode, node: &HeadlessNode, anchor: Option<&HeadlessNode>) {
        node.detach();
        self.ops.borrow_mut().push(HostOp::Insert {
            parent: parent.id(),
            node: node.id(),
            anchor: anchor.map(HeadlessNode::id),
        });
        let mut children = parent.inner.children.borrow_mut();
        let position = match anchor {
            Some(anchor) => children
                .iter()
                .position(|child| Rc::ptr_eq(&child.inner, &anchor.inner))
                .unwrap_or(children.len()),
            None => children.len(),
        };
        children.insert(position, node.clone());
        *node.inner.parent.borrow_mut() = Some(Rc::downgrade(&parent.inner));
    }

    fn set_attribute(&self, node: &HeadlessNode, key: &str, value: &str) {
        self.ops.borrow_mut().push(HostOp::SetAttribute {
            node: node.id(),
            key: key.to_string(),
            value: value.to_string(),
        });
        node.inner
            .attributes
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn set_text(&self, node: &HeadlessNode, value: &str) {
        self.ops.borrow_mut().push(HostOp::SetText {
            node: node.id(),
            value: value.to_string(),
        });
        *node.inner.text.borrow_mut() = value.to_string();
    }

    fn resolve_target(&self, name: &str) -> Option<HeadlessNode> {
        self.targets.borrow().get(name).cloned()
    }

    fn root(&self) -> HeadlessNode {
        self.root.clone()
    }
}

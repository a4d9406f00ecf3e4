//! The reconciler: projects node descriptions onto a host-node tree.
//!
//! `mount` dispatches on the description's variant with an exhaustive
//! match; every mounted subtree owns a [`Scope`] whose finalizers
//! unsubscribe its listeners, cancel its tasks and detach its host
//! nodes, so unmounting is always `scope.close()`.
//!
//! Re-rendering a component is full teardown + rebuild: the old subtree's
//! finalizers run, then the thunk re-executes against the *same* slot
//! arena and the result mounts in the old position. There is no
//! structural diffing of re-rendered subtrees; that is the documented
//! contract, not an oversight. Keyed lists are the exception with
//! surviving state: retained items keep their mounted subtree and are
//! reordered with a minimal number of single-node moves.

mod component;
mod list;
mod portal;
mod swap;

use std::cell::RefCell;
use std::rc::Rc;

use weft_reactive::Scope;
use weft_scene::node::PropValue;
use weft_scene::{HostAdapter, Key, Node, TextContent};

use crate::error::MountError;

pub(crate) use list::ListEntry;

/// Mounts, re-renders and unmounts node descriptions on a host adapter.
pub struct Reconciler<H: HostAdapter> {
    adapter: Rc<H>,
}

impl<H: HostAdapter> Clone for Reconciler<H> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
        }
    }
}

/// Live bookkeeping for one mounted description.
///
/// Unmount by closing [`MountHandle::scope`]; finalizers detach the host
/// nodes and release every subscription and task the subtree owns.
pub struct MountHandle<H: HostAdapter> {
    pub(crate) scope: Scope,
    pub(crate) kind: MountedKind<H>,
}

pub(crate) enum MountedKind<H: HostAdapter> {
    /// Fixed host nodes (element, text, portal placement anchor).
    Static(Vec<H::Node>),
    /// A fragment's children.
    Group(Vec<MountHandle<H>>),
    /// A component: its content changes per render, the anchor does not.
    Slot {
        anchor: H::Node,
        current: Rc<RefCell<Option<MountHandle<H>>>>,
    },
    /// A swap binding: content follows the driving signal.
    Swap {
        anchor: H::Node,
        current: Rc<RefCell<Option<(Scope, MountHandle<H>)>>>,
    },
    /// A keyed list: entries in list order, then the tail anchor.
    List {
        anchor: H::Node,
        entries: Rc<RefCell<Vec<ListEntry<H>>>>,
    },
}

impl<H: HostAdapter> MountHandle<H> {
    /// The scope owning this subtree.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Unmount: run all finalizers (listeners, tasks, host detachment).
    pub fn unmount(&self) {
        self.scope.close();
    }

    /// Current top-level host nodes of this subtree, in tree order.
    pub fn host_nodes(&self) -> Vec<H::Node> {
        match &self.kind {
            MountedKind::Static(nodes) => nodes.clone(),
            MountedKind::Group(children) => children
                .iter()
                .flat_map(MountHandle::host_nodes)
                .collect(),
            MountedKind::Slot { anchor, current } => {
                let mut nodes = current
                    .borrow()
                    .as_ref()
                    .map(MountHandle::host_nodes)
                    .unwrap_or_default();
                nodes.push(anchor.clone());
                nodes
            }
            MountedKind::Swap { anchor, current } => {
                let mut nodes = current
                    .borrow()
                    .as_ref()
                    .map(|(_, handle)| handle.host_nodes())
                    .unwrap_or_default();
                nodes.push(anchor.clone());
                nodes
            }
            MountedKind::List { anchor, entries } => {
                let mut nodes: Vec<H::Node> = entries
                    .borrow()
                    .iter()
                    .flat_map(|entry| entry.handle.host_nodes())
                    .collect();
                nodes.push(anchor.clone());
                nodes
            }
        }
    }
}

impl<H: HostAdapter> Reconciler<H> {
    pub fn new(adapter: Rc<H>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &Rc<H> {
        &self.adapter
    }

    /// Mount a description under the adapter's global root.
    pub fn mount(&self, description: &Node<H>, scope: &Scope) -> Result<MountHandle<H>, MountError> {
        let root = self.adapter.root();
        self.mount_into(description, &root, scope)
    }

    /// Mount a description appended to `parent`.
    pub fn mount_into(
        &self,
        description: &Node<H>,
        parent: &H::Node,
        scope: &Scope,
    ) -> Result<MountHandle<H>, MountError> {
        self.mount_node(description, parent, None, scope)
    }

    /// Variant dispatch. Closed sum type: adding a variant fails to
    /// compile until it is handled here.
    pub(crate) fn mount_node(
        &self,
        description: &Node<H>,
        parent: &H::Node,
        anchor: Option<&H::Node>,
        parent_scope: &Scope,
    ) -> Result<MountHandle<H>, MountError> {
        match description {
            Node::Host {
                tag,
                props,
                children,
                key,
            } => self.mount_host(tag, props, children, key.as_ref(), parent, anchor, parent_scope),
            Node::Text(content) => Ok(self.mount_text(content, parent, anchor, parent_scope)),
            Node::Component { thunk, key: _ } => {
                self.mount_component(thunk.clone(), parent, anchor, parent_scope)
            }
            Node::Fragment(children) => self.mount_fragment(children, parent, anchor, parent_scope),
            Node::List(list) => self.mount_list(list, parent, anchor, parent_scope),
            Node::Portal {
                target,
                children,
                visible,
            } => self.mount_portal(target.as_ref(), children, visible.as_ref(), parent, anchor, parent_scope),
            Node::Swap { signal, on_swap } => {
                Ok(self.mount_swap(signal, on_swap.clone(), parent, anchor, parent_scope))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn mount_host(
        &self,
        tag: &str,
        props: &[(String, PropValue)],
        children: &[Node<H>],
        _key: Option<&Key>,
        parent: &H::Node,
        anchor: Option<&H::Node>,
        parent_scope: &Scope,
    ) -> Result<MountHandle<H>, MountError> {
        let scope = parent_scope.child();
        let node = self.adapter.create_node(tag);
        self.defer_removal(&scope, &node);

        for (name, value) in props {
            match value {
                PropValue::Static(value) => self.adapter.set_attribute(&node, name, value),
                PropValue::Reactive(signal) => {
                    self.adapter.set_attribute(&node, name, &signal.get());
                    let adapter = self.adapter.clone();
                    let node = node.clone();
                    let name = name.clone();
                    let subscription =
                        signal.subscribe(move |value| adapter.set_attribute(&node, &name, value));
                    scope.defer(move || subscription.unsubscribe());
                }
            }
        }

        self.adapter.insert_before(parent, &node, anchor);
        for child in children {
            if let Err(error) = self.mount_node(child, &node, None, &scope) {
                scope.close();
                return Err(error);
            }
        }
        Ok(MountHandle {
            scope,
            kind: MountedKind::Static(vec![node]),
        })
    }

    fn mount_text(
        &self,
        content: &TextContent,
        parent: &H::Node,
        anchor: Option<&H::Node>,
        parent_scope: &Scope,
    ) -> MountHandle<H> {
        let scope = parent_scope.child();
        let node = match content {
            TextContent::Static(text) => self.adapter.create_text(text),
            TextContent::Reactive(signal) => {
                let node = self.adapter.create_text(&signal.get());
                let adapter = self.adapter.clone();
                let text_node = node.clone();
                let subscription =
                    signal.subscribe(move |value| adapter.set_text(&text_node, value));
                scope.defer(move || subscription.unsubscribe());
                node
            }
        };
        self.defer_removal(&scope, &node);
        self.adapter.insert_before(parent, &node, anchor);
        MountHandle {
            scope,
            kind: MountedKind::Static(vec![node]),
        }
    }

    fn mount_fragment(
        &self,
        children: &[Node<H>],
        parent: &H::Node,
        anchor: Option<&H::Node>,
        parent_scope: &Scope,
    ) -> Result<MountHandle<H>, MountError> {
        let scope = parent_scope.child();
        let mut handles = Vec::with_capacity(children.len());
        for child in children {
            match self.mount_node(child, parent, anchor, &scope) {
                Ok(handle) => handles.push(handle),
                Err(error) => {
                    scope.close();
                    return Err(error);
                }
            }
        }
        Ok(MountHandle {
            scope,
            kind: MountedKind::Group(handles),
        })
    }

    /// Register detachment of `node` against `scope`.
    ///
    /// Registered before children mount so it runs after their cleanup
    /// (reverse-registration order).
    pub(crate) fn defer_removal(&self, scope: &Scope, node: &H::Node) {
        let adapter = self.adapter.clone();
        let node = node.clone();
        scope.defer(move || adapter.remove_node(&node));
    }

    /// Create an anchor marker at the mount position and tie its
    /// lifetime to `scope`.
    pub(crate) fn place_anchor(
        &self,
        parent: &H::Node,
        anchor: Option<&H::Node>,
        scope: &Scope,
    ) -> H::Node {
        let marker = self.adapter.create_anchor();
        self.defer_removal(scope, &marker);
        self.adapter.insert_before(parent, &marker, anchor);
        marker
    }
}

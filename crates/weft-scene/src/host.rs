//! Host adapter contract.
//!
//! The reconciler never touches a platform directly; it drives an adapter
//! through this trait. A real platform adapter (DOM, terminal, scene
//! graph) and the headless test adapter must satisfy it identically.

/// Operations the reconciler needs from a host platform.
///
/// `Node` handles are cheap clones of the same underlying host node;
/// reinserting an already-inserted node moves it (detach from the old
/// parent, attach at the new position).
pub trait HostAdapter: 'static {
    type Node: Clone + 'static;

    /// Create a detached element node.
    fn create_node(&self, tag: &str) -> Self::Node;

    /// Create a detached text node.
    fn create_text(&self, content: &str) -> Self::Node;

    /// Create a zero-footprint anchor marker (renders nothing).
    fn create_anchor(&self) -> Self::Node;

    /// Detach a node from its parent.
    fn remove_node(&self, node: &Self::Node);

    /// Insert `node` into `parent` before `anchor`; append when `anchor`
    /// is `None`. Moves the node if it is already inserted somewhere.
    fn insert_before(&self, parent: &Self::Node, node: &Self::Node, anchor: Option<&Self::Node>);

    /// Set one attribute on an element node.
    fn set_attribute(&self, node: &Self::Node, key: &str, value: &str);

    /// Replace the content of a text node.
    fn set_text(&self, node: &Self::Node, value: &str);

    /// Resolve a named portal target, if the platform knows it.
    fn resolve_target(&self, name: &str) -> Option<Self::Node>;

    /// The global root container. Portals without a target mount a
    /// dedicated container under it.
    fn root(&self) -> Self::Node;
}

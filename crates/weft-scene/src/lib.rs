//! Scene layer of the weft runtime: node descriptions and the host
//! adapter contract.
//!
//! The [`Node`] enum is the sole contract between the front-end layer
//! that produces descriptions and the reconciler that consumes them.
//! [`HostAdapter`] is the operation set the reconciler requires from a
//! platform; [`HeadlessAdapter`] is the in-memory implementation used by
//! tests.

pub mod headless;
pub mod host;
pub mod node;

pub use headless::{HeadlessAdapter, HeadlessNode, HostOp};
pub use host::HostAdapter;
pub use node::{
    BuildError, HostBuilder, Key, KeyedList, ListItem, Node, PortalTarget, PropValue, TextContent,
    Thunk, Visibility,
};

//! Fine-grained reactive UI runtime.
//!
//! Three layers:
//!
//! - [`weft_reactive`]: signals, scopes, render phases, supervised tasks.
//! - [`weft_scene`]: node descriptions and the [`HostAdapter`] seam.
//! - this crate: the [`Reconciler`] projecting descriptions onto a host
//!   tree, and [`Resources`] for keyed async data.
//!
//! ```ignore
//! use std::rc::Rc;
//! use weft::{HeadlessAdapter, Node, Reconciler, Scope, Signal};
//!
//! let adapter = Rc::new(HeadlessAdapter::new());
//! let reconciler = Reconciler::new(adapter.clone());
//! let scope = Scope::root();
//!
//! let app = Node::component(|ctx| {
//!     let count = ctx.slot(|| 0u32);
//!     let label = format!("count: {}", ctx.get(&count));
//!     Node::host("button").child(Node::text(label)).build()
//! });
//! let mounted = reconciler.mount(&app, &scope)?;
//! # let _ = mounted;
//! # Ok::<(), weft::MountError>(())
//! ```

mod error;
mod metrics;
mod reconciler;
mod resource;

pub use error::MountError;
pub use reconciler::{MountHandle, Reconciler};
pub use resource::{ResourceError, ResourceState, Resources, match_state};

pub use weft_reactive::{
    Accessed, Ctx, ListenerId, PhaseArena, Scope, Signal, TaskHandle, Unsubscriber, derive,
    derive_all, supervised,
};
pub use weft_scene::{
    BuildError, HeadlessAdapter, HeadlessNode, HostAdapter, HostBuilder, HostOp, Key, KeyedList,
    ListItem, Node, PortalTarget, PropValue, TextContent, Thunk, Visibility,
};

#[cfg(feature = "runtime-metrics")]
pub use metrics::dump_to_log;

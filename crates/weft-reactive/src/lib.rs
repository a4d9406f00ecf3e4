//! Reactive core of the weft runtime.
//!
//! Three pieces live here:
//!
//! - [`Signal`]: a reactive cell with get/set/update/subscribe and
//!   structural-equality change suppression.
//! - [`Scope`]: a hierarchical cleanup unit; everything else registers
//!   finalizers against one.
//! - [`PhaseArena`]/[`Ctx`]: the per-component-instance slot arena that
//!   gives signals created during a render positional identity across
//!   re-renders.
//!
//! The core runs on a single logical thread: all mutation and
//! notification happen on one control flow, with suspension points only
//! at background-task awaits ([`task`]).
//!
//! ```ignore
//! use weft_reactive::{Scope, Signal, derive};
//!
//! let scope = Scope::root();
//! let count = Signal::new(0);
//! let label = derive(&count, |n| format!("count: {n}"), &scope);
//!
//! count.set(1);
//! assert_eq!(label.get(), "count: 1");
//!
//! scope.close(); // label stops following count
//! ```

pub mod derived;
pub mod metrics;
pub mod phase;
pub mod scope;
pub mod signal;
pub mod task;

pub use derived::{derive, derive_all};
pub use phase::{Accessed, Ctx, PhaseArena};
pub use scope::Scope;
pub use signal::{ListenerId, Signal, Unsubscriber};
pub use task::{TaskHandle, supervised};

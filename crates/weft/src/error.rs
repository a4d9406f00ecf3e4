//! Mount-time errors.
//!
//! Only two failure classes are user-visible: unresolved portal targets
//! (this module) and resource computation failures (stored as state, see
//! `resource`). Everything else — listener panics, internal defects — is
//! isolated and logged so one failing callback cannot take down the tree.

use std::fmt;

/// Error returned by `Reconciler::mount`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum MountError {
    /// A portal's named target did not resolve. Recoverable: the caller
    /// decides whether to retry with another target or drop the subtree.
    PortalTargetNotFound(String),
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::PortalTargetNotFound(name) => {
                write!(f, "portal target `{name}` not found")
            }
        }
    }
}

impl std::error::Error for MountError {}

//! Common types shared across LeaseWarden crates.
//!
//! Home of the small cross-cutting pieces: the [`Retryable`] error
//! classification trait, the [`LeaderIdentity`] carried on every lease,
//! and structured logging setup in [`logging`].

use serde::{Deserialize, Serialize};

pub mod logging;

/// Classification for errors that are worth another attempt.
///
/// Implemented by error types whose failures split into transient
/// infrastructure trouble (timeouts, dropped connections, unhappy
/// gateways) and authoritative answers that retrying cannot change.
pub trait Retryable {
    /// True when the failure is transient and a retry may succeed.
    fn is_transient(&self) -> bool;
}

/// Identity of this candidate process as recorded on the lease.
///
/// `name` is the authoritative ownership field. `uid` is the hosting
/// pod's unique id; it distinguishes a restarted pod from a different
/// pod that happens to reuse the same name, and ties the lease to the
/// pod for server-side garbage collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderIdentity {
    pub name: String,
    pub uid: String,
}

impl LeaderIdentity {
    pub fn new(name: String, uid: String) -> Self {
        Self { name, uid }
    }

    /// Build the identity from the downward-API environment (`POD_NAME`
    /// and `POD_UID`). Returns `None` if either is missing, which is
    /// normal outside a cluster.
    pub fn from_env() -> Option<Self> {
        let name = std::env::var("POD_NAME").ok()?;
        let uid = std::env::var("POD_UID").ok()?;
        Some(Self { name, uid })
    }
}

impl std::fmt::Display for LeaderIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

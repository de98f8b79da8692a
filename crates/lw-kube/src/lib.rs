//! Kubernetes coordination API access for LeaseWarden
//!
//! The election core talks to exactly one remote thing: a named Lease
//! record. This crate provides that surface.
//!
//! # Features
//!
//! - **LeaseRepository**: the create/get/patch/delete contract, with
//!   atomic create-if-absent semantics
//! - **KubeLeaseClient**: the contract spoken over HTTPS to a real API
//!   server, with bearer token auth and a custom CA bundle
//! - **InMemoryLeaseRepository**: the contract in process memory, for
//!   tests and dev mode
//! - **RepositoryProvider**: per-call client hand-out, so hosts can
//!   rotate credentials without restarting the election
//!
//! # Example
//!
//! ```no_run
//! use lw_kube::{KubeClientConfig, KubeLeaseClient};
//!
//! # fn main() -> lw_kube::Result<()> {
//! let config = KubeClientConfig::in_cluster()?;
//! let client = KubeLeaseClient::new(config)?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod lease;
mod memory;
mod repository;

pub use client::{KubeClientConfig, KubeLeaseClient};
pub use error::{KubeApiError, Result};
pub use lease::{micro_time, Lease, LeasePatch, LeaseSpec, LeaseSpecPatch, ObjectMeta, OwnerReference};
pub use memory::InMemoryLeaseRepository;
pub use repository::{LeaseRepository, RepositoryProvider};

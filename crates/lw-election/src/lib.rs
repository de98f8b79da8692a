//! Lease-Based Leader Election
//!
//! Elects exactly one leader among a set of candidate processes by
//! competing for a single Kubernetes Lease record.
//!
//! # Features
//!
//! - **Atomic acquisition**: create-if-absent on the coordination API
//!   decides the winner; there is no voting protocol
//! - **Heartbeat renewal**: the leader patches `renewTime` every
//!   interval; a record two intervals old counts as abandoned
//! - **Stale lease reaping**: any candidate deletes an abandoned record
//!   to clear the way for the next round
//! - **Fail-fast leadership**: a leader that cannot renew, or whose
//!   record changed hands, gets a fatal error and is expected to exit
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lw_common::LeaderIdentity;
//! use lw_election::{ElectionConfig, LeaderElection};
//! use lw_kube::{InMemoryLeaseRepository, LeaseRepository};
//!
//! #[tokio::main]
//! async fn main() -> lw_election::Result<()> {
//!     let identity = LeaderIdentity::new("pod-a".to_string(), "uid-a".to_string());
//!     let config = ElectionConfig::new("scheduler".to_string(), "default".to_string(), identity)
//!         .with_interval(Duration::from_secs(15));
//!
//!     let repository: Arc<dyn LeaseRepository> = Arc::new(InMemoryLeaseRepository::new());
//!     let election = LeaderElection::new(config, repository);
//!
//!     election
//!         .become_leader_for_life(|| println!("promoted to leader"))
//!         .await
//! }
//! ```

pub mod claim;
pub mod error;
pub mod retry;

mod elector;

pub use claim::{assess, is_alive, is_owned_by, OwnershipStatus};
pub use elector::{ElectionConfig, ElectionHandle, ElectionPhase, LeaderElection};
pub use error::{ElectionError, Result};
pub use retry::RetryPolicy;

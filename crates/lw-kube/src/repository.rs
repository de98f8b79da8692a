//! The narrow storage contract the election core depends on

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::lease::{Lease, LeasePatch};

/// Create, read, renew and delete one named lease record.
///
/// `create` must be atomic: when the record already exists the call
/// fails with [`KubeApiError::Conflict`](crate::KubeApiError::Conflict)
/// and leaves the stored record untouched. That conflict is the entire
/// election mechanism.
#[async_trait]
pub trait LeaseRepository: Send + Sync {
    async fn create(&self, lease: &Lease) -> Result<Lease>;

    async fn get(&self, name: &str, namespace: &str) -> Result<Lease>;

    async fn patch(&self, name: &str, namespace: &str, patch: &LeasePatch) -> Result<Lease>;

    async fn delete(&self, name: &str, namespace: &str) -> Result<()>;
}

/// Hands out the repository to use for the next remote call.
///
/// Consulted immediately before every call, so a host that rotates
/// service account tokens can swap in a freshly built client at any
/// time. `Arc<dyn LeaseRepository>` implements it for the common
/// fixed-client case.
pub trait RepositoryProvider: Send + Sync {
    fn repository(&self) -> Arc<dyn LeaseRepository>;
}

impl RepositoryProvider for Arc<dyn LeaseRepository> {
    fn repository(&self) -> Arc<dyn LeaseRepository> {
        Arc::clone(self)
    }
}

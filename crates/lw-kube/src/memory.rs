//! In-memory lease repository for tests and dev mode

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::error::{KubeApiError, Result};
use crate::lease::{Lease, LeasePatch};
use crate::repository::LeaseRepository;

/// [`LeaseRepository`] over a process-local map. Same conflict and
/// not-found semantics as the API server, one record per namespace/name
/// pair.
#[derive(Default)]
pub struct InMemoryLeaseRepository {
    leases: Mutex<HashMap<String, Lease>>,
}

impl InMemoryLeaseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str, namespace: &str) -> String {
        format!("{}/{}", namespace, name)
    }

    /// Insert or replace a record unconditionally, bypassing the
    /// conflict check. Test seeding only.
    pub async fn put(&self, lease: Lease) {
        let key = Self::key(&lease.metadata.name, &lease.metadata.namespace);
        self.leases.lock().await.insert(key, lease);
    }

    /// Currently stored record, if any.
    pub async fn snapshot(&self, name: &str, namespace: &str) -> Option<Lease> {
        self.leases
            .lock()
            .await
            .get(&Self::key(name, namespace))
            .cloned()
    }
}

#[async_trait]
impl LeaseRepository for InMemoryLeaseRepository {
    async fn create(&self, lease: &Lease) -> Result<Lease> {
        let mut leases = self.leases.lock().await;
        let key = Self::key(&lease.metadata.name, &lease.metadata.namespace);
        if leases.contains_key(&key) {
            return Err(KubeApiError::Conflict);
        }
        leases.insert(key, lease.clone());
        Ok(lease.clone())
    }

    async fn get(&self, name: &str, namespace: &str) -> Result<Lease> {
        self.leases
            .lock()
            .await
            .get(&Self::key(name, namespace))
            .cloned()
            .ok_or(KubeApiError::NotFound)
    }

    async fn patch(&self, name: &str, namespace: &str, patch: &LeasePatch) -> Result<Lease> {
        let mut leases = self.leases.lock().await;
        match leases.get_mut(&Self::key(name, namespace)) {
            Some(lease) => {
                lease.spec.renew_time = Some(patch.spec.renew_time);
                Ok(lease.clone())
            }
            None => Err(KubeApiError::NotFound),
        }
    }

    async fn delete(&self, name: &str, namespace: &str) -> Result<()> {
        match self.leases.lock().await.remove(&Self::key(name, namespace)) {
            Some(_) => Ok(()),
            None => Err(KubeApiError::NotFound),
        }
    }
}

//! Lease-based Leader Election
//!
//! Implements leader election over a shared Kubernetes Lease record:
//! - Atomic create-if-absent as the ballot; a 409 conflict means lost
//! - Periodic renewTime patches as the leader's heartbeat
//! - Stale records deleted by any candidate to unblock the next round
//! - Fatal exit when a renewal shows the record changed hands

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

use lw_common::LeaderIdentity;
use lw_kube::{KubeApiError, Lease, LeasePatch, LeaseRepository, RepositoryProvider};

use crate::claim::{self, OwnershipStatus};
use crate::error::{ElectionError, Result};
use crate::retry::{default_backoffs, RetryPolicy};

/// Configuration for one election participant
#[derive(Debug, Clone)]
pub struct ElectionConfig {
    /// Name of the lease record all candidates compete for
    pub lease_name: String,

    /// Namespace the record lives in
    pub namespace: String,

    /// Identity this candidate writes into the record
    pub identity: LeaderIdentity,

    /// Pause between acquisition attempts and between heartbeats;
    /// twice this is the staleness threshold
    pub interval: Duration,

    /// Backoff schedule for transient API failures
    pub retry_backoffs: Vec<Duration>,

    /// Retries granted to a single renewal before the leader gives up
    pub renew_retry_budget: usize,
}

impl ElectionConfig {
    pub fn new(lease_name: String, namespace: String, identity: LeaderIdentity) -> Self {
        Self {
            lease_name,
            namespace,
            identity,
            interval: Duration::from_secs(30),
            retry_backoffs: default_backoffs(),
            renew_retry_budget: 2,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry_backoffs(mut self, backoffs: Vec<Duration>) -> Self {
        self.retry_backoffs = backoffs;
        self
    }

    pub fn with_renew_retry_budget(mut self, budget: usize) -> Self {
        self.renew_retry_budget = budget;
        self
    }
}

/// Where this participant is in its election lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionPhase {
    /// Competing for the lease, or waiting out a live leader
    Waiting,
    /// Holding the lease and renewing it
    Leading,
    /// The session ended with an error; the process should exit
    Failed,
}

/// Cloneable observer for an election's phase
#[derive(Clone)]
pub struct ElectionHandle {
    phase_rx: watch::Receiver<ElectionPhase>,
}

impl ElectionHandle {
    pub fn phase(&self) -> ElectionPhase {
        *self.phase_rx.borrow()
    }

    pub fn is_leading(&self) -> bool {
        self.phase() == ElectionPhase::Leading
    }

    /// Wait until the election is won. Fails if the session ends first.
    pub async fn wait_for_leadership(&mut self) -> Result<()> {
        loop {
            let phase = *self.phase_rx.borrow();
            match phase {
                ElectionPhase::Leading => return Ok(()),
                ElectionPhase::Failed => return Err(ElectionError::SessionEnded),
                ElectionPhase::Waiting => {
                    if self.phase_rx.changed().await.is_err() {
                        return Err(ElectionError::SessionEnded);
                    }
                }
            }
        }
    }
}

/// One candidate's participation in a named election
pub struct LeaderElection {
    config: ElectionConfig,
    provider: Box<dyn RepositoryProvider>,
    retry: RetryPolicy,
    renew_retry: RetryPolicy,
    phase_tx: watch::Sender<ElectionPhase>,
}

impl LeaderElection {
    /// Create an election against a fixed repository.
    pub fn new(config: ElectionConfig, repository: Arc<dyn LeaseRepository>) -> Self {
        Self::with_provider(config, Box::new(repository))
    }

    /// Create an election that asks `provider` for a repository before
    /// every call, for hosts that rotate credentials.
    pub fn with_provider(config: ElectionConfig, provider: Box<dyn RepositoryProvider>) -> Self {
        let retry = RetryPolicy::new(config.retry_backoffs.clone());
        let renew_retry = RetryPolicy::new(config.retry_backoffs.clone())
            .with_max_retries(config.renew_retry_budget);
        let (phase_tx, _) = watch::channel(ElectionPhase::Waiting);

        Self {
            config,
            provider,
            retry,
            renew_retry,
            phase_tx,
        }
    }

    /// Phase observer for other tasks.
    pub fn handle(&self) -> ElectionHandle {
        ElectionHandle {
            phase_rx: self.phase_tx.subscribe(),
        }
    }

    pub fn identity(&self) -> &LeaderIdentity {
        &self.config.identity
    }

    /// Compete until this candidate wins, call `on_promoted` once, then
    /// renew the lease forever. Returns only on a fatal error; the
    /// process is expected to exit so a replacement can take over.
    pub async fn become_leader_for_life<F>(self, on_promoted: F) -> Result<()>
    where
        F: FnOnce() + Send,
    {
        let result = self.run(on_promoted).await;
        if let Err(err) = &result {
            error!(
                lease = %self.config.lease_name,
                identity = %self.config.identity,
                error = %err,
                "Election session ended"
            );
            self.phase_tx.send_replace(ElectionPhase::Failed);
        }
        result
    }

    async fn run<F>(&self, on_promoted: F) -> Result<()>
    where
        F: FnOnce() + Send,
    {
        info!(
            lease = %self.config.lease_name,
            namespace = %self.config.namespace,
            identity = %self.config.identity,
            "Trying to become leader; if every candidate keeps logging this, delete the lease"
        );

        while !self.try_acquire().await? {
            tokio::time::sleep(self.config.interval).await;
        }

        self.phase_tx.send_replace(ElectionPhase::Leading);
        on_promoted();

        loop {
            // monitored externally to be exactly one across all candidates
            metrics::counter!("election.leader_running_total").increment(1);
            tokio::time::sleep(self.config.interval).await;
            self.signal_alive().await?;
        }
    }

    /// One acquisition round. True means this candidate holds the lease.
    async fn try_acquire(&self) -> Result<bool> {
        let claim_lease = Lease::new_claim(
            &self.config.lease_name,
            &self.config.namespace,
            &self.config.identity,
            Utc::now(),
            self.config.interval,
        );

        let claim_ref = &claim_lease;
        let created = self
            .retry
            .run_unless("create lease", KubeApiError::is_conflict, move || {
                let repo = self.provider.repository();
                async move { repo.create(claim_ref).await }
            })
            .await;

        match created {
            Ok(_) => {
                info!(
                    lease = %self.config.lease_name,
                    identity = %self.config.identity,
                    "Became leader"
                );
                Ok(true)
            }
            Err(err) if err.is_conflict() => self.examine_holder().await,
            Err(err) => Err(err.into()),
        }
    }

    /// The create conflicted, so somebody holds the record. Decide
    /// whether that somebody is us, a live leader, or a corpse.
    async fn examine_holder(&self) -> Result<bool> {
        let name = self.config.lease_name.as_str();
        let namespace = self.config.namespace.as_str();

        let existing = self
            .retry
            .run("fetch lease", move || {
                let repo = self.provider.repository();
                async move {
                    match repo.get(name, namespace).await {
                        Err(KubeApiError::NotFound) => Ok(None),
                        other => other.map(Some),
                    }
                }
            })
            .await?;

        let lease = match existing {
            Some(lease) => lease,
            None => {
                info!(lease = %name, "Stale lease was deleted by another candidate");
                return Ok(false);
            }
        };

        match claim::assess(&lease, &self.config.identity, Utc::now(), self.config.interval) {
            OwnershipStatus::OwnedBySelf => {
                info!(lease = %name, identity = %self.config.identity, "Still leader");
                Ok(true)
            }
            OwnershipStatus::Abandoned => {
                info!(
                    lease = %name,
                    holder = lease.holder().unwrap_or("unknown"),
                    "Deleting stale lease"
                );
                self.delete_abandoned().await?;
                metrics::counter!("election.stale_leases.deleted_total").increment(1);
                // do not claim here; the next round's create decides who takes over
                Ok(false)
            }
            OwnershipStatus::HeldByOther => {
                // not logging to avoid repetitive noise
                Ok(false)
            }
        }
    }

    /// Remove a record nobody is renewing. Known race: the record can
    /// change hands between the staleness check and this delete, in
    /// which case a fresh claim gets removed. The next round's create
    /// settles ownership either way, at the cost of one extra election.
    async fn delete_abandoned(&self) -> Result<()> {
        let name = self.config.lease_name.as_str();
        let namespace = self.config.namespace.as_str();

        self.retry
            .run("delete lease", move || {
                let repo = self.provider.repository();
                async move {
                    match repo.delete(name, namespace).await {
                        // another candidate reaped it first
                        Err(KubeApiError::NotFound) => Ok(()),
                        other => other,
                    }
                }
            })
            .await?;
        Ok(())
    }

    /// Renew the lease and confirm it still names this candidate. Shows
    /// we are alive, or fails because the API is unreachable or the
    /// record changed hands. Both are fatal for the current session.
    async fn signal_alive(&self) -> Result<()> {
        let name = self.config.lease_name.as_str();
        let namespace = self.config.namespace.as_str();

        let lease = self
            .renew_retry
            .run("renew lease", move || {
                let repo = self.provider.repository();
                let patch = LeasePatch::renew(Utc::now());
                async move { repo.patch(name, namespace, &patch).await }
            })
            .await?;

        if !claim::is_owned_by(&lease, &self.config.identity) {
            let holder = lease.holder().unwrap_or("unknown").to_string();
            return Err(ElectionError::LostLeadership { holder });
        }

        debug!(lease = %name, "Renewed lease");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_identity() -> LeaderIdentity {
        LeaderIdentity::new("pod-a".to_string(), "uid-a".to_string())
    }

    #[test]
    fn test_config_defaults() {
        let config =
            ElectionConfig::new("jobs".to_string(), "default".to_string(), test_identity());

        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.retry_backoffs.len(), 5);
        assert_eq!(config.renew_retry_budget, 2);
    }

    #[test]
    fn test_config_builder() {
        let config =
            ElectionConfig::new("jobs".to_string(), "default".to_string(), test_identity())
                .with_interval(Duration::from_secs(5))
                .with_retry_backoffs(vec![Duration::from_millis(10)])
                .with_renew_retry_budget(4);

        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.retry_backoffs.len(), 1);
        assert_eq!(config.renew_retry_budget, 4);
    }

    #[test]
    fn test_handle_starts_waiting() {
        let config =
            ElectionConfig::new("jobs".to_string(), "default".to_string(), test_identity());
        let repository: Arc<dyn LeaseRepository> = Arc::new(lw_kube::InMemoryLeaseRepository::new());
        let election = LeaderElection::new(config, repository);

        let handle = election.handle();
        assert_eq!(handle.phase(), ElectionPhase::Waiting);
        assert!(!handle.is_leading());
    }
}

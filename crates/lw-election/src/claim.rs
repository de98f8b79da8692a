//! Ownership and liveness assessment of a fetched lease record

use chrono::{DateTime, Utc};
use std::time::Duration;

use lw_common::LeaderIdentity;
use lw_kube::Lease;

/// What an existing lease record means for this candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipStatus {
    /// The record already names this candidate. Happens after a restart;
    /// leadership resumes without touching the record.
    OwnedBySelf,
    /// Another candidate holds the record and is renewing on time.
    HeldByOther,
    /// Another candidate holds the record but stopped renewing. Carries
    /// no valid claim and may be deleted by anyone.
    Abandoned,
}

/// A lease is alive while its renew time is strictly newer than two
/// intervals ago. A record that was never renewed is not alive.
pub fn is_alive(lease: &Lease, now: DateTime<Utc>, interval: Duration) -> bool {
    let renewed_at = match lease.renew_time() {
        Some(renewed_at) => renewed_at,
        None => return false,
    };
    let threshold = chrono::Duration::milliseconds(
        i64::try_from(interval.as_millis())
            .unwrap_or(i64::MAX)
            .saturating_mul(2),
    );
    renewed_at > now - threshold
}

pub fn is_owned_by(lease: &Lease, identity: &LeaderIdentity) -> bool {
    lease.holder() == Some(identity.name.as_str())
}

/// Classify a record this candidate failed to create. Self-ownership is
/// checked before liveness so a restarted leader resumes its own stale
/// lease instead of deleting it.
pub fn assess(
    lease: &Lease,
    identity: &LeaderIdentity,
    now: DateTime<Utc>,
    interval: Duration,
) -> OwnershipStatus {
    if is_owned_by(lease, identity) {
        OwnershipStatus::OwnedBySelf
    } else if !is_alive(lease, now, interval) {
        OwnershipStatus::Abandoned
    } else {
        OwnershipStatus::HeldByOther
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const INTERVAL: Duration = Duration::from_secs(30);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn lease_renewed_at(holder: &str, renewed_at: DateTime<Utc>) -> Lease {
        let identity = LeaderIdentity::new(holder.to_string(), format!("{}-uid", holder));
        let mut lease = Lease::new_claim("jobs", "default", &identity, renewed_at, INTERVAL);
        lease.spec.renew_time = Some(renewed_at);
        lease
    }

    #[test]
    fn test_fresh_renewal_is_alive() {
        let lease = lease_renewed_at("pod-b", now() - chrono::Duration::seconds(10));
        assert!(is_alive(&lease, now(), INTERVAL));
    }

    #[test]
    fn test_renewal_exactly_two_intervals_old_is_not_alive() {
        let lease = lease_renewed_at("pod-b", now() - chrono::Duration::seconds(60));
        assert!(!is_alive(&lease, now(), INTERVAL));
    }

    #[test]
    fn test_renewal_just_inside_threshold_is_alive() {
        let renewed_at = now() - chrono::Duration::seconds(60) + chrono::Duration::milliseconds(1);
        let lease = lease_renewed_at("pod-b", renewed_at);
        assert!(is_alive(&lease, now(), INTERVAL));
    }

    #[test]
    fn test_never_renewed_is_not_alive() {
        let mut lease = lease_renewed_at("pod-b", now());
        lease.spec.renew_time = None;
        assert!(!is_alive(&lease, now(), INTERVAL));
    }

    #[test]
    fn test_own_lease_wins_even_when_stale() {
        let me = LeaderIdentity::new("pod-a".to_string(), "uid-a".to_string());
        let lease = lease_renewed_at("pod-a", now() - chrono::Duration::seconds(90));

        assert_eq!(
            assess(&lease, &me, now(), INTERVAL),
            OwnershipStatus::OwnedBySelf
        );
    }

    #[test]
    fn test_live_foreign_lease_is_held_by_other() {
        let me = LeaderIdentity::new("pod-a".to_string(), "uid-a".to_string());
        let lease = lease_renewed_at("pod-b", now() - chrono::Duration::seconds(10));

        assert_eq!(
            assess(&lease, &me, now(), INTERVAL),
            OwnershipStatus::HeldByOther
        );
    }

    #[test]
    fn test_stale_foreign_lease_is_abandoned() {
        // 90 seconds without renewal at a 30 second interval
        let me = LeaderIdentity::new("pod-a".to_string(), "uid-a".to_string());
        let lease = lease_renewed_at("pod-b", now() - chrono::Duration::seconds(90));

        assert_eq!(
            assess(&lease, &me, now(), INTERVAL),
            OwnershipStatus::Abandoned
        );
    }
}

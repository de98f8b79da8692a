//! The coordination API Lease record and its wire format

use chrono::{DateTime, Utc};
use lw_common::LeaderIdentity;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serde adapter for the API's MicroTime fields: UTC with exactly six
/// fractional digits and a literal `Z` suffix. Reads accept any RFC 3339
/// timestamp, writes always emit the canonical form.
pub mod micro_time {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.format(FORMAT).to_string()
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{self, Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match dt {
                Some(dt) => serializer.serialize_some(&super::format(dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(s) => super::parse(&s).map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

/// Pointer from the lease back to the pod that claimed it, so the record
/// is garbage collected when the pod goes away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    /// Write version assigned by the API server. Unused today, but a
    /// precondition on it is the extension point for guarded deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseSpec {
    #[serde(
        default,
        with = "micro_time::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub acquire_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "micro_time::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub renew_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_duration_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_transitions: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub metadata: ObjectMeta,
    pub spec: LeaseSpec,
}

impl Lease {
    /// Build the record a candidate submits to claim leadership. Acquire
    /// and renew time both start at `now`; the advertised duration is
    /// twice the heartbeat interval, matching the staleness threshold.
    pub fn new_claim(
        name: &str,
        namespace: &str,
        identity: &LeaderIdentity,
        now: DateTime<Utc>,
        interval: Duration,
    ) -> Self {
        let duration_seconds =
            i32::try_from(interval.as_secs().saturating_mul(2).max(1)).unwrap_or(i32::MAX);
        Lease {
            api_version: Some("coordination.k8s.io/v1".to_string()),
            kind: Some("Lease".to_string()),
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: namespace.to_string(),
                owner_references: vec![OwnerReference {
                    api_version: "v1".to_string(),
                    kind: "Pod".to_string(),
                    name: identity.name.clone(),
                    uid: identity.uid.clone(),
                }],
                resource_version: None,
            },
            spec: LeaseSpec {
                acquire_time: Some(now),
                renew_time: Some(now),
                holder_identity: Some(identity.name.clone()),
                lease_duration_seconds: Some(duration_seconds),
                lease_transitions: Some(0),
            },
        }
    }

    /// Name recorded in the first owner reference, if any.
    pub fn holder(&self) -> Option<&str> {
        self.metadata
            .owner_references
            .first()
            .map(|owner| owner.name.as_str())
    }

    pub fn renew_time(&self) -> Option<DateTime<Utc>> {
        self.spec.renew_time
    }
}

/// Strategic merge patch body for a heartbeat. Only `renewTime` moves;
/// everything else on the record stays as written at claim time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeasePatch {
    pub spec: LeaseSpecPatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseSpecPatch {
    #[serde(with = "micro_time")]
    pub renew_time: DateTime<Utc>,
}

impl LeasePatch {
    pub fn renew(now: DateTime<Utc>) -> Self {
        LeasePatch {
            spec: LeaseSpecPatch { renew_time: now },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn identity() -> LeaderIdentity {
        LeaderIdentity::new("pod-a".to_string(), "uid-a".to_string())
    }

    #[test]
    fn test_micro_time_emits_six_fractional_digits() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(micro_time::format(&dt), "2024-03-01T12:30:05.000000Z");

        let dt = dt + chrono::Duration::microseconds(123456);
        assert_eq!(micro_time::format(&dt), "2024-03-01T12:30:05.123456Z");
    }

    #[test]
    fn test_micro_time_parses_offsets_and_precisions() {
        let parsed = micro_time::parse("2024-03-01T12:30:05.123456Z").unwrap();
        assert_eq!(micro_time::format(&parsed), "2024-03-01T12:30:05.123456Z");

        let parsed = micro_time::parse("2024-03-01T13:30:05+01:00").unwrap();
        assert_eq!(micro_time::format(&parsed), "2024-03-01T12:30:05.000000Z");
    }

    #[test]
    fn test_new_claim_advertises_double_interval() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let lease = Lease::new_claim("jobs", "prod", &identity(), now, Duration::from_secs(30));

        assert_eq!(lease.spec.lease_duration_seconds, Some(60));
        assert_eq!(lease.spec.lease_transitions, Some(0));
        assert_eq!(lease.spec.acquire_time, Some(now));
        assert_eq!(lease.spec.renew_time, Some(now));
        assert_eq!(lease.holder(), Some("pod-a"));
    }

    #[test]
    fn test_new_claim_duration_never_rounds_to_zero() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let lease = Lease::new_claim("jobs", "prod", &identity(), now, Duration::from_millis(400));
        assert_eq!(lease.spec.lease_duration_seconds, Some(1));
    }

    #[test]
    fn test_lease_wire_format_is_camel_case() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let lease = Lease::new_claim("jobs", "prod", &identity(), now, Duration::from_secs(30));
        let json = serde_json::to_value(&lease).unwrap();

        assert_eq!(json["apiVersion"], "coordination.k8s.io/v1");
        assert_eq!(json["metadata"]["ownerReferences"][0]["name"], "pod-a");
        assert_eq!(json["spec"]["holderIdentity"], "pod-a");
        assert_eq!(json["spec"]["leaseDurationSeconds"], 60);
        assert_eq!(json["spec"]["renewTime"], "2024-03-01T12:00:00.000000Z");
    }

    #[test]
    fn test_lease_parses_with_missing_spec_fields() {
        let json = r#"{
            "metadata": {"name": "jobs", "namespace": "prod"},
            "spec": {"holderIdentity": "pod-b"}
        }"#;
        let lease: Lease = serde_json::from_str(json).unwrap();
        assert_eq!(lease.renew_time(), None);
        assert_eq!(lease.holder(), None);
        assert_eq!(lease.spec.holder_identity.as_deref(), Some("pod-b"));
    }

    #[test]
    fn test_renew_patch_contains_only_renew_time() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 30).unwrap();
        let json = serde_json::to_value(LeasePatch::renew(now)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"spec": {"renewTime": "2024-03-01T12:00:30.000000Z"}})
        );
    }
}

//! Core credential types.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Value, json};

use crate::store::{StoreMap, keys, store_map};

use super::CredentialError;

/// A complete token pair as written after a grant or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub access_token: String,
    pub refresh_token: String,
    /// Time of the last successful refresh or initial grant.
    pub issued_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            issued_at,
        }
    }

    /// All three fields as one store update.
    pub fn to_store_map(&self) -> StoreMap {
        store_map([
            (keys::ACCESS_TOKEN, json!(self.access_token)),
            (keys::REFRESH_TOKEN, json!(self.refresh_token)),
            (keys::TIME_STAMP, json!(self.issued_at.timestamp_millis())),
        ])
    }
}

/// Credential fields as found in the store.
///
/// Any field may be missing: a record can be partially written by an older
/// extension build, and an expired record only needs its refresh token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
}

impl StoredCredentials {
    pub fn from_store_map(map: &StoreMap) -> Result<Self, CredentialError> {
        let string_field = |key: &str| -> Result<Option<String>, CredentialError> {
            match map.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) if s.is_empty() => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(other) => Err(CredentialError::InvalidRecord(format!(
                    "{key} is not a string: {other}"
                ))),
            }
        };

        let issued_at = match map.get(keys::TIME_STAMP) {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_epoch_millis(value).ok_or_else(|| {
                CredentialError::InvalidRecord(format!("timeStamp is not epoch millis: {value}"))
            })?),
        };

        Ok(Self {
            access_token: string_field(keys::ACCESS_TOKEN)?,
            refresh_token: string_field(keys::REFRESH_TOKEN)?,
            issued_at,
        })
    }

    /// Classify the record against `now` and the refresh threshold.
    pub fn freshness(&self, now: DateTime<Utc>, refresh_after: TimeDelta) -> Freshness {
        match self.issued_at {
            None => Freshness::Missing,
            Some(issued_at) => {
                let elapsed = now - issued_at;
                if elapsed > refresh_after {
                    Freshness::Expired { elapsed }
                } else {
                    Freshness::Fresh { elapsed }
                }
            }
        }
    }
}

/// Epoch milliseconds, integral or not (`Date.now()` is integral, but a
/// hand-edited store may hold a float).
fn parse_epoch_millis(value: &Value) -> Option<DateTime<Utc>> {
    let millis = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))?;
    DateTime::from_timestamp_millis(millis)
}

/// Result of the freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Issued within the threshold; use the stored access token.
    Fresh { elapsed: TimeDelta },
    /// Older than the threshold; refresh before use.
    Expired { elapsed: TimeDelta },
    /// No issue time recorded, so nothing was ever authorized.
    Missing,
}

impl Freshness {
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }

    /// Elapsed seconds as reported in logs.
    pub fn elapsed_secs(&self) -> Option<f64> {
        match self {
            Self::Fresh { elapsed } | Self::Expired { elapsed } => {
                Some(elapsed.num_milliseconds() as f64 / 1000.0)
            }
            Self::Missing => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD_SECS: i64 = 3000;

    fn threshold() -> TimeDelta {
        TimeDelta::seconds(THRESHOLD_SECS)
    }

    fn stored_at(offset_ms: i64) -> (StoredCredentials, DateTime<Utc>) {
        // Millisecond precision, as stored.
        let now = DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap();
        let map = store_map([
            (keys::ACCESS_TOKEN, json!("A1")),
            (keys::REFRESH_TOKEN, json!("R1")),
            (
                keys::TIME_STAMP,
                json!(now.timestamp_millis() - offset_ms),
            ),
        ]);
        (StoredCredentials::from_store_map(&map).unwrap(), now)
    }

    #[test]
    fn test_ten_seconds_old_is_fresh() {
        let (stored, now) = stored_at(10_000);
        let freshness = stored.freshness(now, threshold());
        assert!(matches!(freshness, Freshness::Fresh { .. }));
        assert_eq!(freshness.elapsed_secs(), Some(10.0));
    }

    #[test]
    fn test_threshold_boundary_is_fresh() {
        let (stored, now) = stored_at(3_000_000);
        assert!(!stored.freshness(now, threshold()).is_expired());

        let (stored, now) = stored_at(3_000_001);
        assert!(stored.freshness(now, threshold()).is_expired());
    }

    #[test]
    fn test_3100_seconds_old_is_expired() {
        let (stored, now) = stored_at(3_100_000);
        assert!(stored.freshness(now, threshold()).is_expired());
    }

    #[test]
    fn test_missing_timestamp() {
        let stored = StoredCredentials::from_store_map(&StoreMap::new()).unwrap();
        assert_eq!(stored, StoredCredentials::default());
        assert_eq!(stored.freshness(Utc::now(), threshold()), Freshness::Missing);
    }

    #[test]
    fn test_float_timestamp_and_empty_token() {
        let map = store_map([
            (keys::TIME_STAMP, json!(1_700_000_000_000.0f64)),
            (keys::ACCESS_TOKEN, json!("")),
        ]);
        let stored = StoredCredentials::from_store_map(&map).unwrap();
        assert_eq!(
            stored.issued_at.map(|t| t.timestamp_millis()),
            Some(1_700_000_000_000)
        );
        assert_eq!(stored.access_token, None);
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        let map = store_map([(keys::REFRESH_TOKEN, json!(42))]);
        let err = StoredCredentials::from_store_map(&map).unwrap_err();
        assert!(matches!(err, CredentialError::InvalidRecord(_)));
    }

    #[test]
    fn test_record_to_store_map() {
        let issued_at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let map = CredentialRecord::new("A2", "R2", issued_at).to_store_map();
        assert_eq!(map[keys::ACCESS_TOKEN], json!("A2"));
        assert_eq!(map[keys::REFRESH_TOKEN], json!("R2"));
        assert_eq!(map[keys::TIME_STAMP], json!(1_700_000_000_123i64));
    }
}

//! Persisted wizard progress and its on-disk record format

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::StorageError;
use super::step::Completion;
use crate::api::Organization;

/// Version written by this build
pub const CURRENT_VERSION: u32 = 1;

/// The durable part of the wizard state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardProgress {
    #[serde(default)]
    pub event_id: Option<i64>,
    #[serde(default)]
    pub organization: Option<Organization>,
    #[serde(default)]
    pub completion: Completion,
}

impl WizardProgress {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedProgress {
    version: u32,
    #[serde(flatten)]
    progress: WizardProgress,
}

fn malformed(msg: &str) -> StorageError {
    StorageError::Malformed(<serde_json::Error as serde::de::Error>::custom(msg))
}

/// Serialize progress into a versioned record
pub fn encode(progress: &WizardProgress) -> Result<String, StorageError> {
    let record = PersistedProgress {
        version: CURRENT_VERSION,
        progress: progress.clone(),
    };
    Ok(serde_json::to_string_pretty(&record)?)
}

/// Parse a record of any known version into current progress
pub fn decode(text: &str) -> Result<WizardProgress, StorageError> {
    let value: Value = serde_json::from_str(text)?;

    let version = match value.get("version") {
        None | Some(Value::Null) => 0,
        Some(v) => v
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| malformed("version must be a non-negative integer"))?,
    };

    match version {
        0 => migrate_unversioned(value),
        CURRENT_VERSION => Ok(serde_json::from_value::<PersistedProgress>(value)?.progress),
        found => Err(StorageError::UnsupportedVersion {
            found,
            supported: CURRENT_VERSION,
        }),
    }
}

/// Records written before versioning held whichever fields had been set,
/// with `null` for cleared ones.
fn migrate_unversioned(value: Value) -> Result<WizardProgress, StorageError> {
    let fields = match value {
        Value::Null => return Ok(WizardProgress::default()),
        Value::Object(mut map) => {
            map.retain(|_, v| !v.is_null());
            map
        }
        _ => return Err(malformed("progress record must be a JSON object")),
    };
    Ok(serde_json::from_value(Value::Object(fields))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::step::StepKey;

    fn sample() -> WizardProgress {
        WizardProgress {
            event_id: Some(42),
            organization: Some(Organization {
                id: 1,
                name: "Acme".to_string(),
            }),
            completion: Completion::after_creation(),
        }
    }

    #[test]
    fn test_encode_writes_version() {
        let text = encode(&sample()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["eventId"], 42);
        assert_eq!(value["completion"]["placeType"], true);
        assert_eq!(decode(&text).unwrap(), sample());
    }

    #[test]
    fn test_decode_unversioned_partial_record() {
        let progress =
            decode(r#"{"eventId": 5, "completion": {"placeType": true, "category": true}}"#)
                .unwrap();
        assert_eq!(progress.event_id, Some(5));
        assert_eq!(progress.organization, None);
        assert!(progress.completion.get(StepKey::Category));
        assert!(!progress.completion.get(StepKey::TicketSetting));
    }

    #[test]
    fn test_decode_unversioned_with_nulls() {
        let progress =
            decode(r#"{"eventId": null, "organization": null, "completion": null}"#).unwrap();
        assert!(progress.is_empty());
    }

    #[test]
    fn test_decode_null_root() {
        assert!(decode("null").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_future_version() {
        let err = decode(r#"{"version": 7}"#).unwrap_err();
        assert!(matches!(
            err,
            StorageError::UnsupportedVersion {
                found: 7,
                supported: 1
            }
        ));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(matches!(
            decode("[1, 2]").unwrap_err(),
            StorageError::Malformed(_)
        ));
        assert!(matches!(
            decode(r#"{"version": "one"}"#).unwrap_err(),
            StorageError::Malformed(_)
        ));
    }
}

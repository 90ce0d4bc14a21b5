use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::HarborError;

/// The discriminated result every workflow returns at its boundary.
///
/// Serialises to `{"success": true, ...fields}` on success and to
/// `{"success": false, "error": "...", "kind": "..."}` on failure, so chat
/// handlers can render `error` verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome<T> {
    Success(T),
    Failure(HarborError),
}

impl<T> WorkflowOutcome<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The failure message, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::Failure(e) => Some(e.to_string()),
        }
    }

    pub fn into_result(self) -> Result<T, HarborError> {
        match self {
            Self::Success(v) => Ok(v),
            Self::Failure(e) => Err(e),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WorkflowOutcome<U> {
        match self {
            Self::Success(v) => WorkflowOutcome::Success(f(v)),
            Self::Failure(e) => WorkflowOutcome::Failure(e),
        }
    }
}

impl<T> From<Result<T, HarborError>> for WorkflowOutcome<T> {
    fn from(result: Result<T, HarborError>) -> Self {
        match result {
            Ok(v) => Self::Success(v),
            Err(e) => Self::Failure(e),
        }
    }
}

impl<T: Serialize> Serialize for WorkflowOutcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success(value) => {
                #[derive(serde::Serialize)]
                struct Flat<'a, T> {
                    success: bool,
                    #[serde(flatten)]
                    value: &'a T,
                }
                Flat {
                    success: true,
                    value,
                }
                .serialize(serializer)
            }
            Self::Failure(err) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", &err.to_string())?;
                map.serialize_entry("kind", &err.kind())?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    struct Receipt {
        blob_id: String,
    }

    #[test]
    fn success_is_flattened() {
        let outcome = WorkflowOutcome::Success(Receipt {
            blob_id: "abc".into(),
        });
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"success": true, "blob_id": "abc"})
        );
    }

    #[test]
    fn failure_carries_message_and_kind() {
        let outcome: WorkflowOutcome<Receipt> =
            Err(HarborError::Storage("publisher unreachable".into())).into();
        assert!(!outcome.is_success());
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "success": false,
                "error": "StorageError: publisher unreachable",
                "kind": "StorageError"
            })
        );
    }

    #[test]
    fn into_result_round_trips() {
        let outcome: WorkflowOutcome<u8> = Ok(7).into();
        assert_eq!(outcome.into_result().unwrap(), 7);
    }
}

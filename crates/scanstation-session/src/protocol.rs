//! # Relocation Wire Format
//!
//! JSON shapes exchanged with the relocation backend and the location
//! source. Transport is the host's business; this module only maps bytes to
//! core types.
//!
//! ## Exchange Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Relocation Exchange                                 │
//! │                                                                         │
//! │  LOCATIONS                                                             │
//! │  ─────────                                                             │
//! │  page ◄─── [ { id, name, sublocations: [ { id, name } ] } ]            │
//! │            entries without id or name are skipped                      │
//! │                                                                         │
//! │  UPDATE                                                                │
//! │  ──────                                                                │
//! │  page ───► { recordIds: [...], locationId, sublocationId }             │
//! │  page ◄─── { status: success | partial | error, message,               │
//! │              successful: [...], failed: [ { id, error } ] }            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use scanstation_core::{
    FailedItem, Location, LocationCatalog, SubmissionRequest, Sublocation, UpdateOutcome,
};

use crate::error::{SessionError, SessionResult};

/// Shown when an error response carries no message.
const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

// =============================================================================
// Update Request
// =============================================================================

/// Body of the update call.
///
/// `sublocationId` is always present; an empty string means none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    pub record_ids: Vec<String>,
    pub location_id: String,
    #[serde(default)]
    pub sublocation_id: String,
}

impl From<&SubmissionRequest> for UpdateLocationRequest {
    fn from(request: &SubmissionRequest) -> Self {
        UpdateLocationRequest {
            record_ids: request.codes.clone(),
            location_id: request.location_id.clone(),
            sublocation_id: request.sublocation_id.clone().unwrap_or_default(),
        }
    }
}

impl UpdateLocationRequest {
    pub fn to_json(&self) -> SessionResult<String> {
        serde_json::to_string(self).map_err(|e| SessionError::SerializationFailed(e.to_string()))
    }
}

// =============================================================================
// Update Response
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Partial,
    Error,
}

/// Body the backend answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateLocationResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub successful: Vec<String>,
    #[serde(default)]
    pub failed: Vec<FailedItem>,
}

impl From<UpdateLocationResponse> for UpdateOutcome {
    /// A `success` that still lists failures is treated as partial.
    fn from(response: UpdateLocationResponse) -> Self {
        let UpdateLocationResponse {
            status,
            message,
            successful,
            failed,
        } = response;

        match status {
            ResponseStatus::Success if failed.is_empty() => UpdateOutcome::success(message),
            ResponseStatus::Success | ResponseStatus::Partial => {
                UpdateOutcome::partial(message, successful, failed)
            }
            ResponseStatus::Error if message.trim().is_empty() => {
                UpdateOutcome::error(UNKNOWN_ERROR_MESSAGE)
            }
            ResponseStatus::Error => UpdateOutcome::error(message),
        }
    }
}

/// Parses an update response body into an outcome.
pub fn parse_update_response(body: &str) -> SessionResult<UpdateOutcome> {
    let response: UpdateLocationResponse = serde_json::from_str(body)?;
    Ok(response.into())
}

/// Builds the response body a backend sends for per-code results.
pub fn summarize_results(
    total: usize,
    successful: Vec<String>,
    failed: Vec<FailedItem>,
) -> UpdateLocationResponse {
    let status = if failed.is_empty() {
        ResponseStatus::Success
    } else {
        ResponseStatus::Partial
    };

    UpdateLocationResponse {
        status,
        message: format!("Updated {} of {} records", successful.len(), total),
        successful,
        failed,
    }
}

// =============================================================================
// Location List
// =============================================================================

/// Ids arrive as strings or numbers (integer, unsigned or float). Anything
/// else yields `None` and the entry is skipped.
fn id_string(raw: serde_json::Value) -> Option<String> {
    match raw {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 => Some(format!("{:.0}", f)),
            _ => Some(n.to_string()),
        },
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct RawSublocation {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sublocations: Option<Vec<RawSublocation>>,
}

fn required(id: Option<serde_json::Value>, name: Option<String>) -> Option<(String, String)> {
    let id = id.and_then(id_string).filter(|s| !s.trim().is_empty())?;
    let name = name.filter(|s| !s.trim().is_empty())?;
    Some((id, name))
}

/// Parses the location list.
///
/// The body must be a JSON array. Locations or sublocations missing an id
/// or name are skipped; repeated sublocation ids keep the first entry.
pub fn parse_location_catalog(body: &str) -> SessionResult<LocationCatalog> {
    let raw: Vec<RawLocation> = serde_json::from_str(body)
        .map_err(|e| SessionError::DeserializationFailed(format!("location list: {}", e)))?;

    let locations = raw
        .into_iter()
        .filter_map(|location| {
            let (id, name) = required(location.id, location.name)?;

            let mut seen = HashSet::new();
            let sublocations = location
                .sublocations
                .unwrap_or_default()
                .into_iter()
                .filter_map(|s| required(s.id, s.name))
                .filter(|(id, _)| seen.insert(id.clone()))
                .map(|(id, name)| Sublocation::new(id, name))
                .collect();

            Some(Location::new(id, name, sublocations))
        })
        .collect();

    Ok(LocationCatalog::new(locations))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_empty_sublocation() {
        let submission = SubmissionRequest {
            id: "sub-1".to_string(),
            codes: vec!["A1".to_string(), "B2".to_string()],
            location_id: "1001".to_string(),
            sublocation_id: None,
        };

        let json: serde_json::Value =
            serde_json::from_str(&UpdateLocationRequest::from(&submission).to_json().unwrap())
                .unwrap();
        assert_eq!(json["recordIds"], serde_json::json!(["A1", "B2"]));
        assert_eq!(json["locationId"], "1001");
        assert_eq!(json["sublocationId"], "");
    }

    #[test]
    fn test_partial_response() {
        let outcome = parse_update_response(
            r#"{
                "status": "partial",
                "message": "Updated 1 of 2 records",
                "successful": ["A1"],
                "failed": [{ "id": "B2", "error": "API returned status code 404" }]
            }"#,
        )
        .unwrap();

        match outcome {
            UpdateOutcome::Partial {
                succeeded_ids,
                failed,
                ..
            } => {
                assert_eq!(succeeded_ids, vec!["A1"]);
                assert_eq!(failed[0].id, "B2");
            }
            other => panic!("expected partial, got {:?}", other),
        }
    }

    #[test]
    fn test_success_with_failures_is_partial() {
        let outcome =
            parse_update_response(r#"{"status":"success","failed":[{"id":"X","error":"gone"}]}"#)
                .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Partial { .. }));

        let outcome = parse_update_response(r#"{"status":"success","message":"ok"}"#).unwrap();
        assert_eq!(outcome, UpdateOutcome::success("ok"));
    }

    #[test]
    fn test_error_response() {
        let outcome = parse_update_response(r#"{"status":"error"}"#).unwrap();
        assert_eq!(outcome, UpdateOutcome::error(UNKNOWN_ERROR_MESSAGE));

        assert!(parse_update_response("<html>502</html>").is_err());
    }

    #[test]
    fn test_summarize_results() {
        let response = summarize_results(
            2,
            vec!["A1".to_string()],
            vec![FailedItem {
                id: "B2".to_string(),
                error: "not found".to_string(),
            }],
        );
        assert_eq!(response.status, ResponseStatus::Partial);
        assert_eq!(response.message, "Updated 1 of 2 records");

        let response = summarize_results(1, vec!["A1".to_string()], vec![]);
        assert_eq!(response.status, ResponseStatus::Success);
    }

    #[test]
    fn test_location_list_skips_invalid_entries() {
        let catalog = parse_location_catalog(
            r#"[
                { "id": 1001, "name": "Warehouse A", "sublocations": [
                    { "id": "s1", "name": "Shelf 1" },
                    { "id": "s1", "name": "Shelf 1 again" },
                    { "id": "s2" }
                ] },
                { "name": "No id" },
                { "id": "1002", "name": "" },
                { "id": "1003", "name": "Office" }
            ]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        let warehouse = catalog.get("1001").unwrap();
        assert_eq!(warehouse.sublocations, vec![Sublocation::new("s1", "Shelf 1")]);
        assert!(catalog.get("1003").unwrap().sublocations.is_empty());
    }

    #[test]
    fn test_location_ids_of_any_number_shape() {
        let catalog = parse_location_catalog(
            r#"[
                { "id": 1001.0, "name": "Float id", "sublocations": [
                    { "id": 7, "name": "Numbered shelf" },
                    { "id": { "nested": true }, "name": "Odd shelf" }
                ] },
                { "id": 18446744073709551615, "name": "Huge id" },
                { "id": true, "name": "Bool id" },
                { "id": null, "name": "Null id" },
                { "id": 2.5, "name": "Fractional id" }
            ]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 3);
        let float_id = catalog.get("1001").unwrap();
        assert_eq!(float_id.sublocations, vec![Sublocation::new("7", "Numbered shelf")]);
        assert!(catalog.get("18446744073709551615").is_some());
        assert!(catalog.get("2.5").is_some());
    }

    #[test]
    fn test_location_list_must_be_array() {
        let err = parse_location_catalog(r#"{"locations": []}"#).unwrap_err();
        assert!(matches!(err, SessionError::DeserializationFailed(_)));
    }
}

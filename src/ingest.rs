use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::models::{Priority, ProblemKind, ProblemReport, ProblemStatus};

/// Fields every imported item must carry, in the order they are reported.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "id",
    "type",
    "description",
    "location",
    "reportTime",
    "reporterType",
    "status",
];

/// Validates a raw JSON feed and converts every item into a [`ProblemReport`].
///
/// Only the presence of [`REQUIRED_FIELDS`] is checked. The remaining fields are
/// read opportunistically; a value with an unexpected shape is treated as absent.
pub fn parse_reports(raw: &str) -> Result<Vec<ProblemReport>, ValidationError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| ValidationError::Malformed(err.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        _ => return Err(ValidationError::NotAnArray),
    };

    let empty = Map::new();
    for (index, item) in items.iter().enumerate() {
        let object = item.as_object().unwrap_or(&empty);
        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| !object.contains_key(**field))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields {
                index: index + 1,
                missing,
            });
        }
    }

    Ok(items
        .iter()
        .filter_map(Value::as_object)
        .map(report_from_object)
        .collect())
}

fn report_from_object(object: &Map<String, Value>) -> ProblemReport {
    let created_at = text(object, "createTime").or_else(|| text(object, "reportTime"));

    ProblemReport {
        id: text(object, "id").unwrap_or_default(),
        area: text(object, "area"),
        area_code: text(object, "areaCode"),
        longitude: object.get("lng").and_then(Value::as_f64),
        latitude: object.get("lat").and_then(Value::as_f64),
        kind: wire(object, "type", ProblemKind::from_wire, ProblemKind::Unknown),
        sub_type: text(object, "subType"),
        priority: wire(object, "priority", Priority::from_wire, Priority::Unknown),
        status: wire(object, "status", ProblemStatus::from_wire, ProblemStatus::Unknown),
        created_at,
        response_minutes: object
            .get("responseTime")
            .and_then(Value::as_f64)
            .filter(|minutes| *minutes > 0.0)
            .map(|minutes| minutes.round() as u32),
        device_id: text(object, "deviceId"),
        description: text(object, "description"),
        location: text(object, "location"),
        reporter_type: text(object, "reporterType"),
    }
}

/// Strings are taken as-is, numbers and nested values are rendered as JSON text.
fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(value) => Some(value.clone()),
        other => Some(other.to_string()),
    }
}

fn wire<T>(object: &Map<String, Value>, key: &str, parse: fn(&str) -> T, missing: T) -> T {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(parse)
        .unwrap_or(missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, extra: &str) -> String {
        format!(
            r#"{{"id": "{id}", "type": "event", "description": "d", "location": "l",
                "reportTime": "2026-03-01 08:00:00", "reporterType": "citizen",
                "status": "pending"{extra}}}"#
        )
    }

    #[test]
    fn rejects_non_array_payload() {
        let err = parse_reports(r#"{"id": 1}"#).unwrap_err();
        assert_eq!(err, ValidationError::NotAnArray);
        assert!(err.to_string().contains("must be array"));
    }

    #[test]
    fn rejects_unparseable_text() {
        let err = parse_reports("[{").unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn empty_object_names_all_required_fields() {
        let err = parse_reports("[{}]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "item 1 is missing fields: id, type, description, location, reportTime, reporterType, status"
        );
    }

    #[test]
    fn reports_one_based_index_of_first_bad_item() {
        let raw = format!(r#"[{}, {{"id": 2, "type": "event"}}]"#, item("a", ""));
        match parse_reports(&raw).unwrap_err() {
            ValidationError::MissingFields { index, missing } => {
                assert_eq!(index, 2);
                assert_eq!(
                    missing,
                    vec!["description", "location", "reportTime", "reporterType", "status"]
                );
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn reads_optional_fields_leniently() {
        let raw = format!(
            "[{}]",
            item(
                "a",
                r#", "area": "海淀区", "lng": 116.4, "lat": "bad", "priority": "high",
                   "subType": "设备故障", "responseTime": 12, "deviceId": "DEV-7",
                   "createTime": "2026-03-02 09:30:00""#
            )
        );
        let reports = parse_reports(&raw).unwrap();
        let report = &reports[0];
        assert_eq!(report.area.as_deref(), Some("海淀区"));
        assert_eq!(report.longitude, Some(116.4));
        assert_eq!(report.latitude, None);
        assert_eq!(report.priority, Priority::High);
        assert_eq!(report.status, ProblemStatus::Pending);
        assert_eq!(report.kind, ProblemKind::Event);
        assert_eq!(report.response_minutes, Some(12));
        assert_eq!(report.created_at.as_deref(), Some("2026-03-02 09:30:00"));
    }

    #[test]
    fn numeric_ids_and_unknown_enums_are_accepted() {
        let raw = r#"[{"id": 17, "type": "flood", "description": "", "location": {"x": 1},
                       "reportTime": "2026-03-01", "reporterType": "sensor", "status": "closed"}]"#;
        let reports = parse_reports(raw).unwrap();
        assert_eq!(reports[0].id, "17");
        assert_eq!(reports[0].kind, ProblemKind::Unknown);
        assert_eq!(reports[0].status, ProblemStatus::Unknown);
        assert_eq!(reports[0].priority, Priority::Unknown);
        assert_eq!(reports[0].location.as_deref(), Some(r#"{"x":1}"#));
        assert_eq!(reports[0].created_at.as_deref(), Some("2026-03-01"));
    }
}

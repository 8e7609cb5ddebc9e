//! Parsing of loosely shaped Epics records into typed values.
//!
//! The Epics API has returned the same logical field under several names
//! across versions. Each field has one ordered list of candidate keys here;
//! the first key holding a usable value wins.

use super::{Status, StatusRef, Story};
use serde_json::{Map, Value};

const ID_KEYS: &[&str] = &["id", "storyId", "uuid"];
const TITLE_KEYS: &[&str] = &["title", "name", "summary"];
const DESCRIPTION_KEYS: &[&str] = &["description", "details", "body"];
const STATUS_KEYS: &[&str] = &["status", "statusId", "status_id", "statusUUID"];
const POINTS_KEYS: &[&str] = &[
    "points",
    "storyPoints",
    "story_points",
    "estimate",
    "estimationPoints",
];
const NESTED_POINTS_KEYS: &[&str] = &["points", "value", "amount"];
const STATUS_ID_KEYS: &[&str] = &["id", "statusId", "uuid", "key"];
const STATUS_NAME_KEYS: &[&str] = &["name", "displayName"];

/// Parse one story record. Non-object values yield an untitled story.
pub fn parse_story(record: &Value) -> Story {
    let empty = Map::new();
    let obj = record.as_object().unwrap_or(&empty);

    let id = first_string(obj, ID_KEYS);
    let title = first_string(obj, TITLE_KEYS).unwrap_or_else(|| match &id {
        Some(id) => format!("Story {}", id),
        None => "Story".to_string(),
    });

    Story {
        title,
        description: first_string(obj, DESCRIPTION_KEYS).unwrap_or_default(),
        status: extract_status(obj),
        points: extract_points(obj),
        id,
    }
}

/// Parse one status table entry. Entries without an id are dropped.
pub fn parse_status(record: &Value) -> Option<Status> {
    let obj = record.as_object()?;
    let id = first_string(obj, STATUS_ID_KEYS)?;

    Some(Status {
        name: first_string(obj, STATUS_NAME_KEYS).unwrap_or_default(),
        category: first_string(obj, &["category"]),
        id,
    })
}

fn extract_status(obj: &Map<String, Value>) -> StatusRef {
    for key in STATUS_KEYS {
        match obj.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return StatusRef::Key(s.trim().to_string());
            }
            Some(Value::Object(inner)) => {
                let id = first_string(inner, STATUS_ID_KEYS);
                let name = first_string(inner, STATUS_NAME_KEYS);
                if id.is_some() || name.is_some() {
                    return StatusRef::Object { id, name };
                }
            }
            _ => {}
        }
    }
    StatusRef::None
}

fn extract_points(obj: &Map<String, Value>) -> f64 {
    for key in POINTS_KEYS {
        let points = match obj.get(*key) {
            Some(Value::Object(inner)) => NESTED_POINTS_KEYS
                .iter()
                .find_map(|k| inner.get(*k).and_then(as_number)),
            Some(value) => as_number(value),
            None => None,
        };
        if let Some(points) = points {
            return points;
        }
    }
    0.0
}

/// Numbers and numeric strings; negative or non-finite values are rejected.
fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (n.is_finite() && n >= 0.0).then_some(n)
}

/// First non-empty string (or number rendered as string) under `keys`
fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_story_plain_keys() {
        let story = parse_story(&json!({
            "id": "st-1",
            "title": "  Login page ",
            "description": "Build the login page",
            "status": "Done",
            "points": 3
        }));

        assert_eq!(story.id.as_deref(), Some("st-1"));
        assert_eq!(story.title, "Login page");
        assert_eq!(story.description, "Build the login page");
        assert_eq!(story.status, StatusRef::Key("Done".to_string()));
        assert_eq!(story.points, 3.0);
    }

    #[test]
    fn test_parse_story_alternate_keys() {
        let story = parse_story(&json!({
            "storyId": 17,
            "summary": "Export to CSV",
            "details": "Download button",
            "statusId": "status-uuid",
            "storyPoints": 2.5
        }));

        assert_eq!(story.id.as_deref(), Some("17"));
        assert_eq!(story.title, "Export to CSV");
        assert_eq!(story.description, "Download button");
        assert_eq!(story.status, StatusRef::Key("status-uuid".to_string()));
        assert_eq!(story.points, 2.5);
    }

    #[test]
    fn test_parse_story_nested_shapes() {
        let story = parse_story(&json!({
            "name": "Audit log",
            "status": { "id": "s-2", "name": "Done" },
            "estimate": { "value": 5 }
        }));

        assert_eq!(
            story.status,
            StatusRef::Object {
                id: Some("s-2".to_string()),
                name: Some("Done".to_string()),
            }
        );
        assert_eq!(story.points, 5.0);
    }

    #[test]
    fn test_parse_story_defaults() {
        let story = parse_story(&json!({ "id": "x9" }));
        assert_eq!(story.title, "Story x9");
        assert_eq!(story.description, "");
        assert_eq!(story.status, StatusRef::None);
        assert_eq!(story.points, 0.0);

        let story = parse_story(&json!("not an object"));
        assert_eq!(story.title, "Story");
        assert_eq!(story.id, None);
    }

    #[test]
    fn test_points_non_numeric_is_zero() {
        assert_eq!(parse_story(&json!({ "points": "three" })).points, 0.0);
        assert_eq!(parse_story(&json!({ "points": null })).points, 0.0);
        assert_eq!(parse_story(&json!({ "points": -4 })).points, 0.0);
        assert_eq!(parse_story(&json!({ "points": [1, 2] })).points, 0.0);
    }

    #[test]
    fn test_points_numeric_string() {
        assert_eq!(parse_story(&json!({ "points": " 8 " })).points, 8.0);
    }

    #[test]
    fn test_points_falls_through_to_next_key() {
        let story = parse_story(&json!({
            "points": null,
            "story_points": 13
        }));
        assert_eq!(story.points, 13.0);
    }

    #[test]
    fn test_blank_title_uses_next_key() {
        let story = parse_story(&json!({ "title": "  ", "name": "Fallback" }));
        assert_eq!(story.title, "Fallback");
    }

    #[test]
    fn test_parse_status() {
        let status = parse_status(&json!({
            "statusId": "s-3",
            "displayName": "Accepted",
            "category": "DONE"
        }))
        .unwrap();

        assert_eq!(status.id, "s-3");
        assert_eq!(status.name, "Accepted");
        assert_eq!(status.category.as_deref(), Some("DONE"));
    }

    #[test]
    fn test_parse_status_without_id() {
        assert!(parse_status(&json!({ "name": "Done" })).is_none());
        assert!(parse_status(&json!(42)).is_none());
    }
}

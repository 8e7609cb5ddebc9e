use serde_json::{Map, Value};

const ITEM_KEYS: &[&str] = &["stories", "items", "data"];
const LINK_CONTAINERS: &[&str] = &["links", "_links"];
const NEXT_KEYS: &[&str] = &["next", "Next", "NEXT"];
const NEXT_OFFSET_KEYS: &[&str] = &["nextOffset", "next_offset"];

/// Where the next page of a listing lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageCursor {
    /// Absolute URL taken from a `next` link
    Link(String),
    /// Offset to pass alongside the page size
    Offset(u64),
}

/// Records contained in one page, under `item_key` or the usual fallbacks
pub fn page_items(payload: &Value, item_key: &str) -> Vec<Value> {
    match payload {
        Value::Array(items) => items.clone(),
        Value::Object(obj) => obj
            .get(item_key)
            .and_then(Value::as_array)
            .or_else(|| {
                ITEM_KEYS
                    .iter()
                    .find_map(|key| obj.get(*key).and_then(Value::as_array))
            })
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Work out the next page from a response body.
///
/// A `next` link takes precedence over offset fields. Relative links are
/// resolved against `base`.
pub fn next_cursor(payload: &Value, base: &str) -> Option<PageCursor> {
    let obj = payload.as_object()?;
    next_link(obj, base)
        .map(PageCursor::Link)
        .or_else(|| next_offset(obj).map(PageCursor::Offset))
}

fn next_link(obj: &Map<String, Value>, base: &str) -> Option<String> {
    let links = LINK_CONTAINERS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_object))?;

    NEXT_KEYS.iter().find_map(|key| {
        let href = match links.get(*key)? {
            Value::String(s) => s.as_str(),
            Value::Object(next) => next.get("href")?.as_str()?,
            _ => return None,
        };
        let href = href.trim();
        if href.is_empty() {
            None
        } else if href.starts_with("http://") || href.starts_with("https://") {
            Some(href.to_string())
        } else if href.starts_with('/') {
            Some(format!("{}{}", base.trim_end_matches('/'), href))
        } else {
            Some(format!("{}/{}", base.trim_end_matches('/'), href))
        }
    })
}

fn next_offset(obj: &Map<String, Value>) -> Option<u64> {
    if let Some(offset) = NEXT_OFFSET_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_u64))
    {
        return Some(offset);
    }

    let offset = obj.get("offset").and_then(Value::as_u64)?;
    let limit = obj.get("limit").and_then(Value::as_u64)?;
    if limit == 0 {
        return None;
    }
    let next = offset.checked_add(limit)?;

    match obj.get("total").and_then(Value::as_u64) {
        Some(total) => (next < total).then_some(next),
        None => obj
            .get("hasMore")
            .and_then(Value::as_bool)
            .unwrap_or(false)
            .then_some(next),
    }
}

pub mod client;
pub mod extract;
pub mod pagination;

use std::collections::HashMap;

/// A story as read from the Epics API
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    /// Upstream identifier, if the record carried one
    pub id: Option<String>,
    /// Story title
    pub title: String,
    /// Story description (may be empty)
    pub description: String,
    /// Reference to the story's workflow status
    pub status: StatusRef,
    /// Story point estimate (0 when missing or not numeric)
    pub points: f64,
}

/// How a story points at its status
#[derive(Debug, Clone, PartialEq)]
pub enum StatusRef {
    /// No status present on the record
    None,
    /// A bare string: either a status id or the status label itself
    Key(String),
    /// An embedded status object
    Object {
        id: Option<String>,
        name: Option<String>,
    },
}

/// One entry of the project's status table
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
}

/// Status lookup keyed by status id
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    by_id: HashMap<String, Status>,
}

impl StatusTable {
    /// Build a table from parsed statuses. Later duplicates win.
    pub fn new(statuses: Vec<Status>) -> Self {
        let by_id = statuses.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self { by_id }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Status> {
        self.by_id.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Status> {
        self.by_id.values()
    }

    /// Table name for `id`, ignoring entries parsed without a name
    fn named(&self, id: &str) -> Option<&str> {
        self.get(id)
            .map(|s| s.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Resolve a story's status reference to a display label.
    ///
    /// Ids found in the table resolve to the table name; anything else falls
    /// back to the literal key or the embedded object's name.
    pub fn resolve_label<'a>(&'a self, status: &'a StatusRef) -> Option<&'a str> {
        match status {
            StatusRef::None => None,
            StatusRef::Key(key) => Some(self.named(key).unwrap_or(key.as_str())),
            StatusRef::Object { id, name } => id
                .as_deref()
                .and_then(|id| self.named(id))
                .or(name.as_deref()),
        }
    }
}

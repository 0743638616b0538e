//! Tag model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Color assigned to tags created without one.
pub const DEFAULT_COLOR: &str = "#007bff";

/// Unique identifier for a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub i64);

impl TagId {
    /// Create a new tag ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, colored label attachable to credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    /// Tag id.
    pub id: TagId,
    /// Globally unique name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Display color, `#rrggbb`.
    pub color: String,
    /// When the tag was created.
    pub created_at: DateTime<Utc>,
    /// When the tag was last changed.
    pub updated_at: DateTime<Utc>,
    /// Number of credentials carrying this tag.
    pub credential_count: i64,
}

/// Input for creating a tag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTag {
    /// Tag name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Color; [`DEFAULT_COLOR`] when absent or blank.
    #[serde(default)]
    pub color: Option<String>,
}

impl NewTag {
    /// Create a tag input with the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the color.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// The color to store.
    #[must_use]
    pub fn color_or_default(&self) -> &str {
        self.color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COLOR)
    }
}

/// Partial update of a tag. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagUpdate {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New color.
    pub color: Option<String>,
}

/// Tags created on first start.
#[must_use]
pub fn default_tags() -> Vec<NewTag> {
    vec![
        NewTag::named("Work")
            .with_description("Mailboxes used for work")
            .with_color("#007bff"),
        NewTag::named("Personal")
            .with_description("Personal mailboxes")
            .with_color("#28a745"),
        NewTag::named("Testing")
            .with_description("Mailboxes used for testing")
            .with_color("#ffc107"),
        NewTag::named("Important")
            .with_description("Important mailboxes")
            .with_color("#dc3545"),
        NewTag::named("Temporary")
            .with_description("Short-lived mailboxes")
            .with_color("#6c757d"),
    ]
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::DomainError;

pub type CategoryId = Uuid;

/// Parse a client supplied identifier, naming the offending field on failure.
pub fn parse_category_id(field: &str, raw: &str) -> Result<CategoryId, DomainError> {
    Uuid::parse_str(raw.trim()).map_err(|_| DomainError::InvalidId {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    Active,
    Inactive,
}

impl CategoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryStatus::Active => "active",
            CategoryStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CategoryStatus::Active),
            "inactive" => Ok(CategoryStatus::Inactive),
            other => Err(DomainError::ValidationError(format!(
                "Unknown category status: {}",
                other
            ))),
        }
    }
}

/// One node in the category forest, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub parent_id: Option<CategoryId>,
    pub name: String,
    pub description: String,
    pub status: CategoryStatus,
    pub stock_availability: bool,
    /// Derived index of the categories whose `parent_id` is this id.
    pub children: Vec<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn has_child(&self, id: &CategoryId) -> bool {
        self.children.contains(id)
    }
}

/// Fields a store needs to persist a brand new category.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub parent_id: Option<CategoryId>,
    pub name: String,
    pub description: String,
    pub status: CategoryStatus,
    pub stock_availability: bool,
}

/// Partial update of the client-writable fields. `parent_id` is
/// `Some(None)` to detach, `Some(Some(id))` to attach, `None` to leave as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryChanges {
    pub parent_id: Option<Option<CategoryId>>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<CategoryStatus>,
    pub stock_availability: Option<bool>,
}

impl CategoryChanges {
    /// Apply to an in-memory record. Does not touch `updated_at`.
    pub fn apply_to(&self, category: &mut Category) {
        if let Some(parent_id) = self.parent_id {
            category.parent_id = parent_id;
        }
        if let Some(name) = &self.name {
            category.name = name.clone();
        }
        if let Some(description) = &self.description {
            category.description = description.clone();
        }
        if let Some(status) = self.status {
            category.status = status;
        }
        if let Some(stock) = self.stock_availability {
            category.stock_availability = stock;
        }
    }
}

/// A `children` entry to remove from a parent's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildLink {
    pub parent_id: CategoryId,
    pub child_id: CategoryId,
}

/// Capitalize the first character, lowercase the rest and collapse
/// whitespace runs to a single space.
pub fn normalize_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

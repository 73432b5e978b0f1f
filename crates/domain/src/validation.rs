//! Schema validation of raw category payloads.
//!
//! Validation runs over the untyped JSON body so that a wrong type is
//! reported as a field message instead of a deserializer rejection.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::entities::CategoryStatus;
use crate::errors::DomainError;

const NAME_MIN: usize = 3;
const NAME_MAX: usize = 50;
const DESCRIPTION_MIN: usize = 10;
const DESCRIPTION_MAX: usize = 500;

const KNOWN_FIELDS: [&str; 5] = [
    "parentId",
    "name",
    "description",
    "status",
    "stockAvailability",
];

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z\s]+$").expect("static name pattern compiles"))
}

/// What the client said about the parent link.
#[derive(Debug, Clone, PartialEq)]
pub enum ParentField {
    /// The key was absent from the payload.
    Omitted,
    /// Explicit `null`: the category is (or becomes) a root.
    Root,
    /// Raw identifier, resolved later by the tree manager.
    Id(String),
}

impl ParentField {
    pub fn is_omitted(&self) -> bool {
        matches!(self, ParentField::Omitted)
    }
}

/// Validated input for creating a category.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCategoryInput {
    pub parent: ParentField,
    pub name: String,
    pub description: String,
    pub status: CategoryStatus,
    pub stock_availability: bool,
}

/// Validated input for a partial update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCategoryInput {
    pub parent: ParentField,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<CategoryStatus>,
    pub stock_availability: Option<bool>,
}

impl Default for UpdateCategoryInput {
    fn default() -> Self {
        Self {
            parent: ParentField::Omitted,
            name: None,
            description: None,
            status: None,
            stock_availability: None,
        }
    }
}

/// Collected field errors, kept in payload order.
struct Violations(Vec<String>);

impl Violations {
    fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, DomainError> {
    body.as_object().ok_or_else(|| {
        DomainError::ValidationError("\"value\" must be of type object".to_string())
    })
}

fn check_unknown_keys(object: &Map<String, Value>, violations: &mut Violations) {
    for key in object.keys() {
        if !KNOWN_FIELDS.contains(&key.as_str()) {
            violations.push(format!("\"{}\" is not allowed", key));
        }
    }
}

fn parent_field(value: Option<&Value>, violations: &mut Violations) -> ParentField {
    match value {
        None => ParentField::Omitted,
        Some(Value::Null) => ParentField::Root,
        Some(Value::String(raw)) => ParentField::Id(raw.clone()),
        Some(_) => {
            violations.push("Parent ID must be a string.");
            ParentField::Omitted
        }
    }
}

fn name_field(value: &Value, violations: &mut Violations) -> Option<String> {
    let Value::String(raw) = value else {
        violations.push("\"name\" must be a string");
        return None;
    };
    let trimmed = raw.trim();
    let length = trimmed.chars().count();
    if length == 0 {
        violations.push("\"name\" is not allowed to be empty");
        return None;
    }

    let before = violations.0.len();
    if length < NAME_MIN {
        violations.push("Name must be at least 3 characters long.");
    }
    if length > NAME_MAX {
        violations.push("Name cannot exceed 50 characters.");
    }
    if !name_pattern().is_match(trimmed) {
        violations.push("Special characters are not allowed in the name.");
    }
    (violations.0.len() == before).then(|| trimmed.to_string())
}

fn description_field(value: &Value, violations: &mut Violations) -> Option<String> {
    let Value::String(raw) = value else {
        violations.push("\"description\" must be a string");
        return None;
    };
    let length = raw.chars().count();
    if length == 0 {
        violations.push("\"description\" is not allowed to be empty");
        None
    } else if length < DESCRIPTION_MIN {
        violations.push("Description must be at least 10 characters long.");
        None
    } else if length > DESCRIPTION_MAX {
        violations.push("Description cannot exceed 500 characters.");
        None
    } else {
        Some(raw.clone())
    }
}

fn status_field(value: &Value, violations: &mut Violations) -> Option<CategoryStatus> {
    match value.as_str().map(str::parse::<CategoryStatus>) {
        Some(Ok(status)) => Some(status),
        _ => {
            violations.push("Status must be either 'active' or 'inactive'.");
            None
        }
    }
}

fn stock_field(value: &Value, violations: &mut Violations) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        _ => {
            violations.push("Stock availability must be a boolean.");
            None
        }
    }
}

/// Validate a create payload, reporting every violated constraint.
pub fn validate_create(body: &Value) -> Result<CreateCategoryInput, DomainError> {
    let object = as_object(body)?;
    let mut violations = Violations(Vec::new());

    let parent = parent_field(object.get("parentId"), &mut violations);

    let name = match object.get("name") {
        Some(value) => name_field(value, &mut violations),
        None => {
            violations.push("Name is required.");
            None
        }
    };
    let description = match object.get("description") {
        Some(value) => description_field(value, &mut violations),
        None => {
            violations.push("\"description\" is required");
            None
        }
    };
    let status = match object.get("status") {
        Some(value) => status_field(value, &mut violations),
        None => {
            violations.push("\"status\" is required");
            None
        }
    };
    let stock_availability = object
        .get("stockAvailability")
        .and_then(|value| stock_field(value, &mut violations));

    check_unknown_keys(object, &mut violations);

    match (name, description, status) {
        (Some(name), Some(description), Some(status)) if violations.0.is_empty() => {
            Ok(CreateCategoryInput {
                parent,
                name,
                description,
                status,
                stock_availability: stock_availability.unwrap_or(false),
            })
        }
        _ => Err(DomainError::ValidationError(format!(
            "Validation error: {}",
            violations.0.join(". ")
        ))),
    }
}

/// Validate a partial update payload, reporting the first violation only.
pub fn validate_update(body: &Value) -> Result<UpdateCategoryInput, DomainError> {
    let object = as_object(body)?;
    let mut violations = Violations(Vec::new());

    let input = UpdateCategoryInput {
        parent: parent_field(object.get("parentId"), &mut violations),
        name: object
            .get("name")
            .and_then(|value| name_field(value, &mut violations)),
        description: object
            .get("description")
            .and_then(|value| description_field(value, &mut violations)),
        status: object
            .get("status")
            .and_then(|value| status_field(value, &mut violations)),
        stock_availability: object
            .get("stockAvailability")
            .and_then(|value| stock_field(value, &mut violations)),
    };
    check_unknown_keys(object, &mut violations);

    match violations.0.into_iter().next() {
        Some(first) => Err(DomainError::ValidationError(first)),
        None => Ok(input),
    }
}

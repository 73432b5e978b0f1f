use std::cmp::Ordering;
use std::collections::HashMap;

use crate::entities::{normalize_name, CategoryNode, CategoryStatus};
use crate::errors::DomainError;

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Status,
    StockAvailability,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    fn parse(key: &str) -> Result<Self, DomainError> {
        match key {
            "name" => Ok(SortField::Name),
            "status" => Ok(SortField::Status),
            "stockAvailability" => Ok(SortField::StockAvailability),
            "createdAt" => Ok(SortField::CreatedAt),
            "updatedAt" => Ok(SortField::UpdatedAt),
            other => Err(DomainError::invalid_request(format!(
                "Cannot sort by unknown field '{}'",
                other
            ))),
        }
    }

    fn compare(&self, a: &CategoryNode, b: &CategoryNode) -> Ordering {
        let (a, b) = (&a.category, &b.category);
        match self {
            SortField::Name => a.name.cmp(&b.name),
            SortField::Status => a.status.cmp(&b.status),
            SortField::StockAvailability => a.stock_availability.cmp(&b.stock_availability),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

/// Filter, pagination, projection and ordering options for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<CategoryStatus>,
    pub stock_availability: Option<bool>,
    pub name: Option<String>,
    pub page: usize,
    pub limit: usize,
    pub fields: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            status: None,
            stock_availability: None,
            name: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            fields: None,
            sort: Vec::new(),
        }
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize, DomainError> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(DomainError::invalid_request(format!(
            "The {} query parameter must be a positive integer",
            key
        ))),
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|part| !part.is_empty())
}

impl ListQuery {
    /// Build from raw query-string parameters. Unrecognised keys are ignored.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, DomainError> {
        let mut query = ListQuery::default();

        if let Some(raw) = params.get("status") {
            query.status = Some(raw.parse().map_err(|_| {
                DomainError::invalid_request("Status must be either 'active' or 'inactive'.")
            })?);
        }
        if let Some(raw) = params.get("stockAvailability") {
            query.stock_availability = Some(raw.parse().map_err(|_| {
                DomainError::invalid_request("Stock availability must be a boolean.")
            })?);
        }
        if let Some(raw) = params.get("name") {
            query.name = Some(normalize_name(raw));
        }
        if let Some(raw) = params.get("page") {
            query.page = parse_positive("page", raw)?;
        }
        if let Some(raw) = params.get("limit") {
            query.limit = parse_positive("limit", raw)?.min(MAX_PAGE_SIZE);
        }
        if let Some(raw) = params.get("fields") {
            let fields: Vec<String> = split_list(raw).map(str::to_string).collect();
            if !fields.is_empty() {
                query.fields = Some(fields);
            }
        }
        if let Some(raw) = params.get("sort") {
            query.sort = split_list(raw)
                .map(|part| match part.strip_prefix('-') {
                    Some(key) => SortField::parse(key).map(|field| SortKey {
                        field,
                        descending: true,
                    }),
                    None => SortField::parse(part).map(|field| SortKey {
                        field,
                        descending: false,
                    }),
                })
                .collect::<Result<_, _>>()?;
        }

        Ok(query)
    }

    fn matches(&self, node: &CategoryNode) -> bool {
        let c = &node.category;
        self.status.map_or(true, |status| c.status == status)
            && self
                .stock_availability
                .map_or(true, |stock| c.stock_availability == stock)
            && self.name.as_ref().map_or(true, |name| &c.name == name)
    }

    /// Filter, then paginate, then sort the page. Field projection is a
    /// presentation concern and is left to the caller.
    pub fn apply(&self, nodes: Vec<CategoryNode>) -> Vec<CategoryNode> {
        let skip = (self.page - 1).saturating_mul(self.limit);
        let mut page: Vec<CategoryNode> = nodes
            .into_iter()
            .filter(|node| self.matches(node))
            .skip(skip)
            .take(self.limit)
            .collect();

        if !self.sort.is_empty() {
            page.sort_by(|a, b| {
                self.sort
                    .iter()
                    .map(|key| {
                        let ordering = key.field.compare(a, b);
                        if key.descending {
                            ordering.reverse()
                        } else {
                            ordering
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        page
    }
}

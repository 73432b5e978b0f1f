use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::entities::{
    normalize_name, parse_category_id, Category, CategoryChanges, CategoryId, CategoryNode,
    ChildLink, NewCategory,
};
use crate::errors::DomainError;
use crate::repositories::{CategoryStore, TreeRoot};
use crate::services::list_query::ListQuery;
use crate::validation::{validate_create, validate_update, ParentField};

/// Levels of inline children returned by the tree lookups.
pub const TREE_DEPTH: usize = 2;

/// Keeps every category's `children` set in step with its children's
/// `parent_id`, and rejects mutations that would break the forest.
pub struct CategoryTreeManager {
    store: Arc<dyn CategoryStore>,
}

impl CategoryTreeManager {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self { store }
    }

    /// Create a category from a raw payload.
    ///
    /// The payload must state its parent intent: `parentId: null` for a root
    /// or the id of an existing category.
    pub async fn create(&self, payload: &Value) -> Result<Category, DomainError> {
        let input = validate_create(payload)?;

        let parent_id = match &input.parent {
            ParentField::Omitted => {
                return Err(DomainError::invalid_request(
                    "please provide valid parentId and if you want to create main category then give parentId as null",
                ))
            }
            ParentField::Root => None,
            ParentField::Id(raw) => {
                let parent_id = parse_category_id("parentId", raw)?;
                if self.store.find_by_id(parent_id).await?.is_none() {
                    return Err(DomainError::not_found("No parent found, please check parentId"));
                }
                Some(parent_id)
            }
        };

        let category = self
            .store
            .create(&NewCategory {
                parent_id,
                name: normalize_name(&input.name),
                description: input.description,
                status: input.status,
                stock_availability: input.stock_availability,
            })
            .await?;

        if let Some(parent_id) = parent_id {
            if self.store.push_child(parent_id, category.id).await?.is_none() {
                // Parent vanished after the lookup; undo rather than leave a dangling link.
                warn!(category_id = %category.id, %parent_id, "parent removed during create, rolling back");
                self.store.delete_by_id(category.id).await?;
                return Err(DomainError::not_found("No parent found, please check parentId"));
            }
        }

        info!(category_id = %category.id, name = %category.name, parent_id = ?parent_id, "category created");
        Ok(category)
    }

    /// Every root category with two levels of descendants, shaped by `query`.
    pub async fn get_all(&self, query: &ListQuery) -> Result<Vec<CategoryNode>, DomainError> {
        let roots = self.store.fetch_tree(TreeRoot::Roots, TREE_DEPTH).await?;
        debug!(roots = roots.len(), "fetched category forest");

        let page = query.apply(roots);
        if page.is_empty() {
            return Err(DomainError::not_found("No categories found"));
        }
        Ok(page)
    }

    /// One category with two levels of descendants.
    pub async fn get_by_id(&self, raw_id: &str) -> Result<CategoryNode, DomainError> {
        let id = parse_category_id("id", raw_id)?;
        self.store
            .fetch_tree(TreeRoot::Id(id), TREE_DEPTH)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found("Category not found with the provided ID."))
    }

    /// Partially update a category, re-parenting it when `parentId` is given.
    pub async fn update(&self, raw_id: &str, payload: &Value) -> Result<Category, DomainError> {
        let input = validate_update(payload)?;
        let id = parse_category_id("id", raw_id)?;
        let requested_parent = match &input.parent {
            ParentField::Id(raw) => Some(parse_category_id("parentId", raw)?),
            _ => None,
        };

        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category not found"))?;

        if requested_parent == Some(id) {
            return Err(DomainError::invalid_request(
                "A category cannot be its own parent",
            ));
        }

        // Parent checks run before any write; the record itself is written
        // before the children sets so a rejected write leaves both untouched.
        let new_parent = match requested_parent {
            Some(new_parent_id) => Some(self.check_new_parent(&current, new_parent_id).await?),
            None => None,
        };
        let parent_change = match (&input.parent, &new_parent) {
            (ParentField::Id(_), Some(parent)) => Some(Some(parent.id)),
            (ParentField::Root, _) => Some(None),
            _ => None,
        };

        let changes = CategoryChanges {
            parent_id: parent_change,
            name: input.name.as_deref().map(normalize_name),
            description: input.description,
            status: input.status,
            stock_availability: input.stock_availability,
        };

        let updated = self
            .store
            .update_by_id(id, &changes)
            .await?
            .ok_or_else(|| DomainError::not_found("Category not found"))?;

        match parent_change {
            Some(Some(_)) => {
                if let Some(parent) = &new_parent {
                    self.relink(&current, parent).await?;
                }
            }
            Some(None) => {
                if let Some(old_parent_id) = current.parent_id {
                    self.store
                        .bulk_pull_children(&[ChildLink {
                            parent_id: old_parent_id,
                            child_id: id,
                        }])
                        .await?;
                    info!(category_id = %id, %old_parent_id, "category detached to root");
                }
            }
            None => {}
        }

        Ok(updated)
    }

    /// Load the requested parent and refuse it if it is missing or a descendant.
    async fn check_new_parent(
        &self,
        current: &Category,
        new_parent_id: CategoryId,
    ) -> Result<Category, DomainError> {
        let new_parent = self
            .store
            .find_by_id(new_parent_id)
            .await?
            .ok_or_else(|| {
                DomainError::invalid_request("Parent category not found. Provide a valid parentId.")
            })?;
        self.ensure_not_descendant(current.id, &new_parent).await?;
        Ok(new_parent)
    }

    /// Move `current` from its old parent's set into `new_parent`'s.
    async fn relink(&self, current: &Category, new_parent: &Category) -> Result<(), DomainError> {
        if current.parent_id == Some(new_parent.id) {
            return Ok(());
        }

        if let Some(old_parent_id) = current.parent_id {
            self.store
                .bulk_pull_children(&[ChildLink {
                    parent_id: old_parent_id,
                    child_id: current.id,
                }])
                .await?;
        }
        if !new_parent.has_child(&current.id) {
            self.store.push_child(new_parent.id, current.id).await?;
        }

        info!(
            category_id = %current.id,
            old_parent_id = ?current.parent_id,
            new_parent_id = %new_parent.id,
            "category re-parented"
        );
        Ok(())
    }

    /// Reject a move that would make `id` an ancestor of itself.
    async fn ensure_not_descendant(
        &self,
        id: CategoryId,
        new_parent: &Category,
    ) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        let mut cursor = new_parent.parent_id;

        while let Some(ancestor) = cursor {
            if ancestor == id {
                return Err(DomainError::invalid_request(
                    "A category cannot be moved under one of its own descendants",
                ));
            }
            if !seen.insert(ancestor) {
                warn!(%ancestor, "parent chain loops, stopping ancestor walk");
                break;
            }
            cursor = self
                .store
                .find_by_id(ancestor)
                .await?
                .and_then(|category| category.parent_id);
        }
        Ok(())
    }

    /// Delete a childless category and unlink it from its parent.
    pub async fn delete(&self, raw_id: &str) -> Result<Category, DomainError> {
        let id = parse_category_id("id", raw_id)?;
        let category = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category not found"))?;

        if category.has_children() {
            return Err(DomainError::conflict(
                "This category has child categories. Please delete the children first.",
            ));
        }

        if let Some(parent_id) = category.parent_id {
            self.store
                .bulk_pull_children(&[ChildLink {
                    parent_id,
                    child_id: id,
                }])
                .await?;
        }
        self.store.delete_by_id(id).await?;

        info!(category_id = %id, name = %category.name, "category deleted");
        Ok(category)
    }

    /// Delete several childless categories; one blocked category aborts all.
    pub async fn delete_many(&self, raw_ids: &[String]) -> Result<Vec<Category>, DomainError> {
        if raw_ids.is_empty() {
            return Err(DomainError::invalid_request(
                "Please provide an array of category IDs to delete.",
            ));
        }
        let ids: Vec<CategoryId> = raw_ids
            .iter()
            .map(|raw| parse_category_id("id", raw))
            .collect::<Result<BTreeSet<_>, _>>()?
            .into_iter()
            .collect();

        let categories = self.store.find_by_ids(&ids).await?;
        if categories.is_empty() {
            return Err(DomainError::not_found("No categories found with the provided IDs"));
        }
        if categories.len() < ids.len() {
            let found: HashSet<CategoryId> = categories.iter().map(|c| c.id).collect();
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !found.contains(id))
                .map(ToString::to_string)
                .collect();
            warn!(missing = ?missing, "some requested categories do not exist, skipping them");
        }

        if categories.iter().any(Category::has_children) {
            return Err(DomainError::conflict(
                "Some categories have child categories. Please delete the children first.",
            ));
        }

        let links: Vec<ChildLink> = categories
            .iter()
            .filter_map(|c| {
                c.parent_id.map(|parent_id| ChildLink {
                    parent_id,
                    child_id: c.id,
                })
            })
            .collect();
        if !links.is_empty() {
            self.store.bulk_pull_children(&links).await?;
        }

        let matched: Vec<CategoryId> = categories.iter().map(|c| c.id).collect();
        let deleted = self.store.delete_many(&matched).await?;
        info!(requested = ids.len(), deleted, "categories deleted in bulk");

        Ok(categories)
    }

    /// Case-insensitive substring search on names.
    pub async fn search(&self, key: &str) -> Result<Vec<CategoryNode>, DomainError> {
        if !is_search_key(key) {
            return Err(DomainError::invalid_request(format!(
                "The {} query parameter must be a string",
                key
            )));
        }

        let matches = self.store.search_by_name(key.trim(), true).await?;
        debug!(key, hits = matches.len(), "category search");
        if matches.is_empty() {
            return Err(DomainError::not_found(
                "No categories found matching the search criteria",
            ));
        }
        Ok(matches)
    }
}

/// A usable key is non-blank and does not read as a JavaScript-style number
/// (decimal, exponent, `Infinity`, or `0x`/`0o`/`0b` integer literals).
fn is_search_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && !looks_numeric(key)
}

fn looks_numeric(key: &str) -> bool {
    let unsigned = key.strip_prefix(['+', '-']).unwrap_or(key);
    if unsigned == "Infinity" {
        return true;
    }

    let radix = match unsigned.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        // Prefixed literals take no sign.
        let digits = &key[2.min(key.len())..];
        return key.len() == unsigned.len()
            && !digits.is_empty()
            && digits.chars().all(|c| c.is_digit(radix));
    }

    // Rust also accepts `inf` and `nan` spellings; those are words here.
    matches!(key.parse::<f64>(), Ok(value) if value.is_finite())
}

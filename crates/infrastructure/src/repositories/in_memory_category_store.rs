use async_trait::async_trait;
use chrono::Utc;
use domain::{
    build_forest, Category, CategoryChanges, CategoryId, CategoryNode, CategoryStore, ChildLink,
    DomainError, NewCategory, TreeRoot,
};
use regex::RegexBuilder;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store with the same per-operation atomicity as the SQLite
/// store: every method holds the lock for its whole duration.
#[derive(Default)]
pub struct InMemoryCategoryStore {
    categories: RwLock<HashMap<CategoryId, Category>>,
}

impl InMemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn name_taken(
    categories: &HashMap<CategoryId, Category>,
    name: &str,
    except: Option<CategoryId>,
) -> bool {
    categories
        .values()
        .any(|c| c.name == name && Some(c.id) != except)
}

fn duplicate_name(name: &str) -> DomainError {
    DomainError::DuplicateField {
        field: "name".to_string(),
        value: name.to_string(),
    }
}

/// Records in creation order, the order SQLite returns them in.
fn in_creation_order<'a>(iter: impl Iterator<Item = &'a Category>) -> Vec<Category> {
    let mut list: Vec<Category> = iter.cloned().collect();
    list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    list
}

fn expand(
    categories: &HashMap<CategoryId, Category>,
    level: Vec<Category>,
    depth: usize,
) -> Result<Vec<CategoryNode>, DomainError> {
    build_forest(level, depth, &mut |ids: &[CategoryId]| {
        Ok(in_creation_order(
            ids.iter().filter_map(|id| categories.get(id)),
        ))
    })
}

#[async_trait]
impl CategoryStore for InMemoryCategoryStore {
    async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>, DomainError> {
        Ok(self.categories.read().await.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[CategoryId]) -> Result<Vec<Category>, DomainError> {
        let categories = self.categories.read().await;
        Ok(in_creation_order(
            ids.iter().filter_map(|id| categories.get(id)),
        ))
    }

    async fn create(&self, category: &NewCategory) -> Result<Category, DomainError> {
        let mut categories = self.categories.write().await;
        if name_taken(&categories, &category.name, None) {
            return Err(duplicate_name(&category.name));
        }

        let now = Utc::now();
        let created = Category {
            id: Uuid::new_v4(),
            parent_id: category.parent_id,
            name: category.name.clone(),
            description: category.description.clone(),
            status: category.status,
            stock_availability: category.stock_availability,
            children: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        categories.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_by_id(
        &self,
        id: CategoryId,
        changes: &CategoryChanges,
    ) -> Result<Option<Category>, DomainError> {
        let mut categories = self.categories.write().await;
        if let Some(name) = &changes.name {
            if name_taken(&categories, name, Some(id)) {
                return Err(duplicate_name(name));
            }
        }

        Ok(categories.get_mut(&id).map(|category| {
            changes.apply_to(category);
            category.updated_at = Utc::now();
            category.clone()
        }))
    }

    async fn delete_by_id(&self, id: CategoryId) -> Result<Option<Category>, DomainError> {
        Ok(self.categories.write().await.remove(&id))
    }

    async fn delete_many(&self, ids: &[CategoryId]) -> Result<u64, DomainError> {
        let mut categories = self.categories.write().await;
        Ok(ids.iter().filter_map(|id| categories.remove(id)).count() as u64)
    }

    async fn bulk_pull_children(&self, links: &[ChildLink]) -> Result<(), DomainError> {
        let mut categories = self.categories.write().await;
        let now = Utc::now();
        for link in links {
            if let Some(parent) = categories.get_mut(&link.parent_id) {
                let before = parent.children.len();
                parent.children.retain(|child| *child != link.child_id);
                if parent.children.len() != before {
                    parent.updated_at = now;
                }
            }
        }
        Ok(())
    }

    async fn push_child(
        &self,
        parent_id: CategoryId,
        child_id: CategoryId,
    ) -> Result<Option<Category>, DomainError> {
        let mut categories = self.categories.write().await;
        Ok(categories.get_mut(&parent_id).map(|parent| {
            if !parent.has_child(&child_id) {
                parent.children.push(child_id);
                parent.updated_at = Utc::now();
            }
            parent.clone()
        }))
    }

    async fn fetch_tree(
        &self,
        root: TreeRoot,
        depth: usize,
    ) -> Result<Vec<CategoryNode>, DomainError> {
        let categories = self.categories.read().await;
        let level = match root {
            TreeRoot::Roots => in_creation_order(categories.values().filter(|c| c.is_root())),
            TreeRoot::Id(id) => categories.get(&id).cloned().into_iter().collect(),
        };
        expand(&categories, level, depth)
    }

    async fn search_by_name(
        &self,
        fragment: &str,
        case_insensitive: bool,
    ) -> Result<Vec<CategoryNode>, DomainError> {
        let pattern = RegexBuilder::new(&regex::escape(fragment))
            .case_insensitive(case_insensitive)
            .build()
            .map_err(DomainError::repository)?;

        let categories = self.categories.read().await;
        let matches = in_creation_order(categories.values().filter(|c| pattern.is_match(&c.name)));
        expand(&categories, matches, 1)
    }
}

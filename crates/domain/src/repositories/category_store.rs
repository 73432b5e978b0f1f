use crate::entities::{Category, CategoryChanges, CategoryId, CategoryNode, ChildLink, NewCategory};
use crate::errors::DomainError;
use async_trait::async_trait;

/// Where a descendant fetch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeRoot {
    /// Every category without a parent.
    Roots,
    /// A single category.
    Id(CategoryId),
}

/// Persistence port for categories.
///
/// Each method is atomic on its own; no method spans more than the documents
/// it names. `children` sets only change through `push_child` and
/// `bulk_pull_children`.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>, DomainError>;
    async fn find_by_ids(&self, ids: &[CategoryId]) -> Result<Vec<Category>, DomainError>;

    /// Persist a new category with an empty `children` set. Fails with
    /// `DuplicateField` when the name is taken.
    async fn create(&self, category: &NewCategory) -> Result<Category, DomainError>;

    async fn update_by_id(
        &self,
        id: CategoryId,
        changes: &CategoryChanges,
    ) -> Result<Option<Category>, DomainError>;
    async fn delete_by_id(&self, id: CategoryId) -> Result<Option<Category>, DomainError>;
    async fn delete_many(&self, ids: &[CategoryId]) -> Result<u64, DomainError>;

    /// Remove every `child_id` from its `parent_id`'s set in one batch.
    async fn bulk_pull_children(&self, links: &[ChildLink]) -> Result<(), DomainError>;

    /// Add `child_id` to the parent's set if not already present.
    async fn push_child(
        &self,
        parent_id: CategoryId,
        child_id: CategoryId,
    ) -> Result<Option<Category>, DomainError>;

    async fn fetch_tree(&self, root: TreeRoot, depth: usize)
        -> Result<Vec<CategoryNode>, DomainError>;

    /// Categories whose name contains `fragment`, with one level of children.
    async fn search_by_name(
        &self,
        fragment: &str,
        case_insensitive: bool,
    ) -> Result<Vec<CategoryNode>, DomainError>;
}

use domain::*;
use infrastructure::*;
use std::sync::Arc;

/// Category Application - wires a store into the tree manager
pub struct CategoryApp {
    pub categories: CategoryTreeManager,
    store: Arc<dyn CategoryStore>,
}

impl CategoryApp {
    /// Back the application with a SQLite file.
    pub fn new(database_path: &str) -> Result<Self, DomainError> {
        // Infrastructure layer - database setup
        let database = Database::new(database_path)?;
        let pool = database.get_pool().clone();
        tracing::info!(database_path, "using SQLite category store");

        Ok(Self::with_store(Arc::new(SqliteCategoryStore::new(pool))))
    }

    /// Back the application with a process-local store.
    pub fn in_memory() -> Self {
        tracing::info!("using in-memory category store");
        Self::with_store(Arc::new(InMemoryCategoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn CategoryStore>) -> Self {
        Self {
            categories: CategoryTreeManager::new(store.clone()),
            store,
        }
    }

    /// Direct access to the underlying store, for inspection and tooling.
    pub fn store(&self) -> &Arc<dyn CategoryStore> {
        &self.store
    }
}

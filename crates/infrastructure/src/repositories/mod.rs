pub mod in_memory_category_store;
pub mod sqlite_category_store;

pub use in_memory_category_store::InMemoryCategoryStore;
pub use sqlite_category_store::SqliteCategoryStore;

pub mod category_tree_manager;
pub mod list_query;

pub use category_tree_manager::CategoryTreeManager;
pub use list_query::{ListQuery, SortField, SortKey};

pub mod category;
pub mod category_node;

pub use category::*;
pub use category_node::*;

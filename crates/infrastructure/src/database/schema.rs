// Database schema for the category store
diesel::table! {
    categories (id) {
        id -> Text,                // UUID, hyphenated
        parent_id -> Nullable<Text>,
        name -> Text,              // normalized, unique
        description -> Text,
        status -> Text,            // active, inactive
        stock_availability -> Bool,
        children -> Text,          // JSON array of child ids
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

pub const CREATE_CATEGORIES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS categories (
        id TEXT PRIMARY KEY NOT NULL,
        parent_id TEXT NULL,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        status TEXT NOT NULL,
        stock_availability BOOLEAN NOT NULL DEFAULT 0,
        children TEXT NOT NULL DEFAULT '[]',
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    )";

pub const CREATE_NAME_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS categories_name_unique ON categories (name)";

pub const CREATE_PARENT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS categories_parent_id ON categories (parent_id)";

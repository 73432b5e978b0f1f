use crate::database::{categories, SqlitePool};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use domain::{
    build_forest, Category, CategoryChanges, CategoryId, CategoryNode, CategoryStatus,
    CategoryStore, ChildLink, DomainError, NewCategory, TreeRoot,
};
use std::collections::BTreeMap;
use uuid::Uuid;

// Database model - separate from domain entity
#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct CategoryModel {
    id: String,
    parent_id: Option<String>,
    name: String,
    description: String,
    status: String,
    stock_availability: bool,
    children: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = categories)]
struct NewCategoryModel {
    id: String,
    parent_id: Option<String>,
    name: String,
    description: String,
    status: String,
    stock_availability: bool,
    children: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = categories)]
struct CategoryChangeset {
    parent_id: Option<Option<String>>,
    name: Option<String>,
    description: Option<String>,
    status: Option<String>,
    stock_availability: Option<bool>,
    updated_at: NaiveDateTime,
}

fn parse_stored_id(raw: &str) -> Result<CategoryId, DomainError> {
    Uuid::parse_str(raw)
        .map_err(|e| DomainError::RepositoryError(format!("corrupt category id {}: {}", raw, e)))
}

fn decode_children(raw: &str) -> Result<Vec<CategoryId>, DieselError> {
    serde_json::from_str(raw).map_err(|e| DieselError::DeserializationError(Box::new(e)))
}

fn encode_children(children: &[CategoryId]) -> Result<String, DieselError> {
    serde_json::to_string(children).map_err(|e| DieselError::SerializationError(Box::new(e)))
}

// Convert between domain and database models
impl TryFrom<CategoryModel> for Category {
    type Error = DomainError;

    fn try_from(model: CategoryModel) -> Result<Self, Self::Error> {
        Ok(Category {
            id: parse_stored_id(&model.id)?,
            parent_id: model.parent_id.as_deref().map(parse_stored_id).transpose()?,
            status: model.status.parse::<CategoryStatus>()?,
            children: decode_children(&model.children).map_err(DomainError::repository)?,
            name: model.name,
            description: model.description,
            stock_availability: model.stock_availability,
            created_at: model.created_at.and_utc(),
            updated_at: model.updated_at.and_utc(),
        })
    }
}

impl From<&NewCategory> for NewCategoryModel {
    fn from(category: &NewCategory) -> Self {
        let now = Utc::now().naive_utc();

        NewCategoryModel {
            id: Uuid::new_v4().to_string(),
            parent_id: category.parent_id.map(|id| id.to_string()),
            name: category.name.clone(),
            description: category.description.clone(),
            status: category.status.as_str().to_string(),
            stock_availability: category.stock_availability,
            children: "[]".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<&CategoryChanges> for CategoryChangeset {
    fn from(changes: &CategoryChanges) -> Self {
        CategoryChangeset {
            parent_id: changes
                .parent_id
                .map(|parent| parent.map(|id| id.to_string())),
            name: changes.name.clone(),
            description: changes.description.clone(),
            status: changes.status.map(|status| status.as_str().to_string()),
            stock_availability: changes.stock_availability,
            updated_at: Utc::now().naive_utc(),
        }
    }
}

fn into_domain(models: Vec<CategoryModel>) -> Result<Vec<Category>, DomainError> {
    models.into_iter().map(Category::try_from).collect()
}

fn find_model(conn: &mut SqliteConnection, id: &str) -> QueryResult<Option<CategoryModel>> {
    categories::table
        .filter(categories::id.eq(id))
        .select(CategoryModel::as_select())
        .first::<CategoryModel>(conn)
        .optional()
}

fn load_by_ids(
    conn: &mut SqliteConnection,
    ids: &[CategoryId],
) -> Result<Vec<Category>, DomainError> {
    let keys: Vec<String> = ids.iter().map(ToString::to_string).collect();
    let models = categories::table
        .filter(categories::id.eq_any(keys))
        .order((categories::created_at.asc(), categories::id.asc()))
        .select(CategoryModel::as_select())
        .load::<CategoryModel>(conn)
        .map_err(DomainError::repository)?;
    into_domain(models)
}

fn write_children(
    conn: &mut SqliteConnection,
    id: &str,
    children: &[CategoryId],
) -> QueryResult<usize> {
    diesel::update(categories::table.filter(categories::id.eq(id)))
        .set((
            categories::children.eq(encode_children(children)?),
            categories::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
}

/// Map a write failure, turning a unique-index hit on `name` into a
/// duplicate-field error.
fn write_error(err: DieselError, name: Option<&str>) -> DomainError {
    match (err, name) {
        (DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _), Some(name)) => {
            DomainError::DuplicateField {
                field: "name".to_string(),
                value: name.to_string(),
            }
        }
        (other, _) => DomainError::repository(other),
    }
}

fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

pub struct SqliteCategoryStore {
    pool: SqlitePool,
}

impl SqliteCategoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run `op` on a pooled connection off the async runtime.
    async fn run<T, F>(&self, op: F) -> Result<T, DomainError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, DomainError> + Send + 'static,
    {
        let mut conn = self.pool.get().map_err(DomainError::repository)?;

        tokio::task::spawn_blocking(move || op(&mut conn))
            .await
            .map_err(DomainError::repository)?
    }
}

#[async_trait]
impl CategoryStore for SqliteCategoryStore {
    async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>, DomainError> {
        self.run(move |conn| {
            find_model(conn, &id.to_string())
                .map_err(DomainError::repository)?
                .map(Category::try_from)
                .transpose()
        })
        .await
    }

    async fn find_by_ids(&self, ids: &[CategoryId]) -> Result<Vec<Category>, DomainError> {
        let ids = ids.to_vec();
        self.run(move |conn| load_by_ids(conn, &ids)).await
    }

    async fn create(&self, category: &NewCategory) -> Result<Category, DomainError> {
        let new_category = NewCategoryModel::from(category);

        self.run(move |conn| {
            let name = new_category.name.clone();
            let model = conn
                .immediate_transaction::<_, DieselError, _>(|conn| {
                    diesel::insert_into(categories::table)
                        .values(&new_category)
                        .execute(conn)?;

                    categories::table
                        .filter(categories::id.eq(&new_category.id))
                        .select(CategoryModel::as_select())
                        .first::<CategoryModel>(conn)
                })
                .map_err(|e| write_error(e, Some(name.as_str())))?;
            tracing::debug!(id = %model.id, name = %model.name, "inserted category row");
            Category::try_from(model)
        })
        .await
    }

    async fn update_by_id(
        &self,
        id: CategoryId,
        changes: &CategoryChanges,
    ) -> Result<Option<Category>, DomainError> {
        let changeset = CategoryChangeset::from(changes);
        let key = id.to_string();

        self.run(move |conn| {
            let name = changeset.name.clone();
            conn.immediate_transaction::<_, DieselError, _>(|conn| {
                let updated = diesel::update(categories::table.filter(categories::id.eq(&key)))
                    .set(&changeset)
                    .execute(conn)?;
                if updated == 0 {
                    return Ok(None);
                }
                find_model(conn, &key)
            })
            .map_err(|e| write_error(e, name.as_deref()))?
            .map(Category::try_from)
            .transpose()
        })
        .await
    }

    async fn delete_by_id(&self, id: CategoryId) -> Result<Option<Category>, DomainError> {
        let key = id.to_string();

        self.run(move |conn| {
            conn.immediate_transaction::<_, DieselError, _>(|conn| {
                let existing = find_model(conn, &key)?;
                if existing.is_some() {
                    diesel::delete(categories::table.filter(categories::id.eq(&key)))
                        .execute(conn)?;
                }
                Ok(existing)
            })
            .map_err(DomainError::repository)?
            .map(Category::try_from)
            .transpose()
        })
        .await
    }

    async fn delete_many(&self, ids: &[CategoryId]) -> Result<u64, DomainError> {
        let keys: Vec<String> = ids.iter().map(ToString::to_string).collect();

        self.run(move |conn| {
            let deleted = diesel::delete(categories::table.filter(categories::id.eq_any(keys)))
                .execute(conn)
                .map_err(DomainError::repository)?;
            Ok(deleted as u64)
        })
        .await
    }

    async fn bulk_pull_children(&self, links: &[ChildLink]) -> Result<(), DomainError> {
        let mut by_parent: BTreeMap<String, Vec<CategoryId>> = BTreeMap::new();
        for link in links {
            by_parent
                .entry(link.parent_id.to_string())
                .or_default()
                .push(link.child_id);
        }

        self.run(move |conn| {
            conn.immediate_transaction::<_, DieselError, _>(|conn| {
                for (parent, pulled) in &by_parent {
                    let Some(model) = find_model(conn, parent)? else {
                        continue;
                    };
                    let mut children = decode_children(&model.children)?;
                    let before = children.len();
                    children.retain(|child| !pulled.contains(child));
                    if children.len() != before {
                        write_children(conn, parent, &children)?;
                    }
                }
                Ok(())
            })
            .map_err(DomainError::repository)
        })
        .await
    }

    async fn push_child(
        &self,
        parent_id: CategoryId,
        child_id: CategoryId,
    ) -> Result<Option<Category>, DomainError> {
        let key = parent_id.to_string();

        self.run(move |conn| {
            conn.immediate_transaction::<_, DieselError, _>(|conn| {
                let Some(model) = find_model(conn, &key)? else {
                    return Ok(None);
                };
                let mut children = decode_children(&model.children)?;
                if !children.contains(&child_id) {
                    children.push(child_id);
                    write_children(conn, &key, &children)?;
                }
                find_model(conn, &key)
            })
            .map_err(DomainError::repository)?
            .map(Category::try_from)
            .transpose()
        })
        .await
    }

    async fn fetch_tree(
        &self,
        root: TreeRoot,
        depth: usize,
    ) -> Result<Vec<CategoryNode>, DomainError> {
        self.run(move |conn| {
            let level = match root {
                TreeRoot::Roots => categories::table
                    .filter(categories::parent_id.is_null())
                    .order((categories::created_at.asc(), categories::id.asc()))
                    .select(CategoryModel::as_select())
                    .load::<CategoryModel>(conn),
                TreeRoot::Id(id) => categories::table
                    .filter(categories::id.eq(id.to_string()))
                    .select(CategoryModel::as_select())
                    .load::<CategoryModel>(conn),
            }
            .map_err(DomainError::repository)?;

            build_forest(into_domain(level)?, depth, &mut |ids: &[CategoryId]| {
                load_by_ids(conn, ids)
            })
        })
        .await
    }

    async fn search_by_name(
        &self,
        fragment: &str,
        case_insensitive: bool,
    ) -> Result<Vec<CategoryNode>, DomainError> {
        let fragment = fragment.to_string();

        self.run(move |conn| {
            // LIKE is ASCII case-insensitive; narrow it down for exact matching.
            let candidates = categories::table
                .filter(categories::name.like(like_pattern(&fragment)).escape('\\'))
                .order((categories::created_at.asc(), categories::id.asc()))
                .select(CategoryModel::as_select())
                .load::<CategoryModel>(conn)
                .map_err(DomainError::repository)?;

            let needle = fragment.to_lowercase();
            let matches: Vec<CategoryModel> = candidates
                .into_iter()
                .filter(|model| {
                    if case_insensitive {
                        model.name.to_lowercase().contains(&needle)
                    } else {
                        model.name.contains(&fragment)
                    }
                })
                .collect();

            build_forest(into_domain(matches)?, 1, &mut |ids: &[CategoryId]| {
                load_by_ids(conn, ids)
            })
        })
        .await
    }
}

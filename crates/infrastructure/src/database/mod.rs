use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use domain::DomainError;

pub mod schema;
pub use schema::*;

pub type SqlitePool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

const BUSY_TIMEOUT_MS: u32 = 5_000;

#[derive(Debug)]
struct ConnectionOptions {
    busy_timeout_ms: u32,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute(&format!("PRAGMA busy_timeout = {};", self.busy_timeout_ms))
            .map_err(r2d2::Error::QueryError)
    }
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the SQLite file and make sure the schema exists.
    pub fn new(database_path: &str) -> Result<Self, DomainError> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_path);
        let mut builder = r2d2::Pool::builder().connection_customizer(Box::new(ConnectionOptions {
            busy_timeout_ms: BUSY_TIMEOUT_MS,
        }));
        if database_path == ":memory:" {
            // Every connection would otherwise get its own empty database.
            builder = builder.max_size(1);
        }
        let pool = builder.build(manager).map_err(DomainError::repository)?;

        let mut conn = pool.get().map_err(DomainError::repository)?;
        conn.batch_execute(&format!(
            "{}; {}; {};",
            CREATE_CATEGORIES_TABLE, CREATE_NAME_INDEX, CREATE_PARENT_INDEX
        ))
        .map_err(DomainError::repository)?;
        tracing::debug!(database_path, "category schema ready");

        Ok(Database { pool })
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }
}

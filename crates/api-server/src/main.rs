use api_server::{router, AppState};
use application::CategoryApp;
use config::{Config, StorageBackend};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let config = Config::from_env(None)?;

    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter.as_str())
        .init();

    info!("🚀 Starting category tree API server");
    info!(environment = %config.environment, storage = %config.storage, "configuration loaded");

    let app = match config.storage {
        StorageBackend::Sqlite => {
            info!("💾 Using database: {}", config.database_path);
            CategoryApp::new(&config.database_path)?
        }
        StorageBackend::Memory => CategoryApp::in_memory(),
    };
    let state = AppState::new(app, !config.environment.is_production());

    let bind_address = config.api_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("🌐 API Server listening on http://{}", bind_address);
    info!("📖 API Documentation:");
    info!("   POST   /createCategory          - Create a category (parentId null for a root)");
    info!("   GET    /getParentById/:id       - Category with two levels of children");
    info!("   PATCH  /updateCategory/:id      - Update fields or move a category");
    info!("   GET    /allCategories           - Root categories (filter, page, sort, fields)");
    info!("   DELETE /deleteCategoryById/:id  - Delete a category without children");
    info!("   POST   /deleteCategoriesById    - Delete several categories by id");
    info!("   GET    /searchByChildName/:key  - Case-insensitive name search");
    info!("   GET    /health                  - Health check");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

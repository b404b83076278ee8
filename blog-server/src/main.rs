use anyhow::Context;
use tracing::info;

use blog_server::application::AppState;
use blog_server::data::Repositories;
use blog_server::infrastructure::config::{AppConfig, StorageBackend};
use blog_server::infrastructure::database::{create_pool, run_migrations};
use blog_server::infrastructure::logging::init_logging;
use blog_server::infrastructure::security::JwtKeys;
use blog_server::utils::start_server;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let repos = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = create_pool(url)
                .await
                .context("failed to connect to database")?;
            run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            Repositories::postgres(pool)
        }
        StorageBackend::Memory => {
            info!("using in-memory storage; data is lost on shutdown");
            Repositories::in_memory()
        }
    };

    let state = AppState::new(repos, JwtKeys::new(config.jwt_secret.clone()));
    start_server(config, state).await
}

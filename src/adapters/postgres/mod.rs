//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresConversationRepository` - Conversations, questions and messages
//! - `connect` - Pool construction from [`DatabaseConfig`], with optional migrations

mod conversation_repository;

pub use conversation_repository::PostgresConversationRepository;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;
use crate::ports::RepositoryError;

/// Opens a connection pool and, if configured, applies pending migrations.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, RepositoryError> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .connect(config.url())
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to connect: {}", e)))?;

    if config.run_migrations {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to run migrations: {}", e)))?;
    }

    Ok(pool)
}

//! Storage implementations.

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::interfaces::StudentGateway;

pub mod mock;
pub mod schema;
pub mod sqlite;

pub use mock::MockStudentStore;
pub use sqlite::SqliteStudentStore;

/// Initialize the student gateway for the configured backend.
pub async fn init_storage(
    config: &StorageConfig,
) -> Result<Arc<dyn StudentGateway>, Box<dyn std::error::Error>> {
    match config.storage_type {
        StorageType::Sqlite => {
            info!("Storage: sqlite at {}", config.path);

            if let Some(parent) = std::path::Path::new(&config.path).parent() {
                std::fs::create_dir_all(parent)?;
            }

            let pool =
                sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", config.path)).await?;

            let store = SqliteStudentStore::new(pool);
            store.init().await?;

            Ok(Arc::new(store))
        }
        StorageType::Mock => {
            info!("Storage: in-memory mock");
            Ok(Arc::new(MockStudentStore::new()))
        }
    }
}

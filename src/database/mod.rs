pub mod memory;
pub mod models;
pub mod mutation;
pub mod postgres;
pub mod record;
pub mod schema;
pub mod store;

pub use memory::MemoryStore;
pub use mutation::{build_insert, build_update, MutationError, WriteInstruction, WriteKind};
pub use postgres::PgStore;
pub use record::{FieldSet, Patch, Record, RecordError};
pub use schema::{FieldSpec, ResourceSchema};
pub use store::{record_id, Selection, Store, StoreError};

use std::sync::Arc;

use crate::config::{DatabaseConfig, StoreBackend};

/// Open the configured store backend, applying migrations when enabled
pub async fn open(config: &DatabaseConfig) -> Result<Arc<dyn Store>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let store = PgStore::connect(config).await?;
            if config.run_migrations {
                store.migrate().await?;
            }
            Ok(Arc::new(store))
        }
    }
}

//! Record store collaborators.
//!
//! The engine only compiles queries. Running them is delegated to a
//! [`RecordStore`]; scoping by container tree additionally needs a
//! [`ContainerHierarchy`]. Two implementations ship with the crate:
//! - [`MemoryStore`]: evaluates compiled predicates over in-memory records
//! - [`PgStore`]: renders them to PostgreSQL through sea-query

mod memory;
mod postgres;

use async_trait::async_trait;

pub use memory::{Dataset, MemoryRecord, MemoryStore};
pub use postgres::PgStore;

use crate::bag::CompiledQuery;
use crate::error::StoreError;
use crate::models::Record;

/// Rows selected by one compiled query.
#[derive(Debug, Clone)]
pub struct Selection<R> {
    /// Ordered rows after the limit was applied.
    pub rows: Vec<R>,
    /// Number of matching rows before the limit was applied.
    pub total: u64,
}

/// Executes compiled queries for records of type `R`.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Select the rows matching `query`, ordered and limited.
    async fn select(&self, query: &CompiledQuery) -> Result<Selection<R>, StoreError>;
}

/// Parent/child structure of containers (pages).
#[async_trait]
pub trait ContainerHierarchy: Send + Sync {
    /// Immediate children of `container`.
    async fn children_of(&self, container: u32) -> Result<Vec<u32>, StoreError>;
}

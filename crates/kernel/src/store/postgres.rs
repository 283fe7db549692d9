//! PostgreSQL record store.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;

use super::{ContainerHierarchy, RecordStore, Selection};
use crate::bag::CompiledQuery;
use crate::bag::sql::{children_sql, count_sql, select_json_sql};
use crate::error::StoreError;
use crate::models::Record;

/// Store backed by a PostgreSQL pool.
///
/// Each selection runs its COUNT and row query in one transaction with a
/// local statement timeout. Container children are cached for the lifetime
/// of the store.
pub struct PgStore {
    pool: PgPool,
    statement_timeout: Duration,
    /// Cache: container uid -> immediate children
    children: DashMap<u32, Vec<u32>>,
}

impl PgStore {
    pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
            children: DashMap::new(),
        }
    }

    /// Forget cached container children.
    pub fn clear_container_cache(&self) {
        self.children.clear();
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for PgStore {
    async fn select(&self, query: &CompiledQuery) -> Result<Selection<R>, StoreError> {
        // SET LOCAL resets when the transaction ends.
        let mut tx = self.pool.begin().await?;

        let timeout = format!(
            "SET LOCAL statement_timeout = '{}ms'",
            self.statement_timeout.as_millis()
        );
        sqlx::query(&timeout).execute(&mut *tx).await?;

        let count = count_sql(query);
        let total: i64 = sqlx::query_scalar(&count).fetch_one(&mut *tx).await?;

        let main = select_json_sql(query);
        tracing::debug!(table = query.table, sql = %main, "running bag query");
        let rows: Vec<serde_json::Value> = sqlx::query_scalar(&main).fetch_all(&mut *tx).await?;

        tx.commit().await?;

        let rows = rows
            .into_iter()
            .map(serde_json::from_value::<R>)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Selection {
            rows,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ContainerHierarchy for PgStore {
    async fn children_of(&self, container: u32) -> Result<Vec<u32>, StoreError> {
        let cached = self
            .children
            .get(&container)
            .map(|children| children.value().clone());
        if let Some(children) = cached {
            return Ok(children);
        }

        let rows: Vec<i64> = sqlx::query_scalar(children_sql())
            .bind(i64::from(container))
            .fetch_all(&self.pool)
            .await?;
        let children: Vec<u32> = rows
            .into_iter()
            .filter_map(|uid| u32::try_from(uid).ok())
            .collect();

        self.children.insert(container, children.clone());
        Ok(children)
    }
}

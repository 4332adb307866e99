use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo_types::{CalculationRecord, CalculationRow};
use crate::db::StoreError;

/// Storage of calculation records. Every lookup is scoped to the owning user.
#[async_trait]
pub trait CalculationStore: Send + Sync {
    async fn insert(&self, record: CalculationRecord) -> Result<CalculationRecord, StoreError>;
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CalculationRecord>, StoreError>;
    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<CalculationRecord>, StoreError>;
    /// Returns whether a record was removed.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgCalculationStore {
    db: PgPool,
}

impl PgCalculationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CalculationStore for PgCalculationStore {
    async fn insert(&self, record: CalculationRecord) -> Result<CalculationRecord, StoreError> {
        let row = sqlx::query_as::<_, CalculationRow>(
            r#"
            INSERT INTO calculations (id, user_id, a, b, kind, result, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, a, b, kind, result, created_at
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.a)
        .bind(record.b)
        .bind(record.kind.as_str())
        .bind(record.result)
        .bind(record.created_at)
        .fetch_one(&self.db)
        .await?;
        row.try_into()
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CalculationRecord>, StoreError> {
        let rows = sqlx::query_as::<_, CalculationRow>(
            r#"
            SELECT id, user_id, a, b, kind, result, created_at
            FROM calculations
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(CalculationRecord::try_from).collect()
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<CalculationRecord>, StoreError> {
        let row = sqlx::query_as::<_, CalculationRow>(
            r#"
            SELECT id, user_id, a, b, kind, result, created_at
            FROM calculations
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        row.map(CalculationRecord::try_from).transpose()
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let done = sqlx::query(r#"DELETE FROM calculations WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

/// In-process store; records are kept in insertion order.
#[derive(Default)]
pub struct MemoryCalculationStore {
    records: RwLock<Vec<CalculationRecord>>,
}

#[async_trait]
impl CalculationStore for MemoryCalculationStore {
    async fn insert(&self, record: CalculationRecord) -> Result<CalculationRecord, StoreError> {
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CalculationRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<CalculationRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !(r.id == id && r.user_id == user_id));
        Ok(records.len() != before)
    }
}

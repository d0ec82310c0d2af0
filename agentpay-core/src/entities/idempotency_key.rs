use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use sqlx::Row;

#[derive(Debug, Clone)]
/// Check whether a key was already recorded in a scope.
pub struct ContainsIdempotencyKey {
    pub scope: &'static str,
    pub key: String,
}

impl Processor<ContainsIdempotencyKey> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ContainsIdempotencyKey")]
    async fn process(&self, query: ContainsIdempotencyKey) -> Result<bool, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM idempotency_keys
                WHERE scope = $1 AND key = $2
            ) AS present
            "#,
        )
        .bind(query.scope)
        .bind(query.key)
        .fetch_one(&self.pool)
        .await?;
        row.try_get("present")
    }
}

#[derive(Debug, Clone)]
/// Record a key. Returns `true` when the key was not present before.
pub struct InsertIdempotencyKey {
    pub scope: &'static str,
    pub key: String,
}

impl Processor<InsertIdempotencyKey> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertIdempotencyKey")]
    async fn process(&self, query: InsertIdempotencyKey) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO idempotency_keys (scope, key)
            VALUES ($1, $2)
            ON CONFLICT (scope, key) DO NOTHING
            "#,
        )
        .bind(query.scope)
        .bind(query.key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone)]
/// Forget a key so the next attempt is allowed to claim it again.
pub struct DeleteIdempotencyKey {
    pub scope: &'static str,
    pub key: String,
}

impl Processor<DeleteIdempotencyKey> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteIdempotencyKey")]
    async fn process(&self, query: DeleteIdempotencyKey) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            DELETE FROM idempotency_keys
            WHERE scope = $1 AND key = $2
            "#,
        )
        .bind(query.scope)
        .bind(query.key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

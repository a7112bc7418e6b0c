// ============================================================================
// Kami Infrastructure - PostgreSQL Activation Code Repository
// File: crates/kami-infrastructure/src/database/postgres/activation_code_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use kami_core::domain::{ActivationCode, CardConsumption, CodeFilter, CodeStatus, RevenueWindow};
use kami_core::error::DomainError;
use kami_core::repositories::ActivationCodeRepository;

use super::{db_error, unique_constraint};

pub(crate) const CODE_COLUMNS: &str =
    "id, card_id, code, status, is_sold, exported, proxy_user_id, created_at, used_at";

pub struct PgActivationCodeRepository {
    pool: PgPool,
}

impl PgActivationCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CodeRow {
    id: Uuid,
    card_id: Uuid,
    code: String,
    status: String,
    is_sold: bool,
    exported: bool,
    proxy_user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
}

impl From<CodeRow> for ActivationCode {
    fn from(row: CodeRow) -> Self {
        ActivationCode {
            id: row.id,
            card_id: row.card_id,
            code: row.code,
            status: CodeStatus::from_str(&row.status).unwrap_or_default(),
            is_sold: row.is_sold,
            exported: row.exported,
            proxy_user_id: row.proxy_user_id,
            created_at: row.created_at,
            used_at: row.used_at,
        }
    }
}

/// Guarded status update shared by the order and code repositories. The row
/// only changes while its stored status still equals `from`.
pub(crate) async fn transition_code<'e, E>(
    executor: E,
    id: &Uuid,
    from: CodeStatus,
    to: CodeStatus,
) -> Result<Option<ActivationCode>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    if !from.can_transition_to(to) {
        return Ok(None);
    }
    let row: Option<CodeRow> = sqlx::query_as(&format!(
        r#"
        UPDATE activation_codes SET
            status = $3,
            used_at = CASE WHEN $3 = 'consumed' THEN NOW() ELSE used_at END
        WHERE id = $1 AND status = $2
        RETURNING {CODE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(from.as_str())
    .bind(to.as_str())
    .fetch_optional(executor)
    .await?;

    Ok(row.map(Into::into))
}

#[async_trait]
impl ActivationCodeRepository for PgActivationCodeRepository {
    async fn create_batch(&self, codes: &[ActivationCode]) -> Result<Vec<ActivationCode>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting code batch"))?;
        let mut created = Vec::with_capacity(codes.len());

        for code in codes {
            let row: CodeRow = sqlx::query_as(&format!(
                r#"
                INSERT INTO activation_codes (
                    id, card_id, code, status, is_sold, exported, proxy_user_id, created_at, used_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING {CODE_COLUMNS}
                "#
            ))
            .bind(code.id)
            .bind(code.card_id)
            .bind(&code.code)
            .bind(code.status.as_str())
            .bind(code.is_sold)
            .bind(code.exported)
            .bind(code.proxy_user_id)
            .bind(code.created_at)
            .bind(code.used_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match unique_constraint(&e) {
                Some(_) => {
                    warn!("Generated activation code collided: {}", code.code);
                    DomainError::DatabaseError("duplicate activation code".to_string())
                }
                None => db_error("inserting activation code")(e),
            })?;
            created.push(row.into());
        }

        tx.commit().await.map_err(db_error("committing code batch"))?;
        info!("Inserted {} activation codes", created.len());
        Ok(created)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<ActivationCode>, DomainError> {
        let row: Option<CodeRow> =
            sqlx::query_as(&format!("SELECT {CODE_COLUMNS} FROM activation_codes WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("finding code by id"))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ActivationCode>, DomainError> {
        let row: Option<CodeRow> =
            sqlx::query_as(&format!("SELECT {CODE_COLUMNS} FROM activation_codes WHERE code = $1"))
                .bind(code)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("finding code"))?;

        Ok(row.map(Into::into))
    }

    async fn list_by_card(&self, card_id: &Uuid, filter: &CodeFilter) -> Result<Vec<ActivationCode>, DomainError> {
        let rows: Vec<CodeRow> = sqlx::query_as(&format!(
            r#"
            SELECT {CODE_COLUMNS} FROM activation_codes
            WHERE card_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR proxy_user_id = $3)
              AND ($4::bool IS NULL OR exported = $4)
            ORDER BY created_at DESC
            "#
        ))
        .bind(card_id)
        .bind(filter.effective_status().map(|s| s.as_str()))
        .bind(filter.proxy_user_id)
        .bind(filter.exported)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing codes of card"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_by_card(&self, card_id: &Uuid, only_unused: bool) -> Result<i64, DomainError> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM activation_codes WHERE card_id = $1 AND (NOT $2 OR status = 'available')",
        )
        .bind(card_id)
        .bind(only_unused)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("counting codes of card"))
    }

    async fn delete_by_card(&self, card_id: &Uuid) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM activation_codes WHERE card_id = $1")
            .bind(card_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("deleting codes of card"))?;

        Ok(result.rows_affected())
    }

    async fn transition(
        &self,
        id: &Uuid,
        from: CodeStatus,
        to: CodeStatus,
    ) -> Result<Option<ActivationCode>, DomainError> {
        transition_code(&self.pool, id, from, to)
            .await
            .map_err(db_error("transitioning code"))
    }

    async fn list_available(&self, proxy_user_id: Option<Uuid>) -> Result<Vec<ActivationCode>, DomainError> {
        let rows: Vec<CodeRow> = sqlx::query_as(&format!(
            r#"
            SELECT {CODE_COLUMNS} FROM activation_codes
            WHERE status = 'available' AND ($1::uuid IS NULL OR proxy_user_id = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(proxy_user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing available codes"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_exported(&self, ids: &[Uuid], proxy_user_id: Option<Uuid>) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE activation_codes SET exported = TRUE
            WHERE id = ANY($1) AND ($2::uuid IS NULL OR proxy_user_id = $2)
            "#,
        )
        .bind(ids)
        .bind(proxy_user_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("marking codes exported"))?;

        Ok(result.rows_affected())
    }

    async fn count_stock(&self, card_id: Option<Uuid>) -> Result<i64, DomainError> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM activation_codes
            WHERE status = 'available' AND NOT is_sold AND ($1::uuid IS NULL OR card_id = $1)
            "#,
        )
        .bind(card_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("counting stock"))
    }

    async fn consumed_by_proxy(
        &self,
        proxy_user_id: &Uuid,
        card_ids: &[Uuid],
        window: RevenueWindow,
    ) -> Result<Vec<CardConsumption>, DomainError> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT card_id, COUNT(*) FROM activation_codes
            WHERE status = 'consumed'
              AND proxy_user_id = $1
              AND card_id = ANY($2)
              AND ($3::timestamptz IS NULL OR used_at >= $3)
              AND ($4::timestamptz IS NULL OR used_at <= $4)
            GROUP BY card_id
            "#,
        )
        .bind(proxy_user_id)
        .bind(card_ids)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("aggregating proxy consumption"))?;

        Ok(rows
            .into_iter()
            .map(|(card_id, consumed)| CardConsumption { card_id, consumed })
            .collect())
    }
}

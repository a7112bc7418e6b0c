//! PostgreSQL proxy/card association repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use kami_core::domain::ProxyCardAssociation;
use kami_core::error::DomainError;
use kami_core::repositories::ProxyRepository;

use super::{db_error, unique_constraint};

pub struct PgProxyRepository {
    pool: PgPool,
}

impl PgProxyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AssociationRow {
    id: Uuid,
    proxy_user_id: Uuid,
    card_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<AssociationRow> for ProxyCardAssociation {
    fn from(row: AssociationRow) -> Self {
        ProxyCardAssociation {
            id: row.id,
            proxy_user_id: row.proxy_user_id,
            card_id: row.card_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ProxyRepository for PgProxyRepository {
    async fn find(&self, proxy_user_id: &Uuid, card_id: &Uuid) -> Result<Option<ProxyCardAssociation>, DomainError> {
        let row: Option<AssociationRow> = sqlx::query_as(
            r#"
            SELECT id, proxy_user_id, card_id, created_at
            FROM proxy_card_associations
            WHERE proxy_user_id = $1 AND card_id = $2
            "#,
        )
        .bind(proxy_user_id)
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("finding proxy association"))?;

        Ok(row.map(Into::into))
    }

    async fn list_all(&self) -> Result<Vec<ProxyCardAssociation>, DomainError> {
        let rows: Vec<AssociationRow> = sqlx::query_as(
            "SELECT id, proxy_user_id, card_id, created_at FROM proxy_card_associations ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing proxy associations"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_proxy(&self, proxy_user_id: &Uuid) -> Result<Vec<ProxyCardAssociation>, DomainError> {
        let rows: Vec<AssociationRow> = sqlx::query_as(
            r#"
            SELECT id, proxy_user_id, card_id, created_at
            FROM proxy_card_associations
            WHERE proxy_user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(proxy_user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing associations of proxy"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(&self, association: &ProxyCardAssociation) -> Result<ProxyCardAssociation, DomainError> {
        let row: AssociationRow = sqlx::query_as(
            r#"
            INSERT INTO proxy_card_associations (id, proxy_user_id, card_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, proxy_user_id, card_id, created_at
            "#,
        )
        .bind(association.id)
        .bind(association.proxy_user_id)
        .bind(association.card_id)
        .bind(association.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match unique_constraint(&e) {
            Some(_) => DomainError::DatabaseError("duplicate proxy association".to_string()),
            None => db_error("creating proxy association")(e),
        })?;

        Ok(row.into())
    }

    async fn delete(&self, proxy_user_id: &Uuid, card_ids: &[Uuid]) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "DELETE FROM proxy_card_associations WHERE proxy_user_id = $1 AND card_id = ANY($2)",
        )
        .bind(proxy_user_id)
        .bind(card_ids)
        .execute(&self.pool)
        .await
        .map_err(db_error("deleting proxy associations"))?;

        Ok(result.rows_affected())
    }
}

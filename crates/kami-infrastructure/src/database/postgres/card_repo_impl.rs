//! PostgreSQL card repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use kami_core::domain::Card;
use kami_core::error::DomainError;
use kami_core::repositories::{CardFilter, CardRepository};

use super::{db_error, unique_constraint};

const CARD_COLUMNS: &str =
    "id, name, description, price, is_active, channel_id, created_at, modified_at";

pub struct PgCardRepository {
    pool: PgPool,
}

impl PgCardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CardRow {
    id: Uuid,
    name: String,
    description: String,
    price: f64,
    is_active: bool,
    channel_id: Uuid,
    created_at: DateTime<Utc>,
    modified_at: Option<DateTime<Utc>>,
}

impl From<CardRow> for Card {
    fn from(row: CardRow) -> Self {
        Card {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            is_active: row.is_active,
            channel_id: row.channel_id,
            created_at: row.created_at,
            modified_at: row.modified_at,
        }
    }
}

fn map_write_error(card: &Card) -> impl Fn(sqlx::Error) -> DomainError + '_ {
    move |e| match unique_constraint(&e) {
        Some(_) => DomainError::CardNameAlreadyExists(card.name.clone()),
        None => db_error("writing card")(e),
    }
}

#[async_trait]
impl CardRepository for PgCardRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Card>, DomainError> {
        let row: Option<CardRow> =
            sqlx::query_as(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("finding card by id"))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Card>, DomainError> {
        let row: Option<CardRow> =
            sqlx::query_as(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE name = $1"))
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("finding card by name"))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Card>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<CardRow> =
            sqlx::query_as(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ANY($1)"))
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("finding cards by ids"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list(&self, filter: CardFilter) -> Result<Vec<Card>, DomainError> {
        let rows: Vec<CardRow> = sqlx::query_as(&format!(
            r#"
            SELECT {CARD_COLUMNS} FROM cards
            WHERE ($1 OR is_active)
              AND ($2::uuid IS NULL OR channel_id = $2)
            ORDER BY created_at ASC
            "#
        ))
        .bind(filter.include_inactive)
        .bind(filter.channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing cards"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(&self, card: &Card) -> Result<Card, DomainError> {
        let row: CardRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO cards (
                id, name, description, price, is_active, channel_id, created_at, modified_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(card.id)
        .bind(&card.name)
        .bind(&card.description)
        .bind(card.price)
        .bind(card.is_active)
        .bind(card.channel_id)
        .bind(card.created_at)
        .bind(card.modified_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error(card))?;

        Ok(row.into())
    }

    async fn update(&self, card: &Card) -> Result<Card, DomainError> {
        let row: Option<CardRow> = sqlx::query_as(&format!(
            r#"
            UPDATE cards SET
                name = $2, description = $3, price = $4,
                is_active = $5, channel_id = $6, modified_at = $7
            WHERE id = $1
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(card.id)
        .bind(&card.name)
        .bind(&card.description)
        .bind(card.price)
        .bind(card.is_active)
        .bind(card.channel_id)
        .bind(card.modified_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error(card))?;

        row.map(Into::into).ok_or(DomainError::CardNotFound)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("deleting card"))?;

        Ok(result.rows_affected() > 0)
    }
}

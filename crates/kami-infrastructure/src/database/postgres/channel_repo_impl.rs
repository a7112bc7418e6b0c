//! PostgreSQL channel repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use kami_core::domain::Channel;
use kami_core::error::DomainError;
use kami_core::repositories::ChannelRepository;

use super::{db_error, unique_constraint};

pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ChannelRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    modified_at: Option<DateTime<Utc>>,
}

impl From<ChannelRow> for Channel {
    fn from(row: ChannelRow) -> Self {
        Channel {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            modified_at: row.modified_at,
        }
    }
}

fn map_write_error(channel: &Channel) -> impl Fn(sqlx::Error) -> DomainError + '_ {
    move |e| match unique_constraint(&e) {
        Some(_) => DomainError::ChannelNameAlreadyExists(channel.name.clone()),
        None => db_error("writing channel")(e),
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Channel>, DomainError> {
        let row: Option<ChannelRow> = sqlx::query_as(
            "SELECT id, name, description, created_at, modified_at FROM channels WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("finding channel by id"))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Channel>, DomainError> {
        let row: Option<ChannelRow> = sqlx::query_as(
            "SELECT id, name, description, created_at, modified_at FROM channels WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("finding channel by name"))?;

        Ok(row.map(Into::into))
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Channel>, DomainError> {
        let rows: Vec<ChannelRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, created_at, modified_at
            FROM channels
            ORDER BY created_at ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing channels"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(&self, channel: &Channel) -> Result<Channel, DomainError> {
        let row: ChannelRow = sqlx::query_as(
            r#"
            INSERT INTO channels (id, name, description, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, created_at, modified_at
            "#,
        )
        .bind(channel.id)
        .bind(&channel.name)
        .bind(&channel.description)
        .bind(channel.created_at)
        .bind(channel.modified_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error(channel))?;

        Ok(row.into())
    }

    async fn update(&self, channel: &Channel) -> Result<Channel, DomainError> {
        let row: Option<ChannelRow> = sqlx::query_as(
            r#"
            UPDATE channels SET name = $2, description = $3, modified_at = $4
            WHERE id = $1
            RETURNING id, name, description, created_at, modified_at
            "#,
        )
        .bind(channel.id)
        .bind(&channel.name)
        .bind(&channel.description)
        .bind(channel.modified_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error(channel))?;

        row.map(Into::into).ok_or(DomainError::ChannelNotFound)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM channels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("deleting channel"))?;

        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Kami Infrastructure - PostgreSQL User Repository
// File: crates/kami-infrastructure/src/database/postgres/user_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use kami_core::domain::{Role, User, UserStatus};
use kami_core::error::DomainError;
use kami_core::repositories::UserRepository;
use kami_shared::Pagination;

use super::{db_error, unique_constraint};

const USER_COLUMNS: &str =
    "id, username, email, name, password_hash, role, status, channel_id, created_at, modified_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    name: Option<String>,
    password_hash: String,
    role: String,
    status: String,
    channel_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    modified_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            role: Role::from_str(&row.role).unwrap_or_default(),
            status: UserStatus::from_str(&row.status).unwrap_or_default(),
            channel_id: row.channel_id,
            created_at: row.created_at,
            modified_at: row.modified_at,
        }
    }
}

fn map_write_error(user: &User) -> impl Fn(sqlx::Error) -> DomainError + '_ {
    move |e| match unique_constraint(&e) {
        Some(constraint) if constraint.contains("email") => {
            DomainError::EmailAlreadyExists(user.email.clone())
        }
        Some(_) => DomainError::UsernameAlreadyExists(user.username.clone()),
        None => db_error("writing user")(e),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("finding user by id"))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("finding user by username"))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("finding user by email"))?;

        Ok(row.map(Into::into))
    }

    async fn create(&self, user: &User) -> Result<User, DomainError> {
        info!("Creating user: {}", user.username);

        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (
                id, username, email, name, password_hash,
                role, status, channel_id, created_at, modified_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.channel_id)
        .bind(user.created_at)
        .bind(user.modified_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error(user))?;

        Ok(row.into())
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                email = $2, name = $3, password_hash = $4, role = $5,
                status = $6, channel_id = $7, modified_at = $8
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.channel_id)
        .bind(user.modified_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error(user))?;

        row.map(Into::into).ok_or(DomainError::UserNotFound)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("deleting user"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, role: Option<Role>, page: Pagination) -> Result<Vec<User>, DomainError> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::text IS NULL OR role = $1)
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(role.map(|r| r.as_str()))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing users"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self, role: Option<Role>) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR role = $1)")
            .bind(role.map(|r| r.as_str()))
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("counting users"))
    }

    async fn find_staff_by_channel(&self, channel_id: &Uuid) -> Result<Vec<User>, DomainError> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE role = 'staff' AND status = 'active' AND channel_id = $1
            "#
        ))
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("finding channel staff"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn search_proxies(&self, query: &str) -> Result<Vec<User>, DomainError> {
        let pattern = format!("%{}%", query.to_lowercase());
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE role = 'proxy'
              AND (LOWER(username) LIKE $1 OR LOWER(COALESCE(name, '')) LIKE $1)
            ORDER BY username
            "#
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("searching proxies"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Kami Infrastructure - PostgreSQL Order Repository
// File: crates/kami-infrastructure/src/database/postgres/order_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use kami_core::domain::{CodeStatus, Order, OrderStats, OrderStatus};
use kami_core::error::DomainError;
use kami_core::repositories::OrderRepository;

use super::activation_code_repo_impl::transition_code;
use super::db_error;

const ORDER_COLUMNS: &str =
    "id, activation_code, user_id, channel_id, card_name, status, remarks, created_at, completed_at";

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    activation_code: String,
    user_id: Uuid,
    channel_id: Uuid,
    card_name: String,
    status: String,
    remarks: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            activation_code: row.activation_code,
            user_id: row.user_id,
            channel_id: row.channel_id,
            card_name: row.card_name,
            status: OrderStatus::from_str(&row.status).unwrap_or_default(),
            remarks: row.remarks,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StatsRow {
    total: i64,
    pending: i64,
    processing: i64,
    completed: i64,
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("finding order by id"))?;

        Ok(row.map(Into::into))
    }

    async fn list(&self, status: Option<OrderStatus>, limit: i64, offset: i64) -> Result<Vec<Order>, DomainError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing orders"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_status(&self, status: OrderStatus, channel_id: Option<Uuid>) -> Result<Vec<Order>, DomainError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE status = $1 AND ($2::uuid IS NULL OR channel_id = $2)
            ORDER BY created_at ASC
            "#
        ))
        .bind(status.as_str())
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing orders by status"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_user(&self, user_id: &Uuid) -> Result<Vec<Order>, DomainError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing orders of user"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn stats(&self) -> Result<OrderStats, DomainError> {
        let row: StatsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'processing') AS processing,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed
            FROM orders
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("computing order stats"))?;

        Ok(OrderStats {
            total_orders: row.total,
            pending_orders: row.pending,
            processing_orders: row.processing,
            completed_orders: row.completed,
        })
    }

    async fn create_with_reservation(&self, code_id: &Uuid, order: &Order) -> Result<Order, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting reservation"))?;

        let reserved = transition_code(&mut *tx, code_id, CodeStatus::Available, CodeStatus::Consuming)
            .await
            .map_err(db_error("reserving code"))?;
        if reserved.is_none() {
            warn!("Code {} was taken before it could be reserved", order.activation_code);
            return Err(DomainError::InvalidCodeStatus(format!(
                "{} is no longer available",
                order.activation_code
            )));
        }

        let row: OrderRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO orders (
                id, activation_code, user_id, channel_id, card_name,
                status, remarks, created_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.id)
        .bind(&order.activation_code)
        .bind(order.user_id)
        .bind(order.channel_id)
        .bind(&order.card_name)
        .bind(order.status.as_str())
        .bind(&order.remarks)
        .bind(order.created_at)
        .bind(order.completed_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("inserting order"))?;

        tx.commit().await.map_err(db_error("committing reservation"))?;
        info!("Order {} stored with code reserved", row.id);
        Ok(row.into())
    }

    async fn complete_with_consumption(&self, code_id: &Uuid, order: &Order) -> Result<Order, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting completion"))?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order.id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("locking order"))?;
        match current.as_deref().and_then(OrderStatus::from_str) {
            None => return Err(DomainError::OrderNotFound),
            Some(OrderStatus::Completed) => return Err(DomainError::OrderAlreadyCompleted),
            Some(_) => {}
        }

        let consumed = transition_code(&mut *tx, code_id, CodeStatus::Consuming, CodeStatus::Consumed)
            .await
            .map_err(db_error("consuming code"))?;
        if consumed.is_none() {
            return Err(DomainError::InvalidCodeStatus(format!(
                "{} is not being consumed",
                order.activation_code
            )));
        }

        let row: OrderRow = sqlx::query_as(&format!(
            r#"
            UPDATE orders SET status = $2, remarks = $3, completed_at = $4
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(&order.remarks)
        .bind(order.completed_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("completing order"))?;

        tx.commit().await.map_err(db_error("committing completion"))?;
        Ok(row.into())
    }
}

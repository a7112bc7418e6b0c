//! PostgreSQL sale repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use kami_core::domain::{Sale, SaleRequest, SaleTotals};
use kami_core::error::DomainError;
use kami_core::repositories::SaleRepository;

use super::db_error;

const SALE_COLUMNS: &str =
    "id, user_id, card_id, card_name, activation_code, user_email, sale_price, channel_id, purchased_at";

pub struct PgSaleRepository {
    pool: PgPool,
}

impl PgSaleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: Uuid,
    user_id: Uuid,
    card_id: Uuid,
    card_name: String,
    activation_code: String,
    user_email: String,
    sale_price: f64,
    channel_id: Uuid,
    purchased_at: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            user_id: row.user_id,
            card_id: row.card_id,
            card_name: row.card_name,
            activation_code: row.activation_code,
            user_email: row.user_email,
            sale_price: row.sale_price,
            channel_id: row.channel_id,
            purchased_at: row.purchased_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TotalsRow {
    total_sales: i64,
    total_revenue: f64,
    today_sales: i64,
    today_revenue: f64,
}

#[async_trait]
impl SaleRepository for PgSaleRepository {
    async fn create_with_claim(&self, request: &SaleRequest) -> Result<Option<Sale>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("starting sale"))?;

        let claimed: Option<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT id, code FROM activation_codes
            WHERE card_id = $1 AND status = 'available' AND NOT is_sold
            ORDER BY created_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(request.card_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("claiming code for sale"))?;

        let Some((code_id, code)) = claimed else {
            debug!("No stock left for card {}", request.card_id);
            return Ok(None);
        };

        sqlx::query("UPDATE activation_codes SET is_sold = TRUE WHERE id = $1")
            .bind(code_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("marking code sold"))?;

        let sale = request.clone().into_sale(code, Utc::now());
        let row: SaleRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO sales (
                id, user_id, card_id, card_name, activation_code,
                user_email, sale_price, channel_id, purchased_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {SALE_COLUMNS}
            "#
        ))
        .bind(sale.id)
        .bind(sale.user_id)
        .bind(sale.card_id)
        .bind(&sale.card_name)
        .bind(&sale.activation_code)
        .bind(&sale.user_email)
        .bind(sale.sale_price)
        .bind(sale.channel_id)
        .bind(sale.purchased_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("inserting sale"))?;

        tx.commit().await.map_err(db_error("committing sale"))?;
        Ok(Some(row.into()))
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Sale>, DomainError> {
        let rows: Vec<SaleRow> = sqlx::query_as(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY purchased_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing sales"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Sale>, DomainError> {
        let rows: Vec<SaleRow> = sqlx::query_as(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE LOWER(user_email) = LOWER($1) ORDER BY purchased_at DESC"
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing sales by email"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn totals(&self, today_start: DateTime<Utc>) -> Result<SaleTotals, DomainError> {
        let row: TotalsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_sales,
                COALESCE(SUM(sale_price), 0)::float8 AS total_revenue,
                COUNT(*) FILTER (WHERE purchased_at >= $1) AS today_sales,
                COALESCE(SUM(sale_price) FILTER (WHERE purchased_at >= $1), 0)::float8 AS today_revenue
            FROM sales
            "#,
        )
        .bind(today_start)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("computing sale totals"))?;

        Ok(SaleTotals {
            total_sales: row.total_sales,
            total_revenue: row.total_revenue,
            today_sales: row.today_sales,
            today_revenue: row.today_revenue,
        })
    }
}

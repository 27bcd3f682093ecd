//! PostgreSQL implementation of WebhookEventRepository.
//!
//! Idempotency rests on the `payment_webhook_events_event_id_key` unique
//! constraint: inserts use `ON CONFLICT (event_id) DO NOTHING` and report
//! whether a row was written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::audit_log_repository::corrupt;
use crate::domain::foundation::{
    AcademyId, Currency, DomainError, ErrorCode, Money, PaymentId, Timestamp,
};
use crate::domain::payment::Gateway;
use crate::domain::webhook::{NewWebhookEvent, WebhookEvent};
use crate::ports::{SaveResult, WebhookEventRepository};

pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    gateway: String,
    event_type: String,
    event_id: String,
    transaction_id: String,
    payment_id: Option<Uuid>,
    academy_id: Option<Uuid>,
    reported_status: String,
    amount_minor: i64,
    currency: String,
    payload: serde_json::Value,
    processed: bool,
    processed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    received_at: DateTime<Utc>,
}

impl TryFrom<WebhookEventRow> for WebhookEvent {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        Ok(WebhookEvent {
            gateway: row.gateway.parse::<Gateway>().map_err(corrupt("gateway"))?,
            event_type: row.event_type,
            event_id: row.event_id,
            transaction_id: row.transaction_id,
            payment_id: row.payment_id.map(PaymentId::from_uuid),
            academy_id: row.academy_id.map(AcademyId::from_uuid),
            reported_status: row.reported_status,
            amount: Money::new(
                row.amount_minor,
                row.currency.parse::<Currency>().map_err(corrupt("currency"))?,
            ),
            payload: row.payload,
            processed: row.processed,
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            error_message: row.error_message,
            received_at: Timestamp::from_datetime(row.received_at),
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT gateway, event_type, event_id, transaction_id, payment_id, academy_id,
           reported_status, amount_minor, currency, payload, processed,
           processed_at, error_message, received_at
    FROM payment_webhook_events
"#;

fn event_not_found(event_id: &str) -> DomainError {
    DomainError::new(ErrorCode::WebhookEventNotFound, "Webhook event not found")
        .with_detail("event_id", event_id)
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError> {
        let found: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM payment_webhook_events WHERE event_id = $1")
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to check event: {}", e)))?;
        Ok(found.is_some())
    }

    async fn record_incoming(&self, event: NewWebhookEvent) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_webhook_events (
                gateway, event_type, event_id, transaction_id, payment_id, academy_id,
                reported_status, amount_minor, currency, payload, processed, received_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, $11)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event.gateway.as_str())
        .bind(&event.event_type)
        .bind(&event.event_id)
        .bind(&event.transaction_id)
        .bind(event.payment_id.map(|id| *id.as_uuid()))
        .bind(event.academy_id.map(|id| *id.as_uuid()))
        .bind(&event.reported_status)
        .bind(event.amount.amount_minor)
        .bind(event.amount.currency.code())
        .bind(&event.payload)
        .bind(event.received_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to record webhook event: {}", e)))?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_webhook_events
            SET processed = TRUE, processed_at = $2, error_message = NULL
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to mark event processed: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(event_not_found(event_id));
        }
        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_webhook_events
            SET processed = TRUE, processed_at = $2, error_message = $3
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(Timestamp::now().as_datetime())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to mark event failed: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(event_not_found(event_id));
        }
        Ok(())
    }

    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<WebhookEvent>, DomainError> {
        let row: Option<WebhookEventRow> =
            sqlx::query_as(&format!("{} WHERE event_id = $1", SELECT_COLUMNS))
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to find event: {}", e)))?;

        row.map(WebhookEvent::try_from).transpose()
    }

    async fn list_unresolved(&self, limit: u32) -> Result<Vec<WebhookEvent>, DomainError> {
        let rows: Vec<WebhookEventRow> = sqlx::query_as(&format!(
            "{} WHERE processed = FALSE OR error_message IS NOT NULL ORDER BY received_at ASC LIMIT $1",
            SELECT_COLUMNS
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list unresolved events: {}", e)))?;

        rows.into_iter().map(WebhookEvent::try_from).collect()
    }
}

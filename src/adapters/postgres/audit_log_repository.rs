//! PostgreSQL implementation of the AuditLog port.
//!
//! Rows in `payment_audit_logs` are inserted and read, never updated or
//! deleted. The ledger reuses [`insert_entry`] inside its own transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::audit::{Actor, AuditAction, AuditLogEntry, AuditMetadata, RequestContext};
use crate::domain::foundation::{
    AuditEntryId, Currency, DomainError, ErrorCode, Money, PaymentId, Timestamp, UserId,
};
use crate::domain::payment::PaymentStatus;
use crate::ports::AuditLog;

pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    payment_id: Uuid,
    user_id: Option<String>,
    action: String,
    status_from: Option<String>,
    status_to: Option<String>,
    amount_minor: i64,
    currency: String,
    transaction_id: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    notes: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditLogEntry {
    type Error = DomainError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let actor = match row.user_id {
            Some(id) => Actor::User(UserId::new(id).map_err(corrupt("user_id"))?),
            None => Actor::System,
        };
        let metadata: AuditMetadata =
            serde_json::from_value(row.metadata).map_err(corrupt("metadata"))?;

        Ok(AuditLogEntry {
            id: AuditEntryId::from_uuid(row.id),
            payment_id: PaymentId::from_uuid(row.payment_id),
            actor,
            action: row.action.parse::<AuditAction>().map_err(corrupt("action"))?,
            status_from: parse_optional_status(row.status_from)?,
            status_to: parse_optional_status(row.status_to)?,
            amount: Money::new(
                row.amount_minor,
                row.currency.parse::<Currency>().map_err(corrupt("currency"))?,
            ),
            transaction_id: row.transaction_id,
            context: RequestContext {
                ip_address: row.ip_address,
                user_agent: row.user_agent,
            },
            notes: row.notes,
            metadata,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_optional_status(value: Option<String>) -> Result<Option<PaymentStatus>, DomainError> {
    value
        .map(|s| s.parse::<PaymentStatus>().map_err(corrupt("status")))
        .transpose()
}

/// Maps a decode failure of a stored column to a database error.
pub(super) fn corrupt<E: std::fmt::Display>(column: &'static str) -> impl Fn(E) -> DomainError {
    move |e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value in storage: {}", column, e),
        )
    }
}

/// Inserts one audit entry using any Postgres executor (pool or transaction).
pub(super) async fn insert_entry<'e, E>(executor: E, entry: &AuditLogEntry) -> Result<(), DomainError>
where
    E: PgExecutor<'e>,
{
    let metadata = serde_json::to_value(&entry.metadata)
        .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO payment_audit_logs (
            id, payment_id, user_id, action, status_from, status_to,
            amount_minor, currency, transaction_id, ip_address, user_agent,
            notes, metadata, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(entry.id.as_uuid())
    .bind(entry.payment_id.as_uuid())
    .bind(entry.actor.user_id().map(|u| u.as_str().to_string()))
    .bind(entry.action.as_str())
    .bind(entry.status_from.map(|s| s.as_str()))
    .bind(entry.status_to.map(|s| s.as_str()))
    .bind(entry.amount.amount_minor)
    .bind(entry.amount.currency.code())
    .bind(&entry.transaction_id)
    .bind(&entry.context.ip_address)
    .bind(&entry.context.user_agent)
    .bind(&entry.notes)
    .bind(metadata)
    .bind(entry.created_at.as_datetime())
    .execute(executor)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.constraint() == Some("payment_audit_logs_payment_id_fkey") {
                return DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
                    .with_detail("payment_id", entry.payment_id.to_string());
            }
        }
        DomainError::database(format!("Failed to insert audit entry: {}", e))
    })?;

    Ok(())
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), DomainError> {
        insert_entry(&self.pool, entry).await
    }

    async fn list_for_payment(
        &self,
        payment_id: &PaymentId,
        action: Option<AuditAction>,
    ) -> Result<Vec<AuditLogEntry>, DomainError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT id, payment_id, user_id, action, status_from, status_to,
                   amount_minor, currency, transaction_id, ip_address, user_agent,
                   notes, metadata, created_at
            FROM payment_audit_logs
            WHERE payment_id = $1
              AND ($2::TEXT IS NULL OR action = $2)
            ORDER BY seq ASC
            "#,
        )
        .bind(payment_id.as_uuid())
        .bind(action.map(|a| a.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list audit entries: {}", e)))?;

        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }
}

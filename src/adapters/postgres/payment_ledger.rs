//! PostgreSQL implementation of PaymentLedger.
//!
//! `apply_transition` runs in one transaction: the payment row is locked with
//! `SELECT ... FOR UPDATE`, the change is decided against the locked row, and
//! the status update, the audit entry and the webhook event's processed flag
//! commit together. Any failure drops the transaction and rolls all of it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::audit_log_repository::{corrupt, insert_entry};
use crate::domain::audit::AuditLogEntry;
use crate::domain::foundation::{
    AcademyId, Currency, DomainError, ErrorCode, Money, PaymentId, Timestamp, UserId,
};
use crate::domain::payment::{Gateway, Payment, PaymentCode, PaymentStatus, TransitionOutcome};
use crate::ports::{PaymentLedger, TransitionRequest};

pub struct PostgresPaymentLedger {
    pool: PgPool,
}

impl PostgresPaymentLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    academy_id: Uuid,
    user_id: Option<String>,
    payment_code: String,
    amount_minor: i64,
    refunded_minor: i64,
    currency: String,
    status: String,
    gateway: String,
    transaction_id: Option<String>,
    reference_code: Option<String>,
    receipt_number: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let currency = row.currency.parse::<Currency>().map_err(corrupt("currency"))?;
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            academy_id: AcademyId::from_uuid(row.academy_id),
            user_id: row
                .user_id
                .map(UserId::new)
                .transpose()
                .map_err(corrupt("user_id"))?,
            payment_code: PaymentCode::from_stored(row.payment_code),
            amount: Money::new(row.amount_minor, currency),
            refunded_minor: row.refunded_minor,
            status: row.status.parse::<PaymentStatus>().map_err(corrupt("status"))?,
            gateway: row.gateway.parse::<Gateway>().map_err(corrupt("gateway"))?,
            transaction_id: row.transaction_id,
            reference_code: row.reference_code,
            receipt_number: row.receipt_number,
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            failure_reason: row.failure_reason,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: row.version,
        })
    }
}

const SELECT_PAYMENT: &str = r#"
    SELECT id, academy_id, user_id, payment_code, amount_minor, refunded_minor,
           currency, status, gateway, transaction_id, reference_code, receipt_number,
           paid_at, failure_reason, created_at, updated_at, version
    FROM payments
"#;

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::database(format!("{}: {}", context, e))
}

async fn write_payment(conn: &mut PgConnection, payment: &Payment) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE payments SET
            status = $2,
            refunded_minor = $3,
            transaction_id = $4,
            receipt_number = $5,
            paid_at = $6,
            failure_reason = $7,
            updated_at = $8,
            version = $9
        WHERE id = $1
        "#,
    )
    .bind(payment.id.as_uuid())
    .bind(payment.status.as_str())
    .bind(payment.refunded_minor)
    .bind(&payment.transaction_id)
    .bind(&payment.receipt_number)
    .bind(payment.paid_at.map(|t| *t.as_datetime()))
    .bind(&payment.failure_reason)
    .bind(payment.updated_at.as_datetime())
    .bind(payment.version)
    .execute(conn)
    .await
    .map_err(db_error("Failed to update payment"))?;
    Ok(())
}

#[async_trait]
impl PaymentLedger for PostgresPaymentLedger {
    async fn create(&self, payment: &Payment, entry: &AuditLogEntry) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, academy_id, user_id, payment_code, amount_minor, refunded_minor,
                currency, status, gateway, transaction_id, reference_code, receipt_number,
                paid_at, failure_reason, created_at, updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.academy_id.as_uuid())
        .bind(payment.user_id.as_ref().map(|u| u.as_str().to_string()))
        .bind(payment.payment_code.as_str())
        .bind(payment.amount.amount_minor)
        .bind(payment.refunded_minor)
        .bind(payment.amount.currency.code())
        .bind(payment.status.as_str())
        .bind(payment.gateway.as_str())
        .bind(&payment.transaction_id)
        .bind(&payment.reference_code)
        .bind(&payment.receipt_number)
        .bind(payment.paid_at.map(|t| *t.as_datetime()))
        .bind(&payment.failure_reason)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .bind(payment.version)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if matches!(
                    db_err.constraint(),
                    Some("payments_pkey") | Some("payments_payment_code_key")
                ) {
                    return DomainError::new(
                        ErrorCode::PaymentExists,
                        format!("Payment {} already exists", payment.id),
                    );
                }
            }
            DomainError::database(format!("Failed to insert payment: {}", e))
        })?;

        insert_entry(&mut *tx, entry).await?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_PAYMENT))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find payment"))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE transaction_id = $1 ORDER BY created_at DESC LIMIT 1",
            SELECT_PAYMENT
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find payment by transaction"))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_reference(
        &self,
        academy_id: Option<&AcademyId>,
        reference_code: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE reference_code = $1 AND ($2::UUID IS NULL OR academy_id = $2) \
             ORDER BY created_at DESC LIMIT 1",
            SELECT_PAYMENT
        ))
        .bind(reference_code)
        .bind(academy_id.map(|a| *a.as_uuid()))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find payment by reference"))?;

        row.map(Payment::try_from).transpose()
    }

    async fn apply_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("{} WHERE id = $1 FOR UPDATE", SELECT_PAYMENT))
                .bind(request.payment_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to lock payment"))?;

        let mut payment = match row {
            Some(row) => Payment::try_from(row)?,
            None => {
                return Err(DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
                    .with_detail("payment_id", request.payment_id.to_string()))
            }
        };

        if let Some(event_id) = &request.event_id {
            let processed: Option<bool> = sqlx::query_scalar(
                "SELECT processed FROM payment_webhook_events WHERE event_id = $1 FOR UPDATE",
            )
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to lock webhook event"))?;

            match processed {
                None => {
                    return Err(DomainError::new(
                        ErrorCode::WebhookEventNotFound,
                        "Webhook event not found",
                    )
                    .with_detail("event_id", event_id.as_str()))
                }
                Some(true) => {
                    return Err(DomainError::new(
                        ErrorCode::WebhookEventProcessed,
                        "Webhook event already processed",
                    )
                    .with_detail("event_id", event_id.as_str()))
                }
                Some(false) => {}
            }
        }

        let now = Timestamp::now();
        let outcome = payment.apply(&request.change, now);
        if outcome.accepted {
            if payment.transaction_id.is_none() {
                payment.transaction_id = request.transaction_id.clone();
            }
            write_payment(&mut *tx, &payment).await?;
        }

        let entry = request.audit.complete(&payment, &outcome, now);
        insert_entry(&mut *tx, &entry).await?;

        if let Some(event_id) = &request.event_id {
            let result = sqlx::query(
                r#"
                UPDATE payment_webhook_events
                SET processed = TRUE, processed_at = $2, error_message = NULL,
                    payment_id = COALESCE(payment_id, $3)
                WHERE event_id = $1
                "#,
            )
            .bind(event_id)
            .bind(now.as_datetime())
            .bind(payment.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to mark event processed"))?;

            if result.rows_affected() == 0 {
                return Err(
                    DomainError::new(ErrorCode::WebhookEventNotFound, "Webhook event not found")
                        .with_detail("event_id", event_id.as_str()),
                );
            }
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;
        Ok(outcome)
    }
}

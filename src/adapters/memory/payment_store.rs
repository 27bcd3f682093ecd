//! In-memory payment store.
//!
//! Implements `PaymentLedger`, `WebhookEventRepository` and `AuditLog` over one
//! set of tables behind a single async mutex. Holding that mutex across a
//! read-check-write is the in-memory equivalent of `SELECT ... FOR UPDATE`.
//!
//! Used by tests and by the service when no database is configured.
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(InMemoryPaymentStore::new());
//! store.insert_payment(payment).await;
//!
//! // Make the next transition fail before commit
//! store.fail_method("apply_transition", DomainError::database("disk full")).await;
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::audit::{AuditAction, AuditLogEntry};
use crate::domain::foundation::{AcademyId, DomainError, ErrorCode, PaymentId, Timestamp};
use crate::domain::payment::{Payment, TransitionOutcome};
use crate::domain::webhook::{NewWebhookEvent, WebhookEvent};
use crate::ports::{AuditLog, PaymentLedger, SaveResult, TransitionRequest, WebhookEventRepository};

#[derive(Default)]
struct Tables {
    payments: HashMap<PaymentId, Payment>,
    events: HashMap<String, WebhookEvent>,
    audit: Vec<AuditLogEntry>,
}

/// In-memory implementation of the three payment ports.
#[derive(Default)]
pub struct InMemoryPaymentStore {
    tables: Mutex<Tables>,
    failures: Mutex<HashMap<String, DomainError>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Inserts a payment directly, without an audit entry.
    pub async fn insert_payment(&self, payment: Payment) {
        self.tables.lock().await.payments.insert(payment.id, payment);
    }

    /// Makes every call to `method` fail with `error` until cleared.
    pub async fn fail_method(&self, method: &str, error: DomainError) {
        self.failures.lock().await.insert(method.to_string(), error);
    }

    /// Makes every call to `method` sleep for `delay` first.
    pub async fn delay_method(&self, method: &str, delay: Duration) {
        self.delays.lock().await.insert(method.to_string(), delay);
    }

    pub async fn clear_failures(&self) {
        self.failures.lock().await.clear();
        self.delays.lock().await.clear();
    }

    /// Number of stored webhook events.
    pub async fn event_count(&self) -> usize {
        self.tables.lock().await.events.len()
    }

    /// Number of audit entries across all payments.
    pub async fn audit_count(&self) -> usize {
        self.tables.lock().await.audit.len()
    }

    async fn check(&self, method: &str) -> Result<(), DomainError> {
        let delay = self.delays.lock().await.get(method).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().await.get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn payment_not_found(id: &PaymentId) -> DomainError {
    DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
        .with_detail("payment_id", id.to_string())
}

fn event_not_found(event_id: &str) -> DomainError {
    DomainError::new(ErrorCode::WebhookEventNotFound, "Webhook event not found")
        .with_detail("event_id", event_id)
}

fn event_processed(event_id: &str) -> DomainError {
    DomainError::new(ErrorCode::WebhookEventProcessed, "Webhook event already processed")
        .with_detail("event_id", event_id)
}

#[async_trait]
impl PaymentLedger for InMemoryPaymentStore {
    async fn create(&self, payment: &Payment, entry: &AuditLogEntry) -> Result<(), DomainError> {
        self.check("create").await?;
        let mut tables = self.tables.lock().await;
        if tables.payments.contains_key(&payment.id) {
            return Err(DomainError::new(
                ErrorCode::PaymentExists,
                format!("Payment {} already exists", payment.id),
            ));
        }
        tables.payments.insert(payment.id, payment.clone());
        tables.audit.push(entry.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        self.check("find_by_id").await?;
        Ok(self.tables.lock().await.payments.get(id).cloned())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        self.check("find_by_transaction_id").await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .payments
            .values()
            .find(|p| p.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn find_by_reference(
        &self,
        academy_id: Option<&AcademyId>,
        reference_code: &str,
    ) -> Result<Option<Payment>, DomainError> {
        self.check("find_by_reference").await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .payments
            .values()
            .find(|p| {
                p.reference_code.as_deref() == Some(reference_code)
                    && academy_id.map_or(true, |a| &p.academy_id == a)
            })
            .cloned())
    }

    async fn apply_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut tables = self.tables.lock().await;

        let mut payment = tables
            .payments
            .get(&request.payment_id)
            .cloned()
            .ok_or_else(|| payment_not_found(&request.payment_id))?;

        if let Some(event_id) = &request.event_id {
            match tables.events.get(event_id) {
                None => return Err(event_not_found(event_id)),
                Some(event) if event.processed => return Err(event_processed(event_id)),
                Some(_) => {}
            }
        }

        let now = Timestamp::now();
        let outcome = payment.apply(&request.change, now);
        if outcome.accepted && payment.transaction_id.is_none() {
            payment.transaction_id = request.transaction_id.clone();
        }
        let entry = request.audit.complete(&payment, &outcome, now);

        // Commit point: everything above worked on copies.
        self.check("apply_transition").await?;

        tables.payments.insert(payment.id, payment);
        tables.audit.push(entry);
        if let Some(event_id) = &request.event_id {
            if let Some(event) = tables.events.get_mut(event_id) {
                event.mark_processed(now);
            }
        }

        Ok(outcome)
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryPaymentStore {
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError> {
        self.check("exists").await?;
        Ok(self.tables.lock().await.events.contains_key(event_id))
    }

    async fn record_incoming(&self, event: NewWebhookEvent) -> Result<SaveResult, DomainError> {
        self.check("record_incoming").await?;
        let mut tables = self.tables.lock().await;
        if tables.events.contains_key(&event.event_id) {
            return Ok(SaveResult::AlreadyExists);
        }
        tables
            .events
            .insert(event.event_id.clone(), WebhookEvent::recorded(event));
        Ok(SaveResult::Inserted)
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), DomainError> {
        self.check("mark_processed").await?;
        let mut tables = self.tables.lock().await;
        let event = tables
            .events
            .get_mut(event_id)
            .ok_or_else(|| event_not_found(event_id))?;
        event.mark_processed(Timestamp::now());
        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DomainError> {
        self.check("mark_failed").await?;
        let mut tables = self.tables.lock().await;
        let event = tables
            .events
            .get_mut(event_id)
            .ok_or_else(|| event_not_found(event_id))?;
        event.mark_failed(error, Timestamp::now());
        Ok(())
    }

    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<WebhookEvent>, DomainError> {
        self.check("find_by_event_id").await?;
        Ok(self.tables.lock().await.events.get(event_id).cloned())
    }

    async fn list_unresolved(&self, limit: u32) -> Result<Vec<WebhookEvent>, DomainError> {
        self.check("list_unresolved").await?;
        let tables = self.tables.lock().await;
        let mut events: Vec<WebhookEvent> = tables
            .events
            .values()
            .filter(|e| e.is_unresolved())
            .cloned()
            .collect();
        events.sort_by(|a, b| a.received_at.cmp(&b.received_at));
        events.truncate(limit as usize);
        Ok(events)
    }
}

#[async_trait]
impl AuditLog for InMemoryPaymentStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), DomainError> {
        self.check("append").await?;
        let mut tables = self.tables.lock().await;
        if !tables.payments.contains_key(&entry.payment_id) {
            return Err(payment_not_found(&entry.payment_id));
        }
        tables.audit.push(entry.clone());
        Ok(())
    }

    async fn list_for_payment(
        &self,
        payment_id: &PaymentId,
        action: Option<AuditAction>,
    ) -> Result<Vec<AuditLogEntry>, DomainError> {
        self.check("list_for_payment").await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .audit
            .iter()
            .filter(|e| &e.payment_id == payment_id)
            .filter(|e| action.map_or(true, |a| e.action == a))
            .cloned()
            .collect())
    }
}

//! WebhookEventRepository port - Durable record of inbound gateway webhooks.
//!
//! Every delivery that parses is recorded before anything else is written,
//! keyed by its gateway-derived event id. The store is the idempotency
//! backstop: `exists` is only a fast path, `record_incoming` decides.
//!
//! ## Why Webhook Idempotency Matters
//!
//! Gateways deliver the same notification more than once:
//! - Network timeouts
//! - 5xx response from our endpoint (triggers retry)
//! - Our endpoint returning success but the gateway not receiving it
//!
//! Two deliveries of one event may also arrive at the same time.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::webhook::{NewWebhookEvent, WebhookEvent};

/// Result of attempting to record a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Record was inserted (first time seeing this event).
    Inserted,
    /// Record already exists (duplicate event).
    AlreadyExists,
}

/// Port for storing and retrieving webhook events.
///
/// Implementations must enforce uniqueness of `event_id` in storage (unique
/// index or an insert under a lock) so that concurrent duplicates resolve to
/// exactly one `Inserted`.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// True if an event with this id has been recorded.
    async fn exists(&self, event_id: &str) -> Result<bool, DomainError>;

    /// Records an unprocessed event.
    ///
    /// Returns `SaveResult::AlreadyExists` when another delivery got there first.
    async fn record_incoming(&self, event: NewWebhookEvent) -> Result<SaveResult, DomainError>;

    /// Marks the event processed and clears any error.
    async fn mark_processed(&self, event_id: &str) -> Result<(), DomainError>;

    /// Marks the event processed with a terminal error.
    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DomainError>;

    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<WebhookEvent>, DomainError>;

    /// Unprocessed events and events that failed, oldest first.
    async fn list_unresolved(&self, limit: u32) -> Result<Vec<WebhookEvent>, DomainError>;
}


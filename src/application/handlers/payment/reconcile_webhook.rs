//! ReconcileWebhookHandler - Applies a gateway notification to its payment at most once.
//!
//! Steps:
//!
//! 1. Verify the signature and map the payload (nothing stored on failure)
//! 2. Fast duplicate check on the event id
//! 3. Resolve the payment: payment id hint, transaction id, reference code
//! 4. Record the event unprocessed; losing the insert race means duplicate
//! 5. Reject unmatched payments, tenant mismatches and amount mismatches
//! 6. Apply the transition, audit entry and event completion atomically
//!
//! Storage failures and timeouts leave the event unprocessed so the gateway's
//! retry can finish the work: a stored event that is neither processed nor
//! failed is resumed at step 5 rather than treated as a duplicate. The ledger
//! refuses to complete an event twice, which keeps concurrent resumes at most
//! once. Every other failure after step 4 marks the event failed and is
//! acknowledged.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::domain::audit::{Actor, AuditAction, AuditDraft, AuditMetadata, RequestContext};
use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, Timestamp};
use crate::domain::payment::{Gateway, Payment, PaymentChange, PaymentStatus};
use crate::domain::webhook::{
    body_json, scalar_at, NewWebhookEvent, ParsedWebhook, SignatureVerifier, WebhookError,
    WebhookEvent,
};
use crate::ports::{PaymentLedger, SaveResult, TransitionRequest, WebhookEventRepository};

/// Default deadline for each storage call.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Command to reconcile one webhook delivery.
#[derive(Debug, Clone)]
pub struct ReconcileWebhookCommand {
    pub gateway: Gateway,
    /// Raw request body.
    pub body: Vec<u8>,
    /// Signature from the query string or header. EasyKash carries it in the body.
    pub signature: Option<String>,
    pub context: RequestContext,
}

/// What happened to a delivery. None of these are retried by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Transition applied.
    Processed {
        event_id: String,
        payment_id: PaymentId,
        previous_status: PaymentStatus,
        current_status: PaymentStatus,
    },
    /// Event id seen before. Nothing written.
    AlreadyProcessed { event_id: String },
    /// No payment matches. Event stored as failed.
    Unmatched { event_id: String },
    /// Payment found but tenant or amount disagree. Event stored as failed.
    Rejected {
        event_id: String,
        payment_id: PaymentId,
        reason: String,
    },
    /// The state machine refused the status. Logged as `webhook_received`.
    TransitionRejected {
        event_id: String,
        payment_id: PaymentId,
        current_status: PaymentStatus,
        attempted_status: PaymentStatus,
    },
    /// A non-transient error after recording. Event stored as failed.
    Failed { event_id: String, reason: String },
}

/// Handler for gateway webhook deliveries.
pub struct ReconcileWebhookHandler {
    ledger: Arc<dyn PaymentLedger>,
    events: Arc<dyn WebhookEventRepository>,
    verifiers: HashMap<Gateway, SignatureVerifier>,
    io_timeout: Duration,
}

impl ReconcileWebhookHandler {
    pub fn new(ledger: Arc<dyn PaymentLedger>, events: Arc<dyn WebhookEventRepository>) -> Self {
        Self {
            ledger,
            events,
            verifiers: HashMap::new(),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Requires signatures for `gateway`, checked with `verifier`.
    pub fn with_verifier(mut self, gateway: Gateway, verifier: SignatureVerifier) -> Self {
        self.verifiers.insert(gateway, verifier);
        self
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub async fn handle(
        &self,
        cmd: ReconcileWebhookCommand,
    ) -> Result<ReconcileOutcome, WebhookError> {
        // 1. Verify and parse. Nothing is stored for bad requests.
        let value = body_json(&cmd.body)?;
        self.verify_signature(cmd.gateway, &value, cmd.signature.as_deref())?;
        let parsed = ParsedWebhook::from_value(cmd.gateway, value)?;

        info!(
            gateway = %parsed.gateway,
            event_id = %parsed.event_id,
            transaction_id = %parsed.transaction_id,
            reported_status = %parsed.reported_status,
            "Webhook received"
        );

        // 2. Fast path for duplicates. The insert in step 4 is the real guard.
        if self.io("exists", self.events.exists(&parsed.event_id)).await? {
            return self.redelivered(&parsed, &cmd.context).await;
        }

        // 3. Resolve the payment.
        let payment = self.resolve_payment(&parsed).await?;

        // 4. Record the event before acting on it.
        let new_event = NewWebhookEvent::from_parsed(
            &parsed,
            payment.as_ref().map(|p| p.id),
            payment.as_ref().map(|p| p.academy_id),
            Timestamp::now(),
        );
        let saved = self
            .io("record_incoming", self.events.record_incoming(new_event))
            .await?;
        if saved == SaveResult::AlreadyExists {
            debug!(event_id = %parsed.event_id, "Lost the insert race for webhook");
            return self.redelivered(&parsed, &cmd.context).await;
        }

        self.finish(&parsed, payment, &cmd.context).await
    }

    /// The event id is already stored. Completes it if an earlier delivery
    /// stopped short; otherwise it is a duplicate.
    async fn redelivered(
        &self,
        parsed: &ParsedWebhook,
        context: &RequestContext,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let stored = self
            .io("find_by_event_id", self.events.find_by_event_id(&parsed.event_id))
            .await?;
        if !stored.as_ref().map_or(false, WebhookEvent::awaits_completion) {
            info!(event_id = %parsed.event_id, "Webhook already processed");
            return Ok(ReconcileOutcome::AlreadyProcessed {
                event_id: parsed.event_id.clone(),
            });
        }

        info!(event_id = %parsed.event_id, "Resuming unfinished webhook");
        let payment = self.resolve_payment(parsed).await?;
        self.finish(parsed, payment, context).await
    }

    // 5-6. The event exists and must end processed or stay retryable.
    async fn finish(
        &self,
        parsed: &ParsedWebhook,
        payment: Option<Payment>,
        context: &RequestContext,
    ) -> Result<ReconcileOutcome, WebhookError> {
        match self.reconcile_recorded(parsed, payment, context).await {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_retryable() => {
                warn!(
                    event_id = %parsed.event_id,
                    error = %err,
                    "Transient failure, leaving webhook unprocessed for retry"
                );
                Err(err)
            }
            Err(err) => {
                error!(event_id = %parsed.event_id, error = %err, "Webhook processing failed");
                let reason = err.to_string();
                self.io("mark_failed", self.events.mark_failed(&parsed.event_id, &reason))
                    .await?;
                Ok(ReconcileOutcome::Failed {
                    event_id: parsed.event_id.clone(),
                    reason,
                })
            }
        }
    }

    fn verify_signature(
        &self,
        gateway: Gateway,
        value: &serde_json::Value,
        provided: Option<&str>,
    ) -> Result<(), WebhookError> {
        let Some(verifier) = self.verifiers.get(&gateway) else {
            debug!(gateway = %gateway, "No signature secret configured, skipping verification");
            return Ok(());
        };

        let body_signature = match gateway {
            Gateway::EasyKash => scalar_at(value, "signatureHash"),
            _ => None,
        };
        let provided = provided.map(str::to_string).or(body_signature);

        verifier.verify(value, provided.as_deref()).map_err(|err| {
            warn!(gateway = %gateway, "Webhook signature verification failed");
            err
        })
    }

    async fn resolve_payment(&self, parsed: &ParsedWebhook) -> Result<Option<Payment>, WebhookError> {
        if let Some(id) = &parsed.payment_id_hint {
            if let Some(payment) = self.io("find_by_id", self.ledger.find_by_id(id)).await? {
                return Ok(Some(payment));
            }
        }

        if let Some(payment) = self
            .io(
                "find_by_transaction_id",
                self.ledger.find_by_transaction_id(&parsed.transaction_id),
            )
            .await?
        {
            return Ok(Some(payment));
        }

        if let Some(reference) = &parsed.reference_code {
            return self
                .io(
                    "find_by_reference",
                    self.ledger
                        .find_by_reference(parsed.academy_id_hint.as_ref(), reference),
                )
                .await;
        }

        Ok(None)
    }

    async fn reconcile_recorded(
        &self,
        parsed: &ParsedWebhook,
        payment: Option<Payment>,
        context: &RequestContext,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let event_id = parsed.event_id.clone();

        let Some(payment) = payment else {
            warn!(
                event_id = %event_id,
                transaction_id = %parsed.transaction_id,
                "Payment not found for webhook"
            );
            self.io("mark_failed", self.events.mark_failed(&event_id, "Payment not found"))
                .await?;
            return Ok(ReconcileOutcome::Unmatched { event_id });
        };

        if let Some(reason) = mismatch(parsed, &payment) {
            error!(
                event_id = %event_id,
                payment_id = %payment.id,
                reason,
                "Webhook does not match payment"
            );
            self.io("mark_failed", self.events.mark_failed(&event_id, reason))
                .await?;
            return Ok(ReconcileOutcome::Rejected {
                event_id,
                payment_id: payment.id,
                reason: reason.to_string(),
            });
        }

        let failure_reason = (parsed.target_status == PaymentStatus::Failed)
            .then(|| format!("Gateway reported {}", parsed.reported_status));

        let request = TransitionRequest {
            payment_id: payment.id,
            change: PaymentChange::Status {
                target: parsed.target_status,
                failure_reason,
            },
            audit: AuditDraft {
                actor: Actor::System,
                on_accepted: AuditAction::StatusChanged,
                on_rejected: AuditAction::WebhookReceived,
                transaction_id: Some(parsed.transaction_id.clone()),
                context: context.clone(),
                notes: None,
                metadata: AuditMetadata {
                    gateway: Some(parsed.gateway),
                    event_id: Some(event_id.clone()),
                    event_type: Some(parsed.event_type.clone()),
                    ..AuditMetadata::default()
                },
            },
            event_id: Some(event_id.clone()),
            transaction_id: Some(parsed.transaction_id.clone()),
        };

        let applied = self
            .io("apply_transition", async {
                match self.ledger.apply_transition(request).await {
                    Err(err) if err.code == ErrorCode::WebhookEventProcessed => Ok(None),
                    result => result.map(Some),
                }
            })
            .await?;
        let Some(outcome) = applied else {
            info!(event_id = %event_id, "Webhook completed by a concurrent delivery");
            return Ok(ReconcileOutcome::AlreadyProcessed { event_id });
        };

        if outcome.accepted {
            info!(
                event_id = %event_id,
                payment_id = %payment.id,
                from = %outcome.previous_status,
                to = %outcome.current_status,
                "Payment status updated from webhook"
            );
            Ok(ReconcileOutcome::Processed {
                event_id,
                payment_id: payment.id,
                previous_status: outcome.previous_status,
                current_status: outcome.current_status,
            })
        } else {
            info!(
                event_id = %event_id,
                payment_id = %payment.id,
                current = %outcome.current_status,
                attempted = %outcome.attempted_status,
                "Webhook transition rejected, logged without status change"
            );
            Ok(ReconcileOutcome::TransitionRejected {
                event_id,
                payment_id: payment.id,
                current_status: outcome.current_status,
                attempted_status: outcome.attempted_status,
            })
        }
    }

    /// Runs a port call under the I/O deadline.
    async fn io<T, F>(&self, operation: &'static str, fut: F) -> Result<T, WebhookError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        match tokio::time::timeout(self.io_timeout, fut).await {
            Ok(result) => result.map_err(WebhookError::from),
            Err(_) => Err(WebhookError::from(DomainError::new(
                ErrorCode::Timeout,
                format!("{} exceeded {:?}", operation, self.io_timeout),
            ))),
        }
    }
}

fn mismatch(parsed: &ParsedWebhook, payment: &Payment) -> Option<&'static str> {
    if let Some(academy_id) = &parsed.academy_id_hint {
        if academy_id != &payment.academy_id {
            return Some("Academy ID mismatch");
        }
    }
    if !payment.matches_amount(&parsed.amount) {
        return Some("Amount mismatch");
    }
    None
}

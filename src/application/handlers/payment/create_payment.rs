//! CreatePaymentHandler - Opens a pending payment at checkout.

use std::sync::Arc;

use tracing::info;

use crate::domain::audit::{Actor, AuditLogEntry, RequestContext};
use crate::domain::foundation::{AcademyId, Money, Timestamp, UserId};
use crate::domain::payment::{Gateway, Payment, PaymentCode, PaymentError, DEFAULT_PREFIX};
use crate::ports::PaymentLedger;

#[derive(Debug, Clone)]
pub struct CreatePaymentCommand {
    pub academy_id: AcademyId,
    pub user_id: Option<UserId>,
    pub amount: Money,
    pub gateway: Gateway,
    /// Payment code prefix, e.g. `ASP` for academic packages. Defaults to `PAY`.
    pub code_prefix: Option<String>,
    /// Reference the gateway will echo back. Defaults to the payment code.
    pub reference_code: Option<String>,
    pub context: RequestContext,
}

pub struct CreatePaymentHandler {
    ledger: Arc<dyn PaymentLedger>,
}

impl CreatePaymentHandler {
    pub fn new(ledger: Arc<dyn PaymentLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, cmd: CreatePaymentCommand) -> Result<Payment, PaymentError> {
        let now = Timestamp::now();
        let prefix = cmd.code_prefix.as_deref().unwrap_or(DEFAULT_PREFIX);
        let code = PaymentCode::generate(prefix, &cmd.academy_id, now)
            .map_err(|e| PaymentError::validation("code_prefix", e.to_string()))?;
        let reference = cmd
            .reference_code
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| code.to_string());

        let payment = Payment::create_pending(
            cmd.academy_id,
            cmd.user_id.clone(),
            code,
            cmd.amount,
            cmd.gateway,
            Some(reference),
            now,
        )
        .map_err(|e| PaymentError::validation("amount", e.to_string()))?;

        let entry = AuditLogEntry::created(&payment, Actor::from_user_id(cmd.user_id), cmd.context);
        self.ledger.create(&payment, &entry).await?;

        info!(
            payment_id = %payment.id,
            academy_id = %payment.academy_id,
            code = %payment.payment_code,
            amount = %payment.amount,
            "Payment created"
        );
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPaymentStore;
    use crate::domain::audit::AuditAction;
    use crate::domain::foundation::Currency;
    use crate::domain::payment::PaymentStatus;
    use crate::ports::AuditLog;

    fn command() -> CreatePaymentCommand {
        CreatePaymentCommand {
            academy_id: AcademyId::new(),
            user_id: Some(UserId::new("student-9").unwrap()),
            amount: Money::new(5000, Currency::Sar),
            gateway: Gateway::Tap,
            code_prefix: Some("ASP".to_string()),
            reference_code: None,
            context: RequestContext::default(),
        }
    }

    #[tokio::test]
    async fn creates_pending_payment_with_created_entry() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let handler = CreatePaymentHandler::new(store.clone());

        let payment = handler.handle(command()).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.payment_code.as_str().starts_with("ASP-"));
        assert_eq!(payment.reference_code.as_deref(), Some(payment.payment_code.as_str()));

        let entries = store.list_for_payment(&payment.id, None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Created);
        assert_eq!(entries[0].status_to, Some(PaymentStatus::Pending));
    }

    #[tokio::test]
    async fn zero_amount_is_a_validation_error() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let handler = CreatePaymentHandler::new(store.clone());
        let mut cmd = command();
        cmd.amount = Money::new(0, Currency::Sar);

        let err = handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, PaymentError::ValidationFailed { .. }));
        assert_eq!(store.audit_count().await, 0);
    }

    #[tokio::test]
    async fn bad_prefix_is_a_validation_error() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let handler = CreatePaymentHandler::new(store);
        let mut cmd = command();
        cmd.code_prefix = Some("x".to_string());

        assert!(matches!(
            handler.handle(cmd).await.unwrap_err(),
            PaymentError::ValidationFailed { .. }
        ));
    }
}

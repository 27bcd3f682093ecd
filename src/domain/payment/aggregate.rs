//! Payment aggregate entity.
//!
//! # Invariants
//!
//! - `status` only moves along `PaymentStatus` transitions
//! - `0 <= refunded_minor <= amount.amount_minor`
//! - A paid payment always carries `paid_at` and a receipt number
//! - `version` increases by one on every accepted change

use crate::domain::foundation::{
    AcademyId, Money, PaymentId, StateMachine, Timestamp, UserId, ValidationError,
};
use serde::{Deserialize, Serialize};

use super::{Gateway, PaymentCode, PaymentStatus};

/// A change requested against a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentChange {
    /// Move to `target`, e.g. from a gateway notification.
    Status {
        target: PaymentStatus,
        failure_reason: Option<String>,
    },
    /// Return `amount_minor` to the payer.
    Refund { amount_minor: i64 },
}

/// Result of asking a payment to change. Rejections are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub accepted: bool,
    pub previous_status: PaymentStatus,
    pub current_status: PaymentStatus,
    /// The status that was asked for.
    pub attempted_status: PaymentStatus,
    /// Why the change was rejected. `None` when accepted.
    pub rejection_reason: Option<String>,
}

/// Payment aggregate - the authoritative record of money owed by a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,

    /// Tenant that owns this payment.
    pub academy_id: AcademyId,

    /// Student who pays, when known.
    pub user_id: Option<UserId>,

    pub payment_code: PaymentCode,

    pub amount: Money,

    /// Cumulative refunded amount in the same currency.
    pub refunded_minor: i64,

    pub status: PaymentStatus,

    pub gateway: Gateway,

    /// Gateway charge / transaction id, set once the gateway reports one.
    pub transaction_id: Option<String>,

    /// Academy-scoped reference the gateway echoes back (EasyKash customerReference).
    pub reference_code: Option<String>,

    pub receipt_number: Option<String>,

    pub paid_at: Option<Timestamp>,

    pub failure_reason: Option<String>,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,

    /// Optimistic version counter.
    pub version: i64,
}

impl Payment {
    /// Create a new pending payment at checkout.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when the amount is not positive.
    pub fn create_pending(
        academy_id: AcademyId,
        user_id: Option<UserId>,
        payment_code: PaymentCode,
        amount: Money,
        gateway: Gateway,
        reference_code: Option<String>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        if amount.amount_minor <= 0 {
            return Err(ValidationError::out_of_range(
                "amount",
                1,
                i64::MAX,
                amount.amount_minor,
            ));
        }

        Ok(Self {
            id: PaymentId::new(),
            academy_id,
            user_id,
            payment_code,
            amount,
            refunded_minor: 0,
            status: PaymentStatus::Pending,
            gateway,
            transaction_id: None,
            reference_code,
            receipt_number: None,
            paid_at: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    /// Amount that can still be refunded.
    pub fn remaining_refundable(&self) -> i64 {
        self.amount.amount_minor - self.refunded_minor
    }

    /// True when the reported money equals this payment's amount exactly.
    pub fn matches_amount(&self, reported: &Money) -> bool {
        self.amount == *reported
    }

    /// Applies a change if the state machine allows it.
    ///
    /// Never fails: a disallowed change yields an outcome with `accepted = false`
    /// and leaves the payment untouched.
    pub fn apply(&mut self, change: &PaymentChange, now: Timestamp) -> TransitionOutcome {
        match change {
            PaymentChange::Status {
                target,
                failure_reason,
            } => self.apply_status(*target, failure_reason.clone(), now),
            PaymentChange::Refund { amount_minor } => self.apply_refund(*amount_minor, now),
        }
    }

    /// Moves to `target` when the transition table allows it.
    pub fn apply_transition(&mut self, target: PaymentStatus, now: Timestamp) -> TransitionOutcome {
        self.apply_status(target, None, now)
    }

    fn apply_status(
        &mut self,
        target: PaymentStatus,
        failure_reason: Option<String>,
        now: Timestamp,
    ) -> TransitionOutcome {
        let previous = self.status;
        if let Err(err) = previous.transition_to(target) {
            return self.rejected(target, err.message);
        }

        self.status = target;
        match target {
            PaymentStatus::Paid => {
                if self.paid_at.is_none() {
                    self.paid_at = Some(now);
                }
                if self.receipt_number.is_none() {
                    self.receipt_number = Some(self.receipt_number_at(now));
                }
            }
            PaymentStatus::Failed => {
                self.failure_reason =
                    Some(failure_reason.unwrap_or_else(|| "Payment failed".to_string()));
            }
            PaymentStatus::Refunded => {
                self.refunded_minor = self.amount.amount_minor;
            }
            _ => {}
        }
        self.touch(now);

        TransitionOutcome {
            accepted: true,
            previous_status: previous,
            current_status: target,
            attempted_status: target,
            rejection_reason: None,
        }
    }

    fn apply_refund(&mut self, amount_minor: i64, now: Timestamp) -> TransitionOutcome {
        let remaining = self.remaining_refundable();
        let target = if amount_minor == remaining {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };

        if !self.status.is_refundable() {
            return self.rejected(
                target,
                format!("Payment in status {} cannot be refunded", self.status),
            );
        }
        if amount_minor <= 0 || amount_minor > remaining {
            return self.rejected(
                target,
                format!(
                    "Refund of {} exceeds refundable balance of {}",
                    amount_minor, remaining
                ),
            );
        }
        if let Err(err) = self.status.transition_to(target) {
            return self.rejected(target, err.message);
        }

        let previous = self.status;
        self.status = target;
        self.refunded_minor += amount_minor;
        self.touch(now);

        TransitionOutcome {
            accepted: true,
            previous_status: previous,
            current_status: target,
            attempted_status: target,
            rejection_reason: None,
        }
    }

    fn rejected(&self, attempted: PaymentStatus, reason: String) -> TransitionOutcome {
        TransitionOutcome {
            accepted: false,
            previous_status: self.status,
            current_status: self.status,
            attempted_status: attempted,
            rejection_reason: Some(reason),
        }
    }

    fn touch(&mut self, now: Timestamp) {
        self.updated_at = now;
        self.version += 1;
    }

    fn receipt_number_at(&self, now: Timestamp) -> String {
        format!(
            "REC-{}-{}-{}",
            self.academy_id,
            self.id,
            now.as_unix_secs()
        )
    }
}

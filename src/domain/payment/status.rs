//! Payment status state machine.
//!
//! The transition table is owned here; every writer of a payment status goes
//! through it.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Checkout started, nothing confirmed by the gateway yet.
    Pending,

    /// Funds held by the gateway, not yet captured.
    Authorized,

    /// Captured. Receipt number assigned.
    Paid,

    Failed,

    Cancelled,

    /// Fully refunded. Terminal.
    Refunded,

    /// Some of the paid amount was returned; further refunds are allowed.
    PartiallyRefunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
        }
    }

    /// True when money can still be returned against this payment.
    pub fn is_refundable(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::PartiallyRefunded)
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Authorized)
                | (Pending, Paid)
                | (Pending, Failed)
                | (Pending, Cancelled)
            // From AUTHORIZED
                | (Authorized, Paid)
                | (Authorized, Failed)
                | (Authorized, Cancelled)
            // From PAID
                | (Paid, Refunded)
                | (Paid, PartiallyRefunded)
            // From PARTIALLY_REFUNDED
                | (PartiallyRefunded, PartiallyRefunded) // Another partial refund
                | (PartiallyRefunded, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Authorized, Paid, Failed, Cancelled],
            Authorized => vec![Paid, Failed, Cancelled],
            Paid => vec![Refunded, PartiallyRefunded],
            PartiallyRefunded => vec![PartiallyRefunded, Refunded],
            Failed | Cancelled | Refunded => vec![],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "authorized" => Ok(PaymentStatus::Authorized),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            "refunded" => Ok(PaymentStatus::Refunded),
            "partially_refunded" => Ok(PaymentStatus::PartiallyRefunded),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown payment status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentStatus::*;

    const ALL: [PaymentStatus; 7] = [
        Pending,
        Authorized,
        Paid,
        Failed,
        Cancelled,
        Refunded,
        PartiallyRefunded,
    ];

    #[test]
    fn pending_can_settle_either_way() {
        assert!(Pending.can_transition_to(&Paid));
        assert!(Pending.can_transition_to(&Authorized));
        assert!(Pending.can_transition_to(&Failed));
        assert!(Pending.can_transition_to(&Cancelled));
        assert!(!Pending.can_transition_to(&Refunded));
    }

    #[test]
    fn paid_only_moves_to_refund_states() {
        assert_eq!(Paid.valid_transitions(), vec![Refunded, PartiallyRefunded]);
        assert!(!Paid.can_transition_to(&Failed));
        assert!(!Paid.can_transition_to(&Pending));
        assert!(!Paid.can_transition_to(&Paid));
    }

    #[test]
    fn partial_refund_may_repeat() {
        assert!(PartiallyRefunded.can_transition_to(&PartiallyRefunded));
        assert!(PartiallyRefunded.can_transition_to(&Refunded));
    }

    #[test]
    fn failed_cancelled_and_refunded_are_terminal() {
        assert!(Failed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(Refunded.is_terminal());
        assert!(!Authorized.is_terminal());
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn string_form_parses_back() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("completed".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&PartiallyRefunded).unwrap();
        assert_eq!(json, "\"partially_refunded\"");
    }
}

//! State machine trait for status enums.
//!
//! Lifecycle enums (payment status today) declare their transition table once and
//! get validated transitions for free.

use super::{DomainError, ErrorCode};

/// Trait for status enums that represent state machines.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for PaymentStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         self.valid_transitions().contains(target)
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Pending => vec![Authorized, Paid, Failed, Cancelled],
///             // ...
///         }
///     }
/// }
///
/// let next = current.transition_to(PaymentStatus::Paid)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation.
    ///
    /// # Errors
    ///
    /// `InvalidStateTransition` when the table has no edge from `self` to `target`.
    fn transition_to(&self, target: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

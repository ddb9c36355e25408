//! Teacher payout bookkeeping models

use serde::{Deserialize, Serialize};

/// Lifecycle of a withdrawal request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "withdrawal_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Paid => "paid",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    /// Paid and rejected requests are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Paid | WithdrawalStatus::Rejected)
    }

    /// Whether this request still counts against the teacher's balance
    pub fn reserves_balance(&self) -> bool {
        !matches!(self, WithdrawalStatus::Rejected)
    }

    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Paid) | (Approved, Rejected)
        )
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WithdrawalStatus::*;

    #[test]
    fn test_valid_transitions() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Paid));
        assert!(Approved.can_transition_to(Rejected));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!Pending.can_transition_to(Paid));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for from in [Paid, Rejected] {
            assert!(from.is_terminal());
            for to in [Pending, Approved, Paid, Rejected] {
                assert!(!from.can_transition_to(to));
            }
        }
    }
}

//! Order status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle status of an order.
///
/// ```text
/// pending ──► completed
///    │
///    └──────► failed
/// ```
///
/// Both terminal states are final: nothing leaves `completed` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created by checkout, awaiting the provider's confirmation.
    Pending,
    /// Provider confirmed payment; entitlements were granted.
    Completed,
    /// Provider cancelled or payment expired.
    Failed,
}

impl OrderStatus {
    /// Returns the persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
        }
    }
}

impl StateMachine for OrderStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OrderStatus::*;
        matches!((self, target), (Pending, Completed) | (Pending, Failed))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderStatus::*;
        match self {
            Pending => vec![Completed, Failed],
            Completed | Failed => vec![],
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown order status '{}'", other),
            )),
        }
    }
}

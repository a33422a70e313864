//! The gateway status code table.
//!
//! | gateway code                                  | payment status | order status |
//! |-----------------------------------------------|----------------|--------------|
//! | `A`, `authorised`, `authorized`, `success`    | paid           | processing   |
//! | `C`, `cancelled`, `canceled`                  | failed         | cancelled    |
//! | `E`, `error`                                  | failed         | (unchanged)  |
//! | `H`, `P`, `held`, `pending`, `pending-review` | pending        | (unchanged)  |
//! | anything else                                 | pending        | (unchanged)  |
//!
//! Codes are matched case-insensitively after trimming. New codes from the gateway land in
//! [`GatewayOutcome::Unmapped`] instead of failing the callback.
use std::fmt::Display;

use serde::{Serialize, Serializer};

use crate::db_types::{OrderStatusType, PaymentStatusType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    Authorised,
    Cancelled,
    Error,
    Held,
    Unmapped(String),
}

/// What a gateway outcome asks for. `status: None` means "leave the order status alone".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedTransition {
    pub payment_status: PaymentStatusType,
    pub status: Option<OrderStatusType>,
}

impl GatewayOutcome {
    pub fn from_code(code: &str) -> Self {
        let normalized = code.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "a" | "authorised" | "authorized" | "success" => Self::Authorised,
            "c" | "cancelled" | "canceled" => Self::Cancelled,
            "e" | "error" => Self::Error,
            "h" | "p" | "held" | "pending" | "pending-review" => Self::Held,
            _ => Self::Unmapped(code.trim().to_string()),
        }
    }

    pub fn transition(&self) -> MappedTransition {
        use OrderStatusType as S;
        use PaymentStatusType as P;
        match self {
            Self::Authorised => MappedTransition { payment_status: P::Paid, status: Some(S::Processing) },
            Self::Cancelled => MappedTransition { payment_status: P::Failed, status: Some(S::Cancelled) },
            Self::Error => MappedTransition { payment_status: P::Failed, status: None },
            Self::Held | Self::Unmapped(_) => MappedTransition { payment_status: P::Pending, status: None },
        }
    }
}

impl Display for GatewayOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authorised => f.write_str("authorised"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Error => f.write_str("error"),
            Self::Held => f.write_str("held"),
            Self::Unmapped(code) => write!(f, "unmapped ({code})"),
        }
    }
}

impl Serialize for GatewayOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_table_code_maps() {
        use OrderStatusType as S;
        use PaymentStatusType as P;
        let cases: &[(&str, P, Option<S>)] = &[
            ("A", P::Paid, Some(S::Processing)),
            ("authorised", P::Paid, Some(S::Processing)),
            ("Authorized", P::Paid, Some(S::Processing)),
            ("success", P::Paid, Some(S::Processing)),
            ("C", P::Failed, Some(S::Cancelled)),
            ("cancelled", P::Failed, Some(S::Cancelled)),
            ("canceled", P::Failed, Some(S::Cancelled)),
            ("E", P::Failed, None),
            ("error", P::Failed, None),
            ("H", P::Pending, None),
            ("P", P::Pending, None),
            ("held", P::Pending, None),
            ("pending-review", P::Pending, None),
        ];
        for (code, payment_status, status) in cases {
            let t = GatewayOutcome::from_code(code).transition();
            assert_eq!(t.payment_status, *payment_status, "code {code}");
            assert_eq!(t.status, *status, "code {code}");
        }
    }

    #[test]
    fn unknown_codes_are_pending_and_unchanged() {
        for code in ["X", "", "99", "refund-requested", " a b "] {
            let outcome = GatewayOutcome::from_code(code);
            assert!(matches!(outcome, GatewayOutcome::Unmapped(_)), "code {code:?}");
            let t = outcome.transition();
            assert_eq!(t.payment_status, PaymentStatusType::Pending);
            assert_eq!(t.status, None);
        }
        assert_eq!(GatewayOutcome::from_code(" x ").to_string(), "unmapped (x)");
    }

    #[test]
    fn codes_are_trimmed() {
        assert_eq!(GatewayOutcome::from_code(" A\n"), GatewayOutcome::Authorised);
    }
}

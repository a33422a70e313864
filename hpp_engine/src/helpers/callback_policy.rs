//! Which gateway transitions an order will accept.
//!
//! Callbacks can arrive late, twice, or out of order, so the mapped transition is filtered through a monotonic policy
//! before it is applied:
//!
//! * payment status `pending` may move anywhere;
//! * `failed` may only move to `paid` (the buyer retried at the hosted page and succeeded);
//! * `paid` and `refunded` are never changed by a callback. Only an admin can move them;
//! * the order status only follows a callback while it is still `pending`, and only if the payment status change for
//!   the same callback was accepted.
//!
//! A rejected callback still has its gateway metadata merged by the caller. It just does not move the status fields.
use crate::{
    db_types::{OrderStatusType, PaymentStatusType},
    helpers::gateway_status::MappedTransition,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackDecision {
    /// At least one status field changes.
    Apply { payment_status: Option<PaymentStatusType>, status: Option<OrderStatusType> },
    /// The callback restates the current state.
    NoChange,
    /// The callback asks for a transition the policy forbids.
    Reject { reason: String },
}

pub fn decide(
    current_status: OrderStatusType,
    current_payment: PaymentStatusType,
    mapped: MappedTransition,
) -> CallbackDecision {
    use PaymentStatusType::*;
    let target = mapped.payment_status;
    let payment_change = match (current_payment, target) {
        (from, to) if from == to => None,
        (Pending, to) => Some(to),
        (Failed, Paid) => Some(Paid),
        (from, to) => {
            return CallbackDecision::Reject {
                reason: format!("payment status {from} cannot be changed to {to} by the gateway"),
            };
        },
    };
    let status_change = match mapped.status {
        Some(to) if to == current_status => None,
        Some(to) if current_status == OrderStatusType::Pending => Some(to),
        Some(to) if payment_change.is_none() => {
            return CallbackDecision::Reject {
                reason: format!("order status {current_status} cannot be changed to {to} by the gateway"),
            };
        },
        // The payment moved but the order has already left `pending`, e.g. an admin cancelled it before the
        // authorisation arrived. Record the payment and leave the order status for a human to resolve.
        _ => None,
    };
    if payment_change.is_none() && status_change.is_none() {
        CallbackDecision::NoChange
    } else {
        CallbackDecision::Apply { payment_status: payment_change, status: status_change }
    }
}

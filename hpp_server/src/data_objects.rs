use std::fmt::Display;

use hpp_engine::{
    db_types::{Order, OrderId, OrderStatusType, PaymentStatusType},
    order_objects::{CallbackOutcome, CallbackResult, CheckoutResult},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub redirect_url: String,
}

impl From<CheckoutResult> for CheckoutResponse {
    fn from(result: CheckoutResult) -> Self {
        Self { order_id: result.order.id, redirect_url: result.redirect_url }
    }
}

/// The acknowledgement sent back to the gateway. `applied` is false when the callback was valid but did not move the
/// order's status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub order_id: OrderId,
    pub applied: bool,
    pub outcome: String,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
}

impl From<CallbackResult> for CallbackResponse {
    fn from(result: CallbackResult) -> Self {
        let outcome = match result.outcome {
            CallbackOutcome::Applied => "applied",
            CallbackOutcome::Unchanged => "unchanged",
            CallbackOutcome::Ignored => "ignored",
        };
        Self {
            order_id: result.order.id,
            applied: result.outcome == CallbackOutcome::Applied,
            outcome: outcome.to_string(),
            status: result.order.status,
            payment_status: result.order.payment_status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResultQuery {
    pub order_id: String,
}

/// Which page the gateway sent the buyer back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnOutcome {
    Success,
    Cancelled,
    Declined,
}

impl ReturnOutcome {
    pub fn from_path(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "cancelled" => Some(Self::Cancelled),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }
}

/// What the buyer sees after returning from the hosted payment page. The order fields always reflect the stored state,
/// which may differ from the page the gateway redirected to if the callback has not arrived yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResultResponse {
    pub outcome: ReturnOutcome,
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    pub message: String,
}

impl PaymentResultResponse {
    pub fn new(outcome: ReturnOutcome, order: &Order) -> Self {
        let message = match (outcome, order.payment_status) {
            (_, PaymentStatusType::Paid) => "Thank you! Your payment has been received.",
            (_, PaymentStatusType::Refunded) => "This order has been refunded.",
            (ReturnOutcome::Success, _) => "Thank you! We are waiting for the payment provider to confirm your payment.",
            (ReturnOutcome::Cancelled, _) => "The payment was cancelled. Your order has not been charged.",
            (ReturnOutcome::Declined, _) => "The payment was declined. Please try again or use another payment method.",
        };
        Self {
            outcome,
            order_id: order.id.clone(),
            status: order.status,
            payment_status: order.payment_status,
            message: message.to_string(),
        }
    }
}

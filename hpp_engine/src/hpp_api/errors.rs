use thiserror::Error;

use crate::{
    db::traits::OrderStoreError,
    db_types::{InvalidEnumValue, OrderId},
    helpers::MerchantReferenceError,
};

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Invalid checkout request. {0}")]
    ValidationError(String),
    /// The order exists but no payment link could be issued. Only setting *names* are reported.
    #[error(
        "The payment gateway is not configured (missing: {}). Order {order_id} was created but no payment link was \
         issued.",
        .missing.join(", ")
    )]
    ConfigurationError { order_id: OrderId, missing: Vec<&'static str> },
    #[error("The gateway URL is not valid. Order {order_id} was created but no payment link was issued.")]
    InvalidGatewayUrl { order_id: OrderId },
    #[error("Could not sign the payment request. {0}")]
    SignatureError(String),
    #[error("{0}")]
    StoreError(#[from] OrderStoreError),
}

#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    #[error("The callback is missing the required field '{0}'")]
    MissingField(&'static str),
    #[error("The callback signature is invalid")]
    InvalidSignature,
    #[error("{0}")]
    InvalidReference(#[from] MerchantReferenceError),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Callbacks cannot be verified because the gateway credentials are not configured")]
    ConfigurationError,
    #[error("Order {0} is being updated too frequently. Try again later.")]
    ConcurrencyConflict(OrderId),
    #[error("{0}")]
    StoreError(OrderStoreError),
}

impl From<OrderStoreError> for WebhookError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            e => Self::StoreError(e),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AdminApiError {
    #[error("{0}")]
    InvalidEnumValue(#[from] InvalidEnumValue),
    #[error("Invalid order update. {0}")]
    ValidationError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} is being updated too frequently. Try again later.")]
    ConcurrencyConflict(OrderId),
    #[error("{0}")]
    StoreError(OrderStoreError),
}

impl From<OrderStoreError> for AdminApiError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            e => Self::StoreError(e),
        }
    }
}

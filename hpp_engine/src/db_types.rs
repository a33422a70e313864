//! Data types shared by the order store, the payment APIs and the HTTP layer.
use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use hpp_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

//--------------------------------------     InvalidEnumValue     ---------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid {field}. Allowed values are: {}", .allowed.join(", "))]
pub struct InvalidEnumValue {
    pub field: &'static str,
    pub value: String,
    pub allowed: &'static [&'static str],
}

//--------------------------------------     OrderStatusType      ---------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been created at checkout and no payment outcome has been recorded yet.
    Pending,
    /// The gateway authorised the payment and the order can be fulfilled.
    Processing,
    Shipped,
    /// Terminal.
    Delivered,
    /// Terminal. Orders are never deleted; cancellation is just a status.
    Cancelled,
}

impl OrderStatusType {
    pub const ALLOWED: &'static [&'static str] = &["pending", "processing", "shipped", "delivered", "cancelled"];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatusType {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(InvalidEnumValue { field: "status", value: s.to_string(), allowed: Self::ALLOWED }),
        }
    }
}

//--------------------------------------    PaymentStatusType     ---------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatusType {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatusType {
    pub const ALLOWED: &'static [&'static str] = &["pending", "paid", "failed", "refunded"];
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

impl FromStr for PaymentStatusType {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(InvalidEnumValue { field: "payment_status", value: s.to_string(), allowed: Self::ALLOWED }),
        }
    }
}

//--------------------------------------         OrderId          ---------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

//--------------------------------------   Addresses and buyers   ---------------------------------------------------
/// A point-in-time copy of a postal address. Orders keep their own copy so that later edits to a customer's address
/// book never rewrite history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// ISO 3166-1 alpha-2 country code
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

//--------------------------------------     GatewayMetadata      ---------------------------------------------------
/// Correlation data exchanged with the payment gateway.
///
/// Callbacks are merged into this record field by field. A value that is absent from a callback never erases what an
/// earlier callback (or the checkout) stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayMetadata {
    pub merchant_reference: Option<String>,
    pub transaction_reference: Option<String>,
    pub auth_code: Option<String>,
    pub last_message: Option<String>,
    pub last_status_code: Option<String>,
    pub last_received_at: Option<DateTime<Utc>>,
    /// The outbound parameter set sent to the hosted page, with the API key redacted.
    #[serde(default)]
    pub request_params: BTreeMap<String, String>,
}

/// The subset of a gateway callback that is folded into [`GatewayMetadata`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackFields {
    pub transaction_reference: Option<String>,
    pub auth_code: Option<String>,
    pub message: Option<String>,
    pub status_code: Option<String>,
}

impl GatewayMetadata {
    pub fn merge_callback(&mut self, fields: &CallbackFields, received_at: DateTime<Utc>) {
        fn merge(target: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value.as_ref().filter(|v| !v.trim().is_empty()) {
                *target = Some(v.clone());
            }
        }
        merge(&mut self.transaction_reference, &fields.transaction_reference);
        merge(&mut self.auth_code, &fields.auth_code);
        merge(&mut self.last_message, &fields.message);
        merge(&mut self.last_status_code, &fields.status_code);
        self.last_received_at = Some(received_at);
    }
}

//--------------------------------------          Orders          ---------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: Option<String>,
    pub buyer: BuyerContact,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub currency: String,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    pub payment_method: String,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub notes: Option<String>,
    pub gateway: GatewayMetadata,
    /// Incremented on every update. Writers must present the version they read.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: i64,
    /// The catalogue price at the time the order was placed.
    pub unit_price: Money,
}

impl OrderItem {
    /// `None` if `unit_price * quantity` overflows.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("The order amounts are too large to be totalled")]
pub struct AmountOverflow;

/// A fully priced order, ready to be stored. Only the checkout flow builds these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub id: OrderId,
    pub customer_id: Option<String>,
    pub buyer: BuyerContact,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub currency: String,
    pub payment_method: String,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Prices the order from its items: `total = subtotal + tax + shipping`, with status fields left for the store to
    /// initialise as `pending`. Fails with [`AmountOverflow`] rather than wrapping when the amounts are too large.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        customer_id: Option<String>,
        buyer: BuyerContact,
        items: Vec<OrderItem>,
        tax: Money,
        shipping: Money,
        currency: String,
        payment_method: String,
        shipping_address: Address,
        billing_address: Address,
        created_at: DateTime<Utc>,
    ) -> Result<Self, AmountOverflow> {
        let lines = items.iter().map(OrderItem::line_total).collect::<Option<Vec<_>>>().ok_or(AmountOverflow)?;
        let subtotal = Money::checked_sum(lines).ok_or(AmountOverflow)?;
        let total = Money::checked_sum([subtotal, tax, shipping]).ok_or(AmountOverflow)?;
        Ok(Self {
            id,
            customer_id,
            buyer,
            items,
            subtotal,
            tax,
            shipping,
            total,
            currency,
            payment_method,
            shipping_address,
            billing_address,
            created_at,
        })
    }
}

//--------------------------------------        Audit log         ---------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub order_id: OrderId,
    pub created_at: DateTime<Utc>,
    pub actor: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub actor: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl NewAuditEntry {
    pub fn new<A: Into<String>, N: Into<String>>(actor: A, note: N, created_at: DateTime<Utc>) -> Self {
        Self { actor: actor.into(), note: note.into(), created_at }
    }
}

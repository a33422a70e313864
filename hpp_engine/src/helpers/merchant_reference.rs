//! Merchant order references: `<prefix>-<order-id>-<suffix>`.
//!
//! The reference is the only thing the gateway echoes back that ties a callback to an order, so checkout and callback
//! processing must both go through this codec. The suffix is a millisecond timestamp that makes every payment attempt
//! unique on the gateway side.
//!
//! Decoding strips `<prefix>-` and splits at the *last* `-`, so order ids that themselves contain `-` still
//! round-trip.
use std::fmt::Display;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::OrderId;

const DELIMITER: char = '-';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerchantReferenceError {
    #[error("Merchant reference '{0}' does not start with the expected prefix")]
    WrongPrefix(String),
    #[error("Merchant reference '{0}' does not contain an order id")]
    MissingOrderId(String),
    #[error("Merchant reference '{0}' has a missing or malformed suffix")]
    InvalidSuffix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantReference {
    prefix: String,
    order_id: OrderId,
    suffix: String,
}

impl MerchantReference {
    pub fn new<P: Into<String>, S: Into<String>>(prefix: P, order_id: OrderId, suffix: S) -> Self {
        Self { prefix: prefix.into(), order_id, suffix: suffix.into() }
    }

    /// A reference for a new payment attempt, using the timestamp as the uniqueness suffix.
    pub fn for_order(prefix: &str, order_id: &OrderId, at: DateTime<Utc>) -> Self {
        Self::new(prefix, order_id.clone(), at.timestamp_millis().to_string())
    }

    pub fn decode(prefix: &str, reference: &str) -> Result<Self, MerchantReferenceError> {
        let reference = reference.trim();
        let rest = reference
            .strip_prefix(prefix)
            .and_then(|s| s.strip_prefix(DELIMITER))
            .ok_or_else(|| MerchantReferenceError::WrongPrefix(reference.to_string()))?;
        let (order_id, suffix) =
            rest.rsplit_once(DELIMITER).ok_or_else(|| MerchantReferenceError::InvalidSuffix(reference.to_string()))?;
        if order_id.is_empty() {
            return Err(MerchantReferenceError::MissingOrderId(reference.to_string()));
        }
        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
            return Err(MerchantReferenceError::InvalidSuffix(reference.to_string()));
        }
        Ok(Self::new(prefix, OrderId::new(order_id), suffix))
    }

    pub fn encode(&self) -> String {
        format!("{}{DELIMITER}{}{DELIMITER}{}", self.prefix, self.order_id, self.suffix)
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl Display for MerchantReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

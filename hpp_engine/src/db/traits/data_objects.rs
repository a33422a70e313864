use hpp_common::Money;

use crate::db_types::{Address, GatewayMetadata, OrderStatusType, PaymentStatusType};

/// A partial update to an order. Only fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatusType>,
    pub payment_status: Option<PaymentStatusType>,
    pub payment_method: Option<String>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub notes: Option<String>,
    pub subtotal: Option<Money>,
    pub tax: Option<Money>,
    pub shipping: Option<Money>,
    pub total: Option<Money>,
    pub gateway: Option<GatewayMetadata>,
}

impl OrderUpdate {
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// The names of the fields this update touches, in column order.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut check = |present: bool, name: &'static str| {
            if present {
                fields.push(name);
            }
        };
        check(self.status.is_some(), "status");
        check(self.payment_status.is_some(), "payment_status");
        check(self.payment_method.is_some(), "payment_method");
        check(self.shipping_address.is_some(), "shipping_address");
        check(self.billing_address.is_some(), "billing_address");
        check(self.notes.is_some(), "notes");
        check(self.subtotal.is_some(), "subtotal");
        check(self.tax.is_some(), "tax");
        check(self.shipping.is_some(), "shipping");
        check(self.total.is_some(), "total");
        check(self.gateway.is_some(), "gateway");
        fields
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_payment_status(mut self, payment_status: PaymentStatusType) -> Self {
        self.payment_status = Some(payment_status);
        self
    }

    pub fn with_gateway(mut self, gateway: GatewayMetadata) -> Self {
        self.gateway = Some(gateway);
        self
    }
}

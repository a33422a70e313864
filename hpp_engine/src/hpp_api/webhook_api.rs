use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    config::GatewayConfig,
    db::traits::{OrderManagement, OrderStoreError, OrderUpdate},
    db_types::{CallbackFields, NewAuditEntry, OrderId, OrderStatusType, PaymentStatusType},
    events::EventProducers,
    helpers::{
        callback_policy,
        conflict_backoff,
        verify,
        CallbackDecision,
        Clock,
        GatewayOutcome,
        MerchantReference,
        OrderLocks,
        SystemClock,
        SIGNATURE_FIELD,
    },
    hpp_api::{
        errors::WebhookError,
        order_objects::{
            CallbackOutcome,
            CallbackPayload,
            CallbackResult,
            FIELD_AUTH_CODE,
            FIELD_MERCHANT_REFERENCE,
            FIELD_MESSAGE,
            FIELD_STATUS_CODE,
            FIELD_TRANSACTION_REFERENCE,
        },
    },
};

pub const GATEWAY_ACTOR: &str = "gateway";
/// How many times a callback re-reads the order after losing an optimistic-lock race to a writer that does not share
/// this API's [`OrderLocks`].
pub const MAX_UPDATE_ATTEMPTS: usize = 5;

/// `WebhookApi` processes the gateway's asynchronous payment notifications.
///
/// Every callback is authenticated with the shared-secret signature before anything else is looked at, and is applied
/// through the monotonic policy in [`callback_policy`], so replays and late deliveries cannot move an order backwards.
/// Callbacks for the same order are applied one at a time by every API sharing the same [`OrderLocks`].
pub struct WebhookApi<B> {
    db: B,
    config: Arc<GatewayConfig>,
    clock: Arc<dyn Clock>,
    producers: EventProducers,
    locks: Arc<OrderLocks>,
}

impl<B> Debug for WebhookApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookApi")
    }
}

impl<B> WebhookApi<B> {
    pub fn new(db: B, config: Arc<GatewayConfig>, producers: EventProducers) -> Self {
        Self { db, config, clock: Arc::new(SystemClock), producers, locks: Arc::new(OrderLocks::new()) }
    }

    pub fn with_order_locks(mut self, locks: Arc<OrderLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<B> WebhookApi<B>
where B: OrderManagement
{
    /// Verifies and applies a gateway callback.
    ///
    /// The checks run in a fixed order: required fields (merchant reference and signature), signature, reference
    /// format, order lookup. Each failure is terminal for this callback and leaves the order untouched.
    ///
    /// Status codes are mapped through [`GatewayOutcome`]. Gateway metadata is merged on every verified callback, even
    /// when the status transition itself is refused.
    pub async fn process_callback(&self, payload: CallbackPayload) -> Result<CallbackResult, WebhookError> {
        let reference = payload
            .get_non_empty(FIELD_MERCHANT_REFERENCE)
            .ok_or(WebhookError::MissingField(FIELD_MERCHANT_REFERENCE))?;
        let signature =
            payload.get_non_empty(SIGNATURE_FIELD).ok_or(WebhookError::MissingField(SIGNATURE_FIELD))?;
        if !self.config.can_verify_signatures() {
            error!("🪝️ A callback for {reference} arrived, but the gateway credentials are not configured");
            return Err(WebhookError::ConfigurationError);
        }
        if !verify(payload.iter(), signature, &self.config.signature_secret()) {
            warn!("🪝️ Rejected a callback for {reference} with an invalid signature. This could be a forgery attempt.");
            return Err(WebhookError::InvalidSignature);
        }
        let reference = MerchantReference::decode(&self.config.reference_prefix, reference).map_err(|e| {
            warn!("🪝️ Signed callback carried an unusable merchant reference. {e}");
            e
        })?;
        let order_id = reference.order_id().clone();
        let gateway_outcome =
            GatewayOutcome::from_code(payload.get(FIELD_STATUS_CODE).unwrap_or_default());
        let fields = CallbackFields {
            transaction_reference: payload.get(FIELD_TRANSACTION_REFERENCE).map(String::from),
            auth_code: payload.get(FIELD_AUTH_CODE).map(String::from),
            message: payload.get(FIELD_MESSAGE).map(String::from),
            status_code: payload.get(FIELD_STATUS_CODE).map(String::from),
        };
        debug!("🪝️ Verified callback for order [{order_id}]: {gateway_outcome}");
        let _guard = self.locks.lock(&order_id).await;
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            match self.try_apply(&order_id, &gateway_outcome, &fields).await {
                Err(WebhookError::StoreError(OrderStoreError::VersionConflict { .. })) => {
                    debug!("🪝️ Order [{order_id}] changed underneath callback (attempt {attempt}). Retrying.");
                    conflict_backoff(attempt).await;
                },
                result => return result,
            }
        }
        warn!("🪝️ Gave up applying callback to order [{order_id}] after {MAX_UPDATE_ATTEMPTS} attempts");
        Err(WebhookError::ConcurrencyConflict(order_id))
    }

    /// One read-decide-write cycle against the current version of the order.
    async fn try_apply(
        &self,
        order_id: &OrderId,
        gateway_outcome: &GatewayOutcome,
        fields: &CallbackFields,
    ) -> Result<CallbackResult, WebhookError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| {
            debug!("🪝️ Callback refers to unknown order [{order_id}]");
            WebhookError::OrderNotFound(order_id.clone())
        })?;
        let now = self.clock.now();
        let decision = callback_policy::decide(order.status, order.payment_status, gateway_outcome.transition());
        let mut gateway = order.gateway.clone();
        gateway.merge_callback(fields, now);
        let mut update = OrderUpdate::default().with_gateway(gateway);
        let code = fields.status_code.as_deref().unwrap_or("");
        let (outcome, note) = match &decision {
            CallbackDecision::Apply { payment_status, status } => {
                update.payment_status = *payment_status;
                update.status = *status;
                let changes = describe_changes(order.payment_status, *payment_status, order.status, *status);
                (CallbackOutcome::Applied, format!("Gateway callback '{code}' ({gateway_outcome}): {changes}"))
            },
            CallbackDecision::NoChange => {
                (CallbackOutcome::Unchanged, format!("Gateway callback '{code}' ({gateway_outcome}): no status change"))
            },
            CallbackDecision::Reject { reason } => {
                info!("🪝️ Ignoring status change for order [{order_id}]: {reason}");
                (CallbackOutcome::Ignored, format!("Gateway callback '{code}' ({gateway_outcome}) ignored: {reason}"))
            },
        };
        let audit = NewAuditEntry::new(GATEWAY_ACTOR, note, now);
        let updated = self.db.update_order(order_id, order.version, update, audit).await?;
        if let CallbackDecision::Apply { payment_status, status } = decision {
            if payment_status == Some(PaymentStatusType::Paid) {
                info!("🪝️ Order [{order_id}] has been paid");
                self.producers.publish_order_paid(&updated).await;
            }
            if status == Some(OrderStatusType::Cancelled) {
                info!("🪝️ Order [{order_id}] was cancelled at the gateway");
                self.producers.publish_order_annulled(&updated).await;
            }
            if payment_status == Some(PaymentStatusType::Paid) && updated.status == OrderStatusType::Cancelled {
                warn!("🪝️ Order [{order_id}] was paid after it had been cancelled. It needs a refund or a review.");
            }
        }
        Ok(CallbackResult { order: updated, outcome, gateway_outcome: gateway_outcome.clone() })
    }
}

fn describe_changes(
    old_payment: PaymentStatusType,
    new_payment: Option<PaymentStatusType>,
    old_status: OrderStatusType,
    new_status: Option<OrderStatusType>,
) -> String {
    let mut parts = Vec::new();
    if let Some(p) = new_payment {
        parts.push(format!("payment_status {old_payment} -> {p}"));
    }
    if let Some(s) = new_status {
        parts.push(format!("status {old_status} -> {s}"));
    }
    parts.join(", ")
}

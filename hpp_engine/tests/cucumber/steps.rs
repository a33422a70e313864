use cucumber::{then, when};
use hpp_common::Money;
use hpp_engine::{
    db_types::{Address, BuyerContact},
    helpers::{sign, verify, SIGNATURE_FIELD},
    order_objects::{CallbackPayload, CartItem, CheckoutRequest, ModifyOrderRequest},
    OrderManagement,
};
use url::Url;

use crate::cucumber::PaymentWorld;

#[when(expr = "a buyer checks out {int} x {word} at {int} AED with {int} AED tax and {int} AED shipping")]
async fn checkout(world: &mut PaymentWorld, quantity: i64, product: String, price: i64, tax: i64, shipping: i64) {
    let request = CheckoutRequest {
        customer_id: Some("cust-42".into()),
        buyer: BuyerContact {
            first_name: "Noor".into(),
            last_name: "Saleh".into(),
            email: "noor@example.com".into(),
            phone: "+971555555555".into(),
        },
        items: vec![CartItem { product_id: product, quantity, unit_price: Money::from_major(price) }],
        tax: Money::from_major(tax),
        shipping: Money::from_major(shipping),
        shipping_address: Address {
            line1: "3 Creek Road".into(),
            city: "Dubai".into(),
            country: "AE".into(),
            ..Default::default()
        },
        billing_address: None,
        description: None,
    };
    let result = world.system().checkout.create_checkout(request).await.expect("Checkout failed");
    world.order_id = Some(result.order.id.clone());
    world.redirect_url = Some(result.redirect_url);
}

fn redirect_pairs(world: &PaymentWorld) -> Vec<(String, String)> {
    let url = Url::parse(world.redirect_url.as_deref().expect("No redirect URL")).expect("Invalid redirect URL");
    url.query_pairs().into_owned().collect()
}

#[then(expr = "the redirect parameter {word} is {string}")]
async fn redirect_parameter(world: &mut PaymentWorld, name: String, value: String) {
    let pairs = redirect_pairs(world);
    let actual = pairs.iter().find(|(k, _)| *k == name).map(|(_, v)| v.as_str());
    assert_eq!(actual, Some(value.as_str()));
}

#[then("the redirect URL carries a valid signature")]
async fn redirect_signed(world: &mut PaymentWorld) {
    let pairs = redirect_pairs(world);
    let (_, signature) = pairs.iter().find(|(k, _)| k == SIGNATURE_FIELD).expect("No signature");
    let secret = world.system().config.signature_secret();
    assert!(verify(pairs.iter().map(|(k, v)| (k, v)), signature, &secret));
}

async fn deliver(world: &mut PaymentWorld, status: &str, forge: bool) {
    let order = world.system().db.fetch_order(world.order_id()).await.unwrap().expect("Order not found");
    let reference = order.gateway.merchant_reference.expect("Order has no merchant reference");
    let mut payload = CallbackPayload::from_pairs([
        ("ivp_cart", reference),
        ("tran_ref", format!("T-{}", order.version)),
        ("tran_status", status.to_string()),
        ("tran_authmessage", "cucumber".to_string()),
    ]);
    let signature = sign(payload.iter(), &world.system().config.signature_secret()).unwrap();
    payload.insert(SIGNATURE_FIELD, signature);
    if forge {
        payload.insert("tran_status", "A");
    }
    match world.system().webhook.process_callback(payload).await {
        Ok(result) => {
            world.callback_outcome = Some(result.outcome);
            world.last_error = None;
        },
        Err(e) => {
            world.callback_outcome = None;
            world.last_error = Some(e.to_string());
        },
    }
}

#[when(expr = "the gateway sends a signed callback with status {word}")]
async fn signed_callback(world: &mut PaymentWorld, status: String) {
    deliver(world, &status, false).await;
}

#[when(expr = "the gateway sends a forged callback with status {word}")]
async fn forged_callback(world: &mut PaymentWorld, status: String) {
    deliver(world, &status, true).await;
}

#[then(expr = "the callback outcome is {word}")]
async fn callback_outcome(world: &mut PaymentWorld, outcome: String) {
    let actual = world.callback_outcome.expect("The callback failed");
    assert_eq!(format!("{actual:?}").to_lowercase(), outcome);
}

#[then(expr = "the callback is rejected with {string}")]
async fn callback_rejected(world: &mut PaymentWorld, message: String) {
    let err = world.last_error.as_deref().expect("The callback was accepted");
    assert!(err.contains(&message), "'{err}' does not contain '{message}'");
}

#[then(expr = "the order status is {word} and payment status is {word}")]
async fn order_status(world: &mut PaymentWorld, status: String, payment_status: String) {
    let order = world.system().db.fetch_order(world.order_id()).await.unwrap().expect("Order not found");
    assert_eq!(order.status.to_string(), status);
    assert_eq!(order.payment_status.to_string(), payment_status);
}

async fn admin_update(world: &mut PaymentWorld, request: ModifyOrderRequest) {
    let id = world.order_id().clone();
    match world.system().admin.update_order(&id, request, "admin@example.com").await {
        Ok(_) => world.last_error = None,
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "an admin sets the order status to {word}")]
async fn admin_sets_status(world: &mut PaymentWorld, status: String) {
    admin_update(world, ModifyOrderRequest::default().with_status(status)).await;
}

#[when(expr = "an admin sets the order status to {word} and payment status to {word}")]
async fn admin_sets_both(world: &mut PaymentWorld, status: String, payment_status: String) {
    admin_update(world, ModifyOrderRequest::default().with_status(status).with_payment_status(payment_status)).await;
}

#[then(expr = "the admin update fails with {string}")]
async fn admin_fails(world: &mut PaymentWorld, message: String) {
    let err = world.last_error.as_deref().expect("The admin update succeeded");
    assert!(err.contains(&message), "'{err}' does not contain '{message}'");
}

#[then(expr = "the audit log has {int} entries")]
async fn audit_log_size(world: &mut PaymentWorld, count: usize) {
    let log = world.system().db.fetch_audit_log(world.order_id()).await.unwrap();
    assert_eq!(log.len(), count);
}

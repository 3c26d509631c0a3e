//! End-to-end coverage of the order lifecycle: creation and pricing, the
//! fulfillment state machine, payment settlement, cancellation and deletion.

mod common;

use assert_matches::assert_matches;
use common::{identity, stranger, TestApp};
use uuid::Uuid;

use storefront_api::entities::order::{OrderStatus, PaymentStatus};
use storefront_api::errors::ServiceError;
use storefront_api::services::orders::{CreateOrderRequest, OrderResponse, ShippingOverrides};

async fn place_order(app: &TestApp, buyer_id: Uuid, product_id: Uuid, quantity: i32) -> OrderResponse {
    app.state
        .services
        .order
        .create_order(
            buyer_id,
            CreateOrderRequest {
                product_id,
                quantity,
                shipping: None,
            },
        )
        .await
        .expect("order creation")
}

#[tokio::test]
async fn creating_an_order_prices_it_from_the_catalog() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;

    let order = place_order(&app, buyer.id, product.id, 2).await;

    assert_eq!(order.subtotal, 30000);
    assert_eq!(order.shipping_fee, 2000);
    assert_eq!(order.total_amount, 32000);
    assert_eq!(order.order_status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].unit_price, 15000);
    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(order.order_number.len(), "ORD-".len() + 8);
}

#[tokio::test]
async fn order_number_is_derived_from_the_id() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;

    let order = place_order(&app, buyer.id, product.id, 1).await;

    let hex = order.id.simple().to_string();
    let expected = format!("ORD-{}", hex[hex.len() - 8..].to_uppercase());
    assert_eq!(order.order_number, expected);
}

#[tokio::test]
async fn line_items_snapshot_the_price_at_order_time() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;

    let order = place_order(&app, buyer.id, product.id, 1).await;

    // Raising the catalog price must not change the historical order.
    app.state
        .services
        .product
        .update_product(
            product.id,
            storefront_api::services::products::CreateProductRequest {
                name: "Oak Table".to_string(),
                product_type: storefront_api::entities::product::ProductType::Table,
                price: 99000,
                description: "now more expensive".to_string(),
                image: None,
            },
        )
        .await
        .expect("product update");

    let updated = app
        .state
        .services
        .order
        .update_status(order.id, OrderStatus::Processing, None)
        .await
        .expect("status update");

    assert_eq!(updated.items[0].unit_price, 15000);
    assert_eq!(updated.subtotal, 15000);
    assert_eq!(updated.total_amount, 17000);
}

#[tokio::test]
async fn unknown_product_is_rejected() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;

    let result = app
        .state
        .services
        .order
        .create_order(
            buyer.id,
            CreateOrderRequest {
                product_id: Uuid::new_v4(),
                quantity: 1,
                shipping: None,
            },
        )
        .await;

    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn zero_quantity_is_rejected_before_pricing() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;

    let result = app
        .state
        .services
        .order
        .create_order(
            buyer.id,
            CreateOrderRequest {
                product_id: product.id,
                quantity: 0,
                shipping: None,
            },
        )
        .await;

    assert_matches!(result, Err(ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn shipping_overrides_are_normalized_into_the_snapshot() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;

    let order = app
        .state
        .services
        .order
        .create_order(
            buyer.id,
            CreateOrderRequest {
                product_id: product.id,
                quantity: 1,
                shipping: Some(ShippingOverrides {
                    full_name: None,
                    phone: Some("080-123 abc 4567".to_string()),
                    city: Some("Abeokuta".to_string()),
                    state: None,
                    country: None,
                }),
            },
        )
        .await
        .expect("order creation");

    assert_eq!(order.shipping_address.phone, "0801234567");
    assert_eq!(order.shipping_address.city, "Abeokuta");
    assert_eq!(order.shipping_address.full_name, "Ada");
    assert_eq!(order.shipping_address.state, "Lagos");
    assert_eq!(order.shipping_address.country, "Nigeria");
}

#[tokio::test]
async fn totals_hold_after_every_mutation() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let order = place_order(&app, buyer.id, product.id, 2).await;
    let svc = app.state.services.order.clone();

    let after_processing = svc
        .update_status(order.id, OrderStatus::Processing, None)
        .await
        .unwrap();
    assert_eq!(
        after_processing.total_amount,
        after_processing.subtotal + after_processing.shipping_fee
    );

    let after_payment = svc
        .update_payment_status(order.id, PaymentStatus::Paid)
        .await
        .unwrap();
    assert_eq!(
        after_payment.total_amount,
        after_payment.subtotal + after_payment.shipping_fee
    );

    let after_shipping = svc
        .update_status(order.id, OrderStatus::Shipped, Some("TRK-1".to_string()))
        .await
        .unwrap();
    assert_eq!(
        after_shipping.total_amount,
        after_shipping.subtotal + after_shipping.shipping_fee
    );
}

#[tokio::test]
async fn illegal_transitions_are_rejected() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let order = place_order(&app, buyer.id, product.id, 1).await;
    let svc = app.state.services.order.clone();

    // pending -> shipped skips processing
    assert_matches!(
        svc.update_status(order.id, OrderStatus::Shipped, None).await,
        Err(ServiceError::InvalidTransition(_))
    );

    svc.update_status(order.id, OrderStatus::Processing, None)
        .await
        .unwrap();
    svc.update_status(order.id, OrderStatus::Shipped, None)
        .await
        .unwrap();

    // no regression once shipped
    assert_matches!(
        svc.update_status(order.id, OrderStatus::Pending, None).await,
        Err(ServiceError::InvalidTransition(_))
    );
}

#[tokio::test]
async fn tracking_number_is_stored_verbatim() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let order = place_order(&app, buyer.id, product.id, 1).await;
    let svc = app.state.services.order.clone();

    let updated = svc
        .update_status(
            order.id,
            OrderStatus::Processing,
            Some(" DHL / 00-42 ".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(updated.tracking_number.as_deref(), Some(" DHL / 00-42 "));
}

#[tokio::test]
async fn delivery_settles_pay_on_delivery_payment_once() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let order = place_order(&app, buyer.id, product.id, 1).await;
    let svc = app.state.services.order.clone();

    svc.update_status(order.id, OrderStatus::Processing, None)
        .await
        .unwrap();
    svc.update_status(order.id, OrderStatus::Shipped, None)
        .await
        .unwrap();

    let delivered = svc
        .update_status(order.id, OrderStatus::Delivered, None)
        .await
        .unwrap();
    assert_eq!(delivered.payment_status, PaymentStatus::Paid);
    let delivered_at = delivered.delivered_at.expect("delivered timestamp");

    // Repeating the call is a no-op and must not move the timestamp.
    let repeated = svc
        .update_status(order.id, OrderStatus::Delivered, None)
        .await
        .unwrap();
    assert_eq!(repeated.delivered_at, Some(delivered_at));
    assert_eq!(repeated.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn delivery_leaves_failed_payment_untouched() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let order = place_order(&app, buyer.id, product.id, 1).await;
    let svc = app.state.services.order.clone();

    svc.update_status(order.id, OrderStatus::Processing, None)
        .await
        .unwrap();
    svc.update_status(order.id, OrderStatus::Shipped, None)
        .await
        .unwrap();
    svc.update_payment_status(order.id, PaymentStatus::Failed)
        .await
        .unwrap();

    let delivered = svc
        .update_status(order.id, OrderStatus::Delivered, None)
        .await
        .unwrap();

    assert_eq!(delivered.payment_status, PaymentStatus::Failed);
    assert!(delivered.delivered_at.is_some());
}

#[tokio::test]
async fn payment_status_updates_are_permissive() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let order = place_order(&app, buyer.id, product.id, 1).await;
    let svc = app.state.services.order.clone();

    for status in [
        PaymentStatus::Paid,
        PaymentStatus::Refunded,
        PaymentStatus::Failed,
        PaymentStatus::Pending,
    ] {
        let updated = svc.update_payment_status(order.id, status).await.unwrap();
        assert_eq!(updated.payment_status, status);
    }
}

#[tokio::test]
async fn owner_can_cancel_a_pending_order() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let order = place_order(&app, buyer.id, product.id, 1).await;

    let cancelled = app
        .state
        .services
        .order
        .cancel_order(order.id, &identity(&buyer))
        .await
        .expect("cancellation");

    assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
}

#[tokio::test]
async fn stranger_cannot_cancel_someone_elses_order() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let order = place_order(&app, buyer.id, product.id, 1).await;

    let result = app
        .state
        .services
        .order
        .cancel_order(order.id, &stranger())
        .await;

    assert_matches!(result, Err(ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn admin_can_cancel_any_processing_order() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let admin = app.register_admin("admin@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let order = place_order(&app, buyer.id, product.id, 1).await;
    let svc = app.state.services.order.clone();

    svc.update_status(order.id, OrderStatus::Processing, None)
        .await
        .unwrap();

    let cancelled = svc
        .cancel_order(order.id, &identity(&admin))
        .await
        .expect("admin cancellation");
    assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn shipped_orders_cannot_be_cancelled() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let order = place_order(&app, buyer.id, product.id, 1).await;
    let svc = app.state.services.order.clone();

    svc.update_status(order.id, OrderStatus::Processing, None)
        .await
        .unwrap();
    svc.update_status(order.id, OrderStatus::Shipped, None)
        .await
        .unwrap();

    let result = svc.cancel_order(order.id, &identity(&buyer)).await;
    assert_matches!(result, Err(ServiceError::InvalidTransition(_)));
}

#[tokio::test]
async fn cancelling_twice_does_not_move_the_timestamp() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let order = place_order(&app, buyer.id, product.id, 1).await;
    let svc = app.state.services.order.clone();

    let first = svc
        .cancel_order(order.id, &identity(&buyer))
        .await
        .expect("first cancellation");
    let cancelled_at = first.cancelled_at.expect("cancellation timestamp");

    // Second attempt fails the eligibility check and leaves the order as-is.
    let second = svc.cancel_order(order.id, &identity(&buyer)).await;
    assert_matches!(second, Err(ServiceError::InvalidTransition(_)));

    let via_admin_update = svc
        .update_status(order.id, OrderStatus::Cancelled, None)
        .await
        .expect("same-status update is a no-op");
    assert_eq!(via_admin_update.cancelled_at, Some(cancelled_at));
}

#[tokio::test]
async fn deleting_requires_cancellation_or_force() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let svc = app.state.services.order.clone();

    let order = place_order(&app, buyer.id, product.id, 1).await;
    assert_matches!(
        svc.delete_order(order.id, false).await,
        Err(ServiceError::InvalidTransition(_))
    );

    svc.delete_order(order.id, true).await.expect("forced deletion");
    assert_matches!(
        svc.delete_order(order.id, true).await,
        Err(ServiceError::NotFound(_))
    );

    let second = place_order(&app, buyer.id, product.id, 1).await;
    svc.cancel_order(second.id, &identity(&buyer)).await.unwrap();
    svc.delete_order(second.id, false)
        .await
        .expect("deleting a cancelled order");
}

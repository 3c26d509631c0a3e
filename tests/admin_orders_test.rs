//! Read-side coverage: user listings, admin filtering and pagination, and
//! the status summary.

mod common;

use common::{identity, TestApp};
use uuid::Uuid;

use storefront_api::entities::order::OrderStatus;
use storefront_api::queries::order_queries::{
    GetOrderDetailQuery, GetUserOrdersQuery, ListOrdersQuery, OrderStatusCountsQuery,
    Query as OrderQuery,
};
use storefront_api::services::orders::CreateOrderRequest;

async fn place_order(app: &TestApp, buyer_id: Uuid, product_id: Uuid) -> Uuid {
    app.state
        .services
        .order
        .create_order(
            buyer_id,
            CreateOrderRequest {
                product_id,
                quantity: 1,
                shipping: None,
            },
        )
        .await
        .expect("order creation")
        .id
}

#[tokio::test]
async fn user_orders_are_listed_newest_first() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let other = app.register_customer("Bola", "bola@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;

    let first = place_order(&app, buyer.id, product.id).await;
    let second = place_order(&app, buyer.id, product.id).await;
    place_order(&app, other.id, product.id).await;

    let orders = GetUserOrdersQuery { user_id: buyer.id }
        .execute(&app.state.db)
        .await
        .expect("user listing");

    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id, second);
    assert_eq!(orders[1].id, first);
    assert!(!orders[0].items.is_empty());
}

#[tokio::test]
async fn admin_listing_filters_and_paginates() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let svc = app.state.services.order.clone();

    // 7 processing orders and 3 left pending.
    for _ in 0..7 {
        let id = place_order(&app, buyer.id, product.id).await;
        svc.update_status(id, OrderStatus::Processing, None)
            .await
            .unwrap();
    }
    for _ in 0..3 {
        place_order(&app, buyer.id, product.id).await;
    }

    let page_two = ListOrdersQuery {
        status: Some(OrderStatus::Processing),
        page: 2,
        page_size: 5,
    }
    .execute(&app.state.db)
    .await
    .expect("admin listing");

    assert_eq!(page_two.total, 7);
    assert_eq!(page_two.total_pages, 2);
    assert_eq!(page_two.orders.len(), 2);
    assert!(page_two
        .orders
        .iter()
        .all(|o| o.order.order_status == OrderStatus::Processing));
    assert!(page_two
        .orders
        .iter()
        .all(|o| o.customer.as_ref().map(|c| c.email.as_str()) == Some("ada@example.com")));

    let unfiltered = ListOrdersQuery {
        status: None,
        page: 1,
        page_size: 5,
    }
    .execute(&app.state.db)
    .await
    .expect("unfiltered listing");

    assert_eq!(unfiltered.total, 10);
    assert_eq!(unfiltered.orders.len(), 5);
}

#[tokio::test]
async fn page_and_page_size_are_clamped() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    place_order(&app, buyer.id, product.id).await;

    let page = ListOrdersQuery {
        status: None,
        page: 0,
        page_size: 0,
    }
    .execute(&app.state.db)
    .await
    .expect("clamped listing");

    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 1);
    assert_eq!(page.orders.len(), 1);
}

#[tokio::test]
async fn status_counts_cover_the_full_order_set() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let svc = app.state.services.order.clone();

    for _ in 0..2 {
        place_order(&app, buyer.id, product.id).await;
    }
    let processing = place_order(&app, buyer.id, product.id).await;
    svc.update_status(processing, OrderStatus::Processing, None)
        .await
        .unwrap();
    let cancelled = place_order(&app, buyer.id, product.id).await;
    svc.cancel_order(cancelled, &identity(&buyer)).await.unwrap();

    let counts = OrderStatusCountsQuery
        .execute(&app.state.db)
        .await
        .expect("status counts");

    assert_eq!(counts.total, 4);
    assert_eq!(counts.pending, 2);
    assert_eq!(counts.processing, 1);
    assert_eq!(counts.cancelled, 1);
    assert_eq!(counts.shipped, 0);
    assert_eq!(counts.delivered, 0);
}

#[tokio::test]
async fn detail_resolves_items_and_customer() {
    let app = TestApp::new().await;
    let buyer = app.register_customer("Ada", "ada@example.com").await;
    let product = app.seed_product("Oak Table", 15000).await;
    let order_id = place_order(&app, buyer.id, product.id).await;

    let detail = GetOrderDetailQuery { order_id }
        .execute(&app.state.db)
        .await
        .expect("detail query")
        .expect("order exists");

    assert_eq!(detail.order.id, order_id);
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].product_name, "Oak Table");
    assert_eq!(
        detail.customer.as_ref().map(|c| c.email.as_str()),
        Some("ada@example.com")
    );

    let missing = GetOrderDetailQuery {
        order_id: Uuid::new_v4(),
    }
    .execute(&app.state.db)
    .await
    .expect("detail query");
    assert!(missing.is_none());
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{rbac, AuthUser};
use crate::entities::order::{
    ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel, OrderStatus,
    PaymentMethod, PaymentStatus,
};
use crate::entities::order_item::{
    self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity, Model as OrderItemModel,
};
use crate::entities::product::Entity as ProductEntity;
use crate::entities::user::{self, Entity as UserEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::pricing;

/// Shipping snapshot defaults applied when neither the request nor the
/// buyer's profile provides a value.
pub const DEFAULT_FULL_NAME: &str = "Customer";
pub const DEFAULT_PHONE: &str = "08000000000";
pub const DEFAULT_CITY: &str = "Lagos";
pub const DEFAULT_STATE: &str = "Lagos";
pub const DEFAULT_COUNTRY: &str = "Nigeria";

/// Request/response types for the order service
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[serde(default)]
    pub shipping: Option<ShippingOverrides>,
}

/// Optional shipping details supplied at checkout. Missing fields fall back
/// to the buyer's profile, then to the store defaults.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ShippingOverrides {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemView {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: String,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItemView>,
    pub shipping_address: ShippingAddress,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub total_amount: i64,
    pub tracking_number: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Strips a phone number to its digits. An all-non-digit value falls back to
/// the default line so the snapshot is never empty.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        DEFAULT_PHONE.to_string()
    } else {
        digits
    }
}

/// Legal fulfillment transitions. Same-status updates are accepted so that
/// retried requests stay idempotent; every other combination is rejected.
fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match (from, to) {
        (Pending, Processing) => true,
        (Pending, Cancelled) => true,
        (Processing, Shipped) => true,
        (Processing, Cancelled) => true,
        (Shipped, Delivered) => true,
        _ if from == to => true,
        _ => false,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Owns the order entity: creation, status and payment transitions,
/// cancellation and deletion eligibility. All mutations are read-modify-write
/// inside a transaction so concurrent updates to the same order serialize.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    shipping_fee: i64,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, shipping_fee: i64) -> Self {
        Self {
            db,
            event_sender,
            shipping_fee,
        }
    }

    /// Creates a priced order for a single product.
    ///
    /// The product's current price, name and image are snapshotted into the
    /// line item; totals are computed before anything is persisted.
    #[instrument(skip(self, request), fields(buyer_id = %buyer_id, product_id = %request.product_id))]
    pub async fn create_order(
        &self,
        buyer_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;

        let db = &*self.db;

        let buyer = UserEntity::find_by_id(buyer_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {buyer_id} not found")))?;

        let product = ProductEntity::find_by_id(request.product_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", request.product_id))
            })?;

        let totals = pricing::compute_totals([(product.price, request.quantity)], self.shipping_fee);
        let shipping = resolve_shipping(&buyer, request.shipping.unwrap_or_default());

        let order_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order_model = OrderActiveModel {
            id: Set(order_id),
            user_id: Set(buyer.id),
            payment_method: Set(PaymentMethod::PayOnDelivery),
            payment_status: Set(PaymentStatus::Pending),
            order_status: Set(OrderStatus::Pending),
            subtotal: Set(totals.subtotal),
            shipping_fee: Set(self.shipping_fee),
            total_amount: Set(totals.total_amount),
            tracking_number: Set(None),
            shipping_full_name: Set(shipping.full_name.clone()),
            shipping_phone: Set(shipping.phone.clone()),
            shipping_city: Set(shipping.city.clone()),
            shipping_state: Set(shipping.state.clone()),
            shipping_country: Set(shipping.country.clone()),
            delivered_at: Set(None),
            cancelled_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, %order_id, "failed to create order");
            ServiceError::DatabaseError(e)
        })?;

        let item_model = OrderItemActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(product.id),
            product_name: Set(product.name.clone()),
            product_image: Set(product.image.clone()),
            quantity: Set(request.quantity),
            unit_price: Set(product.price),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, %order_id, "failed to create order line item");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, %order_id, "failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(%order_id, order_number = %order_model.order_number(), "order created");

        if let Err(e) = self.event_sender.send(Event::OrderCreated(order_id)).await {
            warn!(error = %e, %order_id, "failed to publish order created event");
        }

        Ok(to_response(order_model, vec![item_model]))
    }

    /// Applies a fulfillment-status transition.
    ///
    /// Illegal transitions are rejected with `InvalidTransition`. Entering
    /// `delivered` stamps `delivered_at` once and settles pay-on-delivery
    /// payment unless it already failed or was refunded; entering `cancelled`
    /// stamps `cancelled_at` once. A tracking number, when supplied, is
    /// stored verbatim regardless of the target status.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, %order_id, "failed to start transaction for status update");
            ServiceError::DatabaseError(e)
        })?;

        let (current, items) = load_order_with_items(&txn, order_id).await?;
        let old_status = current.order_status;

        if !is_valid_transition(old_status, new_status) {
            return Err(ServiceError::InvalidTransition(format!(
                "Cannot transition from '{old_status}' to '{new_status}'"
            )));
        }

        let now = Utc::now();
        let totals = pricing::totals_for_items(&items, current.shipping_fee);
        let delivered_now = new_status == OrderStatus::Delivered && current.delivered_at.is_none();
        let cancelled_now = new_status == OrderStatus::Cancelled && current.cancelled_at.is_none();

        let mut active: OrderActiveModel = current.clone().into();
        active.order_status = Set(new_status);
        active.subtotal = Set(totals.subtotal);
        active.total_amount = Set(totals.total_amount);

        if let Some(tracking) = tracking_number {
            active.tracking_number = Set(Some(tracking));
        }

        if delivered_now {
            active.delivered_at = Set(Some(now));
            // Pay-on-delivery settlement: delivery implies payment, unless the
            // payment already reached a terminal negative state.
            if !matches!(
                current.payment_status,
                PaymentStatus::Failed | PaymentStatus::Refunded
            ) {
                active.payment_status = Set(PaymentStatus::Paid);
            }
        }

        if cancelled_now {
            active.cancelled_at = Set(Some(now));
        }

        let updated = active.update(&txn).await.map_err(|e| {
            error!(error = %e, %order_id, "failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, %order_id, "failed to commit status update");
            ServiceError::DatabaseError(e)
        })?;

        info!(%order_id, %old_status, %new_status, "order status updated");

        if old_status != new_status {
            if let Err(e) = self
                .event_sender
                .send(Event::OrderStatusChanged {
                    order_id,
                    old_status: old_status.to_string(),
                    new_status: new_status.to_string(),
                })
                .await
            {
                warn!(error = %e, %order_id, "failed to publish status change event");
            }
        }
        if delivered_now {
            if let Err(e) = self.event_sender.send(Event::OrderDelivered(order_id)).await {
                warn!(error = %e, %order_id, "failed to publish delivery event");
            }
        }
        if cancelled_now {
            if let Err(e) = self.event_sender.send(Event::OrderCancelled(order_id)).await {
                warn!(error = %e, %order_id, "failed to publish cancellation event");
            }
        }

        Ok(to_response(updated, items))
    }

    /// Overwrites the payment status.
    ///
    /// Deliberately permissive: payment reconciliation is manual, so any
    /// payment status is reachable from any other.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_payment_status(
        &self,
        order_id: Uuid,
        new_status: PaymentStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, %order_id, "failed to start transaction for payment update");
            ServiceError::DatabaseError(e)
        })?;

        let (current, items) = load_order_with_items(&txn, order_id).await?;
        let old_status = current.payment_status;
        let totals = pricing::totals_for_items(&items, current.shipping_fee);

        let mut active: OrderActiveModel = current.into();
        active.payment_status = Set(new_status);
        active.subtotal = Set(totals.subtotal);
        active.total_amount = Set(totals.total_amount);

        let updated = active.update(&txn).await.map_err(|e| {
            error!(error = %e, %order_id, "failed to update payment status");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, %order_id, "failed to commit payment update");
            ServiceError::DatabaseError(e)
        })?;

        info!(%order_id, %old_status, %new_status, "payment status updated");

        if old_status != new_status {
            if let Err(e) = self
                .event_sender
                .send(Event::PaymentStatusChanged {
                    order_id,
                    old_status: old_status.to_string(),
                    new_status: new_status.to_string(),
                })
                .await
            {
                warn!(error = %e, %order_id, "failed to publish payment change event");
            }
        }

        Ok(to_response(updated, items))
    }

    /// Cancels an order on behalf of its owner or an admin.
    #[instrument(skip(self, identity), fields(order_id = %order_id, user_id = %identity.id))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        identity: &AuthUser,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, %order_id, "failed to start transaction for cancellation");
            ServiceError::DatabaseError(e)
        })?;

        let (current, items) = load_order_with_items(&txn, order_id).await?;

        if !rbac::can_access_order(identity, &current) {
            return Err(ServiceError::Forbidden("Access denied".to_string()));
        }

        if !matches!(
            current.order_status,
            OrderStatus::Pending | OrderStatus::Processing
        ) {
            return Err(ServiceError::InvalidTransition(format!(
                "Order cannot be cancelled. Current status: {}",
                current.order_status
            )));
        }

        let totals = pricing::totals_for_items(&items, current.shipping_fee);
        let cancelled_at = current.cancelled_at;

        let mut active: OrderActiveModel = current.into();
        active.order_status = Set(OrderStatus::Cancelled);
        active.subtotal = Set(totals.subtotal);
        active.total_amount = Set(totals.total_amount);
        if cancelled_at.is_none() {
            active.cancelled_at = Set(Some(Utc::now()));
        }

        let updated = active.update(&txn).await.map_err(|e| {
            error!(error = %e, %order_id, "failed to cancel order");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, %order_id, "failed to commit cancellation");
            ServiceError::DatabaseError(e)
        })?;

        info!(%order_id, "order cancelled");

        if let Err(e) = self.event_sender.send(Event::OrderCancelled(order_id)).await {
            warn!(error = %e, %order_id, "failed to publish cancellation event");
        }

        Ok(to_response(updated, items))
    }

    /// Permanently removes an order. Only cancelled orders may be deleted
    /// unless `force` is set.
    #[instrument(skip(self), fields(order_id = %order_id, force = force))]
    pub async fn delete_order(&self, order_id: Uuid, force: bool) -> Result<(), ServiceError> {
        let db = &*self.db;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, %order_id, "failed to start transaction for deletion");
            ServiceError::DatabaseError(e)
        })?;

        let current = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        if current.order_status != OrderStatus::Cancelled && !force {
            return Err(ServiceError::InvalidTransition(
                "Only cancelled orders can be deleted. Use force=true to override.".to_string(),
            ));
        }

        OrderItemEntity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        OrderEntity::delete_by_id(order_id).exec(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, %order_id, "failed to commit deletion");
            ServiceError::DatabaseError(e)
        })?;

        info!(%order_id, "order deleted");

        if let Err(e) = self.event_sender.send(Event::OrderDeleted(order_id)).await {
            warn!(error = %e, %order_id, "failed to publish deletion event");
        }

        Ok(())
    }
}

async fn load_order_with_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<(OrderModel, Vec<OrderItemModel>), ServiceError> {
    let order = OrderEntity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

    let items = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;

    Ok((order, items))
}

fn resolve_shipping(buyer: &user::Model, overrides: ShippingOverrides) -> ShippingAddress {
    let full_name = non_empty(overrides.full_name)
        .or_else(|| non_empty(Some(buyer.name.clone())))
        .unwrap_or_else(|| DEFAULT_FULL_NAME.to_string());

    let phone = normalize_phone(
        &non_empty(overrides.phone)
            .or_else(|| non_empty(buyer.phone.clone()))
            .unwrap_or_default(),
    );

    let city = non_empty(overrides.city)
        .or_else(|| non_empty(buyer.city.clone()))
        .unwrap_or_else(|| DEFAULT_CITY.to_string());

    let state = non_empty(overrides.state)
        .or_else(|| non_empty(buyer.state.clone()))
        .unwrap_or_else(|| DEFAULT_STATE.to_string());

    let country =
        non_empty(overrides.country).unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

    ShippingAddress {
        full_name,
        phone,
        city,
        state,
        country,
    }
}

/// Converts a persisted order and its line items to the response shape.
pub fn to_response(order: OrderModel, items: Vec<OrderItemModel>) -> OrderResponse {
    OrderResponse {
        id: order.id,
        order_number: order.order_number(),
        order_status: order.order_status,
        payment_status: order.payment_status,
        payment_method: order.payment_method,
        items: items
            .into_iter()
            .map(|item| OrderItemView {
                product_id: item.product_id,
                product_name: item.product_name,
                product_image: item.product_image,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
        shipping_address: ShippingAddress {
            full_name: order.shipping_full_name,
            phone: order.shipping_phone,
            city: order.shipping_city,
            state: order.shipping_state,
            country: order.shipping_country,
        },
        subtotal: order.subtotal,
        shipping_fee: order.shipping_fee,
        total_amount: order.total_amount,
        tracking_number: order.tracking_number,
        delivered_at: order.delivered_at,
        cancelled_at: order.cancelled_at,
        created_at: order.created_at,
    }
}

//! Back-office order management. Every handler requires the admin role.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{rbac, AuthUser};
use crate::entities::order::{OrderStatus, PaymentStatus};
use crate::entities::user::UserRole;
use crate::errors::ServiceError;
use crate::queries::order_queries::{
    GetOrderDetailQuery, ListOrdersQuery, OrderPage, OrderStatusCountsQuery, OrderWithCustomer,
    Query as OrderQuery, StatusCounts,
};
use crate::services::orders::OrderResponse;
use crate::{ApiResponse, AppState};

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminOrderListParams {
    /// Exact status filter; omit or pass "all" for every order.
    pub status: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeleteOrderParams {
    /// Allows deleting an order that is not cancelled.
    pub force: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrdersResponse {
    #[serde(flatten)]
    pub page: OrderPage,
    pub stats: StatusCounts,
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<OrderStatus>, ServiceError> {
    match raw {
        None | Some("all") => Ok(None),
        Some(value) => OrderStatus::from_str(value)
            .map(Some)
            .map_err(|_| ServiceError::InvalidInput(format!("Unknown order status: {value}"))),
    }
}

/// All orders, filtered and paginated, with per-status totals
#[utoipa::path(
    get,
    path = "/admin/orders",
    params(AdminOrderListParams),
    responses(
        (status = 200, description = "Page of orders", body = ApiResponse<AdminOrdersResponse>),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<AdminOrderListParams>,
) -> Result<Json<ApiResponse<AdminOrdersResponse>>, ServiceError> {
    rbac::require_role(&auth_user, &[UserRole::Admin])?;

    let status = parse_status_filter(params.status.as_deref())?;

    let page = ListOrdersQuery {
        status,
        page: params.page.unwrap_or(DEFAULT_PAGE),
        page_size: params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    }
    .execute(&state.db)
    .await?;

    let stats = OrderStatusCountsQuery.execute(&state.db).await?;

    Ok(Json(ApiResponse::success(AdminOrdersResponse {
        page,
        stats,
    })))
}

/// Order detail for the back-office
#[utoipa::path(
    get,
    path = "/admin/orders/{id}",
    operation_id = "admin_get_order",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order detail", body = ApiResponse<OrderWithCustomer>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderWithCustomer>>, ServiceError> {
    rbac::require_role(&auth_user, &[UserRole::Admin])?;

    let detail = GetOrderDetailQuery { order_id: id }
        .execute(&state.db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(ApiResponse::success(detail.into_view())))
}

/// Move an order through the fulfillment state machine
#[utoipa::path(
    put,
    path = "/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Illegal status transition", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    rbac::require_role(&auth_user, &[UserRole::Admin])?;

    let status = request.status;
    let order = state
        .services
        .order
        .update_status(id, status, request.tracking_number)
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        order,
        format!("Order status updated to {status}"),
    )))
}

/// Overwrite an order's payment status
#[utoipa::path(
    put,
    path = "/admin/orders/{id}/payment",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Payment status updated", body = ApiResponse<OrderResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePaymentStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    rbac::require_role(&auth_user, &[UserRole::Admin])?;

    let payment_status = request.payment_status;
    let order = state
        .services
        .order
        .update_payment_status(id, payment_status)
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        order,
        format!("Payment status updated to {payment_status}"),
    )))
}

/// Permanently delete an order
#[utoipa::path(
    delete,
    path = "/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        DeleteOrderParams,
    ),
    responses(
        (status = 200, description = "Order deleted"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not cancelled and force was not set", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteOrderParams>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    rbac::require_role(&auth_user, &[UserRole::Admin])?;

    state
        .services
        .order
        .delete_order(id, params.force.unwrap_or(false))
        .await?;

    Ok(Json(ApiResponse::message_only("Order deleted successfully")))
}

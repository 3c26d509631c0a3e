use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::auth::{rbac, AuthUser};
use crate::errors::ServiceError;
use crate::queries::order_queries::{
    GetOrderDetailQuery, GetUserOrdersQuery, OrderWithCustomer, Query as OrderQuery,
};
use crate::services::orders::{CreateOrderRequest, OrderResponse};
use crate::{ApiResponse, AppState};

/// Place an order for a product
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let order = state
        .services
        .order
        .create_order(auth_user.id, request)
        .await?;

    let message = format!(
        "Order placed successfully! Your order number is {}",
        order.order_number
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(order, message)),
    ))
}

/// The authenticated user's orders, newest first
#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "Order history", body = ApiResponse<Vec<OrderResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let orders = GetUserOrdersQuery {
        user_id: auth_user.id,
    }
    .execute(&state.db)
    .await?;

    Ok(Json(ApiResponse::success(orders)))
}

/// Detail view of a single order. Owner or admin only.
#[utoipa::path(
    get,
    path = "/orders/{id}",
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
    let detail = GetOrderDetailQuery { order_id: id }
        .execute(&state.db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {id} not found")))?;

    if !rbac::can_access_order(&auth_user, &detail.order) {
        return Err(ServiceError::Forbidden("Access denied".to_string()));
    }

    Ok(Json(ApiResponse::success(detail.into_view())))
}

/// Cancel an order that has not shipped yet. Owner or admin only.
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order can no longer be cancelled", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.order.cancel_order(id, &auth_user).await?;
    Ok(Json(ApiResponse::success_with_message(
        order,
        "Order cancelled successfully",
    )))
}

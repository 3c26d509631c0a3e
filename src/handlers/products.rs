use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{rbac, AuthUser};
use crate::entities::product::{Model as ProductModel, ProductType};
use crate::entities::user::UserRole;
use crate::errors::ServiceError;
use crate::services::products::CreateProductRequest;
use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub product_type: ProductType,
    pub price: i64,
    pub description: String,
    pub image: String,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
}

impl From<ProductModel> for ProductResponse {
    fn from(product: ProductModel) -> Self {
        Self {
            id: product.id,
            name: product.name,
            product_type: product.product_type,
            price: product.price,
            description: product.description,
            image: product.image,
            likes: product.likes,
            created_at: product.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LikeResponse {
    pub likes: i32,
}

/// Browse the catalog, newest first
#[utoipa::path(
    get,
    path = "/products",
    responses(
        (status = 200, description = "Catalog listing", body = ApiResponse<Vec<ProductResponse>>),
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, ServiceError> {
    let products = state.services.product.list_products().await?;
    Ok(Json(ApiResponse::success(
        products.into_iter().map(ProductResponse::from).collect(),
    )))
}

/// Single product detail
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product detail", body = ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let product = state.services.product.get_product(id).await?;
    Ok(Json(ApiResponse::success(product.into())))
}

/// Like a product
#[utoipa::path(
    post,
    path = "/products/{id}/like",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Updated like count", body = ApiResponse<LikeResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn like_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LikeResponse>>, ServiceError> {
    let likes = state.services.product.like_product(id).await?;
    Ok(Json(ApiResponse::success(LikeResponse { likes })))
}

/// Add a product to the catalog
#[utoipa::path(
    post,
    path = "/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductResponse>),
        (status = 400, description = "Invalid product data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ServiceError> {
    rbac::require_role(&auth_user, &[UserRole::Admin])?;

    let product = state.services.product.create_product(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            product.into(),
            "Product created successfully",
        )),
    ))
}

/// Update a catalog entry
#[utoipa::path(
    put,
    path = "/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateProductRequest>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    rbac::require_role(&auth_user, &[UserRole::Admin])?;

    let product = state.services.product.update_product(id, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        product.into(),
        "Product updated successfully",
    )))
}

/// Remove a product from the catalog
#[utoipa::path(
    delete,
    path = "/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    rbac::require_role(&auth_user, &[UserRole::Admin])?;

    state.services.product.delete_product(id).await?;
    Ok(Json(ApiResponse::message_only("Product deleted successfully")))
}

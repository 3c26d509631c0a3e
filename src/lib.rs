//! Storefront API Library
//!
//! Core functionality for the furniture storefront backend: product catalog,
//! customer accounts, and the order lifecycle.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod queries;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::auth::{AuthConfig, AuthService};
use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::AppServices;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub event_sender: EventSender,
    pub services: AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: AppConfig, event_sender: EventSender) -> Self {
        let auth = Arc::new(AuthService::new(AuthConfig::new(
            config.jwt_secret.clone(),
            config.auth_issuer.clone(),
            config.auth_audience.clone(),
            Duration::from_secs(config.jwt_expiration_secs),
        )));
        let services = AppServices::new(db.clone(), event_sender.clone(), config.shipping_fee);

        Self {
            db,
            config,
            event_sender,
            services,
            auth,
        }
    }
}

// Common response wrapper
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    /// Success response carrying only a human-readable message.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Liveness endpoint.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Composes the full application router.
///
/// Public routes never consult identity; everything else sits behind the
/// authentication middleware, with role checks applied per handler.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/api-docs/openapi.json", get(openapi::serve_openapi))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/products", get(handlers::products::list_products))
        .route("/products/:id", get(handlers::products::get_product))
        .route("/products/:id/like", post(handlers::products::like_product));

    let protected = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/orders",
            get(handlers::orders::list_my_orders).post(handlers::orders::create_order),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/cancel", post(handlers::orders::cancel_order))
        .route("/admin/orders", get(handlers::admin_orders::list_orders))
        .route(
            "/admin/orders/:id",
            get(handlers::admin_orders::get_order).delete(handlers::admin_orders::delete_order),
        )
        .route(
            "/admin/orders/:id/status",
            put(handlers::admin_orders::update_order_status),
        )
        .route(
            "/admin/orders/:id/payment",
            put(handlers::admin_orders::update_payment_status),
        )
        .route("/admin/products", post(handlers::products::create_product))
        .route(
            "/admin/products/:id",
            put(handlers::products::update_product).delete(handlers::products::delete_product),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new().merge(public).merge(protected).with_state(state)
}

//! Shared test harness: an application instance over in-memory SQLite.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
};
use sea_orm::{ConnectOptions, Database};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::auth::AuthUser;
use storefront_api::config::AppConfig;
use storefront_api::entities::product::{self, ProductType};
use storefront_api::entities::user;
use storefront_api::events::EventSender;
use storefront_api::services::products::CreateProductRequest;
use storefront_api::services::users::RegisterRequest;
use storefront_api::{build_router, AppState};

pub const TEST_PASSWORD: &str = "secret-password-1";

pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single connection keeps every query on the same in-memory
        // database.
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options)
            .await
            .expect("sqlite in-memory connection");

        storefront_api::db::run_migrations(&db)
            .await
            .expect("migrations");

        let (event_tx, event_rx) = mpsc::channel(64);
        tokio::spawn(storefront_api::events::process_events(event_rx));

        let state = AppState::new(
            Arc::new(db),
            test_config(),
            EventSender::new(event_tx),
        );

        Self { state }
    }

    pub async fn seed_product(&self, name: &str, price: i64) -> product::Model {
        self.state
            .services
            .product
            .create_product(CreateProductRequest {
                name: name.to_string(),
                product_type: ProductType::Chair,
                price,
                description: format!("{name} description"),
                image: None,
            })
            .await
            .expect("seed product")
    }

    pub async fn register_customer(&self, name: &str, email: &str) -> user::Model {
        self.state
            .services
            .user
            .register(RegisterRequest {
                name: name.to_string(),
                email: email.to_string(),
                password: TEST_PASSWORD.to_string(),
                phone: None,
                address: None,
                city: None,
                state: None,
            })
            .await
            .expect("register customer")
    }

    pub async fn register_admin(&self, email: &str) -> user::Model {
        self.state
            .services
            .user
            .ensure_admin(email, TEST_PASSWORD)
            .await
            .expect("bootstrap admin");
        self.state
            .services
            .user
            .authenticate(email, TEST_PASSWORD)
            .await
            .expect("authenticate admin")
    }

    pub fn token_for(&self, account: &user::Model) -> String {
        self.state.auth.generate_token(account).expect("token")
    }

    /// Sends one request through a fresh router over the shared state.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        build_router(self.state.clone())
            .oneshot(request)
            .await
            .expect("response")
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        auto_migrate: true,
        db_max_connections: 1,
        log_level: "warn".to_string(),
        log_json: false,
        jwt_secret: "x".repeat(64),
        jwt_expiration_secs: 3600,
        auth_issuer: "storefront-api".to_string(),
        auth_audience: "storefront-clients".to_string(),
        shipping_fee: 2000,
        admin_email: None,
        admin_password: None,
    }
}

/// Identity as the middleware would resolve it for this account.
pub fn identity(account: &user::Model) -> AuthUser {
    AuthUser {
        id: account.id,
        name: account.name.clone(),
        email: account.email.clone(),
        role: account.role,
    }
}

/// An identity that does not correspond to any stored account.
pub fn stranger() -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        name: "Stranger".to_string(),
        email: "stranger@example.com".to_string(),
        role: user::UserRole::Customer,
    }
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

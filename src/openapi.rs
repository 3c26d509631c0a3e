//! OpenAPI document for the storefront API, served at
//! `/api-docs/openapi.json`.

use axum::response::Json;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::like_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_my_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::admin_orders::list_orders,
        crate::handlers::admin_orders::get_order,
        crate::handlers::admin_orders::update_order_status,
        crate::handlers::admin_orders::update_payment_status,
        crate::handlers::admin_orders::delete_order,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "products", description = "Catalog browsing and management"),
        (name = "orders", description = "Order placement and lifecycle"),
        (name = "admin", description = "Back-office order management"),
    ),
    info(
        title = "Storefront API",
        description = "Furniture storefront backend: catalog, accounts, and order lifecycle"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

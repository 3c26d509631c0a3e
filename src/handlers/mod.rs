pub mod admin_orders;
pub mod auth;
pub mod orders;
pub mod products;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

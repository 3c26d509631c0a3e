pub mod orders;
pub mod pricing;
pub mod products;
pub mod users;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub order: Arc<orders::OrderService>,
    pub product: Arc<products::ProductService>,
    pub user: Arc<users::UserService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, shipping_fee: i64) -> Self {
        Self {
            order: Arc::new(orders::OrderService::new(
                db.clone(),
                event_sender.clone(),
                shipping_fee,
            )),
            product: Arc::new(products::ProductService::new(db.clone(), event_sender.clone())),
            user: Arc::new(users::UserService::new(db, event_sender)),
        }
    }
}

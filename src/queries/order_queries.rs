//! Read-side queries over persisted orders: listings, detail retrieval and
//! the admin status summary. Writers live in `services::orders`.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus};
use crate::entities::order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel};
use crate::entities::user::{Entity as UserEntity, Model as UserModel};
use crate::errors::ServiceError;
use crate::services::orders::{to_response, OrderResponse};

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_PAGE_SIZE: u64 = 10;

/// Trait representing a generic asynchronous query.
#[async_trait]
pub trait Query: Send + Sync {
    type Result: Send + Sync;

    /// Executes the query using the provided database connection
    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError>;
}

/// Owner snapshot attached to admin views.
#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<&UserModel> for CustomerSummary {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithCustomer {
    pub order: OrderResponse,
    pub customer: Option<CustomerSummary>,
}

/// One page of the admin order listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPage {
    pub orders: Vec<OrderWithCustomer>,
    pub total: u64,
    pub total_pages: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Per-status totals over the full order set, for the back-office summary.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct StatusCounts {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub shipped: u64,
    pub delivered: u64,
    pub cancelled: u64,
}

/// All orders belonging to one user, newest first.
#[derive(Debug)]
pub struct GetUserOrdersQuery {
    pub user_id: Uuid,
}

#[async_trait]
impl Query for GetUserOrdersQuery {
    type Result = Vec<OrderResponse>;

    #[instrument(skip(self, db), fields(user_id = %self.user_id))]
    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        debug!("executing GetUserOrdersQuery");

        let orders = OrderEntity::find()
            .filter(order::Column::UserId.eq(self.user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(db)
            .await?;

        let mut items_by_order = load_items(db, &orders).await?;

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                to_response(order, items)
            })
            .collect())
    }
}

/// Admin-wide listing with optional exact-status filter and offset
/// pagination. Page and page size are clamped to at least one.
#[derive(Debug)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    pub page: u64,
    pub page_size: u64,
}

impl Default for ListOrdersQuery {
    fn default() -> Self {
        Self {
            status: None,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[async_trait]
impl Query for ListOrdersQuery {
    type Result = OrderPage;

    #[instrument(skip(self, db), fields(status = ?self.status, page = self.page))]
    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        debug!("executing ListOrdersQuery");

        let page = self.page.max(1);
        let page_size = self.page_size.max(1);

        let mut select = OrderEntity::find();
        if let Some(status) = self.status {
            select = select.filter(order::Column::OrderStatus.eq(status));
        }

        let paginator = select
            .order_by_desc(order::Column::CreatedAt)
            .paginate(db, page_size);

        let total = paginator.num_items().await?;
        let total_pages = total.div_ceil(page_size);
        let orders = paginator.fetch_page(page - 1).await?;

        let mut items_by_order = load_items(db, &orders).await?;
        let customers = load_customers(db, &orders).await?;

        let orders = orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                let customer = customers.get(&order.user_id).map(CustomerSummary::from);
                OrderWithCustomer {
                    order: to_response(order, items),
                    customer,
                }
            })
            .collect();

        Ok(OrderPage {
            orders,
            total,
            total_pages,
            page,
            page_size,
        })
    }
}

/// Aggregate per-status counts over the full (unfiltered) order set.
#[derive(Debug)]
pub struct OrderStatusCountsQuery;

#[derive(Debug, FromQueryResult)]
struct StatusCountRow {
    order_status: OrderStatus,
    count: i64,
}

#[async_trait]
impl Query for OrderStatusCountsQuery {
    type Result = StatusCounts;

    #[instrument(skip(self, db))]
    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        debug!("executing OrderStatusCountsQuery");

        let rows: Vec<StatusCountRow> = OrderEntity::find()
            .select_only()
            .column(order::Column::OrderStatus)
            .column_as(order::Column::Id.count(), "count")
            .group_by(order::Column::OrderStatus)
            .into_model()
            .all(db)
            .await?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let n = row.count.max(0) as u64;
            counts.total += n;
            match row.order_status {
                OrderStatus::Pending => counts.pending = n,
                OrderStatus::Processing => counts.processing = n,
                OrderStatus::Shipped => counts.shipped = n,
                OrderStatus::Delivered => counts.delivered = n,
                OrderStatus::Cancelled => counts.cancelled = n,
            }
        }

        Ok(counts)
    }
}

/// Full order detail: the order, its line items and the owning account.
#[derive(Debug)]
pub struct GetOrderDetailQuery {
    pub order_id: Uuid,
}

#[derive(Debug)]
pub struct OrderDetail {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
    pub customer: Option<UserModel>,
}

impl OrderDetail {
    /// Converts to the response shape once access has been granted.
    pub fn into_view(self) -> OrderWithCustomer {
        let customer = self.customer.as_ref().map(CustomerSummary::from);
        OrderWithCustomer {
            order: to_response(self.order, self.items),
            customer,
        }
    }
}

#[async_trait]
impl Query for GetOrderDetailQuery {
    type Result = Option<OrderDetail>;

    #[instrument(skip(self, db), fields(order_id = %self.order_id))]
    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        debug!("executing GetOrderDetailQuery");

        let Some(order) = OrderEntity::find_by_id(self.order_id).one(db).await? else {
            return Ok(None);
        };

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(db)
            .await?;

        let customer = UserEntity::find_by_id(order.user_id).one(db).await?;

        Ok(Some(OrderDetail {
            order,
            items,
            customer,
        }))
    }
}

async fn load_items(
    db: &DatabaseConnection,
    orders: &[OrderModel],
) -> Result<HashMap<Uuid, Vec<OrderItemModel>>, ServiceError> {
    if orders.is_empty() {
        return Ok(HashMap::new());
    }

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .all(db)
        .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }
    Ok(by_order)
}

async fn load_customers(
    db: &DatabaseConnection,
    orders: &[OrderModel],
) -> Result<HashMap<Uuid, UserModel>, ServiceError> {
    if orders.is_empty() {
        return Ok(HashMap::new());
    }

    let user_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();
    let users = UserEntity::find()
        .filter(crate::entities::user::Column::Id.is_in(user_ids))
        .all(db)
        .await?;

    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

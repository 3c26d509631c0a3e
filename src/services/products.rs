use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::product::{
    self, ActiveModel as ProductActiveModel, Entity as ProductEntity, Model as ProductModel,
    ProductType, DEFAULT_PRODUCT_IMAGE,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    pub product_type: ProductType,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,
    #[validate(length(min = 1, max = 1000, message = "Description must be between 1 and 1000 characters"))]
    pub description: String,
    /// Stored filename of an uploaded image.
    pub image: Option<String>,
}

/// Catalog management. Orders snapshot product data at creation time, so
/// edits here never rewrite order history.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Lists the catalog, newest first.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductModel>, ServiceError> {
        let products = ProductEntity::find()
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;

        let product_id = Uuid::new_v4();
        let model = ProductActiveModel {
            id: Set(product_id),
            name: Set(request.name),
            product_type: Set(request.product_type),
            price: Set(request.price),
            description: Set(request.description),
            image: Set(request
                .image
                .unwrap_or_else(|| DEFAULT_PRODUCT_IMAGE.to_string())),
            likes: Set(0),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to create product");
            ServiceError::DatabaseError(e)
        })?;

        info!(%product_id, "product created");

        if let Err(e) = self.event_sender.send(Event::ProductCreated(product_id)).await {
            warn!(error = %e, %product_id, "failed to publish product created event");
        }

        Ok(model)
    }

    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        request: CreateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;

        let current = self.get_product(product_id).await?;

        let mut active: ProductActiveModel = current.into();
        active.name = Set(request.name);
        active.product_type = Set(request.product_type);
        active.price = Set(request.price);
        active.description = Set(request.description);
        if let Some(image) = request.image {
            active.image = Set(image);
        }

        let updated = active.update(&*self.db).await.map_err(|e| {
            error!(error = %e, %product_id, "failed to update product");
            ServiceError::DatabaseError(e)
        })?;

        info!(%product_id, "product updated");

        if let Err(e) = self.event_sender.send(Event::ProductUpdated(product_id)).await {
            warn!(error = %e, %product_id, "failed to publish product updated event");
        }

        Ok(updated)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let current = self.get_product(product_id).await?;
        ProductEntity::delete_by_id(current.id).exec(&*self.db).await?;

        info!(%product_id, "product deleted");

        if let Err(e) = self.event_sender.send(Event::ProductDeleted(product_id)).await {
            warn!(error = %e, %product_id, "failed to publish product deleted event");
        }

        Ok(())
    }

    /// Increments the like counter. Read-modify-write runs in a transaction
    /// so concurrent likes are not lost.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn like_product(&self, product_id: Uuid) -> Result<i32, ServiceError> {
        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, %product_id, "failed to start transaction for like");
            ServiceError::DatabaseError(e)
        })?;

        let current = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

        let likes = current.likes + 1;
        let mut active: ProductActiveModel = current.into();
        active.likes = Set(likes);
        active.update(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, %product_id, "failed to commit like");
            ServiceError::DatabaseError(e)
        })?;

        Ok(likes)
    }
}

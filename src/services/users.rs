use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthService;
use crate::entities::user::{
    self, ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel, UserRole,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Account registration and credential checks.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Registers a customer account. Emails are unique.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<UserModel, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;

        self.create_account(request, UserRole::Customer).await
    }

    /// Verifies credentials, returning the account on success. The same
    /// error covers unknown emails and bad passwords.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserModel, ServiceError> {
        let account = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::Unauthorized("Invalid email or password".to_string())
            })?;

        if !AuthService::verify_password(password, &account.password_hash) {
            return Err(ServiceError::Unauthorized(
                "Invalid email or password".to_string(),
            ));
        }

        Ok(account)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserModel, ServiceError> {
        UserEntity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {user_id} not found")))
    }

    /// Creates the configured admin account at startup when it is absent.
    /// Runs once in the startup sequence, never defensively elsewhere.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), ServiceError> {
        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?;

        if existing.is_some() {
            return Ok(());
        }

        self.create_account(
            RegisterRequest {
                name: "Admin".to_string(),
                email: email.to_string(),
                password: password.to_string(),
                phone: None,
                address: None,
                city: None,
                state: None,
            },
            UserRole::Admin,
        )
        .await?;

        info!(%email, "bootstrap admin account created");
        Ok(())
    }

    async fn create_account(
        &self,
        request: RegisterRequest,
        role: UserRole,
    ) -> Result<UserModel, ServiceError> {
        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(request.email.clone()))
            .one(&*self.db)
            .await?;

        if existing.is_some() {
            return Err(ServiceError::InvalidInput(
                "Email already registered".to_string(),
            ));
        }

        let password_hash = AuthService::hash_password(&request.password)?;
        let user_id = Uuid::new_v4();

        let model = UserActiveModel {
            id: Set(user_id),
            name: Set(request.name),
            email: Set(request.email),
            password_hash: Set(password_hash),
            role: Set(role),
            phone: Set(request.phone),
            address: Set(request.address),
            city: Set(request.city),
            state: Set(request.state),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to create user account");
            ServiceError::DatabaseError(e)
        })?;

        if let Err(e) = self.event_sender.send(Event::UserRegistered(user_id)).await {
            warn!(error = %e, %user_id, "failed to publish registration event");
        }

        Ok(model)
    }
}

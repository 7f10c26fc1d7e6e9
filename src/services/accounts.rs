use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{hash_password, verify_password, AuthError};
use crate::database::manager::DatabaseError;
use crate::database::record::{Entity, RecordError};
use crate::database::{DocQuery, DocumentStore, Repository};
use crate::error::ApiError;
use crate::models::user::normalize_email;
use crate::models::{Role, Subrole, User};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("User already exists")]
    EmailTaken,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmailTaken => ApiError::conflict("User already exists"),
            AccountError::Auth(e) => e.into(),
            AccountError::Record(e) => e.into(),
            AccountError::Database(DatabaseError::Duplicate { .. }) => ApiError::conflict("User already exists"),
            AccountError::Database(e) => e.into(),
        }
    }
}

/// Everything needed to open a login account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub subrole: Option<Subrole>,
    pub staff_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role,
            subrole: None,
            staff_id: None,
            student_id: None,
            parent_id: None,
        }
    }
}

/// User account lifecycle: registration, credential checks, password changes.
pub struct AccountService {
    users: Repository<User>,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(store: Arc<dyn DocumentStore>, bcrypt_cost: u32) -> Self {
        Self {
            users: Repository::new(store),
            bcrypt_cost,
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        self.users
            .select_one(DocQuery::new().eq("email", normalize_email(email)))
            .await
    }

    /// Build and validate a user without storing it.
    pub async fn prepare(&self, account: NewAccount) -> Result<User, AccountError> {
        if account.password.is_empty() {
            return Err(RecordError::MissingRequiredField("password".to_string()).into());
        }
        if self.find_by_email(&account.email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let hash = hash_password(&account.password, self.bcrypt_cost)?;
        let mut user = User::new(account.name, account.email, hash, account.role);
        user.subrole = account.subrole;
        user.staff_id = account.staff_id;
        user.student_id = account.student_id;
        user.parent_id = account.parent_id;
        user.validate()?;
        Ok(user)
    }

    pub async fn register(&self, account: NewAccount) -> Result<User, AccountError> {
        let user = self.prepare(account).await?;
        self.users.insert(&user).await?;
        tracing::info!("Registered {} user {}", user.role.as_str(), user.meta.id);
        Ok(user)
    }

    /// Check credentials. Unknown emails and wrong passwords look the same.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }
        Ok(user)
    }

    pub fn hash(&self, password: &str) -> Result<String, AccountError> {
        if password.is_empty() {
            return Err(RecordError::MissingRequiredField("password".to_string()).into());
        }
        Ok(hash_password(password, self.bcrypt_cost)?)
    }
}

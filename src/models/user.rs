use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::record::{require_text, Entity, Meta, RecordError};
use crate::database::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Parent,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Parent => "parent",
            Role::Student => "student",
        }
    }
}

/// Finer-grained staff duty. Only meaningful for staff users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Subrole {
    Teacher,
    Bursar,
    Classteacher,
    NonTeaching,
}

impl Subrole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subrole::Teacher => "teacher",
            Subrole::Bursar => "bursar",
            Subrole::Classteacher => "classteacher",
            Subrole::NonTeaching => "non-teaching",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub meta: Meta,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub subrole: Option<Subrole>,
    #[serde(default)]
    pub staff_id: Option<Uuid>,
    #[serde(default)]
    pub student_id: Option<Uuid>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// A user as returned to clients. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub meta: Meta,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub subrole: Option<Subrole>,
    pub staff_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password_hash: String, role: Role) -> Self {
        let mut user = Self {
            meta: Meta::new(),
            name: name.into(),
            email: email.into(),
            password_hash,
            role,
            subrole: None,
            staff_id: None,
            student_id: None,
            parent_id: None,
        };
        user.recompute();
        user
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            meta: self.meta.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            subrole: self.subrole,
            staff_id: self.staff_id,
            student_id: self.student_id,
            parent_id: self.parent_id,
        }
    }
}

/// Emails are matched case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Entity for User {
    const COLLECTION: Collection = Collection::Users;
    const LABEL: &'static str = "User";

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn managed_fields() -> &'static [&'static str] {
        &["passwordHash"]
    }

    fn recompute(&mut self) {
        self.email = normalize_email(&self.email);
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_text("name", &self.name)?;
        require_text("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(RecordError::invalid("email", "Invalid email address"));
        }
        if self.subrole.is_some() && self.role != Role::Staff {
            return Err(RecordError::invalid("subrole", "Subrole only applies to staff users"));
        }
        Ok(())
    }
}

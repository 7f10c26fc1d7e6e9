// handlers/mod.rs - Public (no auth) and protected (JWT auth) handler tiers
pub mod protected;
pub mod public;

use serde_json::Value;

use crate::error::ApiError;

/// Role gates. A user passes when their role or staff subrole is listed.
pub mod gates {
    pub const ADMIN: &[&str] = &["admin"];
    pub const ADMIN_STAFF: &[&str] = &["admin", "staff"];
    pub const FINANCE: &[&str] = &["admin", "bursar"];
    pub const FINANCE_READ: &[&str] = &["admin", "bursar", "staff"];
}

/// Take an optional top-level string out of a JSON body.
pub(crate) fn take_string(body: &mut Value, field: &str) -> Option<String> {
    body.as_object_mut()
        .and_then(|map| map.remove(field))
        .and_then(|value| value.as_str().map(str::to_string))
}

/// `userData` block of the with-account endpoints.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct AccountInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<crate::models::Role>,
    #[serde(default)]
    pub subrole: Option<crate::models::Subrole>,
}

impl AccountInput {
    /// Name and email fall back to the profile the account is opened for.
    pub fn into_account(
        self,
        name: &str,
        email: Option<&str>,
        role: crate::models::Role,
    ) -> Result<crate::services::NewAccount, ApiError> {
        let email = self
            .email
            .or_else(|| email.map(str::to_string))
            .ok_or_else(|| ApiError::field_error("userData.email", "An email is required for the account"))?;
        let mut account = crate::services::NewAccount::new(self.name.unwrap_or_else(|| name.to_string()), email, self.password, role);
        account.subrole = self.subrole;
        Ok(account)
    }
}

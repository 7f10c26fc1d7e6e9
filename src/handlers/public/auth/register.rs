// handlers/public/auth/register.rs - POST /auth/register handler

use axum::{extract::State, http::HeaderMap};
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::gates;
use crate::middleware::{authenticate, ApiJson, ApiResponse, ApiResult};
use crate::models::{parse_variant, Role, Subrole, UserProfile};
use crate::services::NewAccount;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub subrole: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /auth/register - create a login account.
///
/// With public registration disabled the caller must present an admin token.
pub async fn register_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<UserProfile> {
    if !state.config.security.allow_public_registration {
        authenticate(&state, &headers).await?.require_any(gates::ADMIN)?;
    }

    let (name, email, password, role) = match (
        present(payload.name),
        present(payload.email),
        present(payload.password),
        present(payload.role),
    ) {
        (Some(name), Some(email), Some(password), Some(role)) => (name, email, password, role),
        _ => return Err(ApiError::bad_request("Please provide all required fields")),
    };

    let role: Role = parse_variant(&role).ok_or_else(|| ApiError::field_error("role", format!("Unknown role '{}'", role)))?;
    let subrole = match present(payload.subrole) {
        Some(raw) => Some(
            parse_variant::<Subrole>(&raw)
                .ok_or_else(|| ApiError::field_error("subrole", format!("Unknown subrole '{}'", raw)))?,
        ),
        None => None,
    };

    let mut account = NewAccount::new(name, email, password, role);
    account.subrole = subrole;
    let user = state.accounts().register(account).await?;

    Ok(ApiResponse::created(user.profile()).with_message("User registered successfully"))
}

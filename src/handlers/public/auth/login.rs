// handlers/public/auth/login.rs - POST /auth/login handler

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::models::{Role, Subrole, UserProfile};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub subrole: Option<Subrole>,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: UserProfile,
}

/// POST /auth/login - exchange email and password for a bearer token.
///
/// Unknown emails and wrong passwords both answer 400 "Invalid credentials".
pub async fn login_post(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let (email, password) = match (payload.email, payload.password) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => (email, password),
        _ => return Err(ApiError::bad_request("Please provide both email and password")),
    };

    let user = state.accounts().authenticate(&email, &password).await.map_err(|e| {
        tracing::info!("Failed login for {}", email.trim());
        ApiError::from(e)
    })?;
    let issued = state.tokens.issue(&user)?;
    tracing::info!("User {} logged in", user.meta.id);

    Ok(ApiResponse::success(LoginResponse {
        token: issued.token,
        role: user.role,
        subrole: user.subrole,
        expires_in: issued.expires_in,
        user: user.profile(),
    })
    .with_message("Login successful"))
}

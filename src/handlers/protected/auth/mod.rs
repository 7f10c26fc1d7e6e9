// handlers/protected/auth/mod.rs - Session endpoints for authenticated users

use axum::{extract::State, Extension};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{Role, Subrole, User, UserProfile};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: Uuid,
    pub role: Role,
    pub subrole: Option<Subrole>,
    pub expires_at: i64,
    pub user: UserProfile,
}

/// GET /api/auth/profile - token claims plus the stored user
pub async fn profile(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Profile> {
    let user = state.repo::<User>().select_404(auth.user_id).await?;

    Ok(ApiResponse::success(Profile {
        user_id: auth.user_id,
        role: auth.role,
        subrole: auth.subrole,
        expires_at: auth.expires_at,
        user: user.profile(),
    })
    .with_message("Access granted"))
}

/// POST /api/auth/logout - revoke the presented token until it expires
pub async fn logout(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Option<()>> {
    state.revocations.revoke(&auth.token, auth.expires_at).await;
    tracing::info!("User {} logged out", auth.user_id);

    Ok(ApiResponse::success(None).with_message("User logged out successfully"))
}

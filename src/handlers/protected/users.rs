use axum::extract::State;
use axum::Extension;
use serde_json::Value;
use uuid::Uuid;

use crate::database::{apply_patch, DocQuery};
use crate::error::ApiError;
use crate::handlers::{gates, take_string};
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::models::{Staff, User, UserProfile};
use crate::AppState;

/// Fields only an admin may change on a user.
const PRIVILEGED_FIELDS: &[&str] = &["role", "subrole", "staffId", "studentId", "parentId"];

/// GET /api/users
pub async fn list(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Vec<UserProfile>> {
    auth.require_any(gates::ADMIN)?;

    let users = state.repo::<User>().select_any(DocQuery::new()).await?;
    Ok(ApiResponse::success(users.iter().map(User::profile).collect()))
}

/// GET /api/users/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<UserProfile> {
    auth.require_self_or_admin(id)?;

    let user = state.repo::<User>().select_404(id).await?;
    Ok(ApiResponse::success(user.profile()))
}

/// PUT /api/users/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut body): ApiJson<Value>,
) -> ApiResult<UserProfile> {
    auth.require_self_or_admin(id)?;

    if !auth.is_admin() {
        let touches_privileged = body
            .as_object()
            .map(|map| PRIVILEGED_FIELDS.iter().any(|f| map.contains_key(*f)))
            .unwrap_or(false);
        if touches_privileged {
            return Err(ApiError::forbidden("Unauthorized"));
        }
    }

    let password = take_string(&mut body, "password");
    let repo = state.repo::<User>();
    let current = repo.select_404(id).await?;
    let mut updated = apply_patch(&current, body)?;
    if let Some(password) = password {
        updated.password_hash = state.accounts().hash(&password)?;
    }
    repo.update(&updated).await?;
    tracing::info!("User {} updated by {}", id, auth.user_id);

    Ok(ApiResponse::success(updated.profile()).with_message("User updated successfully"))
}

/// DELETE /api/users/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<UserProfile> {
    auth.require_any(gates::ADMIN)?;

    let removed = state
        .repo::<User>()
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let staff_repo = state.repo::<Staff>();
    for mut staff in staff_repo.select_any(DocQuery::new().eq("user", id)).await? {
        staff.user = None;
        staff_repo.save(&mut staff).await?;
    }
    tracing::info!("Deleted user {}", id);

    Ok(ApiResponse::success(removed.profile()).with_message("User deleted successfully"))
}

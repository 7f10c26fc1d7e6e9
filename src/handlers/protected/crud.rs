//! Generic handlers for collections without cross-document rules:
//! academic years, classes, subjects, requirements and the school profile.
//! Writes are admin-only, reads are open to any authenticated user.

use axum::extract::State;
use axum::Extension;
use serde_json::Value;
use uuid::Uuid;

use crate::database::{apply_patch, from_api_input, DocQuery, Entity};
use crate::handlers::gates;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::AppState;

/// GET /api/<collection>
pub async fn list<T: Entity>(State(state): State<AppState>) -> ApiResult<Vec<T>> {
    let records = state.repo::<T>().select_any(DocQuery::new()).await?;
    Ok(ApiResponse::success(records))
}

/// GET /api/<collection>/:id
pub async fn get<T: Entity>(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<T> {
    let record = state.repo::<T>().select_404(id).await?;
    Ok(ApiResponse::success(record))
}

/// POST /api/<collection>
pub async fn create<T: Entity>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<T> {
    user.require_any(gates::ADMIN)?;

    let record: T = from_api_input(body)?;
    state.repo::<T>().insert(&record).await?;
    tracing::info!("Created {} {}", T::LABEL, record.id());

    Ok(ApiResponse::created(record).with_message(format!("{} created successfully", T::LABEL)))
}

/// PUT /api/<collection>/:id
pub async fn update<T: Entity>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<T> {
    user.require_any(gates::ADMIN)?;

    let repo = state.repo::<T>();
    let current = repo.select_404(id).await?;
    let updated = apply_patch(&current, body)?;
    repo.update(&updated).await?;

    Ok(ApiResponse::success(updated).with_message(format!("{} updated successfully", T::LABEL)))
}

/// DELETE /api/<collection>/:id
pub async fn delete<T: Entity>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<T> {
    user.require_any(gates::ADMIN)?;

    let removed = state
        .repo::<T>()
        .delete(id)
        .await?
        .ok_or_else(|| crate::error::ApiError::not_found(format!("{} not found", T::LABEL)))?;
    tracing::info!("Deleted {} {}", T::LABEL, id);

    Ok(ApiResponse::success(removed).with_message(format!("{} deleted successfully", T::LABEL)))
}

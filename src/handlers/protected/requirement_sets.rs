use axum::extract::State;
use axum::Extension;
use serde_json::Value;
use uuid::Uuid;

use crate::database::{apply_patch, from_api_input};
use crate::error::ApiError;
use crate::handlers::gates;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::models::{AcademicTerm, Requirement, RequirementSet, SchoolClass};
use crate::AppState;

/// Every reference in a set must resolve.
async fn check_references(state: &AppState, set: &RequirementSet) -> Result<(), ApiError> {
    let ids = set.requirement_ids();
    let found = state.repo::<Requirement>().select_ids(&ids).await?;
    if found.len() != ids.len() {
        return Err(ApiError::bad_request("Some requirements are invalid"));
    }
    state.repo::<SchoolClass>().select_404(set.school_class).await?;
    state.repo::<AcademicTerm>().select_404(set.academic_term).await?;
    Ok(())
}

/// POST /api/requirement-sets
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<RequirementSet> {
    auth.require_any(gates::ADMIN)?;

    let set: RequirementSet = from_api_input(body)?;
    check_references(&state, &set).await?;
    state.repo::<RequirementSet>().insert(&set).await?;
    tracing::info!("Created requirement set {} with {} items", set.meta.id, set.requirement_items.len());

    Ok(ApiResponse::created(set).with_message("Requirement set created successfully"))
}

/// PUT /api/requirement-sets/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<RequirementSet> {
    auth.require_any(gates::ADMIN)?;

    let repo = state.repo::<RequirementSet>();
    let current = repo.select_404(id).await?;
    let updated = apply_patch(&current, body)?;
    check_references(&state, &updated).await?;
    repo.update(&updated).await?;

    Ok(ApiResponse::success(updated).with_message("Requirement set updated successfully"))
}

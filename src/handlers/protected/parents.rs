use axum::extract::State;
use axum::Extension;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::database::record::RecordError;
use crate::database::{apply_patch, from_api_input, DocQuery, SortDirection, SortKind};
use crate::error::ApiError;
use crate::handlers::{gates, AccountInput};
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::models::{Parent, Role, Student, User, UserProfile};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStudentRequest {
    pub parent_id: Uuid,
    pub student_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentWithAccountRequest {
    pub parent_data: Value,
    #[serde(default)]
    pub user_data: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentWithAccount {
    pub parent: Parent,
    pub user: Option<UserProfile>,
    pub has_account: bool,
}

/// GET /api/parents
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Parent>> {
    let query = DocQuery::new().sort("fullName", SortDirection::Asc, SortKind::Text);
    Ok(ApiResponse::success(state.repo::<Parent>().select_any(query).await?))
}

/// GET /api/parents/:id
pub async fn get(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Parent> {
    Ok(ApiResponse::success(state.repo::<Parent>().select_404(id).await?))
}

/// POST /api/parents
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Parent> {
    auth.require_any(gates::ADMIN_STAFF)?;

    let parent: Parent = from_api_input(body)?;
    state.repo::<Parent>().insert(&parent).await?;

    Ok(ApiResponse::created(parent).with_message("Parent created successfully"))
}

/// PUT /api/parents/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Parent> {
    auth.require_any(gates::ADMIN_STAFF)?;

    let repo = state.repo::<Parent>();
    let current = repo.select_404(id).await?;
    let updated = apply_patch(&current, body)?;
    repo.update(&updated).await?;

    Ok(ApiResponse::success(updated).with_message("Parent updated successfully"))
}

/// DELETE /api/parents/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Parent> {
    auth.require_any(gates::ADMIN)?;

    let removed = state
        .repo::<Parent>()
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Parent not found"))?;
    let students = state.family().forget_parent(id).await?;
    tracing::info!("Deleted parent {} ({} student links dropped)", id, students);

    Ok(ApiResponse::success(removed).with_message("Parent deleted successfully"))
}

/// POST /api/parents/add-student
pub async fn add_student(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<AddStudentRequest>,
) -> ApiResult<Parent> {
    auth.require_any(gates::ADMIN_STAFF)?;

    let (_, parent) = state.family().link(req.student_id, req.parent_id, None, false).await?;
    Ok(ApiResponse::success(parent).with_message("Student added to parent successfully"))
}

/// DELETE /api/parents/:id/student/:student_id
pub async fn remove_student(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath((id, student_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Parent> {
    auth.require_any(gates::ADMIN_STAFF)?;

    let (_, parent) = state.family().unlink(student_id, id).await?;
    Ok(ApiResponse::success(parent).with_message("Student removed from parent successfully"))
}

/// GET /api/parents/student/:student_id
pub async fn by_student(State(state): State<AppState>, ApiPath(student_id): ApiPath<Uuid>) -> ApiResult<Vec<Parent>> {
    state.repo::<Student>().select_404(student_id).await?;
    let parents = state
        .repo::<Parent>()
        .select_any(DocQuery::new().any("students", student_id))
        .await?;
    Ok(ApiResponse::success(parents))
}

/// POST /api/parents/with-account
///
/// The account role is always `parent`, whatever the body says.
pub async fn create_with_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<ParentWithAccountRequest>,
) -> ApiResult<ParentWithAccount> {
    auth.require_any(gates::ADMIN)?;

    let parent: Parent = from_api_input(req.parent_data)?;
    let user = match req.user_data {
        Some(data) => {
            let input: AccountInput = serde_json::from_value(data).map_err(RecordError::from)?;
            let mut account = input.into_account(&parent.full_name, parent.email.as_deref(), Role::Parent)?;
            account.subrole = None;
            account.parent_id = Some(parent.meta.id);
            Some(state.accounts().prepare(account).await?)
        }
        None => None,
    };

    let parent_repo = state.repo::<Parent>();
    parent_repo.insert(&parent).await?;
    if let Some(user) = &user {
        if let Err(e) = state.repo::<User>().insert(user).await {
            parent_repo.delete(parent.meta.id).await?;
            return Err(crate::services::AccountError::from(e).into());
        }
    }
    tracing::info!("Created parent {} (account: {})", parent.meta.id, user.is_some());

    Ok(ApiResponse::created(ParentWithAccount {
        has_account: user.is_some(),
        user: user.as_ref().map(User::profile),
        parent,
    })
    .with_message("Parent created successfully with user account"))
}

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
use crate::models::{parse_variant, EmploymentStatus, Role, SchoolClass, Staff, Subject, User, UserProfile};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAssignment {
    pub staff_id: Uuid,
    pub subject_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAssignment {
    pub staff_id: Uuid,
    pub class_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffWithAccountRequest {
    pub staff_data: Value,
    #[serde(default)]
    pub user_data: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffWithAccount {
    pub staff: Staff,
    pub user: Option<UserProfile>,
    pub has_account: bool,
}

/// Subject and class ids in a staff body must point at stored records.
async fn check_assignments(state: &AppState, staff: &Staff) -> Result<(), ApiError> {
    let subjects = state.repo::<Subject>().select_ids(&staff.subjects).await?;
    if subjects.len() != staff.subjects.len() {
        return Err(ApiError::field_error("subjects", "Some subjects are invalid"));
    }
    let classes = state.repo::<SchoolClass>().select_ids(&staff.classes).await?;
    if classes.len() != staff.classes.len() {
        return Err(ApiError::field_error("classes", "Some classes are invalid"));
    }
    Ok(())
}

async fn listing(state: &AppState, query: DocQuery) -> ApiResult<Vec<Staff>> {
    let query = query.sort("fullName", SortDirection::Asc, SortKind::Text);
    let staff = state.repo::<Staff>().select_any(query).await?;
    Ok(ApiResponse::success(staff))
}

/// GET /api/staff
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Staff>> {
    listing(&state, DocQuery::new()).await
}

/// GET /api/staff/:id
pub async fn get(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Staff> {
    Ok(ApiResponse::success(state.repo::<Staff>().select_404(id).await?))
}

/// POST /api/staff
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Staff> {
    auth.require_any(gates::ADMIN)?;

    let staff: Staff = from_api_input(body)?;
    check_assignments(&state, &staff).await?;
    state.repo::<Staff>().insert(&staff).await?;
    tracing::info!("Created staff member {}", staff.meta.id);

    Ok(ApiResponse::created(staff).with_message("Staff created successfully"))
}

/// PUT /api/staff/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Staff> {
    auth.require_any(gates::ADMIN)?;

    let repo = state.repo::<Staff>();
    let current = repo.select_404(id).await?;
    let updated = apply_patch(&current, body)?;
    check_assignments(&state, &updated).await?;
    repo.update(&updated).await?;

    Ok(ApiResponse::success(updated).with_message("Staff updated successfully"))
}

/// DELETE /api/staff/:id
///
/// The linked login account survives; it only loses its `staffId`.
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Staff> {
    auth.require_any(gates::ADMIN)?;

    let removed = state
        .repo::<Staff>()
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Staff not found"))?;

    let users = state.repo::<User>();
    for mut user in users.select_any(DocQuery::new().eq("staffId", id)).await? {
        user.staff_id = None;
        users.save(&mut user).await?;
    }
    tracing::info!("Deleted staff member {}", id);

    Ok(ApiResponse::success(removed).with_message("Staff deleted successfully"))
}

/// GET /api/staff/department/:department
pub async fn by_department(State(state): State<AppState>, ApiPath(department): ApiPath<String>) -> ApiResult<Vec<Staff>> {
    listing(&state, DocQuery::new().eq("department", department)).await
}

/// GET /api/staff/status/:status
pub async fn by_status(State(state): State<AppState>, ApiPath(status): ApiPath<String>) -> ApiResult<Vec<Staff>> {
    let status: EmploymentStatus = parse_variant(&status)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid employment status '{}'", status)))?;
    listing(&state, DocQuery::new().eq("employmentStatus", status)).await
}

/// GET /api/staff/subject/:subject_id
pub async fn by_subject(State(state): State<AppState>, ApiPath(subject_id): ApiPath<Uuid>) -> ApiResult<Vec<Staff>> {
    listing(&state, DocQuery::new().any("subjects", subject_id)).await
}

/// GET /api/staff/class/:class_id
pub async fn by_class(State(state): State<AppState>, ApiPath(class_id): ApiPath<Uuid>) -> ApiResult<Vec<Staff>> {
    listing(&state, DocQuery::new().any("classes", class_id)).await
}

/// POST /api/staff/add-subject
pub async fn add_subject(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<SubjectAssignment>,
) -> ApiResult<Staff> {
    auth.require_any(gates::ADMIN)?;

    let repo = state.repo::<Staff>();
    let mut staff = repo.select_404(req.staff_id).await?;
    state.repo::<Subject>().select_404(req.subject_id).await?;

    if !staff.assign_subject(req.subject_id) {
        return Err(ApiError::bad_request("Subject already assigned to this teacher"));
    }
    repo.save(&mut staff).await?;

    Ok(ApiResponse::success(staff).with_message("Subject added to teacher successfully"))
}

/// DELETE /api/staff/:id/subject/:subject_id
pub async fn remove_subject(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath((id, subject_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Staff> {
    auth.require_any(gates::ADMIN)?;

    let repo = state.repo::<Staff>();
    let mut staff = repo.select_404(id).await?;
    if !staff.unassign_subject(subject_id) {
        return Err(ApiError::bad_request("Subject not assigned to this teacher"));
    }
    repo.save(&mut staff).await?;

    Ok(ApiResponse::success(staff).with_message("Subject removed from teacher successfully"))
}

/// POST /api/staff/add-class
pub async fn add_class(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<ClassAssignment>,
) -> ApiResult<Staff> {
    auth.require_any(gates::ADMIN)?;

    let repo = state.repo::<Staff>();
    let mut staff = repo.select_404(req.staff_id).await?;
    state.repo::<SchoolClass>().select_404(req.class_id).await?;

    if !staff.assign_class(req.class_id) {
        return Err(ApiError::bad_request("Class already assigned to this teacher"));
    }
    repo.save(&mut staff).await?;

    Ok(ApiResponse::success(staff).with_message("Class added to teacher successfully"))
}

/// DELETE /api/staff/:id/class/:class_id
pub async fn remove_class(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath((id, class_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Staff> {
    auth.require_any(gates::ADMIN)?;

    let repo = state.repo::<Staff>();
    let mut staff = repo.select_404(id).await?;
    if !staff.unassign_class(class_id) {
        return Err(ApiError::bad_request("Class not assigned to this teacher"));
    }
    repo.save(&mut staff).await?;

    Ok(ApiResponse::success(staff).with_message("Class removed from teacher successfully"))
}

/// POST /api/staff/with-account
///
/// Both records are validated before either is written. If the user insert
/// still fails the staff record is rolled back.
pub async fn create_with_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<StaffWithAccountRequest>,
) -> ApiResult<StaffWithAccount> {
    auth.require_any(gates::ADMIN)?;

    let mut staff: Staff = from_api_input(req.staff_data)?;
    check_assignments(&state, &staff).await?;

    let accounts = state.accounts();
    let user = match req.user_data {
        Some(data) => {
            let input: AccountInput = serde_json::from_value(data).map_err(RecordError::from)?;
            let role = input.role.unwrap_or(Role::Staff);
            let mut account = input.into_account(&staff.full_name, Some(&staff.email), role)?;
            account.staff_id = Some(staff.meta.id);
            let user = accounts.prepare(account).await?;
            staff.user = Some(user.meta.id);
            Some(user)
        }
        None => None,
    };

    let staff_repo = state.repo::<Staff>();
    staff_repo.insert(&staff).await?;
    if let Some(user) = &user {
        if let Err(e) = state.repo::<User>().insert(user).await {
            staff_repo.delete(staff.meta.id).await?;
            return Err(crate::services::AccountError::from(e).into());
        }
    }
    tracing::info!("Created staff member {} (account: {})", staff.meta.id, user.is_some());

    Ok(ApiResponse::created(StaffWithAccount {
        has_account: user.is_some(),
        user: user.as_ref().map(User::profile),
        staff,
    })
    .with_message("Staff created successfully with user account"))
}

use axum::extract::State;
use axum::Extension;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::{apply_patch, from_api_input, DocQuery, SortDirection, SortKind};
use crate::error::ApiError;
use crate::handlers::gates;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::models::{parse_variant, AcademicStatus, Relationship, SchoolClass, Student};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParentRequest {
    pub student_id: Uuid,
    pub parent_id: Uuid,
    #[serde(default)]
    pub relationship: Option<Relationship>,
    #[serde(default)]
    pub is_primary_contact: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryContactRequest {
    pub student_id: Uuid,
    pub parent_id: Uuid,
}

async fn check_class(state: &AppState, student: &Student) -> Result<(), ApiError> {
    if let Some(class) = student.current_class {
        state.repo::<SchoolClass>().select_404(class).await?;
    }
    Ok(())
}

async fn listing(state: &AppState, query: DocQuery) -> ApiResult<Vec<Student>> {
    let query = query.sort("fullName", SortDirection::Asc, SortKind::Text);
    Ok(ApiResponse::success(state.repo::<Student>().select_any(query).await?))
}

/// GET /api/students
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Student>> {
    listing(&state, DocQuery::new()).await
}

/// GET /api/students/:id
pub async fn get(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Student> {
    Ok(ApiResponse::success(state.repo::<Student>().select_404(id).await?))
}

/// POST /api/students
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Student> {
    auth.require_any(gates::ADMIN_STAFF)?;

    let student: Student = from_api_input(body)?;
    check_class(&state, &student).await?;
    state.repo::<Student>().insert(&student).await?;
    tracing::info!("Enrolled student {}", student.meta.id);

    Ok(ApiResponse::created(student).with_message("Student created successfully"))
}

/// PUT /api/students/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Student> {
    auth.require_any(gates::ADMIN_STAFF)?;

    let repo = state.repo::<Student>();
    let current = repo.select_404(id).await?;
    let updated = apply_patch(&current, body)?;
    if updated.current_class != current.current_class {
        check_class(&state, &updated).await?;
    }
    repo.update(&updated).await?;

    Ok(ApiResponse::success(updated).with_message("Student updated successfully"))
}

/// DELETE /api/students/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Student> {
    auth.require_any(gates::ADMIN)?;

    let removed = state
        .repo::<Student>()
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Student not found"))?;
    let parents = state.family().forget_student(id).await?;
    tracing::info!("Deleted student {} ({} parent links dropped)", id, parents);

    Ok(ApiResponse::success(removed).with_message("Student deleted successfully"))
}

/// POST /api/students/add-parent
pub async fn add_parent(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<AddParentRequest>,
) -> ApiResult<Student> {
    auth.require_any(gates::ADMIN_STAFF)?;

    let (student, _) = state
        .family()
        .link(req.student_id, req.parent_id, req.relationship, req.is_primary_contact)
        .await?;

    Ok(ApiResponse::success(student).with_message("Parent added to student successfully"))
}

/// DELETE /api/students/:id/parent/:parent_id
pub async fn remove_parent(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath((id, parent_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Student> {
    auth.require_any(gates::ADMIN_STAFF)?;

    let (student, _) = state.family().unlink(id, parent_id).await?;
    Ok(ApiResponse::success(student).with_message("Parent removed from student successfully"))
}

/// PUT /api/students/primary-contact
pub async fn primary_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<PrimaryContactRequest>,
) -> ApiResult<Student> {
    auth.require_any(gates::ADMIN_STAFF)?;

    let student = state.family().set_primary_contact(req.student_id, req.parent_id).await?;
    Ok(ApiResponse::success(student).with_message("Primary contact updated successfully"))
}

/// GET /api/students/class/:class_id
pub async fn by_class(State(state): State<AppState>, ApiPath(class_id): ApiPath<Uuid>) -> ApiResult<Vec<Student>> {
    listing(&state, DocQuery::new().eq("currentClass", class_id)).await
}

/// GET /api/students/status/:status
pub async fn by_status(State(state): State<AppState>, ApiPath(status): ApiPath<String>) -> ApiResult<Vec<Student>> {
    let status: AcademicStatus = parse_variant(&status)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid academic status '{}'", status)))?;
    listing(&state, DocQuery::new().eq("academicStatus", status)).await
}

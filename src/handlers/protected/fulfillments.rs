use axum::extract::State;
use axum::Extension;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::{DocQuery, Repository};
use crate::error::ApiError;
use crate::handlers::gates;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::models::{
    dates, AcademicStatus, FulfillmentStats, ItemUpdate, RequirementFulfillment, RequirementSet, Student,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFulfillmentRequest {
    pub student_id: Uuid,
    pub requirement_set_id: Uuid,
    #[serde(default, deserialize_with = "dates::option::deserialize")]
    pub fulfillment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fulfilled_items: Vec<ItemUpdate>,
    #[serde(default)]
    pub receipt_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFulfillmentRequest {
    #[serde(default)]
    pub fulfilled_items: Option<Vec<ItemUpdate>>,
    #[serde(default)]
    pub receipt_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "dates::option::deserialize")]
    pub fulfillment_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemsRequest {
    pub fulfilled_items: Vec<ItemUpdate>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn repo(state: &AppState) -> Repository<RequirementFulfillment> {
    state.repo::<RequirementFulfillment>()
}

async fn newest_first(state: &AppState, query: DocQuery) -> ApiResult<Vec<RequirementFulfillment>> {
    let records = repo(state).select_any(query.newest_first("fulfillmentDate")).await?;
    Ok(ApiResponse::success(records))
}

/// POST /api/requirement-fulfillments
///
/// Items start from the set's quantities; supplied items are applied on top.
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateFulfillmentRequest>,
) -> ApiResult<RequirementFulfillment> {
    auth.require_any(gates::ADMIN_STAFF)?;

    state.repo::<Student>().select_404(req.student_id).await?;
    let set = state.repo::<RequirementSet>().select_404(req.requirement_set_id).await?;

    let existing = repo(&state)
        .select_one(
            DocQuery::new()
                .eq("student", req.student_id)
                .eq("requirementSet", req.requirement_set_id),
        )
        .await?;
    if let Some(existing) = existing {
        return Err(ApiError::conflict_with(
            "A fulfillment record already exists for this student and requirement set",
            serde_json::to_value(&existing).unwrap_or_default(),
        ));
    }

    let mut record = RequirementFulfillment::seeded(req.student_id, &set, Some(auth.user_id));
    record.apply_items(&set, &req.fulfilled_items)?;
    if let Some(date) = req.fulfillment_date {
        record.fulfillment_date = date;
    }
    record.receipt_number = req.receipt_number;
    record.notes = req.notes;

    repo(&state).insert(&record).await?;
    tracing::info!(
        "Recorded fulfillment {} for student {} ({:?})",
        record.meta.id,
        record.student,
        record.status
    );

    Ok(ApiResponse::created(record).with_message("Requirement fulfillment created successfully"))
}

/// GET /api/requirement-fulfillments
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<RequirementFulfillment>> {
    newest_first(&state, DocQuery::new()).await
}

/// GET /api/requirement-fulfillments/:id
pub async fn get(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<RequirementFulfillment> {
    Ok(ApiResponse::success(repo(&state).select_404(id).await?))
}

/// PUT /api/requirement-fulfillments/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateFulfillmentRequest>,
) -> ApiResult<RequirementFulfillment> {
    auth.require_any(gates::ADMIN_STAFF)?;

    let records = repo(&state);
    let mut record = records.select_404(id).await?;
    if let Some(items) = &req.fulfilled_items {
        let set = state.repo::<RequirementSet>().select_404(record.requirement_set).await?;
        record.apply_items(&set, items)?;
    }
    if req.receipt_number.is_some() {
        record.receipt_number = req.receipt_number;
    }
    if req.notes.is_some() {
        record.notes = req.notes;
    }
    if let Some(date) = req.fulfillment_date {
        record.fulfillment_date = date;
    }
    records.save(&mut record).await?;

    Ok(ApiResponse::success(record).with_message("Requirement fulfillment updated successfully"))
}

/// PATCH /api/requirement-fulfillments/:id/items
pub async fn update_items(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateItemsRequest>,
) -> ApiResult<RequirementFulfillment> {
    auth.require_any(gates::ADMIN_STAFF)?;

    let records = repo(&state);
    let mut record = records.select_404(id).await?;
    let set = state.repo::<RequirementSet>().select_404(record.requirement_set).await?;
    record.apply_items(&set, &req.fulfilled_items)?;
    if req.notes.is_some() {
        record.notes = req.notes;
    }
    records.save(&mut record).await?;

    Ok(ApiResponse::success(record).with_message("Fulfillment items updated successfully"))
}

/// DELETE /api/requirement-fulfillments/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<RequirementFulfillment> {
    auth.require_any(gates::ADMIN)?;

    let removed = repo(&state)
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Requirement fulfillment not found"))?;

    Ok(ApiResponse::success(removed).with_message("Requirement fulfillment deleted successfully"))
}

/// GET /api/requirement-fulfillments/student/:student_id
pub async fn by_student(
    State(state): State<AppState>,
    ApiPath(student_id): ApiPath<Uuid>,
) -> ApiResult<Vec<RequirementFulfillment>> {
    newest_first(&state, DocQuery::new().eq("student", student_id)).await
}

/// GET /api/requirement-fulfillments/requirement-set/:requirement_set_id
pub async fn by_set(
    State(state): State<AppState>,
    ApiPath(set_id): ApiPath<Uuid>,
) -> ApiResult<Vec<RequirementFulfillment>> {
    newest_first(&state, DocQuery::new().eq("requirementSet", set_id)).await
}

/// GET /api/requirement-fulfillments/student/:student_id/requirement-set/:requirement_set_id
pub async fn by_student_and_set(
    State(state): State<AppState>,
    ApiPath((student_id, set_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<RequirementFulfillment> {
    let record = repo(&state)
        .select_one(DocQuery::new().eq("student", student_id).eq("requirementSet", set_id))
        .await?
        .ok_or_else(|| ApiError::not_found("No fulfillment found for this student and requirement set"))?;
    Ok(ApiResponse::success(record))
}

/// GET /api/requirement-fulfillments/class/:class_id
pub async fn by_class(
    State(state): State<AppState>,
    ApiPath(class_id): ApiPath<Uuid>,
) -> ApiResult<Vec<RequirementFulfillment>> {
    newest_first(&state, DocQuery::new().eq("schoolClass", class_id)).await
}

/// GET /api/requirement-fulfillments/term/:term_id
pub async fn by_term(
    State(state): State<AppState>,
    ApiPath(term_id): ApiPath<Uuid>,
) -> ApiResult<Vec<RequirementFulfillment>> {
    newest_first(&state, DocQuery::new().eq("academicTerm", term_id)).await
}

/// GET /api/requirement-fulfillments/requirement-set/:requirement_set_id/stats
pub async fn stats(State(state): State<AppState>, ApiPath(set_id): ApiPath<Uuid>) -> ApiResult<FulfillmentStats> {
    let set = state.repo::<RequirementSet>().select_404(set_id).await?;

    let total_students = state
        .repo::<Student>()
        .count(
            DocQuery::new()
                .eq("currentClass", set.school_class)
                .eq("academicStatus", AcademicStatus::Active),
        )
        .await?;
    let records = repo(&state)
        .select_any(DocQuery::new().eq("requirementSet", set_id))
        .await?;

    Ok(ApiResponse::success(FulfillmentStats::compute(total_students, &records)))
}

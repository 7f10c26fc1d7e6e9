use axum::extract::State;
use axum::Extension;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::{apply_patch, from_api_input, DocQuery};
use crate::handlers::gates;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::models::{AcademicTerm, AcademicYear};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermQuery {
    pub academic_year: Option<Uuid>,
}

/// GET /api/academic-terms[?academicYear=]
pub async fn list(State(state): State<AppState>, ApiQuery(query): ApiQuery<TermQuery>) -> ApiResult<Vec<AcademicTerm>> {
    let q = DocQuery::new()
        .eq_opt("academicYear", query.academic_year)
        .oldest_first("startDate");
    let terms = state.repo::<AcademicTerm>().select_any(q).await?;
    Ok(ApiResponse::success(terms))
}

/// POST /api/academic-terms
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<AcademicTerm> {
    user.require_any(gates::ADMIN)?;

    let term: AcademicTerm = from_api_input(body)?;
    state.repo::<AcademicYear>().select_404(term.academic_year).await?;
    state.repo::<AcademicTerm>().insert(&term).await?;

    Ok(ApiResponse::created(term).with_message("Academic term created successfully"))
}

/// PUT /api/academic-terms/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<AcademicTerm> {
    user.require_any(gates::ADMIN)?;

    let repo = state.repo::<AcademicTerm>();
    let current = repo.select_404(id).await?;
    let updated = apply_patch(&current, body)?;
    if updated.academic_year != current.academic_year {
        state.repo::<AcademicYear>().select_404(updated.academic_year).await?;
    }
    repo.update(&updated).await?;

    Ok(ApiResponse::success(updated).with_message("Academic term updated successfully"))
}

//! Fee transactions. Balances are owned by the ledger service; these handlers
//! validate references and shape the read views.

use std::collections::{HashMap, HashSet};

use axum::extract::State;
use axum::Extension;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::database::{apply_patch, from_api_input, DocQuery};
use crate::error::ApiError;
use crate::handlers::gates;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser, Pagination};
use crate::models::school_fees::{self, SchoolFees};
use crate::models::{dates, AcademicTerm, SchoolClass, Student};
use crate::AppState;

const ADMIN_VIEW_PAGE_LIMIT: u32 = 20;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeFilter {
    pub page: Option<u64>,
    pub limit: Option<u32>,
    pub term_id: Option<Uuid>,
    pub class_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl FeeFilter {
    fn date_bound(raw: &Option<String>, field: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
        match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => dates::parse(raw)
                .map(Some)
                .ok_or_else(|| ApiError::field_error(field, format!("Invalid date '{}'", raw))),
            None => Ok(None),
        }
    }

    fn to_query(&self) -> Result<DocQuery, ApiError> {
        let mut query = DocQuery::new()
            .eq_opt("academicTerm", self.term_id)
            .eq_opt("studentClass", self.class_id)
            .eq_opt("student", self.student_id);
        if let Some(start) = Self::date_bound(&self.start_date, "startDate")? {
            query = query.gte("date", start.to_rfc3339());
        }
        if let Some(end) = Self::date_bound(&self.end_date, "endDate")? {
            query = query.lte("date", end.to_rfc3339());
        }
        Ok(query)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermFilter {
    pub term_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StudentRef {
    pub id: Uuid,
    pub name: String,
    pub class: Option<Uuid>,
}

impl From<&Student> for StudentRef {
    fn from(student: &Student) -> Self {
        Self {
            id: student.meta.id,
            name: student.full_name.clone(),
            class: student.current_class,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_paid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_balance: Decimal,
    pub transaction_count: usize,
}

impl LedgerSummary {
    fn of(rows: &[SchoolFees]) -> Self {
        Self {
            total_paid: school_fees::total_paid(rows),
            current_balance: school_fees::current_balance(rows),
            transaction_count: rows.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StudentFees {
    pub student: StudentRef,
    pub transactions: Vec<SchoolFees>,
    pub summary: LedgerSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentBalance {
    pub student: StudentRef,
    pub academic_term: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct StudentLedgerSummary {
    pub student: Uuid,
    #[serde(flatten)]
    pub summary: LedgerSummary,
}

#[derive(Debug, Serialize)]
pub struct ClassFees {
    pub transactions: Vec<SchoolFees>,
    pub summary: Vec<StudentLedgerSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_collected: Decimal,
    pub transaction_count: usize,
    pub unique_students: usize,
}

#[derive(Debug, Serialize)]
pub struct TermFees {
    pub transactions: Vec<SchoolFees>,
    pub summary: TermSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPeriod {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_transactions: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub unique_students: usize,
}

#[derive(Debug, Serialize)]
pub struct FeeReport {
    pub period: ReportPeriod,
    pub summary: ReportSummary,
    pub transactions: Vec<SchoolFees>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRow {
    pub transaction_id: Uuid,
    pub student_name: String,
    pub date: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub bf: Decimal,
    pub rn: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

fn unique_students(rows: &[SchoolFees]) -> usize {
    rows.iter().map(|row| row.student).collect::<HashSet<_>>().len()
}

/// Per-student summaries in order of first appearance.
fn summarize_by_student(rows: &[SchoolFees]) -> Vec<StudentLedgerSummary> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut grouped: HashMap<Uuid, Vec<SchoolFees>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.student)
            .or_insert_with(|| {
                order.push(row.student);
                Vec::new()
            })
            .push(row.clone());
    }
    order
        .into_iter()
        .map(|student| StudentLedgerSummary {
            student,
            summary: LedgerSummary::of(grouped.get(&student).map(Vec::as_slice).unwrap_or(&[])),
        })
        .collect()
}

async fn check_references(state: &AppState, fee: &SchoolFees) -> Result<(), ApiError> {
    state.repo::<Student>().select_404(fee.student).await?;
    state.repo::<AcademicTerm>().select_404(fee.academic_term).await?;
    state.repo::<SchoolClass>().select_404(fee.student_class).await?;
    Ok(())
}

fn not_found() -> ApiError {
    ApiError::not_found("School fees transaction not found")
}

/// POST /api/school-fees
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<SchoolFees> {
    auth.require_any(gates::FINANCE)?;

    let fee: SchoolFees = from_api_input(body)?;
    check_references(&state, &fee).await?;
    let recorded = state.ledger().record(fee).await?;
    tracing::info!(
        "Recorded payment {} for student {}: amount {}, balance {}",
        recorded.meta.id,
        recorded.student,
        recorded.amount,
        recorded.bal
    );

    Ok(ApiResponse::created(recorded).with_message("School fees transaction created successfully"))
}

/// GET /api/school-fees
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(filter): ApiQuery<FeeFilter>,
) -> ApiResult<Vec<SchoolFees>> {
    auth.require_any(gates::FINANCE_READ)?;

    let page = filter.page.unwrap_or(1).max(1);
    let limit = u64::from(state.config.page_limit(filter.limit));
    let query = filter.to_query()?;

    let repo = state.repo::<SchoolFees>();
    let total = repo.count(query.unpaged()).await?;
    let rows = repo
        .select_any(
            query
                .newest_first("date")
                .limit(limit)
                .offset(Pagination::offset(page, limit)),
        )
        .await?;

    Ok(ApiResponse::success(rows).with_pagination(Pagination::new(total, page, limit)))
}

/// GET /api/school-fees/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<SchoolFees> {
    auth.require_any(gates::FINANCE_READ)?;

    let fee = state.repo::<SchoolFees>().find_by_id(id).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::success(fee))
}

/// PUT /api/school-fees/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<SchoolFees> {
    auth.require_any(gates::FINANCE)?;

    let current = state.repo::<SchoolFees>().find_by_id(id).await?.ok_or_else(not_found)?;
    let updated = apply_patch(&current, body)?;
    check_references(&state, &updated).await?;
    let saved = state.ledger().amend(&current, updated).await?;

    Ok(ApiResponse::success(saved).with_message("School fees transaction updated successfully"))
}

/// DELETE /api/school-fees/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<SchoolFees> {
    auth.require_any(gates::ADMIN)?;

    if !state.repo::<SchoolFees>().exists(id).await? {
        return Err(not_found());
    }
    let removed = state.ledger().remove(id).await?;
    tracing::info!("Deleted payment {} for student {}", id, removed.student);

    Ok(ApiResponse::success(removed).with_message("School fees transaction deleted successfully"))
}

/// GET /api/school-fees/student/:student_id[?termId=]
pub async fn by_student(
    State(state): State<AppState>,
    ApiPath(student_id): ApiPath<Uuid>,
    ApiQuery(filter): ApiQuery<TermFilter>,
) -> ApiResult<StudentFees> {
    let student = state.repo::<Student>().select_404(student_id).await?;

    let transactions = match filter.term_id {
        Some(term) => state.ledger().transactions(student_id, term).await?,
        None => {
            let mut rows = state
                .repo::<SchoolFees>()
                .select_any(DocQuery::new().eq("student", student_id))
                .await?;
            school_fees::sort_ledger(&mut rows);
            rows
        }
    };

    Ok(ApiResponse::success(StudentFees {
        student: StudentRef::from(&student),
        summary: LedgerSummary::of(&transactions),
        transactions,
    }))
}

/// GET /api/school-fees/student/:student_id/balance?termId=
pub async fn student_balance(
    State(state): State<AppState>,
    ApiPath(student_id): ApiPath<Uuid>,
    ApiQuery(filter): ApiQuery<TermFilter>,
) -> ApiResult<StudentBalance> {
    let term = filter
        .term_id
        .ok_or_else(|| ApiError::bad_request("Academic term ID is required"))?;
    let student = state.repo::<Student>().select_404(student_id).await?;
    let balance = state.ledger().current_balance(student_id, term).await?;

    Ok(ApiResponse::success(StudentBalance {
        student: StudentRef::from(&student),
        academic_term: term,
        current_balance: balance,
    }))
}

/// GET /api/school-fees/class/:class_id[?termId=]
pub async fn by_class(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(class_id): ApiPath<Uuid>,
    ApiQuery(filter): ApiQuery<TermFilter>,
) -> ApiResult<ClassFees> {
    auth.require_any(gates::FINANCE_READ)?;

    let query = DocQuery::new()
        .eq("studentClass", class_id)
        .eq_opt("academicTerm", filter.term_id)
        .newest_first("date");
    let transactions = state.repo::<SchoolFees>().select_any(query).await?;

    Ok(ApiResponse::success(ClassFees {
        summary: summarize_by_student(&transactions),
        transactions,
    }))
}

/// GET /api/school-fees/term/:term_id
pub async fn by_term(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(term_id): ApiPath<Uuid>,
) -> ApiResult<TermFees> {
    auth.require_any(gates::FINANCE_READ)?;

    let query = DocQuery::new().eq("academicTerm", term_id).newest_first("date");
    let transactions = state.repo::<SchoolFees>().select_any(query).await?;

    Ok(ApiResponse::success(TermFees {
        summary: TermSummary {
            total_collected: school_fees::total_paid(&transactions),
            transaction_count: transactions.len(),
            unique_students: unique_students(&transactions),
        },
        transactions,
    }))
}

/// GET /api/school-fees/report/summary
pub async fn report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(filter): ApiQuery<FeeFilter>,
) -> ApiResult<FeeReport> {
    auth.require_any(gates::FINANCE)?;

    let query = filter.to_query()?.oldest_first("date");
    let transactions = state.repo::<SchoolFees>().select_any(query).await?;

    let label = |raw: &Option<String>, fallback: &str| {
        raw.clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    };

    Ok(ApiResponse::success(FeeReport {
        period: ReportPeriod {
            start_date: label(&filter.start_date, "All time"),
            end_date: label(&filter.end_date, "Current"),
        },
        summary: ReportSummary {
            total_transactions: transactions.len(),
            total_amount: school_fees::total_paid(&transactions),
            unique_students: unique_students(&transactions),
        },
        transactions,
    }))
}

/// GET /api/school-fees/admin/view
pub async fn admin_view(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiQuery(filter): ApiQuery<FeeFilter>,
) -> ApiResult<Vec<AdminRow>> {
    auth.require_any(gates::FINANCE)?;

    let page = filter.page.unwrap_or(1).max(1);
    let limit = u64::from(state.config.page_limit(Some(filter.limit.unwrap_or(ADMIN_VIEW_PAGE_LIMIT))));

    let repo = state.repo::<SchoolFees>();
    let total = repo.count(DocQuery::new()).await?;
    let rows = repo
        .select_any(
            DocQuery::new()
                .newest_first("date")
                .limit(limit)
                .offset(Pagination::offset(page, limit)),
        )
        .await?;

    let student_ids: Vec<Uuid> = rows
        .iter()
        .map(|row| row.student)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let names: HashMap<Uuid, String> = state
        .repo::<Student>()
        .select_ids(&student_ids)
        .await?
        .into_iter()
        .map(|student| (student.meta.id, student.full_name))
        .collect();

    let data = rows
        .into_iter()
        .map(|row| AdminRow {
            transaction_id: row.meta.id,
            student_name: names.get(&row.student).cloned().unwrap_or_else(|| "Unknown".to_string()),
            date: row.date,
            bf: row.bf,
            rn: row.rn.filter(|rn| !rn.is_empty()).unwrap_or_else(|| "N/A".to_string()),
            amount: row.amount,
            balance: row.bal,
        })
        .collect();

    Ok(ApiResponse::success(data).with_pagination(Pagination::new(total, page, limit)))
}

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, patch, post, put},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{AuthError, RevocationList, TokenService};
use crate::config::AppConfig;
use crate::database::{DocumentStore, Entity, Repository};
use crate::handlers::{protected, public};
use crate::models::{AcademicYear, Metadata, Requirement, SchoolClass, Subject};
use crate::services::{AccountService, FamilyLinks, FeeLedger};

/// Shared runtime state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub tokens: Arc<TokenService>,
    pub revocations: Arc<RevocationList>,
    pub config: Arc<AppConfig>,
    /// Serialises fee ledger replays
    ledger_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Result<Self, AuthError> {
        let tokens = TokenService::from_config(&config.security)?;
        let revocations = RevocationList::new(config.security.enable_token_revocation);
        Ok(Self {
            store,
            tokens: Arc::new(tokens),
            revocations: Arc::new(revocations),
            config: Arc::new(config),
            ledger_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn repo<T: Entity>(&self) -> Repository<T> {
        Repository::new(self.store.clone())
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.store.clone(), self.config.security.bcrypt_cost)
    }

    pub fn family(&self) -> FamilyLinks {
        FamilyLinks::new(self.store.clone())
    }

    pub fn ledger(&self) -> FeeLedger {
        FeeLedger::new(self.store.clone(), self.ledger_lock.clone())
    }
}

/// The full HTTP surface.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(calendar_routes())
        .merge(catalog_routes())
        .merge(staff_routes())
        .merge(student_routes())
        .merge(parent_routes())
        .merge(requirement_routes())
        .merge(fulfillment_routes())
        .merge(school_fees_routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::jwt_auth_middleware,
        ));

    let router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes)
        // Global middleware
        .layer(cors_layer(&state.config));

    let router = if state.config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };
    router.with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let security = &config.security;
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let methods = [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE];
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(methods).allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/register", post(auth::register_post))
        .route("/auth/login", post(auth::login_post))
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/api/auth/profile", get(auth::profile))
        .route("/api/auth/logout", post(auth::logout))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/api/users", get(users::list))
        .route(
            "/api/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
}

fn calendar_routes() -> Router<AppState> {
    use protected::{academic_terms, crud};

    Router::new()
        .route(
            "/api/academic-years",
            get(crud::list::<AcademicYear>).post(crud::create::<AcademicYear>),
        )
        .route(
            "/api/academic-years/:id",
            get(crud::get::<AcademicYear>)
                .put(crud::update::<AcademicYear>)
                .delete(crud::delete::<AcademicYear>),
        )
        .route(
            "/api/academic-terms",
            get(academic_terms::list).post(academic_terms::create),
        )
        .route(
            "/api/academic-terms/:id",
            get(crud::get::<models::AcademicTerm>)
                .put(academic_terms::update)
                .delete(crud::delete::<models::AcademicTerm>),
        )
}

/// Collections with plain admin-write CRUD.
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .merge(crud_routes::<SchoolClass>("/api/classes"))
        .merge(crud_routes::<Subject>("/api/subjects"))
        .merge(crud_routes::<Requirement>("/api/requirements"))
        .merge(crud_routes::<Metadata>("/api/metadata"))
}

fn crud_routes<T: Entity>(base: &str) -> Router<AppState> {
    use protected::crud;

    Router::new()
        .route(base, get(crud::list::<T>).post(crud::create::<T>))
        .route(
            &format!("{}/:id", base),
            get(crud::get::<T>).put(crud::update::<T>).delete(crud::delete::<T>),
        )
}

fn staff_routes() -> Router<AppState> {
    use protected::staff;

    Router::new()
        .route("/api/staff", get(staff::list).post(staff::create))
        .route("/api/staff/with-account", post(staff::create_with_account))
        .route("/api/staff/add-subject", post(staff::add_subject))
        .route("/api/staff/add-class", post(staff::add_class))
        .route("/api/staff/department/:department", get(staff::by_department))
        .route("/api/staff/status/:status", get(staff::by_status))
        .route("/api/staff/subject/:subject_id", get(staff::by_subject))
        .route("/api/staff/class/:class_id", get(staff::by_class))
        .route(
            "/api/staff/:id",
            get(staff::get).put(staff::update).delete(staff::delete),
        )
        .route("/api/staff/:id/subject/:subject_id", delete(staff::remove_subject))
        .route("/api/staff/:id/class/:class_id", delete(staff::remove_class))
}

fn student_routes() -> Router<AppState> {
    use protected::students;

    Router::new()
        .route("/api/students", get(students::list).post(students::create))
        .route("/api/students/add-parent", post(students::add_parent))
        .route("/api/students/primary-contact", put(students::primary_contact))
        .route("/api/students/class/:class_id", get(students::by_class))
        .route("/api/students/status/:status", get(students::by_status))
        .route(
            "/api/students/:id",
            get(students::get).put(students::update).delete(students::delete),
        )
        .route("/api/students/:id/parent/:parent_id", delete(students::remove_parent))
}

fn parent_routes() -> Router<AppState> {
    use protected::parents;

    Router::new()
        .route("/api/parents", get(parents::list).post(parents::create))
        .route("/api/parents/with-account", post(parents::create_with_account))
        .route("/api/parents/add-student", post(parents::add_student))
        .route("/api/parents/student/:student_id", get(parents::by_student))
        .route(
            "/api/parents/:id",
            get(parents::get).put(parents::update).delete(parents::delete),
        )
        .route("/api/parents/:id/student/:student_id", delete(parents::remove_student))
}

fn requirement_routes() -> Router<AppState> {
    use protected::{crud, requirement_sets};
    use models::RequirementSet;

    Router::new()
        .route(
            "/api/requirement-sets",
            get(crud::list::<RequirementSet>).post(requirement_sets::create),
        )
        .route(
            "/api/requirement-sets/:id",
            get(crud::get::<RequirementSet>)
                .put(requirement_sets::update)
                .delete(crud::delete::<RequirementSet>),
        )
}

fn fulfillment_routes() -> Router<AppState> {
    use protected::fulfillments;

    Router::new()
        .route(
            "/api/requirement-fulfillments",
            get(fulfillments::list).post(fulfillments::create),
        )
        .route(
            "/api/requirement-fulfillments/:id",
            get(fulfillments::get)
                .put(fulfillments::update)
                .delete(fulfillments::delete),
        )
        .route("/api/requirement-fulfillments/:id/items", patch(fulfillments::update_items))
        .route("/api/requirement-fulfillments/student/:student_id", get(fulfillments::by_student))
        .route(
            "/api/requirement-fulfillments/student/:student_id/requirement-set/:requirement_set_id",
            get(fulfillments::by_student_and_set),
        )
        .route(
            "/api/requirement-fulfillments/requirement-set/:requirement_set_id",
            get(fulfillments::by_set),
        )
        .route(
            "/api/requirement-fulfillments/requirement-set/:requirement_set_id/stats",
            get(fulfillments::stats),
        )
        .route("/api/requirement-fulfillments/class/:class_id", get(fulfillments::by_class))
        .route("/api/requirement-fulfillments/term/:term_id", get(fulfillments::by_term))
}

fn school_fees_routes() -> Router<AppState> {
    use protected::school_fees;

    Router::new()
        .route("/api/school-fees", get(school_fees::list).post(school_fees::create))
        .route("/api/school-fees/report/summary", get(school_fees::report))
        .route("/api/school-fees/admin/view", get(school_fees::admin_view))
        .route("/api/school-fees/student/:student_id", get(school_fees::by_student))
        .route("/api/school-fees/student/:student_id/balance", get(school_fees::student_balance))
        .route("/api/school-fees/class/:class_id", get(school_fees::by_class))
        .route("/api/school-fees/term/:term_id", get(school_fees::by_term))
        .route(
            "/api/school-fees/:id",
            get(school_fees::get).put(school_fees::update).delete(school_fees::delete),
        )
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "School Administration API",
            "version": version,
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/login, /auth/register (public - token acquisition)",
                "auth": "/api/auth/profile, /api/auth/logout (protected)",
                "users": "/api/users[/:id] (protected)",
                "calendar": "/api/academic-years, /api/academic-terms (protected)",
                "catalog": "/api/classes, /api/subjects, /api/requirements, /api/metadata (protected)",
                "people": "/api/staff, /api/students, /api/parents (protected)",
                "requirements": "/api/requirement-sets, /api/requirement-fulfillments (protected)",
                "fees": "/api/school-fees (protected)",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": state.store.backend_name()
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string()
                    }
                })),
            )
        }
    }
}

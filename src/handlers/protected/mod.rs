// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route prefix: /api/*
// Every handler receives the caller as `Extension<AuthUser>` from the JWT
// middleware and checks its own role gate.

pub mod academic_terms;
pub mod auth;
pub mod crud;
pub mod fulfillments;
pub mod parents;
pub mod requirement_sets;
pub mod school_fees;
pub mod staff;
pub mod students;
pub mod users;

// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition only. Everything else lives under /api and goes through
// the JWT middleware.

pub mod auth;

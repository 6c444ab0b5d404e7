//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Questo modulo organizza i service handlers in sotto-moduli separati per una migliore manutenibilità.
//! Ogni modulo gestisce gli endpoint HTTP per una specifica funzionalità.

pub mod auth;
pub mod invite;

// Re-exports per facilitare l'import
pub use auth::login_user;
pub use invite::{
    accept_invite, create_invite, get_invite, list_invites, preview_invite, resend_invite,
    revoke_invite, send_code, verify_code,
};

use axum::{http::StatusCode, response::IntoResponse};

/// Root endpoint - health check
pub async fn root() -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}

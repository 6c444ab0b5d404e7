//! Server library - espone i moduli principali per i test

pub mod core;
pub mod dtos;
pub mod entities;
pub mod invites;
pub mod notifications;
pub mod repositories;
pub mod services;

// Re-export dei tipi principali per facilitare l'import
pub use crate::core::{AppError, AppState, auth, config};
pub use services::root;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use notifications::Notifier;
use repositories::Store;
use std::sync::Arc;

/// Crea il router principale dell'applicazione
pub fn create_router<S: Store, N: Notifier>(state: Arc<AppState<S, N>>) -> Router {
    Router::new()
        .route("/", get(root))
        .nest("/auth", configure_auth_routes::<S, N>())
        .merge(configure_tenant_invite_routes(state.clone()))
        .nest("/invites", configure_public_invite_routes(&state))
        .with_state(state)
}

/// Configura le routes di autenticazione (login)
fn configure_auth_routes<S: Store, N: Notifier>() -> Router<Arc<AppState<S, N>>> {
    use services::*;
    Router::new().route("/login", post(login_user::<S, N>))
}

/// Configura le routes di gestione inviti di un garage (autenticazione + membership)
fn configure_tenant_invite_routes<S: Store, N: Notifier>(
    state: Arc<AppState<S, N>>,
) -> Router<Arc<AppState<S, N>>> {
    use crate::core::{authentication_middleware, tenant_membership_middleware};
    use services::*;

    Router::new()
        .route(
            "/tenants/{tenant_id}/invites",
            get(list_invites::<S, N>).post(create_invite::<S, N>),
        )
        .route(
            "/tenants/{tenant_id}/invites/{invite_id}",
            get(get_invite::<S, N>).delete(revoke_invite::<S, N>),
        )
        .route(
            "/tenants/{tenant_id}/invites/{invite_id}/resend",
            post(resend_invite::<S, N>),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            tenant_membership_middleware::<S, N>,
        ))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware::<S, N>,
        ))
}

/// Configura le routes pubbliche dell'invitato, con limiti per IP
fn configure_public_invite_routes<S: Store, N: Notifier>(
    state: &AppState<S, N>,
) -> Router<Arc<AppState<S, N>>> {
    use crate::core::rate_limit_middleware;
    use services::*;

    let limits = &state.limits;
    Router::new()
        .route("/{token}/preview", get(preview_invite::<S, N>))
        .route(
            "/{token}/send-code",
            post(send_code::<S, N>).layer(middleware::from_fn_with_state(
                limits.send_code.clone(),
                rate_limit_middleware,
            )),
        )
        .route(
            "/{token}/verify-code",
            post(verify_code::<S, N>).layer(middleware::from_fn_with_state(
                limits.verify_code.clone(),
                rate_limit_middleware,
            )),
        )
        .route(
            "/{token}/accept",
            post(accept_invite::<S, N>).layer(middleware::from_fn_with_state(
                limits.accept.clone(),
                rate_limit_middleware,
            )),
        )
}

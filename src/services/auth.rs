//! Auth services - Login dello staff

use crate::core::auth::SESSION_HOURS;
use crate::core::{AppError, AppState, encode_jwt};
use crate::dtos::{LoginDTO, UserDTO, normalize_email};
use crate::notifications::Notifier;
use crate::repositories::Store;
use axum::{
    extract::{Json, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Serialize)]
pub struct SessionDTO {
    pub token: String,
    pub user: UserDTO,
}

/// Header Set-Cookie e Authorization per il token di sessione
pub fn session_headers(token: &str) -> Result<HeaderMap, AppError> {
    let cookie_value = format!(
        "token={}; HttpOnly; Secure; SameSite=Lax; Max-Age={}",
        token,
        SESSION_HOURS * 60 * 60
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie_value)
            .map_err(|_| AppError::internal_server_error("Invalid session token"))?,
    );
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| AppError::internal_server_error("Invalid session token"))?,
    );
    Ok(headers)
}

#[instrument(skip(state, body))]
pub async fn login_user<S: Store, N: Notifier>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(body): Json<LoginDTO>, // JSON body
) -> Result<impl IntoResponse, AppError> {
    // 1. Verificare che email e password siano presenti (fail-fast prima della query DB)
    // 2. Cercare l'utente tramite email normalizzata
    // 3. Se l'utente non esiste o la password non corrisponde, ritornare UNAUTHORIZED con lo stesso messaggio
    // 4. Generare il token JWT e restituirlo negli header e nel body
    let email = normalize_email(&body.email);
    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let user = match state.store().find_user_by_email(&email).await? {
        Some(user) if user.verify_password(&body.password) => user,
        _ => {
            warn!("Failed login attempt");
            return Err(AppError::unauthorized("Email or password are not correct."));
        }
    };

    let token = encode_jwt(user.email.clone(), user.user_id, &state.jwt_secret)?;
    let headers = session_headers(&token)?;
    info!("User {} logged in", user.user_id);

    Ok((
        StatusCode::OK,
        headers,
        Json(SessionDTO {
            token,
            user: UserDTO::from(user),
        }),
    ))
}

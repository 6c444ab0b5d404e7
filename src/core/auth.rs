use crate::core::{AppError, AppState};
use crate::entities::{Membership, StaffRole, User};
use crate::notifications::Notifier;
use crate::repositories::Store;
use axum::extract::State;
use axum::{Error, body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Durata della sessione emessa da login e accettazione invito
pub const SESSION_HOURS: i64 = 8;

// struct che codifica il contenuto del token jwt
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub id: i32,
    pub email: String,
}

#[instrument(skip(secret), fields(email = %email, id = %id))]
pub fn encode_jwt(email: String, id: i32, secret: &str) -> Result<String, Error> {
    debug!("Encoding JWT token for user");
    let now = Utc::now();
    let expire: chrono::TimeDelta = Duration::hours(SESSION_HOURS);
    let exp: usize = (now + expire).timestamp() as usize;
    let iat: usize = now.timestamp() as usize;
    let claim = Claims { iat, exp, email, id };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map(|token| {
        info!("JWT token encoded successfully");
        token
    })
    .map_err(|e| {
        error!("Failed to encode JWT token: {:?}", e);
        Error::new("Error in encoding jwt token")
    })
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(jwt_token: &str, secret: &str) -> Result<TokenData<Claims>, Error> {
    debug!("Decoding JWT token");
    decode::<Claims>(
        jwt_token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| {
        debug!("JWT token decoded successfully for user: {}", data.claims.id);
        data
    })
    .map_err(|e| {
        warn!("Failed to decode JWT token: {:?}", e);
        Error::new("Error in decoding jwt token")
    })
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware<S: Store, N: Notifier>(
    State(state): State<Arc<AppState<S, N>>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let auth_header = match req.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::unauthorized("Invalid authorization header")
        })?,
        None => {
            warn!("Missing authorization header");
            return Err(AppError::unauthorized(
                "Please add the JWT token to the header",
            ));
        }
    };

    let mut header = auth_header.split_whitespace();
    let token = match (header.next(), header.next()) {
        (Some(bearer), Some(token)) if bearer.eq_ignore_ascii_case("bearer") => token,
        _ => {
            warn!("Authorization header is not a bearer token");
            return Err(AppError::unauthorized("Expected a Bearer token"));
        }
    };

    let token_data = decode_jwt(token, &state.jwt_secret)
        .map_err(|_| AppError::unauthorized("Unable to decode token"))?;

    // Fetch the user details from the store
    let current_user = match state.store().find_user(token_data.claims.id).await? {
        Some(user) => {
            debug!("User authenticated: {}", user.user_id);
            user
        }
        None => {
            warn!("User not found: {}", token_data.claims.id);
            return Err(AppError::unauthorized("You are not an authorized user"));
        }
    };
    req.extensions_mut().insert(current_user);
    // l'utente si recupera dagli handler con Extension<User>
    Ok(next.run(req).await)
}

/// Middleware che verifica che l'utente corrente sia membro del garage specificato
/// Estrae tenant_id dal path, verifica la membership e la inserisce nell'Extension
#[instrument(skip(state, req, next))]
pub async fn tenant_membership_middleware<S: Store, N: Notifier>(
    State(state): State<Arc<AppState<S, N>>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running tenant membership middleware");
    // 1. Ottenere l'utente corrente dall'Extension (deve essere stato inserito dall'authentication_middleware)
    let current_user = req
        .extensions()
        .get::<User>()
        .ok_or_else(|| {
            warn!("User not found in request extensions");
            AppError::unauthorized("User not authenticated")
        })?
        .clone();

    // 2. Estrarre tenant_id dal path (primo segmento numerico)
    let tenant_id: i32 = req
        .uri()
        .path()
        .split('/')
        .find_map(|segment| segment.parse::<i32>().ok())
        .ok_or_else(|| {
            warn!("Tenant ID not found in path: {}", req.uri().path());
            AppError::bad_request("Tenant ID not found in path")
        })?;

    // 3. Verificare che l'utente sia membro del garage
    let membership = state
        .store()
        .find_membership(tenant_id, current_user.user_id)
        .await?
        .ok_or_else(|| {
            warn!(
                "User {} is not a member of tenant {}",
                current_user.user_id, tenant_id
            );
            AppError::forbidden("You are not a member of this garage")
        })?;

    debug!(
        "User {} verified as {} of tenant {}",
        current_user.user_id, membership.role, tenant_id
    );

    // 4. Inserire la membership nell'Extension per uso successivo negli handler
    req.extensions_mut().insert(membership);

    Ok(next.run(req).await)
}

/// Helper function per verificare che un utente abbia uno dei ruoli richiesti
///
/// # Arguments
/// * `membership` - La membership dell'utente da verificare
/// * `allowed_roles` - Lista di ruoli permessi
///
/// # Returns
/// * `Ok(())` se il ruolo è permesso
/// * `Err(AppError)` se il ruolo non è tra quelli permessi
#[instrument(skip(membership))]
pub fn require_role(membership: &Membership, allowed_roles: &[StaffRole]) -> Result<(), AppError> {
    if !allowed_roles.contains(&membership.role) {
        warn!(
            "User {} has insufficient role {}, required one of: {:?}",
            membership.user_id, membership.role, allowed_roles
        );
        return Err(AppError::forbidden("Insufficient role").with_details(format!(
            "This action requires one of the following roles: {:?}",
            allowed_roles
        )));
    }

    debug!(
        "Role check passed for user {} with role {}",
        membership.user_id, membership.role
    );
    Ok(())
}

//! Invite services - Endpoint HTTP degli inviti
//!
//! Lato garage (autenticato, OWNER o MANAGER): creazione, lista, dettaglio,
//! reinvio e revoca. Lato invitato (pubblico, solo token): anteprima, invio
//! e verifica del codice, accettazione.

use crate::core::auth::require_role;
use crate::core::{AppError, AppState, encode_jwt};
use crate::dtos::{
    AcceptInviteDTO, AcceptedInviteDTO, CodeSentDTO, CodeVerifiedDTO, CreateInviteDTO,
    CreatedInviteDTO, InviteListQuery, InviteSummaryDTO, UserDTO, VerifyCodeDTO,
};
use crate::entities::{Invite, Membership, StaffRole, User};
use crate::invites::{
    AcceptOutcome, CreatePrecheck, InvitePreview, IssuedInvite, LoadOutcome, ResendOutcome,
    SendOtpOutcome, VerifyOtpOutcome,
};
use crate::notifications::Notifier;
use crate::repositories::Store;
use crate::services::auth::session_headers;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Ruoli che possono gestire gli inviti di un garage
const INVITE_MANAGERS: [StaffRole; 2] = [StaffRole::Owner, StaffRole::Manager];

fn created_invite_dto(issued: IssuedInvite) -> CreatedInviteDTO {
    CreatedInviteDTO {
        id: issued.invite.invite_id(),
        email: issued.invite.email().to_string(),
        role: issued.invite.role(),
        expires_at: issued.invite.expires_at(),
        invite_link: issued.invite_link,
        email_delivered: issued.email_delivered,
    }
}

/// Risolve il token del path in un invito PENDING e non scaduto
async fn load_invite<S: Store, N: Notifier>(
    state: &AppState<S, N>,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Invite, AppError> {
    match state.invites.load_by_raw_token(token, now).await? {
        LoadOutcome::Found(invite) => Ok(invite),
        LoadOutcome::Malformed => {
            Err(AppError::bad_request("Invalid invite link").with_code("INVALID_TOKEN_FORMAT"))
        }
        LoadOutcome::NotFound => {
            Err(AppError::not_found("Invalid or expired invite link").with_code("INVALID_TOKEN"))
        }
        LoadOutcome::Expired => {
            Err(AppError::gone("This invite has expired").with_code("INVITE_EXPIRED"))
        }
        LoadOutcome::AlreadyUsed => {
            Err(AppError::gone("This invite has already been used").with_code("INVITE_USED"))
        }
    }
}

fn invite_locked(retry_after_seconds: i64) -> AppError {
    AppError::locked("Too many failed attempts. Please try again later.")
        .with_code("INVITE_LOCKED")
        .with_retry_after(retry_after_seconds)
}

// ************************* LATO GARAGE ************************* //

#[instrument(skip(state, current_user, membership, body), fields(user_id = %current_user.user_id))]
pub async fn create_invite<S: Store, N: Notifier>(
    State(state): State<Arc<AppState<S, N>>>,
    Extension(current_user): Extension<User>,
    Extension(membership): Extension<Membership>,
    Path(tenant_id): Path<i32>,
    Json(body): Json<CreateInviteDTO>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Creating invite");
    // 1. Verificare che l'utente sia OWNER o MANAGER del garage
    // 2. Validare il body (email valida, ruolo tra quelli ammessi)
    // 3. Controllare che non esista un invito PENDING per la stessa email, altrimenti CONFLICT
    // 4. Controllare che l'email non appartenga già a un membro del garage, altrimenti CONFLICT
    // 5. Creare l'invito e spedire il link (un invio fallito non annulla l'invito)
    // 6. Ritornare 201 con il link, l'esito dell'invio email e la scadenza
    require_role(&membership, &INVITE_MANAGERS)?;
    let body = body.normalized();
    body.validate()?;

    let now = Utc::now();
    match state.invites.precheck_create(tenant_id, &body.email, now).await? {
        CreatePrecheck::Allowed => {}
        CreatePrecheck::PendingInviteExists => {
            warn!("Pending invite already exists");
            return Err(
                AppError::conflict("A pending invite already exists for this email")
                    .with_code("INVITE_PENDING"),
            );
        }
        CreatePrecheck::AlreadyMember => {
            warn!("Invited email already belongs to a member");
            return Err(AppError::conflict("This user is already a member of this garage")
                .with_code("ALREADY_MEMBER"));
        }
    }

    let issued = state
        .invites
        .create_invite(tenant_id, &current_user, body, now)
        .await?;

    info!("Invite {} created", issued.invite.invite_id());
    Ok((StatusCode::CREATED, Json(created_invite_dto(issued))))
}

#[instrument(skip(state, membership))]
pub async fn list_invites<S: Store, N: Notifier>(
    State(state): State<Arc<AppState<S, N>>>,
    Extension(membership): Extension<Membership>,
    Path(tenant_id): Path<i32>,
    Query(query): Query<InviteListQuery>,
) -> Result<Json<Vec<InviteSummaryDTO>>, AppError> {
    require_role(&membership, &INVITE_MANAGERS)?;

    let invites = state
        .invites
        .list_invites(tenant_id, &query, Utc::now())
        .await?;
    debug!("Found {} invites", invites.len());
    Ok(Json(invites))
}

#[instrument(skip(state, membership))]
pub async fn get_invite<S: Store, N: Notifier>(
    State(state): State<Arc<AppState<S, N>>>,
    Extension(membership): Extension<Membership>,
    Path((tenant_id, invite_id)): Path<(i32, i32)>,
) -> Result<Json<InviteSummaryDTO>, AppError> {
    require_role(&membership, &INVITE_MANAGERS)?;

    state
        .invites
        .get_invite(tenant_id, invite_id, Utc::now())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Invite not found"))
}

#[instrument(skip(state, current_user, membership), fields(user_id = %current_user.user_id))]
pub async fn resend_invite<S: Store, N: Notifier>(
    State(state): State<Arc<AppState<S, N>>>,
    Extension(current_user): Extension<User>,
    Extension(membership): Extension<Membership>,
    Path((tenant_id, invite_id)): Path<(i32, i32)>,
) -> Result<Json<CreatedInviteDTO>, AppError> {
    // 1. Verificare il ruolo
    // 2. Ruotare token e scadenza dell'invito (il vecchio link smette di funzionare)
    // 3. Ritornare il nuovo link
    require_role(&membership, &INVITE_MANAGERS)?;

    match state
        .invites
        .resend_invite(tenant_id, invite_id, &current_user, Utc::now())
        .await?
    {
        ResendOutcome::Resent(issued) => Ok(Json(created_invite_dto(issued))),
        ResendOutcome::NotFound => Err(AppError::not_found("Invite not found or no longer pending")),
    }
}

#[instrument(skip(state, membership))]
pub async fn revoke_invite<S: Store, N: Notifier>(
    State(state): State<Arc<AppState<S, N>>>,
    Extension(membership): Extension<Membership>,
    Path((tenant_id, invite_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    require_role(&membership, &INVITE_MANAGERS)?;

    if !state.invites.revoke_invite(tenant_id, invite_id).await? {
        return Err(AppError::not_found("Invite not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ************************* LATO INVITATO ************************* //

#[instrument(skip(state, token))]
pub async fn preview_invite<S: Store, N: Notifier>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(token): Path<String>,
) -> Result<Json<InvitePreview>, AppError> {
    let now = Utc::now();
    let invite = load_invite(&state, &token, now).await?;
    Ok(Json(state.invites.preview_invite(&invite, now).await?))
}

#[instrument(skip(state, token))]
pub async fn send_code<S: Store, N: Notifier>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(token): Path<String>,
) -> Result<Json<CodeSentDTO>, AppError> {
    // 1. Risolvere il token (formato, esistenza, scadenza, utilizzo)
    // 2. Rifiutare se l'invito è bloccato o se sono stati superati gli invii dell'ora
    // 3. Generare il codice, salvarlo e spedirlo via email
    let now = Utc::now();
    let invite = load_invite(&state, &token, now).await?;

    match state.invites.send_otp(invite, now).await? {
        SendOtpOutcome::Sent {
            expires_at,
            remaining_sends,
        } => Ok(Json(CodeSentDTO {
            message: "Verification code sent".to_string(),
            expires_at,
            remaining_sends,
        })),
        SendOtpOutcome::Locked {
            retry_after_seconds,
        } => Err(invite_locked(retry_after_seconds)),
        SendOtpOutcome::RateLimited {
            retry_after_seconds,
        } => Err(AppError::too_many_requests(
            "Too many verification codes requested. Please try again later.",
        )
        .with_code("OTP_SEND_LIMIT_EXCEEDED")
        .with_retry_after(retry_after_seconds)),
    }
}

#[instrument(skip(state, token, body))]
pub async fn verify_code<S: Store, N: Notifier>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(token): Path<String>,
    Json(body): Json<VerifyCodeDTO>,
) -> Result<Json<CodeVerifiedDTO>, AppError> {
    let now = Utc::now();
    let invite = load_invite(&state, &token, now).await?;

    match state.invites.verify_otp(invite, body.code.trim(), now).await? {
        VerifyOtpOutcome::Verified {
            verification_token,
            expires_at,
        } => Ok(Json(CodeVerifiedDTO {
            message: "Email verified successfully".to_string(),
            verification_token,
            expires_at,
        })),
        VerifyOtpOutcome::MalformedCode => Err(AppError::bad_request(
            "Please enter a 6-digit verification code",
        )),
        VerifyOtpOutcome::NoCodeSent => {
            Err(AppError::bad_request("No verification code has been sent")
                .with_code("NO_OTP_SENT"))
        }
        VerifyOtpOutcome::CodeExpired => Err(AppError::bad_request(
            "Verification code has expired. Please request a new one.",
        )
        .with_code("OTP_EXPIRED")),
        VerifyOtpOutcome::Locked {
            retry_after_seconds,
        } => Err(invite_locked(retry_after_seconds)),
        VerifyOtpOutcome::Invalid { remaining_attempts } => {
            Err(AppError::bad_request("Incorrect verification code")
                .with_code("INVALID_OTP")
                .with_remaining_attempts(remaining_attempts))
        }
    }
}

#[instrument(skip(state, token, body))]
pub async fn accept_invite<S: Store, N: Notifier>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(token): Path<String>,
    Json(body): Json<AcceptInviteDTO>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Risolvere il token dell'invito
    // 2. Controllare il token di verifica e i dati dell'account
    // 3. Creare l'account (se serve) e la membership con il ruolo dell'invito
    // 4. Ritornare 201 per un nuovo utente, 200 altrimenti, con il token di sessione
    let now = Utc::now();
    let invite = load_invite(&state, &token, now).await?;

    let acceptance = match state.invites.accept_invite(invite, body, now).await? {
        AcceptOutcome::Accepted(acceptance) => acceptance,
        AcceptOutcome::VerificationRequired => {
            return Err(AppError::unauthorized("Email verification required")
                .with_code("VERIFICATION_REQUIRED"));
        }
        AcceptOutcome::InvalidVerification => {
            return Err(AppError::unauthorized("Invalid verification. Please verify again.")
                .with_code("INVALID_VERIFICATION"));
        }
        AcceptOutcome::VerificationExpired => {
            return Err(
                AppError::unauthorized("Verification expired. Please verify again.")
                    .with_code("VERIFICATION_EXPIRED"),
            );
        }
        AcceptOutcome::ValidationError(failure) => {
            return Err(AppError::bad_request("Validation error")
                .with_code("VALIDATION_ERROR")
                .with_details(failure.message()));
        }
        AcceptOutcome::DuplicateMembership => {
            return Err(AppError::conflict("You are already a member of this garage")
                .with_code("DUPLICATE_MEMBERSHIP"));
        }
    };

    let session = encode_jwt(
        acceptance.user.email.clone(),
        acceptance.user.user_id,
        &state.jwt_secret,
    )?;
    let headers = session_headers(&session)?;

    let status = if acceptance.is_new_user {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let message = if acceptance.already_member {
        "You are already a member of this garage"
    } else {
        "Welcome to the team!"
    };

    Ok((
        status,
        headers,
        Json(AcceptedInviteDTO {
            message: message.to_string(),
            token: session,
            user: UserDTO::from(acceptance.user),
            tenant_id: acceptance.tenant.tenant_id,
            garage_name: acceptance.tenant.name,
            role: acceptance.role,
        }),
    ))
}

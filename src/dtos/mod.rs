//! DTOs module - Data Transfer Objects
//!
//! Questo modulo contiene tutti i DTOs usati per la comunicazione client-server.
//! I DTOs separano la rappresentazione esterna (API) dalla rappresentazione interna (entities).

pub mod invite;
pub mod membership;
pub mod query;
pub mod user;

// Re-exports per facilitare l'import
pub use invite::{
    AcceptInviteDTO, AcceptedInviteDTO, CodeSentDTO, CodeVerifiedDTO, CreateInviteDTO,
    CreatedInviteDTO, InviteSummaryDTO, VerifyCodeDTO, normalize_email,
};
pub use membership::CreateMembershipDTO;
pub use query::{InviteListQuery, InviteListStatus};
pub use user::{CreateUserDTO, LoginDTO, UserDTO};

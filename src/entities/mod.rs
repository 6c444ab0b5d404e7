//! Entities module - Entità del dominio applicativo
//!
//! Questo modulo contiene tutte le entità (models) che rappresentano i dati persistiti nel database.
//! Ogni entity corrisponde a una tabella nel database.

pub mod enums;
pub mod invite;
pub mod membership;
pub mod tenant;
pub mod user;

// Re-exports per facilitare l'import
pub use enums::{InviteStatus, MembershipStatus, StaffRole};
pub use invite::{Invite, Lifecycle, NewInvite, OtpState};
pub use membership::Membership;
pub use tenant::Tenant;
pub use user::User;

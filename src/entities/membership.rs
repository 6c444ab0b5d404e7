//! Membership entity - Legame utente-garage con ruolo

use super::enums::{MembershipStatus, StaffRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `(tenant_id, user_id)` is unique in every store.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Membership {
    pub membership_id: i32,
    pub tenant_id: i32,
    pub user_id: i32,
    pub role: StaffRole,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
}

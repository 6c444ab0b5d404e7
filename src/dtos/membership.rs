//! Membership DTOs - Data Transfer Objects per le membership

use crate::entities::{MembershipStatus, StaffRole};
use serde::{Deserialize, Serialize};

/// DTO per creare una membership (senza membership_id e created_at)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateMembershipDTO {
    pub tenant_id: i32,
    pub user_id: i32,
    pub role: StaffRole,
    pub status: MembershipStatus,
}

//! Enumerazioni - Tipi enumerati utilizzati nelle entità

use serde::{Deserialize, Serialize};
use std::fmt;

// ********************* ENUMERAZIONI UTILI **********************//

/// Staff role inside a garage. Copied verbatim from the invite into the membership.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "staff_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum StaffRole {
    Owner,
    Manager,
    Mechanic,
    Storekeeper,
    Viewer,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Owner => "OWNER",
            StaffRole::Manager => "MANAGER",
            StaffRole::Mechanic => "MECHANIC",
            StaffRole::Storekeeper => "STOREKEEPER",
            StaffRole::Viewer => "VIEWER",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted invite status. `Expired` is mostly derived from `expires_at`
/// and is rarely written eagerly.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invite_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Expired,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "membership_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipStatus {
    Active,
    Invited,
    Suspended,
}

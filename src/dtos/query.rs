//! Query DTOs - Parametri di query string

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InviteListStatus {
    /// solo inviti PENDING (default)
    #[default]
    Pending,
    /// tutti gli inviti del garage
    All,
    /// solo inviti già accettati
    Used,
}

/// Query params per GET /tenants/{tenant_id}/invites
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct InviteListQuery {
    #[serde(default)]
    pub status: InviteListStatus,
    /// Vale solo per `status=pending`
    #[serde(default)]
    pub include_expired: bool,
}

//! Tenant entity - Entità garage

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Tenant {
    pub tenant_id: i32,
    pub name: String,
    pub slug: String,
}

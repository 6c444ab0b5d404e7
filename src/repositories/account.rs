//! AccountStore su MySQL - utenti, membership e garage

use super::{AccountStore, MySqlStore, StoreError};
use crate::dtos::{CreateMembershipDTO, CreateUserDTO};
use crate::entities::{Membership, Tenant, User};
use tracing::{instrument, warn};

/// Violazione di un vincolo UNIQUE (email utente, coppia tenant/utente)
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

impl AccountStore for MySqlStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, name, email, password, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(user)
    }

    async fn find_user(&self, user_id: i32) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, name, email, password, created_at FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self, data), fields(email = %data.email))]
    async fn create_user(&self, data: &CreateUserDTO) -> Result<User, StoreError> {
        let result = sqlx::query("INSERT INTO users (name, email, password) VALUES (?, ?, ?)")
            .bind(&data.name)
            .bind(&data.email)
            .bind(&data.password)
            .execute(&self.connection_pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    warn!("Email already registered");
                    StoreError::DuplicateUser
                } else {
                    StoreError::Database(e)
                }
            })?;

        let new_id = result.last_insert_id() as i32;
        self.find_user(new_id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn find_membership(
        &self,
        tenant_id: i32,
        user_id: i32,
    ) -> Result<Option<Membership>, StoreError> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT membership_id, tenant_id, user_id, role, status, created_at \
             FROM memberships WHERE tenant_id = ? AND user_id = ?",
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(membership)
    }

    #[instrument(skip(self, data), fields(tenant_id = data.tenant_id, user_id = data.user_id))]
    async fn create_membership(&self, data: &CreateMembershipDTO) -> Result<Membership, StoreError> {
        sqlx::query("INSERT INTO memberships (tenant_id, user_id, role, status) VALUES (?, ?, ?, ?)")
            .bind(data.tenant_id)
            .bind(data.user_id)
            .bind(data.role)
            .bind(data.status)
            .execute(&self.connection_pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateMembership {
                        tenant_id: data.tenant_id,
                        user_id: data.user_id,
                    }
                } else {
                    StoreError::Database(e)
                }
            })?;

        self.find_membership(data.tenant_id, data.user_id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn find_tenant(&self, tenant_id: i32) -> Result<Option<Tenant>, StoreError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT tenant_id, name, slug FROM tenants WHERE tenant_id = ?",
        )
        .bind(tenant_id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(tenant)
    }
}

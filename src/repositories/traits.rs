//! Common repository traits
//!
//! This module defines the persistence interfaces consumed by the invite state machine.
//! Both the MySQL adapter and the in-memory adapter implement them.

use crate::dtos::{CreateMembershipDTO, CreateUserDTO, InviteListQuery};
use crate::entities::{Invite, Membership, NewInvite, Tenant, User};
use chrono::{DateTime, Utc};
use std::future::Future;
use thiserror::Error;

/// Failures coming from a store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The compare-and-swap on the invite version failed
    #[error("invite {0} was modified concurrently")]
    Conflict(i32),

    #[error("a user with this email already exists")]
    DuplicateUser,

    #[error("user {user_id} is already a member of tenant {tenant_id}")]
    DuplicateMembership { tenant_id: i32, user_id: i32 },
}

/// Persistence of invite records
pub trait InviteStore: Send + Sync + 'static {
    /// Looks up an invite by the hash of its bearer token
    ///
    /// # Returns
    /// * `Ok(Some(Invite))` - Invite found
    /// * `Ok(None)` - No invite carries that hash
    fn find_invite_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = Result<Option<Invite>, StoreError>> + Send;

    /// Reads an invite by primary key, regardless of tenant
    fn find_invite(
        &self,
        invite_id: i32,
    ) -> impl Future<Output = Result<Option<Invite>, StoreError>> + Send;

    /// Returns the PENDING invite for `email` in `tenant_id` still valid at `now`, if any
    fn find_pending_invite_for_email(
        &self,
        tenant_id: i32,
        email: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Invite>, StoreError>> + Send;

    /// Lists the invites of a tenant, newest first
    fn list_invites(
        &self,
        tenant_id: i32,
        query: &InviteListQuery,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Invite>, StoreError>> + Send;

    /// Inserts a new invite
    ///
    /// # Returns
    /// * `Ok(Invite)` - Created invite with id, `version = 0` and `created_at` assigned by the store
    fn insert_invite(
        &self,
        data: &NewInvite,
    ) -> impl Future<Output = Result<Invite, StoreError>> + Send;

    /// Writes every mutable column of `invite` in a single atomic step
    ///
    /// # Arguments
    /// * `invite` - Invite carrying the new state
    /// * `expected_version` - Version observed when the invite was loaded
    ///
    /// # Returns
    /// * `Ok(Invite)` - Saved invite, with `version = expected_version + 1`
    /// * `Err(StoreError::Conflict)` - Someone else saved the invite in the meantime
    fn save_invite(
        &self,
        invite: &Invite,
        expected_version: i32,
    ) -> impl Future<Output = Result<Invite, StoreError>> + Send;

    /// Deletes an invite of the tenant
    ///
    /// # Returns
    /// * `Ok(true)` - Invite deleted
    /// * `Ok(false)` - No such invite in that tenant
    fn delete_invite(
        &self,
        tenant_id: i32,
        invite_id: i32,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Accounts, memberships and tenants, used by invite acceptance and the HTTP layer
pub trait AccountStore: Send + Sync + 'static {
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    fn find_user(
        &self,
        user_id: i32,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    /// Creates an account
    ///
    /// # Returns
    /// * `Err(StoreError::DuplicateUser)` - The email is already registered
    fn create_user(
        &self,
        data: &CreateUserDTO,
    ) -> impl Future<Output = Result<User, StoreError>> + Send;

    fn find_membership(
        &self,
        tenant_id: i32,
        user_id: i32,
    ) -> impl Future<Output = Result<Option<Membership>, StoreError>> + Send;

    /// Creates a membership
    ///
    /// # Returns
    /// * `Err(StoreError::DuplicateMembership)` - The `(tenant_id, user_id)` unique key was violated
    fn create_membership(
        &self,
        data: &CreateMembershipDTO,
    ) -> impl Future<Output = Result<Membership, StoreError>> + Send;

    fn find_tenant(
        &self,
        tenant_id: i32,
    ) -> impl Future<Output = Result<Option<Tenant>, StoreError>> + Send;
}

/// Everything the invite service needs from persistence
pub trait Store: InviteStore + AccountStore {}

impl<T> Store for T where T: InviteStore + AccountStore {}

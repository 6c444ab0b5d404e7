//! MemoryStore - Store in memoria basato su DashMap
//!
//! Implements the same contracts as the MySQL store, unique keys and the
//! version compare-and-swap included. Used by the test suites and for running
//! the server without a database.

use super::{AccountStore, InviteStore, StoreError};
use crate::dtos::{CreateMembershipDTO, CreateUserDTO, InviteListQuery, InviteListStatus};
use crate::entities::{
    Invite, InviteStatus, Membership, MembershipStatus, NewInvite, StaffRole, Tenant, User,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

#[derive(Default)]
struct Tables {
    invites: DashMap<i32, Invite>,
    users: DashMap<i32, User>,
    /// indice univoco email -> user_id
    emails: DashMap<String, i32>,
    memberships: DashMap<(i32, i32), Membership>,
    tenants: DashMap<i32, Tenant>,
    next_id: AtomicI32,
}

/// Clones share the same tables
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i32 {
        self.tables.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn add_tenant(&self, name: &str, slug: &str) -> Tenant {
        let tenant = Tenant {
            tenant_id: self.next_id(),
            name: name.to_string(),
            slug: slug.to_string(),
        };
        self.tables.tenants.insert(tenant.tenant_id, tenant.clone());
        tenant
    }

    /// `password_hash` is stored as is
    pub fn add_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User, StoreError> {
        self.insert_user(name, email, password_hash)
    }

    pub fn add_membership(
        &self,
        tenant_id: i32,
        user_id: i32,
        role: StaffRole,
    ) -> Result<Membership, StoreError> {
        self.insert_membership(&CreateMembershipDTO {
            tenant_id,
            user_id,
            role,
            status: MembershipStatus::Active,
        })
    }

    pub fn memberships_of(&self, tenant_id: i32) -> Vec<Membership> {
        self.tables
            .memberships
            .iter()
            .filter(|entry| entry.key().0 == tenant_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn user_count(&self) -> usize {
        self.tables.users.len()
    }

    fn insert_user(&self, name: &str, email: &str, password: &str) -> Result<User, StoreError> {
        match self.tables.emails.entry(email.to_string()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateUser),
            Entry::Vacant(slot) => {
                let user = User {
                    user_id: self.next_id(),
                    name: name.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                    created_at: Utc::now(),
                };
                slot.insert(user.user_id);
                self.tables.users.insert(user.user_id, user.clone());
                Ok(user)
            }
        }
    }

    fn insert_membership(&self, data: &CreateMembershipDTO) -> Result<Membership, StoreError> {
        match self.tables.memberships.entry((data.tenant_id, data.user_id)) {
            Entry::Occupied(_) => Err(StoreError::DuplicateMembership {
                tenant_id: data.tenant_id,
                user_id: data.user_id,
            }),
            Entry::Vacant(slot) => {
                let membership = Membership {
                    membership_id: self.next_id(),
                    tenant_id: data.tenant_id,
                    user_id: data.user_id,
                    role: data.role,
                    status: data.status,
                    created_at: Utc::now(),
                };
                slot.insert(membership.clone());
                Ok(membership)
            }
        }
    }
}

fn listed(invite: &Invite, query: &InviteListQuery, now: DateTime<Utc>) -> bool {
    match query.status {
        InviteListStatus::All => true,
        InviteListStatus::Used => invite.status == InviteStatus::Accepted,
        InviteListStatus::Pending => {
            invite.status == InviteStatus::Pending && (query.include_expired || invite.expires_at > now)
        }
    }
}

impl InviteStore for MemoryStore {
    async fn find_invite_by_token_hash(&self, token_hash: &str) -> Result<Option<Invite>, StoreError> {
        Ok(self
            .tables
            .invites
            .iter()
            .find(|entry| entry.token_hash == token_hash)
            .map(|entry| entry.value().clone()))
    }

    async fn find_invite(&self, invite_id: i32) -> Result<Option<Invite>, StoreError> {
        Ok(self
            .tables
            .invites
            .get(&invite_id)
            .map(|entry| entry.value().clone()))
    }

    async fn find_pending_invite_for_email(
        &self,
        tenant_id: i32,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invite>, StoreError> {
        Ok(self
            .tables
            .invites
            .iter()
            .find(|entry| {
                entry.tenant_id == tenant_id
                    && entry.email == email
                    && entry.status == InviteStatus::Pending
                    && entry.expires_at > now
            })
            .map(|entry| entry.value().clone()))
    }

    async fn list_invites(
        &self,
        tenant_id: i32,
        query: &InviteListQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invite>, StoreError> {
        let mut invites: Vec<Invite> = self
            .tables
            .invites
            .iter()
            .filter(|entry| entry.tenant_id == tenant_id && listed(entry.value(), query, now))
            .map(|entry| entry.value().clone())
            .collect();
        invites.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.invite_id.cmp(&a.invite_id))
        });
        Ok(invites)
    }

    async fn insert_invite(&self, data: &NewInvite) -> Result<Invite, StoreError> {
        let invite = Invite {
            invite_id: self.next_id(),
            tenant_id: data.tenant_id,
            email: data.email.clone(),
            role: data.role,
            token_hash: data.token_hash.clone(),
            status: InviteStatus::Pending,
            expires_at: data.expires_at,
            used_at: None,
            created_by_user_id: data.created_by_user_id,
            otp_hash: None,
            otp_expires_at: None,
            otp_attempts: 0,
            otp_send_count: 0,
            otp_last_sent_at: None,
            locked_until: None,
            verification_token: None,
            verification_token_expires_at: None,
            version: 0,
            created_at: Utc::now(),
        };
        self.tables.invites.insert(invite.invite_id, invite.clone());
        Ok(invite)
    }

    async fn save_invite(&self, invite: &Invite, expected_version: i32) -> Result<Invite, StoreError> {
        // il lock dello shard rende atomico confronto + scrittura
        let Some(mut entry) = self.tables.invites.get_mut(&invite.invite_id) else {
            return Err(StoreError::Conflict(invite.invite_id));
        };
        if entry.version != expected_version {
            return Err(StoreError::Conflict(invite.invite_id));
        }
        let mut saved = invite.clone();
        saved.version = expected_version + 1;
        *entry = saved.clone();
        Ok(saved)
    }

    async fn delete_invite(&self, tenant_id: i32, invite_id: i32) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .invites
            .remove_if(&invite_id, |_, invite| invite.tenant_id == tenant_id)
            .is_some())
    }
}

impl AccountStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(user_id) = self.tables.emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        self.find_user(user_id).await
    }

    async fn find_user(&self, user_id: i32) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables
            .users
            .get(&user_id)
            .map(|entry| entry.value().clone()))
    }

    async fn create_user(&self, data: &CreateUserDTO) -> Result<User, StoreError> {
        self.insert_user(&data.name, &data.email, &data.password)
    }

    async fn find_membership(
        &self,
        tenant_id: i32,
        user_id: i32,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(self
            .tables
            .memberships
            .get(&(tenant_id, user_id))
            .map(|entry| entry.value().clone()))
    }

    async fn create_membership(&self, data: &CreateMembershipDTO) -> Result<Membership, StoreError> {
        self.insert_membership(data)
    }

    async fn find_tenant(&self, tenant_id: i32) -> Result<Option<Tenant>, StoreError> {
        Ok(self
            .tables
            .tenants
            .get(&tenant_id)
            .map(|entry| entry.value().clone()))
    }
}

//! InviteService - orchestrazione: carica, decide, salva, poi notifica
//!
//! Each operation loads the invite, runs a pure transition from `machine`, saves
//! the result with a version check and only then hands the emails to the
//! `Notifier`. A stale save reloads the invite and decides again.

use super::codec;
use super::machine::{self, Decision, MailContext};
use super::outcome::{
    AcceptOutcome, Acceptance, CreatePrecheck, InviteError, InvitePreview, IssuedInvite,
    LoadOutcome, ResendOutcome, SendOtpOutcome, VerifyOtpOutcome,
};
use super::policy::InvitePolicy;
use crate::dtos::{
    AcceptInviteDTO, CreateInviteDTO, CreateMembershipDTO, CreateUserDTO, InviteListQuery,
    InviteSummaryDTO, UserDTO,
};
use crate::entities::{Invite, Lifecycle, MembershipStatus, Tenant, User};
use crate::notifications::{Notification, Notifier};
use crate::repositories::{Store, StoreError};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::{debug, error, info, instrument, warn};

/// Saves attempted on one invite before giving up with `InviteError::Contention`
const MAX_SAVE_ATTEMPTS: i32 = 3;

pub struct InviteService<S, N> {
    store: S,
    notifier: N,
    policy: InvitePolicy,
    public_url: String,
}

impl<S: Store, N: Notifier> InviteService<S, N> {
    pub fn new(store: S, notifier: N, public_url: impl Into<String>) -> Self {
        Self {
            store,
            notifier,
            policy: InvitePolicy::default(),
            public_url: public_url.into(),
        }
    }

    pub fn with_policy(mut self, policy: InvitePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn policy(&self) -> &InvitePolicy {
        &self.policy
    }

    // ************************* SUPPORTO ************************* //

    async fn tenant_of(&self, tenant_id: i32) -> Result<Tenant, InviteError> {
        self.store
            .find_tenant(tenant_id)
            .await?
            .ok_or(InviteError::MissingTenant(tenant_id))
    }

    /// Runs `decide` on the invite and saves it, reloading and deciding again on a stale version.
    ///
    /// # Returns
    /// * `Ok((outcome, invite, notifications))` - the committed (or untouched) invite
    /// * `Err(InviteError::Superseded)` - the invite vanished or `decide` refused the reloaded copy
    /// * `Err(InviteError::Contention)` - still stale after `MAX_SAVE_ATTEMPTS`
    async fn transact<T, F>(
        &self,
        mut invite: Invite,
        mut decide: F,
    ) -> Result<(T, Invite, Vec<Notification>), InviteError>
    where
        T: Send,
        F: FnMut(&mut Invite) -> Result<Decision<T>, InviteError> + Send,
    {
        let invite_id = invite.invite_id();
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let expected_version = invite.version();
            let decision = decide(&mut invite)?;
            if !decision.dirty {
                return Ok((decision.outcome, invite, decision.notifications));
            }

            match self.store.save_invite(&invite, expected_version).await {
                Ok(saved) => return Ok((decision.outcome, saved, decision.notifications)),
                Err(StoreError::Conflict(_)) => {
                    warn!(
                        "Invite {} saved concurrently, retrying ({}/{})",
                        invite_id, attempt, MAX_SAVE_ATTEMPTS
                    );
                    invite = self
                        .store
                        .find_invite(invite_id)
                        .await?
                        .ok_or(InviteError::Superseded(invite_id))?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        error!("Giving up on invite {} after {} attempts", invite_id, MAX_SAVE_ATTEMPTS);
        Err(InviteError::Contention(invite_id))
    }

    /// Invite emails are best effort: a failure is logged and reported as `false`
    async fn deliver_best_effort(&self, notifications: &[Notification]) -> bool {
        let mut delivered = true;
        for notification in notifications {
            if let Err(e) = self.notifier.deliver(notification).await {
                warn!("Invite email not delivered: {}", e);
                delivered = false;
            }
        }
        delivered
    }

    fn mail_context(&self, tenant: &Tenant, inviter: &User) -> MailContext {
        MailContext {
            garage_name: tenant.name.clone(),
            inviter_name: Some(inviter.name.clone()),
            public_url: self.public_url.clone(),
        }
    }

    // ************************* LATO GARAGE ************************* //

    /// Conflicts checked before creating: a live PENDING invite or an existing membership
    pub async fn precheck_create(
        &self,
        tenant_id: i32,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<CreatePrecheck, InviteError> {
        if self
            .store
            .find_pending_invite_for_email(tenant_id, email, now)
            .await?
            .is_some()
        {
            return Ok(CreatePrecheck::PendingInviteExists);
        }

        if let Some(user) = self.store.find_user_by_email(email).await? {
            if self
                .store
                .find_membership(tenant_id, user.user_id)
                .await?
                .is_some()
            {
                return Ok(CreatePrecheck::AlreadyMember);
            }
        }

        Ok(CreatePrecheck::Allowed)
    }

    /// Creates a PENDING invite and emails the link.
    ///
    /// The caller is expected to have run `precheck_create` and checked the
    /// inviter's permissions. A failed email does not roll the invite back.
    #[instrument(skip(self, inviter, request), fields(inviter_id = inviter.user_id))]
    pub async fn create_invite(
        &self,
        tenant_id: i32,
        inviter: &User,
        request: CreateInviteDTO,
        now: DateTime<Utc>,
    ) -> Result<IssuedInvite, InviteError> {
        let request = request.normalized();
        let tenant = self.tenant_of(tenant_id).await?;

        let (data, secret) = machine::new_invite(
            tenant_id,
            inviter.user_id,
            &request.email,
            request.role,
            &self.policy,
            now,
        );
        let invite = self.store.insert_invite(&data).await?;
        info!("Invite {} created for role {}", invite.invite_id(), invite.role());

        let ctx = self.mail_context(&tenant, inviter);
        let notification = machine::invite_notification(&invite, &secret.raw, &ctx);
        let email_delivered = self.deliver_best_effort(&[notification]).await;

        Ok(IssuedInvite {
            invite_link: machine::invite_link(&self.public_url, &secret.raw),
            raw_token: secret.raw,
            invite,
            email_delivered,
        })
    }

    /// Rotates token and deadline of a PENDING, unexpired invite of the tenant and emails the new link
    #[instrument(skip(self, inviter), fields(inviter_id = inviter.user_id))]
    pub async fn resend_invite(
        &self,
        tenant_id: i32,
        invite_id: i32,
        inviter: &User,
        now: DateTime<Utc>,
    ) -> Result<ResendOutcome, InviteError> {
        let invite = match self.store.find_invite(invite_id).await? {
            Some(invite)
                if invite.tenant_id() == tenant_id
                    && invite.lifecycle(now) == Lifecycle::Active =>
            {
                invite
            }
            _ => {
                debug!("Invite {} not resendable", invite_id);
                return Ok(ResendOutcome::NotFound);
            }
        };

        let tenant = self.tenant_of(tenant_id).await?;
        let ctx = self.mail_context(&tenant, inviter);
        let policy = &self.policy;

        let (secret, invite, notifications) = self
            .transact(invite, |invite| {
                machine::ensure_active(invite, now)?;
                Ok(machine::resend(invite, policy, &ctx, now))
            })
            .await?;
        info!("Invite {} resent", invite.invite_id());

        let email_delivered = self.deliver_best_effort(&notifications).await;
        Ok(ResendOutcome::Resent(IssuedInvite {
            invite_link: machine::invite_link(&self.public_url, &secret.raw),
            raw_token: secret.raw,
            invite,
            email_delivered,
        }))
    }

    /// Deletes an invite of the tenant, in any state
    pub async fn revoke_invite(&self, tenant_id: i32, invite_id: i32) -> Result<bool, InviteError> {
        let deleted = self.store.delete_invite(tenant_id, invite_id).await?;
        if deleted {
            info!("Invite {} revoked", invite_id);
        }
        Ok(deleted)
    }

    pub async fn list_invites(
        &self,
        tenant_id: i32,
        query: &InviteListQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<InviteSummaryDTO>, InviteError> {
        let invites = self.store.list_invites(tenant_id, query, now).await?;

        // un solo lookup per ogni autore distinto
        let mut author_ids: Vec<i32> = invites.iter().map(|i| i.created_by_user_id()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors = try_join_all(author_ids.iter().map(|id| self.store.find_user(*id))).await?;
        let authors: Vec<User> = authors.into_iter().flatten().collect();

        Ok(invites
            .iter()
            .map(|invite| {
                let created_by = authors
                    .iter()
                    .find(|user| user.user_id == invite.created_by_user_id())
                    .cloned()
                    .map(UserDTO::from);
                InviteSummaryDTO::from_invite(invite, created_by, now)
            })
            .collect())
    }

    pub async fn get_invite(
        &self,
        tenant_id: i32,
        invite_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<InviteSummaryDTO>, InviteError> {
        let Some(invite) = self
            .store
            .find_invite(invite_id)
            .await?
            .filter(|invite| invite.tenant_id() == tenant_id)
        else {
            return Ok(None);
        };

        let created_by = self
            .store
            .find_user(invite.created_by_user_id())
            .await?
            .map(UserDTO::from);
        Ok(Some(InviteSummaryDTO::from_invite(&invite, created_by, now)))
    }

    // ************************* LATO INVITATO ************************* //

    /// Resolves a raw token. Shape, existence, expiry and usage are checked in this order.
    pub async fn load_by_raw_token(
        &self,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<LoadOutcome, InviteError> {
        if !codec::is_well_formed_token(raw_token) {
            return Ok(LoadOutcome::Malformed);
        }

        let token_hash = codec::hash_secret(raw_token);
        let Some(invite) = self.store.find_invite_by_token_hash(&token_hash).await? else {
            return Ok(LoadOutcome::NotFound);
        };

        Ok(match invite.lifecycle(now) {
            Lifecycle::Expired => LoadOutcome::Expired,
            Lifecycle::Accepted => LoadOutcome::AlreadyUsed,
            Lifecycle::Active => LoadOutcome::Found(invite),
        })
    }

    pub async fn preview_invite(
        &self,
        invite: &Invite,
        now: DateTime<Utc>,
    ) -> Result<InvitePreview, InviteError> {
        let tenant = self.tenant_of(invite.tenant_id()).await?;
        Ok(machine::preview(invite, &tenant.name, &self.policy, now))
    }

    /// Issues a new code and emails it.
    ///
    /// The new code is committed before sending: if the email fails the error is
    /// returned but the code and the send counter stay as saved.
    #[instrument(skip(self, invite), fields(invite_id = invite.invite_id()))]
    pub async fn send_otp(
        &self,
        invite: Invite,
        now: DateTime<Utc>,
    ) -> Result<SendOtpOutcome, InviteError> {
        let tenant = self.tenant_of(invite.tenant_id()).await?;
        let policy = &self.policy;

        let (outcome, _, notifications) = self
            .transact(invite, |invite| {
                machine::ensure_active(invite, now)?;
                Ok(machine::send_otp(invite, policy, &tenant.name, now))
            })
            .await?;

        for notification in &notifications {
            self.notifier.deliver(notification).await.map_err(|e| {
                error!("Verification code not delivered: {}", e);
                InviteError::Delivery(e)
            })?;
        }

        debug!("Send outcome: {:?}", outcome);
        Ok(outcome)
    }

    #[instrument(skip(self, invite, code), fields(invite_id = invite.invite_id()))]
    pub async fn verify_otp(
        &self,
        invite: Invite,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifyOtpOutcome, InviteError> {
        let policy = &self.policy;
        let (outcome, _, _) = self
            .transact(invite, |invite| {
                machine::ensure_active(invite, now)?;
                Ok(machine::verify_otp(invite, code, policy, now))
            })
            .await?;

        match &outcome {
            VerifyOtpOutcome::Verified { .. } => info!("Email verified"),
            VerifyOtpOutcome::Locked { .. } => warn!("Invite locked after failed attempts"),
            other => debug!("Verify outcome: {:?}", other),
        }
        Ok(outcome)
    }

    /// Consumes the verification token, then creates the account if needed and the membership.
    ///
    /// The invite is committed first and every guard runs again on a reloaded
    /// copy: a resend or a revoke that lands before the save wins, and no account
    /// or membership is created. Role and email always come from the invite. An
    /// existing member keeps the role they already have.
    #[instrument(skip(self, invite, request), fields(invite_id = invite.invite_id()))]
    pub async fn accept_invite(
        &self,
        invite: Invite,
        request: AcceptInviteDTO,
        now: DateTime<Utc>,
    ) -> Result<AcceptOutcome, InviteError> {
        let tenant = self.tenant_of(invite.tenant_id()).await?;
        let policy = &self.policy;

        let (rejection, invite, _) = self
            .transact(invite, |invite| {
                machine::ensure_active(invite, now)?;
                Ok(machine::accept(invite, &request, policy, now))
            })
            .await?;
        if let Some(rejection) = rejection {
            debug!("Acceptance rejected: {:?}", rejection);
            return Ok(rejection);
        }

        let (user, is_new_user) = self.resolve_account(&invite, &request).await?;

        if !is_new_user {
            if let Some(membership) = self
                .store
                .find_membership(tenant.tenant_id, user.user_id)
                .await?
            {
                info!(
                    "User {} already member of tenant {} as {}",
                    user.user_id, tenant.tenant_id, membership.role
                );
                return Ok(AcceptOutcome::Accepted(Acceptance {
                    user,
                    tenant,
                    role: membership.role,
                    is_new_user,
                    already_member: true,
                }));
            }
        }

        let role = invite.role();
        let membership = CreateMembershipDTO {
            tenant_id: tenant.tenant_id,
            user_id: user.user_id,
            role,
            status: MembershipStatus::Active,
        };
        match self.store.create_membership(&membership).await {
            Ok(_) => {}
            Err(StoreError::DuplicateMembership { tenant_id, user_id }) => {
                warn!("Membership ({}, {}) created concurrently", tenant_id, user_id);
                return Ok(AcceptOutcome::DuplicateMembership);
            }
            Err(e) => return Err(e.into()),
        }
        info!(
            "User {} joined tenant {} as {}",
            user.user_id, tenant.tenant_id, role
        );

        Ok(AcceptOutcome::Accepted(Acceptance {
            user,
            tenant,
            role,
            is_new_user,
            already_member: false,
        }))
    }

    /// Existing account for the invite email, or a new one. `bool` is true when created here.
    async fn resolve_account(
        &self,
        invite: &Invite,
        request: &AcceptInviteDTO,
    ) -> Result<(User, bool), InviteError> {
        if let Some(user) = self.store.find_user_by_email(invite.email()).await? {
            return Ok((user, false));
        }

        let password = User::hash_password(&request.password)?;
        let data = CreateUserDTO {
            name: request.name.trim().to_string(),
            email: invite.email().to_string(),
            password,
        };
        match self.store.create_user(&data).await {
            Ok(user) => Ok((user, true)),
            Err(StoreError::DuplicateUser) => {
                // registrato in parallelo: si prosegue con l'account esistente
                warn!("Account created concurrently, reusing it");
                let user = self
                    .store
                    .find_user_by_email(invite.email())
                    .await?
                    .ok_or(StoreError::DuplicateUser)?;
                Ok((user, false))
            }
            Err(e) => Err(e.into()),
        }
    }
}

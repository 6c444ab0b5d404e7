//! InviteStore su MySQL - Repository per la gestione degli inviti

use super::{InviteStore, MySqlStore, StoreError};
use crate::dtos::{InviteListQuery, InviteListStatus};
use crate::entities::{Invite, NewInvite};
use chrono::{DateTime, Utc};
use sqlx::{MySql, QueryBuilder};
use tracing::{debug, instrument};

/// SELECT con tutte le colonne dell'invito, seguita dal resto della query
macro_rules! select_invite {
    ($tail:literal) => {
        concat!(
            "SELECT invite_id, tenant_id, email, role, token_hash, status, expires_at, used_at, ",
            "created_by_user_id, otp_hash, otp_expires_at, otp_attempts, otp_send_count, ",
            "otp_last_sent_at, locked_until, verification_token, verification_token_expires_at, ",
            "version, created_at FROM invites ",
            $tail
        )
    };
}

impl InviteStore for MySqlStore {
    async fn find_invite_by_token_hash(&self, token_hash: &str) -> Result<Option<Invite>, StoreError> {
        let invite = sqlx::query_as::<_, Invite>(select_invite!("WHERE token_hash = ?"))
            .bind(token_hash)
            .fetch_optional(&self.connection_pool)
            .await?;

        Ok(invite)
    }

    async fn find_invite(&self, invite_id: i32) -> Result<Option<Invite>, StoreError> {
        let invite = sqlx::query_as::<_, Invite>(select_invite!("WHERE invite_id = ?"))
            .bind(invite_id)
            .fetch_optional(&self.connection_pool)
            .await?;

        Ok(invite)
    }

    async fn find_pending_invite_for_email(
        &self,
        tenant_id: i32,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Invite>, StoreError> {
        let invite = sqlx::query_as::<_, Invite>(select_invite!(
            "WHERE tenant_id = ? AND email = ? AND status = 'PENDING' AND expires_at > ? LIMIT 1"
        ))
        .bind(tenant_id)
        .bind(email)
        .bind(now)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(invite)
    }

    async fn list_invites(
        &self,
        tenant_id: i32,
        query: &InviteListQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invite>, StoreError> {
        let mut builder = QueryBuilder::<MySql>::new(select_invite!("WHERE tenant_id = "));
        builder.push_bind(tenant_id);

        match query.status {
            InviteListStatus::All => {}
            InviteListStatus::Used => {
                builder.push(" AND status = 'ACCEPTED'");
            }
            InviteListStatus::Pending => {
                builder.push(" AND status = 'PENDING'");
                if !query.include_expired {
                    builder.push(" AND expires_at > ");
                    builder.push_bind(now);
                }
            }
        }
        builder.push(" ORDER BY created_at DESC, invite_id DESC");

        let invites = builder
            .build_query_as::<Invite>()
            .fetch_all(&self.connection_pool)
            .await?;

        Ok(invites)
    }

    #[instrument(skip(self, data), fields(tenant_id = data.tenant_id))]
    async fn insert_invite(&self, data: &NewInvite) -> Result<Invite, StoreError> {
        let result = sqlx::query(
            "INSERT INTO invites (tenant_id, email, role, token_hash, status, expires_at, created_by_user_id) \
             VALUES (?, ?, ?, ?, 'PENDING', ?, ?)",
        )
        .bind(data.tenant_id)
        .bind(&data.email)
        .bind(data.role)
        .bind(&data.token_hash)
        .bind(data.expires_at)
        .bind(data.created_by_user_id)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_id() as i32;
        debug!("Invite {} inserted", new_id);

        self.find_invite(new_id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    #[instrument(skip(self, invite), fields(invite_id = invite.invite_id))]
    async fn save_invite(&self, invite: &Invite, expected_version: i32) -> Result<Invite, StoreError> {
        // compare-and-swap sulla versione: nessuna riga aggiornata = qualcun altro ha salvato prima
        let result = sqlx::query(
            "UPDATE invites SET token_hash = ?, status = ?, expires_at = ?, used_at = ?, \
             otp_hash = ?, otp_expires_at = ?, otp_attempts = ?, otp_send_count = ?, \
             otp_last_sent_at = ?, locked_until = ?, verification_token = ?, \
             verification_token_expires_at = ?, version = version + 1 \
             WHERE invite_id = ? AND version = ?",
        )
        .bind(&invite.token_hash)
        .bind(invite.status)
        .bind(invite.expires_at)
        .bind(invite.used_at)
        .bind(&invite.otp_hash)
        .bind(invite.otp_expires_at)
        .bind(invite.otp_attempts)
        .bind(invite.otp_send_count)
        .bind(invite.otp_last_sent_at)
        .bind(invite.locked_until)
        .bind(&invite.verification_token)
        .bind(invite.verification_token_expires_at)
        .bind(invite.invite_id)
        .bind(expected_version)
        .execute(&self.connection_pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("Version {} is stale", expected_version);
            return Err(StoreError::Conflict(invite.invite_id));
        }

        let mut saved = invite.clone();
        saved.version = expected_version + 1;
        Ok(saved)
    }

    async fn delete_invite(&self, tenant_id: i32, invite_id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM invites WHERE invite_id = ? AND tenant_id = ?")
            .bind(invite_id)
            .bind(tenant_id)
            .execute(&self.connection_pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

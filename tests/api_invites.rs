//! Integration tests per gli endpoints degli inviti
//!
//! Test per:
//! - POST/GET /tenants/{tenant_id}/invites
//! - GET/DELETE /tenants/{tenant_id}/invites/{invite_id}
//! - POST /tenants/{tenant_id}/invites/{invite_id}/resend
//! - GET /invites/{token}/preview
//! - POST /invites/{token}/send-code, /verify-code, /accept
//!
//! Girano contro lo store in memoria e l'outbox in memoria: i codici OTP
//! e i link si leggono dalle email raccolte.

mod common;

#[cfg(test)]
mod invite_tests {
    use super::common::*;
    use axum_test::TestServer;
    use axum_test::http::{HeaderName, StatusCode};
    use garage_server::entities::StaffRole;
    use garage_server::notifications::MemoryOutbox;
    use serde_json::{Value, json};

    const BOB: &str = "bob@example.com";
    const WRONG_CODE: &str = "000000";

    fn forwarded_for() -> HeaderName {
        HeaderName::from_static("x-forwarded-for")
    }

    /// Alice invita `email` come MECHANIC, ritorna (invite_id, token grezzo)
    async fn invite(server: &TestServer, seed: &Seed, email: &str) -> (i64, String) {
        let response = server
            .post(&format!("/tenants/{}/invites", seed.tenant.tenant_id))
            .add_header(authorization(), bearer(&seed.alice))
            .json(&json!({ "email": email, "role": "MECHANIC" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let link = body["invite_link"].as_str().expect("invite_link missing");
        (body["id"].as_i64().expect("id missing"), token_from_link(link))
    }

    /// Invia il codice e lo verifica, ritorna il token di verifica
    async fn verify(server: &TestServer, outbox: &MemoryOutbox, token: &str, email: &str) -> String {
        server
            .post(&format!("/invites/{}/send-code", token))
            .await
            .assert_status_ok();
        let code = outbox.last_code_for(email).expect("no code delivered");

        let response = server
            .post(&format!("/invites/{}/verify-code", token))
            .json(&json!({ "code": code }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["verification_token"]
            .as_str()
            .expect("verification_token missing")
            .to_string()
    }

    // ============================================================
    // Flusso completo lato invitato
    // ============================================================

    #[tokio::test]
    async fn test_invite_flow_creates_account_and_membership() {
        let (state, store, outbox, seed) = create_test_state();
        let server = create_test_server(state);
        let (_, token) = invite(&server, &seed, "Bob@Example.com ").await;

        assert_eq!(
            outbox.last_link_for(BOB),
            Some(format!("{}/invite/{}", PUBLIC_URL, token))
        );

        // L'anteprima mostra l'email mascherata
        let response = server.get(&format!("/invites/{}/preview", token)).await;
        response.assert_status_ok();
        let preview: Value = response.json();
        assert_eq!(preview["email"], "bo***@example.com");
        assert_eq!(preview["garage_name"], "Officina Rossi");
        assert_eq!(preview["role"], "MECHANIC");
        assert_eq!(preview["otp_sent"], false);

        let verification_token = verify(&server, &outbox, &token, BOB).await;

        let response = server
            .post(&format!("/invites/{}/accept", token))
            .json(&json!({
                "verification_token": verification_token,
                "name": "Bob",
                "password": "Password123"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        assert!(response.headers().get("authorization").is_some());
        let body: Value = response.json();
        assert_eq!(body["role"], "MECHANIC");
        assert_eq!(body["tenant_id"], seed.tenant.tenant_id);
        assert_eq!(body["user"]["email"], BOB);
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

        let memberships = store.memberships_of(seed.tenant.tenant_id);
        assert_eq!(memberships.len(), 3);

        // Il link è ormai consumato
        let response = server.get(&format!("/invites/{}/preview", token)).await;
        response.assert_status(StatusCode::GONE);
        let body: Value = response.json();
        assert_eq!(body["code"], "INVITE_USED");
    }

    #[tokio::test]
    async fn test_accept_ignores_role_in_body() {
        let (state, store, outbox, seed) = create_test_state();
        let server = create_test_server(state);
        let (_, token) = invite(&server, &seed, BOB).await;
        let verification_token = verify(&server, &outbox, &token, BOB).await;

        let response = server
            .post(&format!("/invites/{}/accept", token))
            .json(&json!({
                "verification_token": verification_token,
                "name": "Bob",
                "password": "Password123",
                "role": "OWNER",
                "email": "mallory@example.com"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let bob = store
            .memberships_of(seed.tenant.tenant_id)
            .into_iter()
            .find(|m| m.user_id != seed.alice.user_id && m.user_id != seed.carl.user_id)
            .expect("membership not created");
        assert_eq!(bob.role, StaffRole::Mechanic);
    }

    #[tokio::test]
    async fn test_accept_with_existing_account_returns_ok() {
        let (state, store, outbox, seed) = create_test_state();
        let hash = bcrypt::hash("Original123", 4).unwrap();
        store.add_user("Dave", "dave@example.com", &hash).unwrap();
        let server = create_test_server(state);

        let (_, token) = invite(&server, &seed, "dave@example.com").await;
        let verification_token = verify(&server, &outbox, &token, "dave@example.com").await;

        let response = server
            .post(&format!("/invites/{}/accept", token))
            .json(&json!({
                "verification_token": verification_token,
                "name": "Someone Else",
                "password": "Different123"
            }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["user"]["name"], "Dave");

        // la password dell'account esistente non cambia
        let login = server
            .post("/auth/login")
            .json(&json!({ "email": "dave@example.com", "password": "Original123" }))
            .await;
        login.assert_status_ok();
    }

    #[tokio::test]
    async fn test_accept_requires_verification() {
        let (state, _, _, seed) = create_test_state();
        let server = create_test_server(state);
        let (_, token) = invite(&server, &seed, BOB).await;

        let response = server
            .post(&format!("/invites/{}/accept", token))
            .json(&json!({ "name": "Bob", "password": "Password123" }))
            .await;

        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(body["code"], "VERIFICATION_REQUIRED");

        let response = server
            .post(&format!("/invites/{}/accept", token))
            .json(&json!({
                "verification_token": "f".repeat(64),
                "name": "Bob",
                "password": "Password123"
            }))
            .await;

        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_VERIFICATION");
    }

    #[tokio::test]
    async fn test_accept_rejects_short_password() {
        let (state, store, outbox, seed) = create_test_state();
        let server = create_test_server(state);
        let (_, token) = invite(&server, &seed, BOB).await;
        let verification_token = verify(&server, &outbox, &token, BOB).await;

        let response = server
            .post(&format!("/invites/{}/accept", token))
            .json(&json!({
                "verification_token": verification_token,
                "name": "Bob",
                "password": "short"
            }))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(store.user_count(), 2);

        // nome presente, password vuota
        let response = server
            .post(&format!("/invites/{}/accept", token))
            .json(&json!({
                "verification_token": verification_token,
                "name": "Bob",
                "password": ""
            }))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["details"], "Password is required");
        assert_eq!(store.user_count(), 2);
    }

    // ============================================================
    // Token dell'invito
    // ============================================================

    #[tokio::test]
    async fn test_token_format_and_existence() {
        let (state, _, _, _) = create_test_state();
        let server = create_test_server(state);

        let response = server.get("/invites/short/preview").await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_TOKEN_FORMAT");

        let response = server
            .get(&format!("/invites/{}/preview", "a".repeat(64)))
            .await;
        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_TOKEN");
    }

    // ============================================================
    // Codice OTP
    // ============================================================

    #[tokio::test]
    async fn test_wrong_codes_lock_the_invite() {
        let (state, _, _, seed) = create_test_state();
        let server = create_test_server(state);
        let (_, token) = invite(&server, &seed, BOB).await;

        server
            .post(&format!("/invites/{}/send-code", token))
            .await
            .assert_status_ok();

        for remaining in (1..=4).rev() {
            let response = server
                .post(&format!("/invites/{}/verify-code", token))
                .json(&json!({ "code": WRONG_CODE }))
                .await;
            response.assert_status_bad_request();
            let body: Value = response.json();
            assert_eq!(body["code"], "INVALID_OTP");
            assert_eq!(body["remaining_attempts"], remaining);
        }

        let response = server
            .post(&format!("/invites/{}/verify-code", token))
            .json(&json!({ "code": WRONG_CODE }))
            .await;
        response.assert_status(StatusCode::LOCKED);
        let body: Value = response.json();
        assert_eq!(body["code"], "INVITE_LOCKED");
        assert!(response.headers().get("retry-after").is_some());

        // Anche l'invio di un nuovo codice è bloccato
        let response = server
            .post(&format!("/invites/{}/send-code", token))
            .await;
        response.assert_status(StatusCode::LOCKED);

        let preview: Value = server
            .get(&format!("/invites/{}/preview", token))
            .await
            .json();
        assert_eq!(preview["is_locked"], true);
    }

    #[tokio::test]
    async fn test_verify_without_code_sent() {
        let (state, _, _, seed) = create_test_state();
        let server = create_test_server(state);
        let (_, token) = invite(&server, &seed, BOB).await;

        let response = server
            .post(&format!("/invites/{}/verify-code", token))
            .json(&json!({ "code": "123456" }))
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["code"], "NO_OTP_SENT");

        let response = server
            .post(&format!("/invites/{}/verify-code", token))
            .json(&json!({ "code": "12ab" }))
            .await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_send_code_limit_per_invite() {
        let (state, _, outbox, seed) = create_test_state();
        let server = create_test_server(state);
        let (_, token) = invite(&server, &seed, BOB).await;

        for remaining in (0..5).rev() {
            let response = server
                .post(&format!("/invites/{}/send-code", token))
                .await;
            response.assert_status_ok();
            let body: Value = response.json();
            assert_eq!(body["remaining_sends"], remaining);
        }

        let response = server
            .post(&format!("/invites/{}/send-code", token))
            .await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        let body: Value = response.json();
        assert_eq!(body["code"], "OTP_SEND_LIMIT_EXCEEDED");
        assert!(response.headers().get("retry-after").is_some());

        let codes = outbox
            .sent()
            .iter()
            .filter(|n| matches!(n, garage_server::notifications::Notification::OtpCode(_)))
            .count();
        assert_eq!(codes, 5);
    }

    #[tokio::test]
    async fn test_send_code_delivery_failure() {
        let (state, _, outbox, seed) = create_test_state();
        let server = create_test_server(state);
        let (_, token) = invite(&server, &seed, BOB).await;

        outbox.set_failing(true);
        let response = server
            .post(&format!("/invites/{}/send-code", token))
            .await;
        response.assert_status(StatusCode::BAD_GATEWAY);

        // il codice è comunque stato emesso
        let preview: Value = server
            .get(&format!("/invites/{}/preview", token))
            .await
            .json();
        assert_eq!(preview["otp_sent"], true);
    }

    // ============================================================
    // Limiti per IP
    // ============================================================

    #[tokio::test]
    async fn test_accept_limited_per_ip() {
        let (state, _, _, seed) = create_test_state();
        let server = create_test_server(state);
        let (_, token) = invite(&server, &seed, BOB).await;
        let path = format!("/invites/{}/accept", token);

        for _ in 0..5 {
            server
                .post(&path)
                .add_header(forwarded_for(), "203.0.113.9".to_string())
                .json(&json!({}))
                .await
                .assert_status_unauthorized();
        }

        let response = server
            .post(&path)
            .add_header(forwarded_for(), "203.0.113.9".to_string())
            .json(&json!({}))
            .await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        let body: Value = response.json();
        assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");

        // un altro client non è toccato
        server
            .post(&path)
            .add_header(forwarded_for(), "198.51.100.4".to_string())
            .json(&json!({}))
            .await
            .assert_status_unauthorized();
    }

    // ============================================================
    // Lato garage
    // ============================================================

    #[tokio::test]
    async fn test_create_invite_conflicts() {
        let (state, _, _, seed) = create_test_state();
        let server = create_test_server(state);
        let path = format!("/tenants/{}/invites", seed.tenant.tenant_id);
        invite(&server, &seed, BOB).await;

        let response = server
            .post(&path)
            .add_header(authorization(), bearer(&seed.alice))
            .json(&json!({ "email": "BOB@example.com", "role": "VIEWER" }))
            .await;
        response.assert_status_conflict();
        let body: Value = response.json();
        assert_eq!(body["code"], "INVITE_PENDING");

        let response = server
            .post(&path)
            .add_header(authorization(), bearer(&seed.alice))
            .json(&json!({ "email": "carl@example.com", "role": "VIEWER" }))
            .await;
        response.assert_status_conflict();
        let body: Value = response.json();
        assert_eq!(body["code"], "ALREADY_MEMBER");

        let response = server
            .post(&path)
            .add_header(authorization(), bearer(&seed.alice))
            .json(&json!({ "email": "not-an-email", "role": "VIEWER" }))
            .await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_create_invite_reports_failed_email() {
        let (state, _, outbox, seed) = create_test_state();
        let server = create_test_server(state);
        outbox.set_failing(true);

        let response = server
            .post(&format!("/tenants/{}/invites", seed.tenant.tenant_id))
            .add_header(authorization(), bearer(&seed.alice))
            .json(&json!({ "email": BOB, "role": "STOREKEEPER" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["email_delivered"], false);
        assert_eq!(body["role"], "STOREKEEPER");
    }

    #[tokio::test]
    async fn test_invite_routes_require_manager() {
        let (state, store, _, seed) = create_test_state();
        let outsider = store
            .add_user("Eve", "eve@example.com", "not-a-bcrypt-hash")
            .unwrap();
        let server = create_test_server(state);
        let path = format!("/tenants/{}/invites", seed.tenant.tenant_id);

        server.get(&path).await.assert_status_unauthorized();

        server
            .get(&path)
            .add_header(authorization(), "Token abc".to_string())
            .await
            .assert_status_unauthorized();

        // MECHANIC: membro ma senza permessi
        server
            .get(&path)
            .add_header(authorization(), bearer(&seed.carl))
            .await
            .assert_status_forbidden();

        // non membro del garage
        server
            .post(&path)
            .add_header(authorization(), bearer(&outsider))
            .json(&json!({ "email": BOB, "role": "VIEWER" }))
            .await
            .assert_status_forbidden();

        server
            .get(&path)
            .add_header(authorization(), bearer(&seed.alice))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_list_get_and_revoke() {
        let (state, _, _, seed) = create_test_state();
        let server = create_test_server(state);
        let (invite_id, token) = invite(&server, &seed, BOB).await;
        let tenant_id = seed.tenant.tenant_id;

        let response = server
            .get(&format!("/tenants/{}/invites", tenant_id))
            .add_header(authorization(), bearer(&seed.alice))
            .await;
        response.assert_status_ok();
        let list: Value = response.json();
        let list = list.as_array().expect("list expected");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["email"], BOB);
        assert_eq!(list[0]["status"], "PENDING");
        assert_eq!(list[0]["created_by"]["name"], "Alice");
        assert!(list[0].get("token_hash").is_none());
        assert!(list[0].get("otp_hash").is_none());

        let detail = format!("/tenants/{}/invites/{}", tenant_id, invite_id);
        server
            .get(&detail)
            .add_header(authorization(), bearer(&seed.alice))
            .await
            .assert_status_ok();

        server
            .delete(&detail)
            .add_header(authorization(), bearer(&seed.alice))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get(&detail)
            .add_header(authorization(), bearer(&seed.alice))
            .await
            .assert_status_not_found();

        server
            .get(&format!("/invites/{}/preview", token))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_list_used_invites() {
        let (state, _, outbox, seed) = create_test_state();
        let server = create_test_server(state);
        let (_, token) = invite(&server, &seed, BOB).await;
        invite(&server, &seed, "dave@example.com").await;
        let verification_token = verify(&server, &outbox, &token, BOB).await;
        server
            .post(&format!("/invites/{}/accept", token))
            .json(&json!({
                "verification_token": verification_token,
                "name": "Bob",
                "password": "Password123"
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let path = format!("/tenants/{}/invites", seed.tenant.tenant_id);
        let used: Value = server
            .get(&path)
            .add_query_param("status", "used")
            .add_header(authorization(), bearer(&seed.alice))
            .await
            .json();
        assert_eq!(used.as_array().map(Vec::len), Some(1));
        assert_eq!(used[0]["email"], BOB);

        let all: Value = server
            .get(&path)
            .add_query_param("status", "all")
            .add_header(authorization(), bearer(&seed.alice))
            .await
            .json();
        assert_eq!(all.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_resend_rotates_the_link() {
        let (state, _, outbox, seed) = create_test_state();
        let server = create_test_server(state);
        let (invite_id, old_token) = invite(&server, &seed, BOB).await;

        let response = server
            .post(&format!(
                "/tenants/{}/invites/{}/resend",
                seed.tenant.tenant_id, invite_id
            ))
            .add_header(authorization(), bearer(&seed.alice))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        let new_token = token_from_link(body["invite_link"].as_str().unwrap());

        assert_ne!(new_token, old_token);
        assert_eq!(
            outbox.last_link_for(BOB),
            Some(format!("{}/invite/{}", PUBLIC_URL, new_token))
        );

        server
            .get(&format!("/invites/{}/preview", old_token))
            .await
            .assert_status_not_found();
        server
            .get(&format!("/invites/{}/preview", new_token))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_resend_unknown_invite() {
        let (state, _, _, seed) = create_test_state();
        let server = create_test_server(state);

        server
            .post(&format!("/tenants/{}/invites/999/resend", seed.tenant.tenant_id))
            .add_header(authorization(), bearer(&seed.alice))
            .await
            .assert_status_not_found();
    }
}

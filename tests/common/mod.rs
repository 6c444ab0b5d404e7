#![allow(dead_code)]

use axum_test::TestServer;
use axum_test::http::HeaderName;
use garage_server::core::AppState;
use garage_server::entities::{StaffRole, Tenant, User};
use garage_server::notifications::MemoryOutbox;
use garage_server::repositories::MemoryStore;
use std::sync::Arc;

pub const JWT_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";
pub const PUBLIC_URL: &str = "http://garage.test";
pub const PASSWORD: &str = "Password123";

pub type TestState = Arc<AppState<MemoryStore, MemoryOutbox>>;

/// Garage seminato per i test
pub struct Seed {
    pub tenant: Tenant,
    /// OWNER del garage
    pub alice: User,
    /// MECHANIC del garage
    pub carl: User,
}

/// Crea un AppState in memoria con un garage, un OWNER e un MECHANIC
///
/// # Returns
/// (state, store, outbox, seed) - store e outbox condividono le tabelle con lo state
pub fn create_test_state() -> (TestState, MemoryStore, MemoryOutbox, Seed) {
    let store = MemoryStore::new();
    let outbox = MemoryOutbox::new();

    // costo minimo di bcrypt, i test non devono aspettare
    let hash = bcrypt::hash(PASSWORD, 4).expect("Failed to hash password");
    let tenant = store.add_tenant("Officina Rossi", "officina-rossi");
    let alice = store
        .add_user("Alice", "alice@example.com", &hash)
        .expect("Failed to seed alice");
    let carl = store
        .add_user("Carl", "carl@example.com", &hash)
        .expect("Failed to seed carl");
    store
        .add_membership(tenant.tenant_id, alice.user_id, StaffRole::Owner)
        .expect("Failed to seed membership");
    store
        .add_membership(tenant.tenant_id, carl.user_id, StaffRole::Mechanic)
        .expect("Failed to seed membership");

    let state = Arc::new(AppState::new(
        store.clone(),
        outbox.clone(),
        JWT_SECRET.to_string(),
        PUBLIC_URL,
    ));
    (state, store, outbox, Seed { tenant, alice, carl })
}

/// Crea un TestServer per i test
pub fn create_test_server(state: TestState) -> TestServer {
    let app = garage_server::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Genera un JWT token per testing, firmato con `JWT_SECRET`
pub fn create_test_jwt(user: &User) -> String {
    garage_server::core::encode_jwt(user.email.clone(), user.user_id, JWT_SECRET)
        .expect("Failed to create JWT token")
}

pub fn authorization() -> HeaderName {
    HeaderName::from_static("authorization")
}

pub fn bearer(user: &User) -> String {
    format!("Bearer {}", create_test_jwt(user))
}

/// Token grezzo in coda a un link di invito
pub fn token_from_link(link: &str) -> String {
    link.rsplit('/')
        .next()
        .expect("invite link without token")
        .to_string()
}

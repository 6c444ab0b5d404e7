//! Application State - Stato globale dell'applicazione
//!
//! Contiene il servizio inviti (con store e notifier), la configurazione JWT
//! e i rate limiter condivisi da route e middleware.

use crate::core::rate_limit::RequestLimits;
use crate::invites::InviteService;
use crate::notifications::Notifier;
use crate::repositories::Store;

/// Stato globale dell'applicazione condiviso tra tutte le route e middleware
pub struct AppState<S, N> {
    /// Flusso inviti: possiede lo store e il notifier
    pub invites: InviteService<S, N>,

    /// Secret key per JWT token
    pub jwt_secret: String,

    /// Limiti per IP sugli endpoint pubblici degli inviti
    pub limits: RequestLimits,
}

impl<S: Store, N: Notifier> AppState<S, N> {
    /// Crea una nuova istanza di AppState
    ///
    /// # Arguments
    /// * `store` - Persistenza (MySQL in produzione, memoria nei test)
    /// * `notifier` - Canale di invio email
    /// * `jwt_secret` - Chiave segreta per la firma dei token JWT
    /// * `public_url` - Base URL del frontend per i link di invito
    pub fn new(store: S, notifier: N, jwt_secret: String, public_url: impl Into<String>) -> Self {
        Self {
            invites: InviteService::new(store, notifier, public_url),
            jwt_secret,
            limits: RequestLimits::default(),
        }
    }

    /// Store condiviso con il servizio inviti
    pub fn store(&self) -> &S {
        self.invites.store()
    }
}

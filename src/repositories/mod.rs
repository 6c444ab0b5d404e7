//! Repositories module - Coordinatore per tutti i repository del progetto
//!
//! Due implementazioni degli stessi trait:
//! - `MySqlStore`: persistenza su MySQL tramite sqlx
//! - `MemoryStore`: tabelle in memoria, per i test e per girare senza database

// ************************* NOTA SU SQLX ************************* //

/*
   Le query qui usano sqlx::query / sqlx::query_as (controllo a run-time) e non le macro query! / query_as!.
   Le macro vogliono un database raggiungibile (o la cache offline di `cargo sqlx prepare`) già in compilazione,
   mentre così il crate compila ovunque e lo schema viene verificato dalle migrations in `migrations/`
   e dai test #[sqlx::test] (ignorati di default, lanciarli con DATABASE_URL impostata e `--ignored`).
   Il mapping riga -> struct lo fa #[derive(sqlx::FromRow)] sulle entities, quindi l'ordine delle colonne
   nella SELECT non conta ma i nomi sì.

   Gli inviti hanno una colonna `version`: ogni save è un UPDATE ... WHERE version = ? e se non tocca righe
   vuol dire che qualcun altro ha salvato prima -> StoreError::Conflict, e il service ricarica e riprova.
*/

// ************************* MODULI REPOSITORY ************************* //

pub mod account;
pub mod invite;
pub mod memory;
pub mod traits;

// Re-esportazione dei trait per facilitare l'import
pub use traits::{AccountStore, InviteStore, Store, StoreError};

pub use memory::MemoryStore;

use sqlx::MySqlPool;

/// MySQL adapter, implements every store trait (see `invite` and `account`)
#[derive(Clone)]
pub struct MySqlStore {
    connection_pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(connection_pool: MySqlPool) -> MySqlStore {
        Self { connection_pool }
    }
}

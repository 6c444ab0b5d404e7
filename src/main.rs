use garage_server::core::{AppState, Config};
use garage_server::notifications::{LogMailer, Mailer, ResendMailer};
use garage_server::repositories::MySqlStore;
use sqlx::mysql::MySqlPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Inizializza il logging (RUST_LOG, default info)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Carica la configurazione
    let config = Config::from_env()?;
    config.print_info();

    // Connessione al database e migrations
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");

    // Canale email: Resend se c'è la chiave, altrimenti solo log
    let mailer = match &config.resend_api_key {
        Some(api_key) => Mailer::Resend(ResendMailer::new(api_key.clone(), config.email_from.clone())?),
        None => {
            warn!("RESEND_API_KEY not set, emails will only be logged");
            Mailer::Log(LogMailer)
        }
    };

    let state = Arc::new(AppState::new(
        MySqlStore::new(pool),
        mailer,
        config.jwt_secret.clone(),
        config.app_public_url.clone(),
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = garage_server::create_router(state).layer(cors);

    // Definisci l'indirizzo
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    // Avvia il server, l'indirizzo del client serve ai limiti per IP
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use departure_server::config::{Config, EnvFile};
use departure_server::departures::DepartureService;
use departure_server::rmv::RmvClient;
use departure_server::web::{AppState, create_router};

#[tokio::main]
async fn main() -> ExitCode {
    // Read before tracing starts so RUST_LOG may come from the file.
    let (env_file, env_file_error) = match EnvFile::load(".env") {
        Ok(env_file) => (env_file, None),
        Err(e) => (EnvFile::default(), Some(e)),
    };

    let filter = env_file
        .var("RUST_LOG")
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| "departure_server=info,tower_http=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(e) = env_file_error {
        tracing::warn!(error = %e, "could not load .env file");
    }

    let config = match Config::from_env(&env_file) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let client = match RmvClient::new(config.rmv_config()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to create RMV client");
            return ExitCode::FAILURE;
        }
    };

    let departures = DepartureService::new(Arc::new(client), &config.cache_config())
        .with_coalescing(config.coalesce_fetches);
    let state = AppState::new(
        departures,
        config.stop_id.as_str(),
        config.allowed_origins.clone(),
    );
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        %addr,
        stop_id = %config.stop_id,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "starting server"
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

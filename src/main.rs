use std::{env, sync::Arc};

use anyhow::Result;
use pokerd_view::{
    AppState,
    bootstrap::{Connection, FaucetBackend},
    client::PokerClient,
    config::Config,
    router,
    session::Keys,
};
use tracing::{debug, info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // initialize tracing
    let env_filter = env::var("RUST_LOG")
        .map(|log_level| {
            EnvFilter::builder()
                .with_default_directive(LevelFilter::ERROR.into())
                .parse_lossy(log_level)
        })
        .unwrap_or(EnvFilter::new("debug"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let config = Config::from_env()?;
    debug!(?config, "loaded config");

    // the connection is established lazily on the first request
    let backend = FaucetBackend::new(
        &config.faucet_url,
        config.service_url.clone(),
        config.application_id.clone(),
        config.private_key.clone(),
        config.bootstrap_timeout,
    )?;
    let connection = Arc::new(Connection::new(Arc::new(backend), config.bootstrap_timeout));
    let state = Arc::new(AppState {
        client: PokerClient::new(connection),
        keys: Keys::new(config.jwt_secret.as_bytes()),
        admins: config.admin_wallets.iter().copied().collect(),
    });

    // routes
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "serving");
    axum::serve(listener, app).await?;
    Ok(())
}

use std::{net::SocketAddr, sync::Arc};

use blog_api::{App, config::ServerConfig, db_pool, router, storage::ImageStore};
use dotenv::dotenv;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const DEFAULT_LOG_FILTER: &str = "blog_api=debug,tower_http=info";

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    let production = std::env::var("ENVIRONMENT").is_ok_and(|e| e == "production");
    init_tracing(production);

    let config = ServerConfig::new_from_env();
    tracing::info!(env = ?config.env, "Starting blog api");

    let diesel = db_pool(&config)?;
    let images = ImageStore::from_config(config.storage.as_ref())
        .map_err(|e| eyre::eyre!("Could not set up image storage: {e:?}"))?;

    let listen_addr = config.listen_addr;
    let app = router(App {
        diesel,
        config: Arc::new(config),
        images,
    });

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("Listening on {}", listen_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

mod api;
mod config;
mod db;
mod feed;
mod geocode;
mod models;
mod store;
mod sync;
mod uploads;

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use config::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Sightings Sync Service...");

    // Init DB
    let pool = db::init_pool(&config.database_url).await?;
    info!("Connected to database");

    let store: Arc<dyn store::SightingStore> = Arc::new(store::PgSightingStore::new(pool));
    let feed: Arc<dyn feed::FeedSource> = Arc::new(feed::HttpFeedClient::new(
        &config.feed_base_url,
        &config.feed_board_id,
        Duration::from_secs(config.feed_timeout_secs),
    )?);
    let geocoder = geocode::GeocodeClient::new(&config.geocode_url, &config.geocode_user_agent)?;
    let images = uploads::ImageHostClient::new(&config.imgur_upload_url, &config.imgur_client_id)?;
    let vault = uploads::FileVaultClient::new(&config.vault_upload_url)?;

    let bind = config.http_bind.clone();
    let state = web::Data::new(api::AppState {
        sync_options: sync::SyncOptions::from_config(&config),
        store,
        feed,
        geocoder,
        images,
        vault,
        config,
    });

    info!("Listening on {}", bind);
    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure))
        .bind(&bind)?
        .run()
        .await?;

    Ok(())
}

mod auth;
mod config;
mod error;
mod logging;
mod models;
mod observer;
mod rest;
mod sensor;
mod weather;

use auth::SessionAuthenticator;
use config::CONFIG;
use models::{PgStore, Store};
use observer::ConcurrentObserver;
use sensor::SensorGenerator;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use weather::OpenWeatherClient;

static TERMINATED: AtomicU32 = AtomicU32::new(0);

/// First Ctrl-C shuts down gracefully, the second one kills the process.
fn register_sigint_handler(shutdown: watch::Sender<bool>) {
    let res = ctrlc::set_handler(move || {
        let count = TERMINATED.fetch_add(1, Ordering::Relaxed);
        if count >= 1 {
            warn!("Force killing");
            std::process::exit(1);
        }
        info!("Shutting down, press Ctrl-C again to force");
        let _ = shutdown.send(true);
    });
    if let Err(e) = res {
        error!("Cannot register sigint handler: {}", e);
    }
}

#[tokio::main]
async fn main() {
    logging::init();
    info!(
        "Starting {} {} (core {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        irrigo_core::CORE_VERSION
    );

    let bind_addr: SocketAddr = match CONFIG.bind_addr().parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid BIND_ADDR {}: {}", CONFIG.bind_addr(), e);
            std::process::exit(1);
        }
    };

    let pool = match models::establish_db_connection().await {
        Some(pool) => pool,
        None => {
            error!("Cannot connect to database");
            std::process::exit(1);
        }
    };
    if let Err(e) = models::migrate(&pool).await {
        error!("Failed migrating database: {}", e);
        std::process::exit(1);
    }

    let weather = match OpenWeatherClient::new(
        CONFIG.weather_api_url(),
        CONFIG.weather_api_key(),
        CONFIG.weather_timeout(),
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("Cannot build weather client: {}", e);
            std::process::exit(1);
        }
    };
    if CONFIG.weather_api_key().is_empty() {
        warn!("WEATHER_API_KEY is not set, weather requests will be rejected");
    }

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let authenticator = SessionAuthenticator::new(store.clone(), CONFIG.session_ttl());
    let observer = ConcurrentObserver::new(store.clone(), Arc::new(weather), Arc::new(authenticator));

    let (shutdown_sender, shutdown) = watch::channel(false);
    register_sigint_handler(shutdown_sender);

    let generator = SensorGenerator::new(store, CONFIG.sensor_interval()).spawn(shutdown.clone());
    if let Err(e) = rest::dispatch_server(observer, bind_addr, shutdown).await {
        error!("Cannot bind webserver to {}: {}", bind_addr, e);
        logging::shutdown();
        std::process::exit(1);
    }

    if let Err(e) = generator.await {
        error!("Sensor generator crashed: {}", e);
    }
    logging::shutdown();
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the ward air quality monitor.
//!
//! Serves per-ward analysis reports assembled from live upstream air
//! quality data, CPCB index resolution, and AI-generated narratives
//! cached in a `SQLite` database at `data/narratives.db`. A background
//! refresh loop regenerates one segment of the ward list per tick so
//! every narrative is rewritten roughly once a day.

mod handlers;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use aqi_monitor_ai::providers::{TextGenerator, create_provider_from_env};
use aqi_monitor_database::{DEFAULT_DB_PATH, DbNarrativeStore, NarrativeStore, open_db};
use aqi_monitor_geometry::WardRegistry;
use aqi_monitor_report::WardReportService;
use aqi_monitor_report::refresh::{refresh_segment, segment_bounds};
use aqi_monitor_upstream::aqicn::AqicnClient;
use aqi_monitor_upstream::openweather::OpenWeatherClient;
use tokio::time::MissedTickBehavior;

/// Number of bulk refresh slots per day; every ward's narrative is
/// regenerated once across a full cycle.
const REFRESH_SLOTS_PER_DAY: usize = 24;

/// Shared application state.
pub struct AppState {
    /// Ward report pipeline.
    pub reports: Arc<WardReportService>,
}

/// Starts the AQI monitor API server.
///
/// Loads the ward boundary registry, opens the narrative `SQLite`
/// database, constructs the upstream clients and the AI provider from
/// the environment, spawns the bulk refresh scheduler, and starts the
/// Actix-Web HTTP server. This is a regular async function — the caller
/// is responsible for providing the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind
/// or encounters a runtime error.
///
/// # Panics
///
/// Panics if the ward boundary file cannot be loaded, the narrative
/// database cannot be opened, a required API credential is missing, or
/// no AI provider is configured.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let boundaries_path = std::env::var("WARD_BOUNDARIES_PATH")
        .unwrap_or_else(|_| "data/ward_boundaries.geojson".to_string());
    log::info!("Loading ward boundaries from {boundaries_path}...");
    let registry = Arc::new(
        WardRegistry::load(Path::new(&boundaries_path)).expect("Failed to load ward boundaries"),
    );
    log::info!("Loaded {} wards", registry.len());

    let db_path =
        std::env::var("NARRATIVE_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    log::info!("Opening narrative database at {db_path}...");
    let db = open_db(Path::new(&db_path))
        .await
        .expect("Failed to open narrative database");
    let store: Arc<dyn NarrativeStore> = Arc::new(DbNarrativeStore::new(Arc::from(db)));

    let aqicn_token =
        std::env::var("AQICN_API_TOKEN").expect("AQICN_API_TOKEN environment variable must be set");
    let openweather_key = std::env::var("OPENWEATHER_API_KEY")
        .expect("OPENWEATHER_API_KEY environment variable must be set");

    let generator: Arc<dyn TextGenerator> =
        Arc::from(create_provider_from_env().expect("Failed to configure AI provider"));

    let reports = Arc::new(WardReportService::new(
        registry.clone(),
        Arc::new(AqicnClient::new(aqicn_token)),
        Arc::new(OpenWeatherClient::new(openweather_key)),
        generator.clone(),
        store.clone(),
    ));

    tokio::spawn(run_refresh_scheduler(store, generator, registry));

    let state = web::Data::new(AppState { reports });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route(
                        "/ward-analysis/{ward_id}",
                        web::get().to(handlers::ward_analysis),
                    ),
            )
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

/// Bulk refresh loop: one segment per tick, advancing through the ward
/// list so a full cycle covers every ward exactly once per day.
///
/// A failed batch is logged and skipped; the per-request path has its
/// own fallback chain and is never blocked by this loop.
async fn run_refresh_scheduler(
    store: Arc<dyn NarrativeStore>,
    generator: Arc<dyn TextGenerator>,
    registry: Arc<WardRegistry>,
) {
    let period = Duration::from_secs(24 * 3600 / REFRESH_SLOTS_PER_DAY as u64);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the first
    // refresh runs one full period after startup.
    interval.tick().await;

    let mut slot = 0;
    loop {
        interval.tick().await;

        let (start, count) = segment_bounds(slot, REFRESH_SLOTS_PER_DAY, registry.len());
        log::info!("Bulk refresh slot {slot}: wards {start}..{}", start + count);

        match refresh_segment(store.as_ref(), generator.as_ref(), &registry, start, count).await {
            Ok(stored) => {
                log::info!("Bulk refresh slot {slot}: stored {stored} of {count} narratives");
            }
            Err(e) => log::warn!("Bulk refresh slot {slot} failed: {e}"),
        }

        slot = (slot + 1) % REFRESH_SLOTS_PER_DAY;
    }
}

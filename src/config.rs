use std::env;
use std::sync::Arc;

use anyhow::Result;
use env_logger::Builder;
use lazy_static::lazy_static;
use log::{info, warn, LevelFilter};
use rocket::http::Method;
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::db;
use crate::services::gemini_service::{self, GeminiService};
use crate::services::youtube_service::YouTubeService;

/// Fallback thumbnail when a video carries none.
pub const DEFAULT_THUMBNAIL: &str = "/static/images/default_album.jpg";

lazy_static! {
    /// Comma-separated YouTube Data API keys. Placeholder values are
    /// filtered out; an empty result refuses startup.
    pub static ref YOUTUBE_API_KEYS: Vec<String> = env::var("YOUTUBE_API_KEYS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty() && !key.starts_with("your-"))
        .map(String::from)
        .collect();
    pub static ref GEMINI_API_KEY: Option<String> = env::var("GEMINI_API_KEY")
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty() && !key.starts_with("your-"));
    pub static ref DATABASE_URL: String = env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://goodmusic.db?mode=rwc".to_string());
    /// Six-field cron expression; default runs a cycle every 6 hours.
    pub static ref DISCOVERY_SCHEDULE: String =
        env::var("DISCOVERY_SCHEDULE").unwrap_or_else(|_| "0 0 */6 * * *".to_string());
    pub static ref ALLOWED_ORIGIN: String =
        env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "http://localhost:8080".to_string());
}

pub struct AppState {
    pub pool: SqlitePool,
    pub youtube: Arc<YouTubeService>,
    pub gemini: Arc<GeminiService>,
    pub scheduler: Mutex<JobScheduler>,
}

pub fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
    info!("Starting Good Music KE backend...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}

pub async fn create_app_state() -> Result<AppState> {
    let pool = db::init_database(&DATABASE_URL).await?;

    // Fails fast when no usable API key is configured.
    let youtube = Arc::new(YouTubeService::new(YOUTUBE_API_KEYS.clone())?);
    let gemini = Arc::new(GeminiService::new(GEMINI_API_KEY.clone()));

    let scheduler =
        setup_discovery_scheduler(pool.clone(), youtube.clone(), gemini.clone()).await?;

    Ok(AppState {
        pool,
        youtube,
        gemini,
        scheduler: Mutex::new(scheduler),
    })
}

pub async fn setup_discovery_scheduler(
    pool: SqlitePool,
    youtube: Arc<YouTubeService>,
    gemini: Arc<GeminiService>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let discovery_job = Job::new_async(DISCOVERY_SCHEDULE.as_str(), move |_uuid, _l| {
        let pool = pool.clone();
        let youtube = youtube.clone();
        let gemini = gemini.clone();
        Box::pin(async move {
            info!("Starting scheduled music update...");
            let report = youtube.update_music_library(&pool).await;
            if report.status == "success" {
                let enriched = gemini_service::enrich_library(&pool, &gemini).await;
                info!(
                    "Scheduled update done: {} saved, {enriched} records enriched",
                    report.videos_saved.unwrap_or(0)
                );
            } else {
                warn!(
                    "Scheduled update failed: {}",
                    report.message.unwrap_or_default()
                );
            }
        })
    })?;

    scheduler.add(discovery_job).await?;
    scheduler.start().await?;
    info!("Discovery scheduler started ({})", *DISCOVERY_SCHEDULE);

    Ok(scheduler)
}

pub fn create_cors() -> Result<rocket_cors::Cors> {
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::some_exact(&[ALLOWED_ORIGIN.as_str()]))
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Delete, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allowed_headers(AllowedHeaders::some(&["Accept", "Content-Type"]))
        .allow_credentials(true)
        .to_cors()
        .map_err(|e| anyhow::anyhow!("Failed to create CORS options: {}", e))?;

    Ok(cors)
}

use log::{error, info};
use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::config::AppState;
use crate::models::{
    AddSongRequest, BulkAddRequest, BulkAddResponse, CleanupResponse, DiscoveryReport,
    MessageResponse, StatsResponse,
};
use crate::services::{gemini_service, library_service};

/// Manual trigger for one discovery cycle. The scheduler runs the same
/// service call on its own timer.
#[post("/update")]
pub async fn update_songs(state: &State<AppState>) -> Json<DiscoveryReport> {
    let report = state.youtube.update_music_library(&state.pool).await;

    if report.status == "success" {
        let enriched = gemini_service::enrich_library(&state.pool, &state.gemini).await;
        info!("Post-update enrichment touched {enriched} records");
    }

    Json(report)
}

/// Remove songs that fell out of the rolling 30-day window.
#[post("/cleanup")]
pub async fn cleanup_old_songs(state: &State<AppState>) -> Json<CleanupResponse> {
    match library_service::cleanup_old_songs(&state.pool).await {
        Ok(deleted_count) => Json(CleanupResponse {
            success: true,
            message: format!("Removed {deleted_count} songs older than 1 month"),
            deleted_count,
        }),
        Err(e) => {
            error!("Cleanup failed: {e:#}");
            Json(CleanupResponse {
                success: false,
                message: format!("Error cleaning up old songs: {e}"),
                deleted_count: 0,
            })
        }
    }
}

#[post("/songs", data = "<request>")]
pub async fn add_song(
    state: &State<AppState>,
    request: Json<AddSongRequest>,
) -> Json<MessageResponse> {
    match library_service::add_song(&state.pool, &request).await {
        Ok(_) => Json(MessageResponse {
            success: true,
            message: format!("Song \"{}\" added successfully", request.title),
        }),
        Err(e) => {
            error!("Failed to add song '{}': {e:#}", request.title);
            Json(MessageResponse {
                success: false,
                message: format!("Error adding song: {e}"),
            })
        }
    }
}

#[post("/songs/bulk", data = "<request>")]
pub async fn bulk_add_songs(
    state: &State<AppState>,
    request: Json<BulkAddRequest>,
) -> Json<BulkAddResponse> {
    let mut added_count = 0;
    let mut errors = Vec::new();

    for (i, song) in request.songs.iter().enumerate() {
        match library_service::add_song(&state.pool, song).await {
            Ok(_) => added_count += 1,
            Err(e) => errors.push(format!("Song {}: {e}", i + 1)),
        }
    }

    let message = if errors.is_empty() {
        format!("Added {added_count} new songs successfully")
    } else {
        format!("Added {added_count} songs with {} errors", errors.len())
    };

    Json(BulkAddResponse {
        success: true,
        message,
        added_count,
        errors,
    })
}

#[get("/stats")]
pub async fn stats(state: &State<AppState>) -> Json<StatsResponse> {
    match library_service::platform_stats(&state.pool).await {
        Ok(stats) => Json(stats),
        Err(e) => {
            error!("Failed to compute stats: {e:#}");
            Json(StatsResponse {
                total_songs: 0,
                total_artists: 0,
                total_views: 0,
                new_this_week: 0,
                top_artists: vec![],
                most_viewed: vec![],
            })
        }
    }
}

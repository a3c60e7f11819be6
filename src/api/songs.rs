use log::error;
use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::config::AppState;
use crate::models::{DescriptionResponse, SongListResponse};
use crate::services::library_service;

const DEFAULT_PER_PAGE: i64 = 12;
const MAX_PER_PAGE: i64 = 50;

fn page_params(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

fn empty_page(page: i64, per_page: i64) -> SongListResponse {
    SongListResponse {
        songs: vec![],
        total: 0,
        page,
        per_page,
    }
}

#[get("/?<page>&<per_page>")]
pub async fn list_songs(
    state: &State<AppState>,
    page: Option<i64>,
    per_page: Option<i64>,
) -> Json<SongListResponse> {
    let (page, per_page) = page_params(page, per_page);
    match library_service::list_songs(&state.pool, page, per_page).await {
        Ok(response) => Json(response),
        Err(e) => {
            error!("Failed to list songs: {e:#}");
            Json(empty_page(page, per_page))
        }
    }
}

/// Songs released within the last 30 days.
#[get("/latest?<page>&<per_page>")]
pub async fn latest_songs(
    state: &State<AppState>,
    page: Option<i64>,
    per_page: Option<i64>,
) -> Json<SongListResponse> {
    let (page, per_page) = page_params(page, per_page);
    match library_service::latest_songs(&state.pool, page, per_page).await {
        Ok(response) => Json(response),
        Err(e) => {
            error!("Failed to list latest songs: {e:#}");
            Json(empty_page(page, per_page))
        }
    }
}

#[get("/trending?<page>&<per_page>")]
pub async fn trending_songs(
    state: &State<AppState>,
    page: Option<i64>,
    per_page: Option<i64>,
) -> Json<SongListResponse> {
    let (page, per_page) = page_params(page, per_page);
    match library_service::trending_songs(&state.pool, page, per_page).await {
        Ok(response) => Json(response),
        Err(e) => {
            error!("Failed to list trending songs: {e:#}");
            Json(empty_page(page, per_page))
        }
    }
}

#[get("/search?<q>&<page>&<per_page>")]
pub async fn search_songs(
    state: &State<AppState>,
    q: String,
    page: Option<i64>,
    per_page: Option<i64>,
) -> Json<SongListResponse> {
    let (page, per_page) = page_params(page, per_page);
    if q.trim().is_empty() {
        return Json(empty_page(page, per_page));
    }
    match library_service::search_songs(&state.pool, &q, page, per_page).await {
        Ok(response) => Json(response),
        Err(e) => {
            error!("Search failed for '{q}': {e:#}");
            Json(empty_page(page, per_page))
        }
    }
}

/// Generate a one-off promotional blurb for a song. Nothing is stored;
/// the UI shows it inline.
#[post("/<id>/description")]
pub async fn generate_song_description(
    state: &State<AppState>,
    id: i64,
) -> Json<DescriptionResponse> {
    let song = match library_service::song_by_id(&state.pool, id).await {
        Ok(Some(song)) => song,
        Ok(None) => {
            return Json(DescriptionResponse {
                success: false,
                description: None,
                message: "Song not found".to_string(),
            })
        }
        Err(e) => {
            error!("Failed to load song {id}: {e:#}");
            return Json(DescriptionResponse {
                success: false,
                description: None,
                message: "Error loading song".to_string(),
            });
        }
    };

    match state
        .gemini
        .generate_song_description(&song.title, &song.artist)
        .await
    {
        Ok(description) => Json(DescriptionResponse {
            success: true,
            description: Some(description),
            message: "Song description generated successfully".to_string(),
        }),
        Err(e) => {
            error!("Song description failed for {id}: {e:#}");
            Json(DescriptionResponse {
                success: false,
                description: None,
                message: "Could not generate description. Please check your Gemini API key."
                    .to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_clamp_out_of_range_values() {
        assert_eq!(page_params(None, None), (1, DEFAULT_PER_PAGE));
        assert_eq!(page_params(Some(0), Some(500)), (1, MAX_PER_PAGE));
        assert_eq!(page_params(Some(3), Some(20)), (3, 20));
    }
}

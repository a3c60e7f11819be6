use log::error;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::config::AppState;
use crate::models::{ArtistDetailResponse, ArtistWithCount, DescriptionResponse};
use crate::services::{gemini_service, library_service};

#[get("/")]
pub async fn list_artists(state: &State<AppState>) -> Json<Vec<ArtistWithCount>> {
    match library_service::list_artists(&state.pool).await {
        Ok(artists) => Json(artists),
        Err(e) => {
            error!("Failed to list artists: {e:#}");
            Json(vec![])
        }
    }
}

#[get("/<name>")]
pub async fn artist_detail(
    state: &State<AppState>,
    name: &str,
) -> Result<Json<ArtistDetailResponse>, Status> {
    match library_service::artist_detail(&state.pool, name).await {
        Ok(Some(detail)) => Ok(Json(detail)),
        Ok(None) => Err(Status::NotFound),
        Err(e) => {
            error!("Failed to load artist {name}: {e:#}");
            Err(Status::InternalServerError)
        }
    }
}

#[post("/<name>/description")]
pub async fn generate_description(
    state: &State<AppState>,
    name: &str,
) -> Json<DescriptionResponse> {
    if !state.gemini.is_available() {
        return Json(DescriptionResponse {
            success: false,
            description: None,
            message: "Could not generate description. Please check your Gemini API key."
                .to_string(),
        });
    }

    match gemini_service::describe_artist(&state.pool, &state.gemini, name).await {
        Ok(description) => Json(DescriptionResponse {
            success: true,
            description: Some(description),
            message: "Artist description generated successfully".to_string(),
        }),
        Err(e) => {
            error!("Description generation failed for {name}: {e:#}");
            Json(DescriptionResponse {
                success: false,
                description: None,
                message: format!("Error: {e}"),
            })
        }
    }
}

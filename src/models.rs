use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist_id: i64,
    pub release_date: DateTime<Utc>,
    pub youtube_url: String,
    pub youtube_id: String,
    pub thumbnail_url: Option<String>,
    pub image_url: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Song row joined with its artist name, the shape the API serves.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SongWithArtist {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub artist_id: i64,
    pub release_date: DateTime<Utc>,
    pub youtube_url: String,
    pub youtube_id: String,
    pub thumbnail_url: Option<String>,
    pub image_url: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ArtistWithCount {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub song_count: i64,
}

/// A discovered, filtered, not-yet-persisted video produced by the
/// discovery pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateVideo {
    pub video_id: String,
    pub title: String,
    pub original_title: String,
    pub channel_title: String,
    pub published_at: DateTime<Utc>,
    pub thumbnail_url: String,
    pub youtube_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub country: String,
    pub subscriber_count: u64,
}

/// Result shape of one discovery cycle, returned by the update trigger
/// and logged by the scheduler.
#[derive(Debug, Serialize)]
pub struct DiscoveryReport {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos_found: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos_saved: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DiscoveryReport {
    pub fn success(videos_found: usize, videos_saved: u64, duration_seconds: f64) -> Self {
        DiscoveryReport {
            status: "success".to_string(),
            videos_found: Some(videos_found),
            videos_saved: Some(videos_saved),
            duration_seconds: Some((duration_seconds * 100.0).round() / 100.0),
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        DiscoveryReport {
            status: "error".to_string(),
            videos_found: None,
            videos_saved: None,
            duration_seconds: None,
            message: Some(message),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SongListResponse {
    pub songs: Vec<SongWithArtist>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Serialize)]
pub struct ArtistDetailResponse {
    pub artist: Artist,
    pub songs: Vec<Song>,
}

#[derive(Debug, Serialize)]
pub struct DescriptionResponse {
    pub success: bool,
    pub description: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AddSongRequest {
    pub title: String,
    pub artist: String,
    pub youtube_url: String,
    /// Release date as `YYYY-MM-DD`, stored normalized to UTC midnight.
    pub release_date: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkAddRequest {
    pub songs: Vec<AddSongRequest>,
}

#[derive(Debug, Serialize)]
pub struct BulkAddResponse {
    pub success: bool,
    pub message: String,
    pub added_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
    pub deleted_count: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_songs: i64,
    pub total_artists: i64,
    pub total_views: i64,
    pub new_this_week: i64,
    pub top_artists: Vec<ArtistWithCount>,
    pub most_viewed: Vec<SongWithArtist>,
}

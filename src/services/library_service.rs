use anyhow::{anyhow, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use log::info;
use sqlx::{SqliteConnection, SqlitePool};

use crate::models::{
    AddSongRequest, Artist, ArtistDetailResponse, ArtistWithCount, Song, SongListResponse,
    SongWithArtist, StatsResponse,
};
use crate::utils;

const RECENCY_WINDOW_DAYS: i64 = 30;

const SONG_COLUMNS: &str = r#"
    s.id, s.title, a.name AS artist, s.artist_id, s.release_date,
    s.youtube_url, s.youtube_id, s.thumbnail_url, s.image_url,
    s.view_count, s.like_count
"#;

/// Look an artist up by name, creating the row when missing. Shared by the
/// discovery upsert writer and the manual-add endpoints.
pub async fn find_or_create_artist(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM artists WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let now = Utc::now();
    let result = sqlx::query("INSERT INTO artists (name, created_at, updated_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn list_songs(pool: &SqlitePool, page: i64, per_page: i64) -> Result<SongListResponse> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
        .fetch_one(pool)
        .await?;

    let songs = sqlx::query_as::<_, SongWithArtist>(&format!(
        "SELECT {SONG_COLUMNS} FROM songs s JOIN artists a ON a.id = s.artist_id \
         ORDER BY s.release_date DESC LIMIT ? OFFSET ?"
    ))
    .bind(per_page)
    .bind((page - 1).max(0) * per_page)
    .fetch_all(pool)
    .await?;

    Ok(SongListResponse {
        songs,
        total,
        page,
        per_page,
    })
}

/// Songs released within the rolling 30-day window, newest first.
pub async fn latest_songs(pool: &SqlitePool, page: i64, per_page: i64) -> Result<SongListResponse> {
    let cutoff = Utc::now() - chrono::Duration::days(RECENCY_WINDOW_DAYS);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE release_date >= ?")
        .bind(cutoff)
        .fetch_one(pool)
        .await?;

    let songs = sqlx::query_as::<_, SongWithArtist>(&format!(
        "SELECT {SONG_COLUMNS} FROM songs s JOIN artists a ON a.id = s.artist_id \
         WHERE s.release_date >= ? ORDER BY s.release_date DESC LIMIT ? OFFSET ?"
    ))
    .bind(cutoff)
    .bind(per_page)
    .bind((page - 1).max(0) * per_page)
    .fetch_all(pool)
    .await?;

    Ok(SongListResponse {
        songs,
        total,
        page,
        per_page,
    })
}

pub async fn trending_songs(
    pool: &SqlitePool,
    page: i64,
    per_page: i64,
) -> Result<SongListResponse> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
        .fetch_one(pool)
        .await?;

    let songs = sqlx::query_as::<_, SongWithArtist>(&format!(
        "SELECT {SONG_COLUMNS} FROM songs s JOIN artists a ON a.id = s.artist_id \
         ORDER BY s.view_count DESC LIMIT ? OFFSET ?"
    ))
    .bind(per_page)
    .bind((page - 1).max(0) * per_page)
    .fetch_all(pool)
    .await?;

    Ok(SongListResponse {
        songs,
        total,
        page,
        per_page,
    })
}

/// Case-insensitive title/artist substring search.
pub async fn search_songs(
    pool: &SqlitePool,
    query: &str,
    page: i64,
    per_page: i64,
) -> Result<SongListResponse> {
    let pattern = format!("%{}%", query.trim());

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM songs s JOIN artists a ON a.id = s.artist_id \
         WHERE s.title LIKE ? OR a.name LIKE ?",
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    let songs = sqlx::query_as::<_, SongWithArtist>(&format!(
        "SELECT {SONG_COLUMNS} FROM songs s JOIN artists a ON a.id = s.artist_id \
         WHERE s.title LIKE ? OR a.name LIKE ? \
         ORDER BY s.release_date DESC LIMIT ? OFFSET ?"
    ))
    .bind(&pattern)
    .bind(&pattern)
    .bind(per_page)
    .bind((page - 1).max(0) * per_page)
    .fetch_all(pool)
    .await?;

    Ok(SongListResponse {
        songs,
        total,
        page,
        per_page,
    })
}

pub async fn list_artists(pool: &SqlitePool) -> Result<Vec<ArtistWithCount>> {
    let artists = sqlx::query_as::<_, ArtistWithCount>(
        "SELECT a.id, a.name, a.description, COUNT(s.id) AS song_count \
         FROM artists a LEFT JOIN songs s ON s.artist_id = a.id \
         GROUP BY a.id ORDER BY a.name",
    )
    .fetch_all(pool)
    .await?;
    Ok(artists)
}

pub async fn artist_detail(pool: &SqlitePool, name: &str) -> Result<Option<ArtistDetailResponse>> {
    let artist = sqlx::query_as::<_, Artist>("SELECT * FROM artists WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    let artist = match artist {
        Some(artist) => artist,
        None => return Ok(None),
    };

    let songs =
        sqlx::query_as::<_, Song>("SELECT * FROM songs WHERE artist_id = ? ORDER BY release_date DESC")
            .bind(artist.id)
            .fetch_all(pool)
            .await?;

    Ok(Some(ArtistDetailResponse { artist, songs }))
}

pub async fn song_by_id(pool: &SqlitePool, id: i64) -> Result<Option<SongWithArtist>> {
    let song = sqlx::query_as::<_, SongWithArtist>(&format!(
        "SELECT {SONG_COLUMNS} FROM songs s JOIN artists a ON a.id = s.artist_id WHERE s.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(song)
}

pub async fn platform_stats(pool: &SqlitePool) -> Result<StatsResponse> {
    let total_songs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
        .fetch_one(pool)
        .await?;
    let total_artists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artists")
        .fetch_one(pool)
        .await?;
    let total_views: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(view_count), 0) FROM songs")
        .fetch_one(pool)
        .await?;

    let week_ago = Utc::now() - chrono::Duration::days(7);
    let new_this_week: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE release_date >= ?")
        .bind(week_ago)
        .fetch_one(pool)
        .await?;

    let top_artists = sqlx::query_as::<_, ArtistWithCount>(
        "SELECT a.id, a.name, a.description, COUNT(s.id) AS song_count \
         FROM artists a JOIN songs s ON s.artist_id = a.id \
         GROUP BY a.id ORDER BY song_count DESC LIMIT 10",
    )
    .fetch_all(pool)
    .await?;

    let most_viewed = sqlx::query_as::<_, SongWithArtist>(&format!(
        "SELECT {SONG_COLUMNS} FROM songs s JOIN artists a ON a.id = s.artist_id \
         ORDER BY s.view_count DESC LIMIT 10"
    ))
    .fetch_all(pool)
    .await?;

    Ok(StatsResponse {
        total_songs,
        total_artists,
        total_views,
        new_this_week,
        top_artists,
        most_viewed,
    })
}

/// Delete songs older than the rolling window, returning how many went.
pub async fn cleanup_old_songs(pool: &SqlitePool) -> Result<u64> {
    let cutoff = Utc::now() - chrono::Duration::days(RECENCY_WINDOW_DAYS);
    let result = sqlx::query("DELETE FROM songs WHERE release_date < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    let deleted = result.rows_affected();
    info!("Removed {deleted} songs older than {RECENCY_WINDOW_DAYS} days");
    Ok(deleted)
}

/// Manual song insertion from the add-song form. Rejects URLs the id
/// cannot be extracted from and already-known songs.
pub async fn add_song(pool: &SqlitePool, request: &AddSongRequest) -> Result<String> {
    let youtube_id = utils::extract_youtube_video_id(&request.youtube_url)
        .ok_or_else(|| anyhow!("Invalid YouTube URL"))?;

    let release_date = NaiveDate::parse_from_str(&request.release_date, "%Y-%m-%d")
        .map_err(|_| anyhow!("Invalid release date, expected YYYY-MM-DD"))?;
    let release_date = Utc
        .from_utc_datetime(&release_date.and_hms_opt(0, 0, 0).unwrap());

    let mut tx = pool.begin().await?;

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM songs WHERE youtube_id = ?")
        .bind(&youtube_id)
        .fetch_optional(&mut *tx)
        .await?;
    if existing.is_some() {
        return Err(anyhow!("Song already exists in database"));
    }

    let artist_id = find_or_create_artist(&mut tx, request.artist.trim()).await?;

    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO songs
            (title, artist_id, release_date, youtube_url, youtube_id,
             thumbnail_url, view_count, like_count, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
        "#,
    )
    .bind(request.title.trim())
    .bind(artist_id)
    .bind(release_date)
    .bind(&request.youtube_url)
    .bind(&youtube_id)
    .bind(utils::default_thumbnail_for(&youtube_id))
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    info!("Added song '{}' by {}", request.title, request.artist);
    Ok(youtube_id)
}

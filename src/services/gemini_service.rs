use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{info, warn};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::config::DEFAULT_THUMBNAIL;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-1.5-flash";
const GEMINI_TIMEOUT: Duration = Duration::from_secs(30);

/// How many artists one enrichment pass will describe at most. Keeps a
/// post-discovery pass from burning the whole text quota.
const ENRICH_BATCH_LIMIT: i64 = 5;

/// Thin client for the Generative Language API. Constructed once at
/// startup; an absent key just makes the service report unavailable and
/// every caller skips enrichment.
pub struct GeminiService {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl GeminiService {
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_some() {
            info!("Gemini API configured");
        } else {
            info!("No Gemini API key provided, AI enrichment disabled");
        }
        GeminiService {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn generate_artist_description(
        &self,
        name: &str,
        song_titles: &[String],
    ) -> Result<String> {
        let context = if song_titles.is_empty() {
            String::new()
        } else {
            format!(" Known songs: {}.", song_titles.join(", "))
        };
        let prompt = format!(
            "Write a short two-sentence biography of the Kenyan musician \
             \"{name}\".{context} Plain prose, no markdown, no disclaimers."
        );
        self.generate_text(&prompt).await
    }

    pub async fn generate_song_description(&self, title: &str, artist: &str) -> Result<String> {
        let prompt = format!(
            "Write one enthusiastic sentence introducing the Kenyan song \
             \"{title}\" by {artist}. Plain prose, no markdown."
        );
        self.generate_text(&prompt).await
    }

    /// Cover art reference for a song without one. Actual image synthesis
    /// is out of scope; the default album asset stands in.
    pub fn cover_art_reference(&self) -> &'static str {
        DEFAULT_THUMBNAIL
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Gemini API key not configured"))?;

        let url = format!("{GEMINI_API_BASE}/models/{GEMINI_MODEL}:generateContent?key={api_key}");
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(GEMINI_TIMEOUT)
            .send()
            .await
            .context("Gemini request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("Gemini API error: {}", response.status()));
        }

        let payload: Value = response.json().await?;
        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow!("Gemini response carried no text"))?;

        Ok(text.trim().to_string())
    }
}

/// Best-effort enrichment pass run after a discovery cycle: describe a
/// few artists that still lack a biography and stamp the default cover
/// reference onto songs without one. Failures are logged, never fatal.
pub async fn enrich_library(pool: &SqlitePool, gemini: &GeminiService) -> u64 {
    let mut enriched = 0u64;

    match stamp_default_covers(pool, gemini).await {
        Ok(count) => enriched += count,
        Err(e) => warn!("Cover stamping failed: {e:#}"),
    }

    if !gemini.is_available() {
        return enriched;
    }

    let artists: Vec<(i64, String)> = match sqlx::query_as(
        "SELECT id, name FROM artists WHERE description IS NULL ORDER BY created_at DESC LIMIT ?",
    )
    .bind(ENRICH_BATCH_LIMIT)
    .fetch_all(pool)
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Could not list artists for enrichment: {e:#}");
            return enriched;
        }
    };

    for (artist_id, name) in artists {
        let song_titles: Vec<String> = sqlx::query_scalar(
            "SELECT title FROM songs WHERE artist_id = ? ORDER BY release_date DESC LIMIT 5",
        )
        .bind(artist_id)
        .fetch_all(pool)
        .await
        .unwrap_or_default();

        match gemini.generate_artist_description(&name, &song_titles).await {
            Ok(description) => {
                let updated = sqlx::query(
                    "UPDATE artists SET description = ?, updated_at = ? WHERE id = ?",
                )
                .bind(&description)
                .bind(Utc::now())
                .bind(artist_id)
                .execute(pool)
                .await;
                match updated {
                    Ok(_) => {
                        info!("Generated AI description for {name}");
                        enriched += 1;
                    }
                    Err(e) => warn!("Could not store description for {name}: {e:#}"),
                }
            }
            Err(e) => warn!("Description generation failed for {name}: {e:#}"),
        }
    }

    enriched
}

/// Generate and store a biography for one artist, on demand from the API.
pub async fn describe_artist(
    pool: &SqlitePool,
    gemini: &GeminiService,
    name: &str,
) -> Result<String> {
    let artist_id: i64 = sqlx::query_scalar("SELECT id FROM artists WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow!("Artist not found"))?;

    let song_titles: Vec<String> = sqlx::query_scalar(
        "SELECT title FROM songs WHERE artist_id = ? ORDER BY release_date DESC LIMIT 5",
    )
    .bind(artist_id)
    .fetch_all(pool)
    .await?;

    let description = gemini.generate_artist_description(name, &song_titles).await?;

    sqlx::query("UPDATE artists SET description = ?, updated_at = ? WHERE id = ?")
        .bind(&description)
        .bind(Utc::now())
        .bind(artist_id)
        .execute(pool)
        .await?;

    info!("Generated AI description for {name}");
    Ok(description)
}

async fn stamp_default_covers(pool: &SqlitePool, gemini: &GeminiService) -> Result<u64> {
    let result = sqlx::query("UPDATE songs SET image_url = ? WHERE image_url IS NULL")
        .bind(gemini.cover_art_reference())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

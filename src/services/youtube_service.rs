use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use log::{error, info, warn};
use serde_json::Value;
use sqlx::{Acquire, SqlitePool, Transaction};
use tokio::sync::RwLock;

use crate::config::DEFAULT_THUMBNAIL;
use crate::models::{CandidateVideo, ChannelInfo, DiscoveryReport};
use crate::services::{library_service, title_service};
use crate::utils;

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const MUSIC_CATEGORY_ID: &str = "10";
const REGION_CODE: &str = "KE";
const MAX_RESULTS_PER_QUERY: &str = "50";

const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const CHANNEL_TIMEOUT: Duration = Duration::from_secs(8);
const API_CALL_DELAY: Duration = Duration::from_secs(1);

const QUERY_WORKERS: usize = 3;
const VIDEO_BATCH_SIZE: usize = 5;
const RECENCY_WINDOW_DAYS: i64 = 30;
const MAX_SELECTION: usize = 50;
const MIN_SUBSCRIBERS: u64 = 10_000;
const CHANNEL_CACHE_TTL_HOURS: i64 = 24;

/// Cheap title check run before any channel lookup.
const QUICK_EXCLUDE: &[&str] = &[
    "reaction",
    "mix",
    "dj",
    "interview",
    "podcast",
    "compilation",
    "lyrics",
    "shorts",
];

const EXCLUDE_KEYWORDS: &[&str] = &[
    "reaction",
    "mix",
    "dj",
    "interview",
    "podcast",
    "compilation",
    "lyrics",
    "cover",
    "behind the scenes",
    "challenge",
    "dance",
    "shorts",
];

const INCLUDE_KEYWORDS: &[&str] = &[
    "official",
    "music video",
    "official video",
    "audio",
    "single",
    "release",
];

/// Defensive second pass applied after the per-query results are merged.
const REFILTER_EXCLUDE: &[&str] = &["mix", "cover", "reaction"];

pub const SEARCH_QUERIES: &[&str] = &[
    "New Kenyan official music video 2025",
    "Latest Kenyan songs 2025",
    "Kenyan AfroPop official music video",
    "Kenya Bongo and Afrobeat songs 2025",
    "Nairobi music release this week",
    "Kenya trending music videos 2025",
    "Top Kenyan hits 2025",
    "Kenyan RnB official video 2025",
    "Kenya Hip Hop official release 2025",
    "New gengetone song 2025",
    "Nyashinski new song 2025",
    "Bensoul latest song 2025",
    "Buruklyn Boyz new track 2025",
    "Nikita Kering new video 2025",
    "Khaligraph Jones official video 2025",
    "Otile Brown latest song 2025",
    "Savara or Bien new song 2025",
    "Xenia Manasseh",
    "Okello Max",
    "Prince Indah",
    "Watendawili music",
    "Kenyan official gospel song 2025",
    "Kenya latest audio release 2025",
    "Kenyan music video premiere 2025",
];

/// Ordered API credential set with a circular rotation pointer.
///
/// The pointer is atomic so the concurrent query tasks can share one
/// rotator without coordination.
pub struct KeyRotator {
    keys: Vec<String>,
    index: AtomicUsize,
}

impl KeyRotator {
    pub fn new(keys: Vec<String>) -> Result<Self> {
        ensure!(
            !keys.is_empty(),
            "no YouTube API keys configured; set YOUTUBE_API_KEYS"
        );
        Ok(KeyRotator {
            keys,
            index: AtomicUsize::new(0),
        })
    }

    pub fn current(&self) -> &str {
        &self.keys[self.index.load(Ordering::Relaxed) % self.keys.len()]
    }

    pub fn rotate(&self) -> &str {
        let next = self.index.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        &self.keys[next % self.keys.len()]
    }
}

struct CacheEntry {
    info: ChannelInfo,
    fetched_at: DateTime<Utc>,
}

/// Time-bounded channel info cache. Unbounded growth is fine here: the
/// channel cardinality of one run is tiny compared to its duration.
pub struct ChannelCache {
    ttl: chrono::Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ChannelCache {
    pub fn new(ttl: chrono::Duration) -> Self {
        ChannelCache {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached value when it is still fresh at `now`, otherwise
    /// run `fetch`. A successful fetch is stored stamped `now`; a failed
    /// one is not cached, so the next call retries.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        channel_id: &str,
        now: DateTime<Utc>,
        fetch: F,
    ) -> Option<ChannelInfo>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<ChannelInfo>>,
    {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(channel_id) {
                if now - entry.fetched_at < self.ttl {
                    return Some(entry.info.clone());
                }
            }
        }

        let info = fetch().await?;
        // concurrent refreshes race last-writer-wins
        let mut entries = self.entries.write().await;
        entries.insert(
            channel_id.to_string(),
            CacheEntry {
                info: info.clone(),
                fetched_at: now,
            },
        );
        Some(info)
    }
}

/// Quick title check to avoid a channel lookup for obvious non-candidates.
/// Returns true when the item is worth the API call.
pub fn quick_pre_filter(title: &str) -> bool {
    let title_lower = title.to_lowercase();
    !QUICK_EXCLUDE.iter().any(|kw| title_lower.contains(kw))
}

/// Rule-based admissibility decision for one candidate. Short-circuits in
/// order: recency, exclusion vocabulary, channel availability, verified
/// Kenyan channel with enough subscribers, inclusion vocabulary, official
/// channel name.
pub fn is_admissible(
    title: &str,
    channel_title: &str,
    channel_info: Option<&ChannelInfo>,
    published_at: DateTime<Utc>,
    cutoff: DateTime<Utc>,
) -> bool {
    if published_at < cutoff {
        return false;
    }

    let title_lower = title.to_lowercase();
    if EXCLUDE_KEYWORDS.iter().any(|kw| title_lower.contains(kw)) {
        return false;
    }

    let info = match channel_info {
        Some(info) => info,
        None => return false,
    };
    if info.country != REGION_CODE || info.subscriber_count < MIN_SUBSCRIBERS {
        return false;
    }

    if INCLUDE_KEYWORDS.iter().any(|kw| title_lower.contains(kw)) {
        return true;
    }
    channel_title.to_lowercase().contains("official")
}

/// Drop duplicate video ids, keeping the first occurrence encountered.
pub fn remove_duplicates(videos: Vec<CandidateVideo>) -> Vec<CandidateVideo> {
    let mut seen = HashSet::new();
    videos
        .into_iter()
        .filter(|v| seen.insert(v.video_id.clone()))
        .collect()
}

/// Re-apply the recency cutoff and a light keyword exclusion, then sort
/// newest first.
pub fn refilter_recent(videos: Vec<CandidateVideo>, cutoff: DateTime<Utc>) -> Vec<CandidateVideo> {
    let mut kept: Vec<CandidateVideo> = videos
        .into_iter()
        .filter(|v| {
            let title_lower = v.title.to_lowercase();
            v.published_at >= cutoff
                && !REFILTER_EXCLUDE.iter().any(|kw| title_lower.contains(kw))
        })
        .collect();
    kept.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    kept
}

pub struct YouTubeService {
    client: reqwest::Client,
    rotator: KeyRotator,
    channel_cache: ChannelCache,
}

impl YouTubeService {
    pub fn new(api_keys: Vec<String>) -> Result<Self> {
        Ok(YouTubeService {
            client: reqwest::Client::new(),
            rotator: KeyRotator::new(api_keys)?,
            channel_cache: ChannelCache::new(chrono::Duration::hours(CHANNEL_CACHE_TTL_HOURS)),
        })
    }

    /// One full discovery cycle: search, save, report. Never panics; the
    /// report carries the error shape when persistence fails.
    pub async fn update_music_library(&self, pool: &SqlitePool) -> DiscoveryReport {
        info!("Starting Kenyan music library update...");
        let started = Instant::now();

        let videos = self.search_kenyan_music().await;

        match save_videos(pool, &videos).await {
            Ok(saved) => {
                let duration = started.elapsed().as_secs_f64();
                info!(
                    "Update completed in {duration:.2}s: {} found, {saved} saved",
                    videos.len()
                );
                DiscoveryReport::success(videos.len(), saved, duration)
            }
            Err(e) => {
                error!("Update failed: {e:#}");
                DiscoveryReport::error(e.to_string())
            }
        }
    }

    /// Search YouTube for verified Kenyan music uploaded in the last 30
    /// days. Queries run through a bounded pool; one query's failure is
    /// logged and dropped without touching its siblings.
    pub async fn search_kenyan_music(&self) -> Vec<CandidateVideo> {
        let cutoff = Utc::now() - chrono::Duration::days(RECENCY_WINDOW_DAYS);
        info!(
            "Searching for Kenyan music published after {}",
            cutoff.format("%Y-%m-%dT%H:%M:%SZ")
        );

        let mut queries: Vec<String> = Vec::with_capacity(SEARCH_QUERIES.len());
        for &q in SEARCH_QUERIES {
            queries.push(q.to_string());
        }
        let outcomes: Vec<(String, Result<Vec<CandidateVideo>>)> =
            stream::iter(queries)
                .map(|query| async move {
                    let result = self.search_query(&query, cutoff).await;
                    (query, result)
                })
                .buffer_unordered(QUERY_WORKERS)
                .collect()
                .await;

        let mut all_videos = Vec::new();
        for (query, outcome) in outcomes {
            match outcome {
                Ok(videos) => {
                    info!("Query '{query}': {} results", videos.len());
                    all_videos.extend(videos);
                }
                Err(e) => warn!("Query '{query}' failed: {e:#}"),
            }
        }

        let unique = remove_duplicates(all_videos);
        let mut filtered = refilter_recent(unique, cutoff);
        filtered.truncate(MAX_SELECTION);

        info!("Final selection: {} new Kenyan songs", filtered.len());
        filtered
    }

    /// One paginated search call for one query string. A non-success
    /// status rotates the key and yields an empty batch; the query is
    /// simply dropped this cycle.
    async fn search_query(
        &self,
        query: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<CandidateVideo>> {
        let api_key = self.rotator.current().to_string();
        let published_after = cutoff.format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let response = self
            .client
            .get(format!("{YOUTUBE_API_BASE}/search"))
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("videoCategoryId", MUSIC_CATEGORY_ID),
                ("regionCode", REGION_CODE),
                ("maxResults", MAX_RESULTS_PER_QUERY),
                ("order", "date"),
                ("publishedAfter", published_after.as_str()),
                ("key", api_key.as_str()),
            ])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            warn!("YouTube API error ({status}) for '{query}': {snippet}");
            self.rotator.rotate();
            return Ok(Vec::new());
        }

        let payload: Value = response.json().await?;
        let items = payload["items"].as_array().cloned().unwrap_or_default();

        let mut videos = Vec::new();
        for batch in items.chunks(VIDEO_BATCH_SIZE) {
            let processed =
                join_all(batch.iter().map(|item| self.process_video_item(item, cutoff))).await;
            videos.extend(processed.into_iter().flatten());
        }

        self.rotator.rotate();
        tokio::time::sleep(API_CALL_DELAY).await;

        Ok(videos)
    }

    /// Turn one raw search result into a candidate, or nothing. Malformed
    /// items and filtered-out content are skips, never failures.
    async fn process_video_item(
        &self,
        item: &Value,
        cutoff: DateTime<Utc>,
    ) -> Option<CandidateVideo> {
        let video_id = item["id"]["videoId"].as_str()?;
        let snippet = &item["snippet"];

        let published_at = utils::parse_published_at(snippet["publishedAt"].as_str()?)?;
        if published_at < cutoff {
            return None;
        }

        let title = snippet["title"].as_str().unwrap_or("");
        let channel_title = snippet["channelTitle"].as_str().unwrap_or("");
        let channel_id = snippet["channelId"].as_str()?;

        if !quick_pre_filter(title) {
            return None;
        }

        let channel_info = self
            .channel_cache
            .get_or_fetch(channel_id, Utc::now(), || self.fetch_channel_info(channel_id))
            .await;

        if !is_admissible(title, channel_title, channel_info.as_ref(), published_at, cutoff) {
            return None;
        }

        let thumbnail_url = snippet["thumbnails"]["high"]["url"]
            .as_str()
            .unwrap_or(DEFAULT_THUMBNAIL)
            .to_string();

        Some(CandidateVideo {
            video_id: video_id.to_string(),
            title: title_service::normalize_title(title, channel_title),
            original_title: title.to_string(),
            channel_title: channel_title.to_string(),
            published_at,
            thumbnail_url,
            youtube_url: utils::watch_url(video_id),
        })
    }

    /// Remote channel lookup. Every failure mode maps to `None` so the
    /// caller treats it as a plain cache miss.
    async fn fetch_channel_info(&self, channel_id: &str) -> Option<ChannelInfo> {
        let api_key = self.rotator.current().to_string();

        let response = self
            .client
            .get(format!("{YOUTUBE_API_BASE}/channels"))
            .query(&[
                ("part", "snippet,statistics"),
                ("id", channel_id),
                ("key", api_key.as_str()),
            ])
            .timeout(CHANNEL_TIMEOUT)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("Channel info request failed for {channel_id}: {e}");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(
                "Channel info error ({}) for {channel_id}",
                response.status()
            );
            return None;
        }

        let payload: Value = response.json().await.ok()?;
        let item = &payload["items"][0];
        if item.is_null() {
            return None;
        }

        let country = item["snippet"]["country"].as_str().unwrap_or("").to_string();
        let subscriber_count = item["statistics"]["subscriberCount"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        Some(ChannelInfo {
            country,
            subscriber_count,
        })
    }
}

/// Persist candidates. One outer transaction with a savepoint per item:
/// an item's failure rolls back only that item, a commit failure rolls
/// back the whole batch and reports zero saved. Safe to re-run with
/// overlapping candidate sets.
pub async fn save_videos(pool: &SqlitePool, videos: &[CandidateVideo]) -> Result<u64> {
    if videos.is_empty() {
        info!("No new videos to save");
        return Ok(0);
    }

    let cutoff = Utc::now() - chrono::Duration::days(RECENCY_WINDOW_DAYS);
    let mut tx = pool.begin().await?;
    let mut saved = 0u64;

    for video in videos {
        if video.published_at < cutoff {
            continue;
        }
        match insert_candidate(&mut tx, video).await {
            Ok(true) => {
                saved += 1;
                let days_ago = (Utc::now() - video.published_at).num_days();
                info!("Saved: {} ({days_ago} days ago)", video.title);
            }
            Ok(false) => {}
            Err(e) => error!("Error saving video {}: {e:#}", video.video_id),
        }
    }

    if let Err(e) = tx.commit().await {
        error!("Commit error: {e:#}");
        return Ok(0);
    }

    info!("Saved {saved} new Kenyan songs");
    Ok(saved)
}

/// Returns Ok(true) when a new song row was staged, Ok(false) for an
/// idempotent skip. Runs inside a savepoint so an error leaves the outer
/// transaction clean.
async fn insert_candidate(
    tx: &mut Transaction<'_, sqlx::Sqlite>,
    video: &CandidateVideo,
) -> Result<bool> {
    let mut sp = tx.begin().await?;

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM songs WHERE youtube_id = ?")
        .bind(&video.video_id)
        .fetch_optional(&mut *sp)
        .await?;
    if existing.is_some() {
        sp.commit().await?;
        return Ok(false);
    }

    let artist_id = library_service::find_or_create_artist(&mut sp, &video.channel_title).await?;

    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO songs
            (title, artist_id, release_date, youtube_url, youtube_id,
             thumbnail_url, view_count, like_count, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
        "#,
    )
    .bind(&video.title)
    .bind(artist_id)
    .bind(video.published_at)
    .bind(&video.youtube_url)
    .bind(&video.video_id)
    .bind(&video.thumbnail_url)
    .bind(now)
    .bind(now)
    .execute(&mut *sp)
    .await?;

    sp.commit().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use std::sync::atomic::AtomicU32;

    fn candidate(video_id: &str, title: &str, days_ago: i64) -> CandidateVideo {
        let published_at = Utc::now() - chrono::Duration::days(days_ago);
        CandidateVideo {
            video_id: video_id.to_string(),
            title: title.to_string(),
            original_title: title.to_string(),
            channel_title: "Sauti Sol".to_string(),
            published_at,
            thumbnail_url: DEFAULT_THUMBNAIL.to_string(),
            youtube_url: utils::watch_url(video_id),
        }
    }

    fn kenyan_channel(subs: u64) -> ChannelInfo {
        ChannelInfo {
            country: "KE".to_string(),
            subscriber_count: subs,
        }
    }

    #[test]
    fn rotator_rejects_empty_key_set() {
        assert!(KeyRotator::new(Vec::new()).is_err());
    }

    #[test]
    fn rotator_cycles_through_keys() {
        let rotator =
            KeyRotator::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]).unwrap();
        assert_eq!(rotator.current(), "a");
        assert_eq!(rotator.rotate(), "b");
        assert_eq!(rotator.rotate(), "c");
        assert_eq!(rotator.rotate(), "a");
        assert_eq!(rotator.current(), "a");
    }

    #[test]
    fn quick_pre_filter_drops_obvious_non_music() {
        assert!(!quick_pre_filter("DJ Mix 2025 Reaction"));
        assert!(!quick_pre_filter("Studio Interview with Bien"));
        assert!(quick_pre_filter("Amazing Song"));
    }

    #[test]
    fn admissibility_accepts_official_kenyan_release() {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::days(30);
        assert!(is_admissible(
            "Amazing Song (Official Music Video)",
            "Artist Official",
            Some(&kenyan_channel(50_000)),
            now - chrono::Duration::days(2),
            cutoff,
        ));
    }

    #[test]
    fn admissibility_rejects_small_channels() {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::days(30);
        assert!(!is_admissible(
            "Amazing Song (Official Music Video)",
            "Artist Official",
            Some(&kenyan_channel(500)),
            now - chrono::Duration::days(2),
            cutoff,
        ));
    }

    #[test]
    fn admissibility_exclusion_short_circuits_before_channel_checks() {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::days(30);
        // channel info irrelevant: the title alone rejects it
        assert!(!is_admissible(
            "DJ Mix 2025 Reaction",
            "Artist Official",
            None,
            now - chrono::Duration::days(1),
            cutoff,
        ));
        assert!(!is_admissible(
            "DJ Mix 2025 Reaction",
            "Artist Official",
            Some(&kenyan_channel(1_000_000)),
            now - chrono::Duration::days(1),
            cutoff,
        ));
    }

    #[test]
    fn admissibility_rejects_stale_and_foreign_and_unknown_channels() {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::days(30);
        // too old
        assert!(!is_admissible(
            "Amazing Song (Official Music Video)",
            "Artist",
            Some(&kenyan_channel(50_000)),
            now - chrono::Duration::days(45),
            cutoff,
        ));
        // no channel info
        assert!(!is_admissible(
            "Amazing Song (Official Music Video)",
            "Artist",
            None,
            now - chrono::Duration::days(2),
            cutoff,
        ));
        // not a Kenyan channel
        let foreign = ChannelInfo {
            country: "US".to_string(),
            subscriber_count: 50_000,
        };
        assert!(!is_admissible(
            "Amazing Song (Official Music Video)",
            "Artist",
            Some(&foreign),
            now - chrono::Duration::days(2),
            cutoff,
        ));
    }

    #[test]
    fn admissibility_official_channel_name_rescues_plain_titles() {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::days(30);
        let recent = now - chrono::Duration::days(3);
        // no inclusion keyword in the title, channel name decides
        assert!(is_admissible(
            "Zimenishika",
            "Bahati Official",
            Some(&kenyan_channel(200_000)),
            recent,
            cutoff,
        ));
        assert!(!is_admissible(
            "Zimenishika",
            "Bahati",
            Some(&kenyan_channel(200_000)),
            recent,
            cutoff,
        ));
    }

    #[test]
    fn dedup_keeps_first_occurrence_per_id() {
        let videos = vec![
            candidate("id-1", "First Title", 1),
            candidate("id-2", "Other Song", 2),
            candidate("id-1", "Second Title", 3),
        ];
        let unique = remove_duplicates(videos);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].video_id, "id-1");
        assert_eq!(unique[0].title, "First Title");
    }

    #[test]
    fn refilter_drops_stale_and_excluded_then_sorts_newest_first() {
        let cutoff = Utc::now() - chrono::Duration::days(30);
        let videos = vec![
            candidate("a", "Fresh Song", 10),
            candidate("b", "Old Song", 40),
            candidate("c", "Amapiano Mix", 1),
            candidate("d", "Newest Song", 2),
        ];
        let kept = refilter_recent(videos, cutoff);
        let ids: Vec<&str> = kept.iter().map(|v| v.video_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a"]);
    }

    #[tokio::test]
    async fn cache_serves_fresh_entries_without_refetching() {
        let cache = ChannelCache::new(chrono::Duration::hours(24));
        let calls = AtomicU32::new(0);
        let t0 = Utc::now();

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(kenyan_channel(20_000))
        };

        let first = cache.get_or_fetch("UC123", t0, fetch).await;
        assert_eq!(first, Some(kenyan_channel(20_000)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // within the freshness window: no second remote call
        let second = cache
            .get_or_fetch("UC123", t0 + chrono::Duration::hours(23), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Some(kenyan_channel(99))
            })
            .await;
        assert_eq!(second, Some(kenyan_channel(20_000)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_refetches_past_the_freshness_window() {
        let cache = ChannelCache::new(chrono::Duration::hours(24));
        let calls = AtomicU32::new(0);
        let t0 = Utc::now();

        cache
            .get_or_fetch("UC123", t0, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Some(kenyan_channel(20_000))
            })
            .await;

        let later = t0 + chrono::Duration::hours(25);
        let refreshed = cache
            .get_or_fetch("UC123", later, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Some(kenyan_channel(30_000))
            })
            .await;
        assert_eq!(refreshed, Some(kenyan_channel(30_000)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_does_not_store_failed_lookups() {
        let cache = ChannelCache::new(chrono::Duration::hours(24));
        let calls = AtomicU32::new(0);
        let t0 = Utc::now();

        let miss = cache
            .get_or_fetch("UC123", t0, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                None
            })
            .await;
        assert_eq!(miss, None);

        // the failure was not cached, so the next call retries
        let hit = cache
            .get_or_fetch("UC123", t0, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Some(kenyan_channel(20_000))
            })
            .await;
        assert_eq!(hit, Some(kenyan_channel(20_000)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn save_is_idempotent_across_reruns() {
        let pool = db::test_pool().await;
        let videos = vec![
            candidate("vid-1", "Song One", 2),
            candidate("vid-2", "Song Two", 5),
        ];

        assert_eq!(save_videos(&pool, &videos).await.unwrap(), 2);
        assert_eq!(save_videos(&pool, &videos).await.unwrap(), 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn save_skips_already_known_ids() {
        let pool = db::test_pool().await;
        assert_eq!(
            save_videos(&pool, &[candidate("vid-1", "Song One", 2)])
                .await
                .unwrap(),
            1
        );

        // same id, different title: still a skip
        let saved = save_videos(&pool, &[candidate("vid-1", "Renamed Song", 1)])
            .await
            .unwrap();
        assert_eq!(saved, 0);

        let title: String = sqlx::query_scalar("SELECT title FROM songs WHERE youtube_id = 'vid-1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(title, "Song One");
    }

    #[tokio::test]
    async fn save_reuses_the_artist_row() {
        let pool = db::test_pool().await;
        let videos = vec![
            candidate("vid-1", "Song One", 2),
            candidate("vid-2", "Song Two", 3),
        ];
        save_videos(&pool, &videos).await.unwrap();

        let artists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artists")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(artists, 1);
    }

    #[tokio::test]
    async fn save_skips_stale_candidates() {
        let pool = db::test_pool().await;
        let videos = vec![
            candidate("vid-1", "Fresh Song", 2),
            candidate("vid-2", "Stale Song", 45),
        ];
        assert_eq!(save_videos(&pool, &videos).await.unwrap(), 1);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}

//! # Content Index Store
//!
//! The single surface over the cached catalog. The sync coordinator is its
//! only bulk writer; the UI reads through account-scoped pagers that stay
//! usable while indexing is still running and simply grow as pages commit.
//!
//! ## Consistency
//!
//! Each indexed page commits atomically with its checkpoint advance in one
//! SQLite transaction, and WAL journaling keeps readers off the writer's
//! path. A reader therefore sees the latest committed pages, never a
//! half-written one; section completion (`is_complete` on the checkpoint)
//! is the coarser boundary exposed to anything that needs a whole section.
//!
//! ## Account isolation
//!
//! Every row is keyed by [`AccountKey`]. Clearing the cache bumps an epoch
//! counter; pagers snapshot the epoch at creation and fail with
//! [`CatalogError::StalePager`] afterwards instead of silently serving
//! rows from a different account generation.

use crate::error::{CatalogError, Result};
use crate::models::{Category, ContentItem, Section, SectionSyncCheckpoint, SYNC_SECTIONS};
use crate::repositories::{
    CategoryRepository, CheckpointRepository, ContentRepository, Page, PageRequest,
    SqliteCategoryRepository, SqliteCheckpointRepository, SqliteContentRepository,
};
use bridge_traits::catalog::{
    CatalogSource, ContentType, MovieDetail, NowNext, SeriesDetail, SeriesEpisode, SeriesSeason,
};
use core_account::{AccountKey, PlaylistConfig};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use lru::LruCache;
use sqlx::SqlitePool;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Progress callback invoked after every committed page.
pub type SectionProgressFn = dyn Fn(Section, &SectionSyncCheckpoint) + Send + Sync;

/// Outcome of one section indexing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionOutcome {
    pub section: Section,
    /// Items committed for the section so far (across all passes).
    pub items_indexed: u64,
    /// Whether the section checkpoint is now complete.
    pub completed: bool,
}

/// Store tuning knobs.
#[derive(Debug, Clone)]
pub struct StoreTuning {
    /// Items requested per upstream page.
    pub page_size: u64,
    /// Entries kept per metadata cache.
    pub metadata_cache_size: usize,
    /// Staleness bound for movie/series detail.
    pub detail_ttl: Duration,
    /// Staleness bound for live now/next data.
    pub now_next_ttl: Duration,
}

impl Default for StoreTuning {
    fn default() -> Self {
        Self {
            page_size: 200,
            metadata_cache_size: 256,
            detail_ttl: Duration::from_secs(6 * 60 * 60),
            now_next_ttl: Duration::from_secs(60),
        }
    }
}

struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn fresh(&self, ttl: Duration) -> Option<T> {
        (self.fetched_at.elapsed() < ttl).then(|| self.value.clone())
    }
}

/// Cached catalog content for one account.
pub struct ContentIndexStore {
    pool: SqlitePool,
    source: Arc<dyn CatalogSource>,
    account: AccountKey,
    events: EventBus,
    tuning: StoreTuning,
    epoch: Arc<AtomicU64>,
    content: SqliteContentRepository,
    categories: SqliteCategoryRepository,
    checkpoints: SqliteCheckpointRepository,
    movie_cache: Mutex<LruCache<i64, CacheEntry<MovieDetail>>>,
    series_cache: Mutex<LruCache<i64, CacheEntry<SeriesDetail>>>,
    now_next_cache: Mutex<LruCache<i64, CacheEntry<NowNext>>>,
}

impl ContentIndexStore {
    /// Create a store bound to one account's partition of the catalog
    /// database.
    pub fn new(
        pool: SqlitePool,
        source: Arc<dyn CatalogSource>,
        config: &PlaylistConfig,
        events: EventBus,
        tuning: StoreTuning,
    ) -> Self {
        let cache_size =
            NonZeroUsize::new(tuning.metadata_cache_size.max(1)).expect("max(1) is non-zero");
        Self {
            content: SqliteContentRepository::new(pool.clone()),
            categories: SqliteCategoryRepository::new(pool.clone()),
            checkpoints: SqliteCheckpointRepository::new(pool.clone()),
            pool,
            source,
            account: config.account_key(),
            events,
            tuning,
            epoch: Arc::new(AtomicU64::new(0)),
            movie_cache: Mutex::new(LruCache::new(cache_size)),
            series_cache: Mutex::new(LruCache::new(cache_size)),
            now_next_cache: Mutex::new(LruCache::new(cache_size)),
        }
    }

    /// The account this store is partitioned to.
    pub fn account(&self) -> &AccountKey {
        &self.account
    }

    // ========================================================================
    // Existence checks
    // ========================================================================

    /// Whether every sync-target section has a complete checkpoint.
    pub async fn has_full_index(&self) -> Result<bool> {
        self.checkpoints
            .all_complete(&self.account, &SYNC_SECTIONS)
            .await
    }

    /// Whether one section's index is complete.
    pub async fn has_search_index(&self, section: Section) -> Result<bool> {
        Ok(self
            .checkpoints
            .get(&self.account, section)
            .await?
            .map(|cp| cp.is_complete)
            .unwrap_or(false))
    }

    /// Whether any section has indexed at least one item. This is the
    /// fast-start readiness check: some content is browsable/searchable.
    pub async fn has_any_search_index(&self) -> Result<bool> {
        self.checkpoints.any_items(&self.account).await
    }

    /// Read-only checkpoint lookup, used to short-circuit redundant boosts.
    pub async fn section_sync_checkpoint(
        &self,
        section: Section,
    ) -> Result<Option<SectionSyncCheckpoint>> {
        self.checkpoints.get(&self.account, section).await
    }

    // ========================================================================
    // Write path
    // ========================================================================

    /// Index one section until its checkpoint is complete.
    ///
    /// Resumes from the persisted checkpoint; `force` deletes it first.
    /// Cancellation is only observed between pages, so a page either fully
    /// commits (items plus checkpoint, one transaction) or leaves no trace.
    #[instrument(skip(self, cancel, on_progress), fields(account = %self.account, section = %section))]
    pub async fn sync_section(
        &self,
        section: Section,
        force: bool,
        cancel: &CancellationToken,
        on_progress: &SectionProgressFn,
    ) -> Result<SectionOutcome> {
        self.sync_section_inner(section, force, cancel, on_progress, None)
            .await
    }

    /// Index a minimal cross-section slice: the first page of every
    /// sync-target section that has nothing cached yet. Enough for basic
    /// browsing and search; the background full pass resumes from the
    /// checkpoints this leaves behind.
    #[instrument(skip(self, cancel, on_progress), fields(account = %self.account))]
    pub async fn sync_fast_slice(
        &self,
        cancel: &CancellationToken,
        on_progress: &SectionProgressFn,
    ) -> Result<()> {
        for section in SYNC_SECTIONS {
            let checkpoint = self.checkpoints.get(&self.account, section).await?;
            if checkpoint.map(|cp| cp.items_indexed > 0).unwrap_or(false) {
                debug!(%section, "fast slice: section already has items, skipping");
                continue;
            }
            self.sync_section_inner(section, false, cancel, on_progress, Some(1))
                .await?;
        }
        Ok(())
    }

    /// Manual/legacy full indexing pass over the given sections (all
    /// sync-target sections when `None`).
    ///
    /// `force` invalidates the targeted checkpoints before re-indexing.
    /// Never partially commits a section as complete: completion only
    /// flips inside the final page's transaction.
    #[instrument(skip(self, on_progress), fields(account = %self.account))]
    pub async fn sync_search_index(
        &self,
        force: bool,
        sections: Option<&[Section]>,
        on_progress: &SectionProgressFn,
    ) -> Result<()> {
        let cancel = CancellationToken::new();
        for &section in sections.unwrap_or(&SYNC_SECTIONS) {
            self.sync_section(section, force, &cancel, on_progress)
                .await?;
        }
        Ok(())
    }

    async fn sync_section_inner(
        &self,
        section: Section,
        force: bool,
        cancel: &CancellationToken,
        on_progress: &SectionProgressFn,
        max_pages: Option<u32>,
    ) -> Result<SectionOutcome> {
        let content_type = section
            .content_type()
            .ok_or(CatalogError::NotSyncTarget(section))?;

        if force {
            self.checkpoints.reset(&self.account, section).await?;
            self.events
                .emit(CoreEvent::Catalog(CatalogEvent::CheckpointInvalidated {
                    account: self.account.to_string(),
                    section: section.as_str().to_string(),
                }))
                .ok();
        }

        let mut checkpoint = self.checkpoints.get_or_create(&self.account, section).await?;
        if checkpoint.is_complete {
            return Ok(SectionOutcome {
                section,
                items_indexed: checkpoint.items_indexed,
                completed: true,
            });
        }

        // The category list rides along with the section's first page so a
        // resumed pass does not refetch it.
        let mut pending_categories = if checkpoint.cursor == 0 {
            Some(self.source.fetch_categories(content_type).await?)
        } else {
            None
        };

        let mut pages_committed = 0u32;
        loop {
            if cancel.is_cancelled() {
                debug!(%section, cursor = checkpoint.cursor, "indexing cancelled between pages");
                return Err(CatalogError::Cancelled);
            }

            let page = self
                .source
                .fetch_page(content_type, checkpoint.cursor, self.tuning.page_size)
                .await?;
            let batch = page.entries.len() as u64;
            let next_cursor = page.next_offset.unwrap_or(checkpoint.cursor + batch);
            let completed = page.next_offset.is_none();

            let mut tx = self.pool.begin().await?;
            if let Some(categories) = pending_categories.take() {
                self.categories
                    .replace_all(&mut tx, &self.account, content_type, &categories)
                    .await?;
            }
            self.content
                .upsert_page(&mut tx, &self.account, &page.entries, page.offset)
                .await?;
            self.checkpoints
                .advance(
                    &mut tx,
                    &self.account,
                    section,
                    next_cursor,
                    checkpoint.items_indexed + batch,
                    page.total,
                    completed,
                )
                .await?;
            tx.commit().await?;

            checkpoint.cursor = next_cursor;
            checkpoint.items_indexed += batch;
            checkpoint.total_estimate = page.total;
            checkpoint.is_complete = completed;
            on_progress(section, &checkpoint);

            pages_committed += 1;
            if completed {
                info!(%section, items = checkpoint.items_indexed, "section index complete");
                break;
            }
            if max_pages.is_some_and(|max| pages_committed >= max) {
                break;
            }
        }

        Ok(SectionOutcome {
            section,
            items_indexed: checkpoint.items_indexed,
            completed: checkpoint.is_complete,
        })
    }

    // ========================================================================
    // Pagers (read path)
    // ========================================================================

    fn pager_epoch(&self) -> PagerEpoch {
        PagerEpoch {
            shared: Arc::clone(&self.epoch),
            created: self.epoch.load(Ordering::Acquire),
        }
    }

    /// Pager over a section's items in upstream order. [`Section::All`]
    /// pages the union of all content types.
    pub fn pager(&self, section: Section) -> Result<ContentPager> {
        let kind = match section {
            Section::All => ContentPagerKind::Search {
                content_type: None,
                query: String::new(),
            },
            _ => ContentPagerKind::Section(
                section
                    .content_type()
                    .ok_or(CatalogError::NotSyncTarget(section))?,
            ),
        };
        Ok(self.content_pager(kind))
    }

    /// Pager over items matching a search term, optionally scoped to one
    /// section ([`Section::All`] searches every type).
    pub fn search_pager(&self, section: Section, query: impl Into<String>) -> Result<ContentPager> {
        let content_type = match section {
            Section::All => None,
            _ => Some(
                section
                    .content_type()
                    .ok_or(CatalogError::NotSyncTarget(section))?,
            ),
        };
        Ok(self.content_pager(ContentPagerKind::Search {
            content_type,
            query: query.into(),
        }))
    }

    /// Pager over one category's items.
    pub fn category_items_pager(
        &self,
        section: Section,
        category_id: impl Into<String>,
    ) -> Result<ContentPager> {
        let content_type = section
            .content_type()
            .ok_or(CatalogError::NotSyncTarget(section))?;
        Ok(self.content_pager(ContentPagerKind::Category {
            content_type,
            category_id: category_id.into(),
        }))
    }

    /// Pager over the series items of one category.
    pub fn series_pager(&self, category_id: impl Into<String>) -> ContentPager {
        self.content_pager(ContentPagerKind::Category {
            content_type: ContentType::Series,
            category_id: category_id.into(),
        })
    }

    /// Pager over a section's categories in upstream order.
    pub fn category_pager(&self, section: Section) -> Result<CategoryPager> {
        let content_type = section
            .content_type()
            .ok_or(CatalogError::NotSyncTarget(section))?;
        Ok(CategoryPager {
            repo: self.categories.clone(),
            account: self.account.clone(),
            epoch: self.pager_epoch(),
            content_type,
            query: None,
        })
    }

    /// Pager over a section's categories matching a search term.
    pub fn category_search_pager(
        &self,
        section: Section,
        query: impl Into<String>,
    ) -> Result<CategoryPager> {
        let mut pager = self.category_pager(section)?;
        pager.query = Some(query.into());
        Ok(pager)
    }

    /// Pager over the seasons of one series, loading (and caching) the
    /// series detail on first use.
    pub async fn series_season_pager(&self, series_id: i64) -> Result<SeasonPager> {
        let seasons = self.load_series_seasons(series_id).await?;
        Ok(SeasonPager {
            epoch: self.pager_epoch(),
            seasons,
        })
    }

    fn content_pager(&self, kind: ContentPagerKind) -> ContentPager {
        ContentPager {
            repo: self.content.clone(),
            account: self.account.clone(),
            epoch: self.pager_epoch(),
            kind,
        }
    }

    // ========================================================================
    // Cache clearing
    // ========================================================================

    /// Drop the in-memory metadata caches and invalidate outstanding
    /// pagers. Cached rows on disk are kept.
    pub fn clear_cache(&self) {
        self.movie_cache.lock().expect("cache lock").clear();
        self.series_cache.lock().expect("cache lock").clear();
        self.now_next_cache.lock().expect("cache lock").clear();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.events
            .emit(CoreEvent::Catalog(CatalogEvent::CacheCleared {
                account: self.account.to_string(),
            }))
            .ok();
    }

    /// Wipe everything cached for this account - items, categories,
    /// checkpoints, and the in-memory caches. Invoked on account switch or
    /// sign-out; every outstanding pager becomes stale.
    #[instrument(skip(self), fields(account = %self.account))]
    pub async fn clear_disk_cache(&self) -> Result<()> {
        let items = self.content.delete_account(&self.account).await?;
        self.categories.delete_account(&self.account).await?;
        self.checkpoints.delete_account(&self.account).await?;
        info!(items, "cleared disk cache");
        self.clear_cache();
        Ok(())
    }

    // ========================================================================
    // Metadata loaders
    // ========================================================================

    /// Detailed movie metadata, cached with its own staleness bound.
    pub async fn load_movie_info(&self, stream_id: i64) -> Result<MovieDetail> {
        if let Some(hit) = self
            .movie_cache
            .lock()
            .expect("cache lock")
            .get(&stream_id)
            .and_then(|e| e.fresh(self.tuning.detail_ttl))
        {
            return Ok(hit);
        }

        let detail = self.source.fetch_movie_detail(stream_id).await?;
        self.movie_cache.lock().expect("cache lock").put(
            stream_id,
            CacheEntry {
                value: detail.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(detail)
    }

    /// Detailed series metadata including the season/episode tree.
    pub async fn load_series_info(&self, series_id: i64) -> Result<SeriesDetail> {
        if let Some(hit) = self
            .series_cache
            .lock()
            .expect("cache lock")
            .get(&series_id)
            .and_then(|e| e.fresh(self.tuning.detail_ttl))
        {
            return Ok(hit);
        }

        let detail = self.source.fetch_series_detail(series_id).await?;
        self.series_cache.lock().expect("cache lock").put(
            series_id,
            CacheEntry {
                value: detail.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(detail)
    }

    /// Seasons of one series.
    pub async fn load_series_seasons(&self, series_id: i64) -> Result<Vec<SeriesSeason>> {
        Ok(self.load_series_info(series_id).await?.seasons)
    }

    /// Episodes of one series season.
    pub async fn load_series_episodes(
        &self,
        series_id: i64,
        season: u32,
    ) -> Result<Vec<SeriesEpisode>> {
        let detail = self.load_series_info(series_id).await?;
        Ok(detail
            .seasons
            .into_iter()
            .find(|s| s.season == season)
            .map(|s| s.episodes)
            .unwrap_or_default())
    }

    /// Current/next programme for a live channel. Short TTL; EPG data
    /// goes stale by the minute.
    pub async fn load_live_now_next(&self, stream_id: i64) -> Result<NowNext> {
        if let Some(hit) = self
            .now_next_cache
            .lock()
            .expect("cache lock")
            .get(&stream_id)
            .and_then(|e| e.fresh(self.tuning.now_next_ttl))
        {
            return Ok(hit);
        }

        let now_next = self.source.fetch_now_next(stream_id).await?;
        self.now_next_cache.lock().expect("cache lock").put(
            stream_id,
            CacheEntry {
                value: now_next.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(now_next)
    }

    /// Thumbnail URL of one category, from the cached category rows.
    pub async fn category_thumbnail(
        &self,
        section: Section,
        category_id: &str,
    ) -> Result<Option<String>> {
        let content_type = section
            .content_type()
            .ok_or(CatalogError::NotSyncTarget(section))?;
        self.categories
            .thumbnail(&self.account, content_type, category_id)
            .await
    }
}

// ============================================================================
// Pagers
// ============================================================================

#[derive(Clone)]
struct PagerEpoch {
    shared: Arc<AtomicU64>,
    created: u64,
}

impl PagerEpoch {
    fn check(&self) -> Result<()> {
        if self.shared.load(Ordering::Acquire) != self.created {
            warn!("pager used after its account cache was cleared");
            return Err(CatalogError::StalePager);
        }
        Ok(())
    }
}

#[derive(Clone)]
enum ContentPagerKind {
    Section(ContentType),
    Search {
        content_type: Option<ContentType>,
        query: String,
    },
    Category {
        content_type: ContentType,
        category_id: String,
    },
}

/// Account-scoped pager over content items. Usable mid-sync: each page
/// call returns the latest committed state.
#[derive(Clone)]
pub struct ContentPager {
    repo: SqliteContentRepository,
    account: AccountKey,
    epoch: PagerEpoch,
    kind: ContentPagerKind,
}

impl ContentPager {
    /// Load one page.
    ///
    /// # Errors
    ///
    /// [`CatalogError::StalePager`] once the account cache has been
    /// cleared after this pager was created.
    pub async fn page(&self, request: PageRequest) -> Result<Page<ContentItem>> {
        self.epoch.check()?;
        match &self.kind {
            ContentPagerKind::Section(content_type) => {
                self.repo
                    .query_section(&self.account, *content_type, request)
                    .await
            }
            ContentPagerKind::Search {
                content_type,
                query,
            } => {
                self.repo
                    .search(&self.account, *content_type, query, request)
                    .await
            }
            ContentPagerKind::Category {
                content_type,
                category_id,
            } => {
                self.repo
                    .query_category(&self.account, *content_type, category_id, request)
                    .await
            }
        }
    }
}

/// Account-scoped pager over categories.
#[derive(Clone)]
pub struct CategoryPager {
    repo: SqliteCategoryRepository,
    account: AccountKey,
    epoch: PagerEpoch,
    content_type: ContentType,
    query: Option<String>,
}

impl CategoryPager {
    /// Load one page of categories.
    pub async fn page(&self, request: PageRequest) -> Result<Page<Category>> {
        self.epoch.check()?;
        match &self.query {
            Some(query) => {
                self.repo
                    .search(&self.account, self.content_type, query, request)
                    .await
            }
            None => self.repo.query(&self.account, self.content_type, request).await,
        }
    }
}

/// Pager over the seasons of one series, backed by the metadata cache
/// snapshot taken at creation.
pub struct SeasonPager {
    epoch: PagerEpoch,
    seasons: Vec<SeriesSeason>,
}

impl SeasonPager {
    /// Page through the snapshot.
    pub fn page(&self, request: PageRequest) -> Result<Page<SeriesSeason>> {
        self.epoch.check()?;
        let start = (request.offset() as usize).min(self.seasons.len());
        let end = (start + request.limit() as usize).min(self.seasons.len());
        Ok(Page::new(
            self.seasons[start..end].to_vec(),
            self.seasons.len() as u64,
            request,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use async_trait::async_trait;
    use bridge_traits::catalog::{CatalogCategory, CatalogEntry, CatalogPage};
    use bridge_traits::error::BridgeError;
    use std::sync::atomic::AtomicUsize;

    /// In-memory catalog source serving fixed listings.
    struct MockSource {
        movies: Vec<CatalogEntry>,
        series: Vec<CatalogEntry>,
        live: Vec<CatalogEntry>,
        page_fetches: AtomicUsize,
        detail_fetches: AtomicUsize,
        fail_pages_from: Option<u64>,
    }

    impl MockSource {
        fn with_counts(movies: usize, series: usize, live: usize) -> Self {
            fn entries(content_type: ContentType, count: usize) -> Vec<CatalogEntry> {
                (0..count)
                    .map(|i| CatalogEntry {
                        content_type,
                        id: i as i64 + 1,
                        stream_id: i as i64 + 1,
                        name: format!("{} {}", content_type, i + 1),
                        category_id: Some("1".to_string()),
                        icon_url: None,
                        container_extension: match content_type {
                            ContentType::Movie => Some("mp4".to_string()),
                            _ => None,
                        },
                        added_at: None,
                    })
                    .collect()
            }
            Self {
                movies: entries(ContentType::Movie, movies),
                series: entries(ContentType::Series, series),
                live: entries(ContentType::Live, live),
                page_fetches: AtomicUsize::new(0),
                detail_fetches: AtomicUsize::new(0),
                fail_pages_from: None,
            }
        }

        fn listing(&self, content_type: ContentType) -> &[CatalogEntry] {
            match content_type {
                ContentType::Movie => &self.movies,
                ContentType::Series => &self.series,
                ContentType::Live => &self.live,
            }
        }
    }

    #[async_trait]
    impl CatalogSource for MockSource {
        async fn fetch_categories(
            &self,
            content_type: ContentType,
        ) -> bridge_traits::error::Result<Vec<CatalogCategory>> {
            Ok(vec![CatalogCategory {
                content_type,
                id: "1".to_string(),
                name: "Default".to_string(),
                thumbnail_url: None,
            }])
        }

        async fn fetch_page(
            &self,
            content_type: ContentType,
            offset: u64,
            limit: u64,
        ) -> bridge_traits::error::Result<CatalogPage> {
            self.page_fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_pages_from.is_some_and(|from| offset >= from) {
                return Err(BridgeError::Upstream("boom".to_string()));
            }
            let listing = self.listing(content_type);
            let start = (offset as usize).min(listing.len());
            let end = (start + limit as usize).min(listing.len());
            Ok(CatalogPage {
                entries: listing[start..end].to_vec(),
                offset,
                next_offset: (end < listing.len()).then_some(end as u64),
                total: Some(listing.len() as u64),
            })
        }

        async fn fetch_movie_detail(
            &self,
            stream_id: i64,
        ) -> bridge_traits::error::Result<MovieDetail> {
            self.detail_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(MovieDetail {
                stream_id,
                name: format!("movie {stream_id}"),
                ..Default::default()
            })
        }

        async fn fetch_series_detail(
            &self,
            series_id: i64,
        ) -> bridge_traits::error::Result<SeriesDetail> {
            self.detail_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(SeriesDetail {
                series_id,
                name: format!("series {series_id}"),
                seasons: vec![SeriesSeason {
                    season: 1,
                    name: None,
                    episodes: vec![],
                }],
                ..Default::default()
            })
        }

        async fn fetch_now_next(&self, _stream_id: i64) -> bridge_traits::error::Result<NowNext> {
            self.detail_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(NowNext::default())
        }
    }

    fn config() -> PlaylistConfig {
        PlaylistConfig::new("http://s", "u", "p", "Main")
    }

    fn small_pages() -> StoreTuning {
        StoreTuning {
            page_size: 10,
            ..Default::default()
        }
    }

    async fn store_with(source: MockSource, tuning: StoreTuning) -> ContentIndexStore {
        let pool = create_test_pool().await.unwrap();
        ContentIndexStore::new(pool, Arc::new(source), &config(), EventBus::new(16), tuning)
    }

    fn no_progress() -> Box<SectionProgressFn> {
        Box::new(|_: Section, _: &SectionSyncCheckpoint| {})
    }

    #[tokio::test]
    async fn test_sync_section_completes_and_reports_progress() {
        let store = store_with(MockSource::with_counts(25, 0, 0), small_pages()).await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);

        let outcome = store
            .sync_section(
                Section::Movies,
                false,
                &CancellationToken::new(),
                &move |section, cp| {
                    seen_cb
                        .lock()
                        .unwrap()
                        .push((section, cp.items_indexed, cp.progress()));
                },
            )
            .await
            .unwrap();

        assert!(outcome.completed);
        assert_eq!(outcome.items_indexed, 25);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3); // 10 + 10 + 5
        let indexed: Vec<u64> = seen.iter().map(|(_, i, _)| *i).collect();
        assert_eq!(indexed, vec![10, 20, 25]);
        // progress strictly below 1.0 until the final page
        assert!(seen[0].2 < 1.0 && seen[1].2 < 1.0);
        assert_eq!(seen[2].2, 1.0);
    }

    #[tokio::test]
    async fn test_cancel_between_pages_preserves_checkpoint() {
        let store = store_with(MockSource::with_counts(30, 0, 0), small_pages()).await;
        let cancel = CancellationToken::new();
        let cancel_after_first = cancel.clone();

        let result = store
            .sync_section(Section::Movies, false, &cancel, &move |_, _| {
                cancel_after_first.cancel();
            })
            .await;
        assert!(matches!(result, Err(CatalogError::Cancelled)));

        let cp = store
            .section_sync_checkpoint(Section::Movies)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cp.items_indexed, 10);
        assert!(!cp.is_complete);

        // Resume picks up from the committed cursor, not from scratch
        let outcome = store
            .sync_section(
                Section::Movies,
                false,
                &CancellationToken::new(),
                &*no_progress(),
            )
            .await
            .unwrap();
        assert!(outcome.completed);
        assert_eq!(outcome.items_indexed, 30);
    }

    #[tokio::test]
    async fn test_page_failure_leaves_checkpoint_intact() {
        let mut source = MockSource::with_counts(30, 0, 0);
        source.fail_pages_from = Some(10);
        let store = store_with(source, small_pages()).await;

        let result = store
            .sync_section(
                Section::Movies,
                false,
                &CancellationToken::new(),
                &*no_progress(),
            )
            .await;
        assert!(matches!(result, Err(CatalogError::Source(_))));

        let cp = store
            .section_sync_checkpoint(Section::Movies)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cp.cursor, 10);
        assert!(!cp.is_complete);
    }

    #[tokio::test]
    async fn test_fast_slice_indexes_first_page_of_each_section() {
        let store = store_with(MockSource::with_counts(25, 25, 25), small_pages()).await;
        store
            .sync_fast_slice(&CancellationToken::new(), &*no_progress())
            .await
            .unwrap();

        assert!(store.has_any_search_index().await.unwrap());
        assert!(!store.has_full_index().await.unwrap());

        for section in SYNC_SECTIONS {
            let cp = store
                .section_sync_checkpoint(section)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(cp.items_indexed, 10);
            assert!(!cp.is_complete);
        }
    }

    #[tokio::test]
    async fn test_fast_slice_completes_tiny_sections() {
        let store = store_with(MockSource::with_counts(5, 5, 5), small_pages()).await;
        store
            .sync_fast_slice(&CancellationToken::new(), &*no_progress())
            .await
            .unwrap();
        assert!(store.has_full_index().await.unwrap());
    }

    #[tokio::test]
    async fn test_sync_search_index_force_reindexes() {
        let store = store_with(MockSource::with_counts(12, 3, 3), small_pages()).await;
        store
            .sync_search_index(false, None, &*no_progress())
            .await
            .unwrap();
        assert!(store.has_full_index().await.unwrap());

        // Forced pass rewinds the targeted section only
        store
            .sync_search_index(true, Some(&[Section::Movies]), &*no_progress())
            .await
            .unwrap();
        assert!(store.has_full_index().await.unwrap());
        let cp = store
            .section_sync_checkpoint(Section::Movies)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cp.items_indexed, 12);
    }

    #[tokio::test]
    async fn test_pager_reads_mid_sync() {
        let store = store_with(MockSource::with_counts(25, 0, 0), small_pages()).await;
        let pager = store.pager(Section::Movies).unwrap();

        // Nothing indexed yet: empty, not an error
        let page = pager.page(PageRequest::default()).await.unwrap();
        assert!(page.is_empty());

        store
            .sync_fast_slice(&CancellationToken::new(), &*no_progress())
            .await
            .unwrap();

        let page = pager.page(PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 10);
    }

    #[tokio::test]
    async fn test_clear_disk_cache_invalidates_pagers() {
        let store = store_with(MockSource::with_counts(5, 0, 0), small_pages()).await;
        store
            .sync_search_index(false, Some(&[Section::Movies]), &*no_progress())
            .await
            .unwrap();

        let pager = store.pager(Section::Movies).unwrap();
        assert_eq!(pager.page(PageRequest::default()).await.unwrap().total, 5);

        store.clear_disk_cache().await.unwrap();
        assert!(matches!(
            pager.page(PageRequest::default()).await,
            Err(CatalogError::StalePager)
        ));

        // A pager created after the wipe works and sees the empty cache
        let fresh = store.pager(Section::Movies).unwrap();
        assert_eq!(fresh.page(PageRequest::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_movie_info_cached_until_ttl() {
        let pool = create_test_pool().await.unwrap();
        let source = Arc::new(MockSource::with_counts(0, 0, 0));
        let store = ContentIndexStore::new(
            pool,
            Arc::clone(&source) as Arc<dyn CatalogSource>,
            &config(),
            EventBus::new(16),
            StoreTuning::default(),
        );

        let first = store.load_movie_info(42).await.unwrap();
        let second = store.load_movie_info(42).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(source.detail_fetches.load(Ordering::SeqCst), 1);

        // clear_cache drops the entry; the next load refetches
        store.clear_cache();
        store.load_movie_info(42).await.unwrap();
        assert_eq!(source.detail_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_search_pager_spans_sections_for_all() {
        let store = store_with(MockSource::with_counts(3, 3, 3), small_pages()).await;
        store
            .sync_search_index(false, None, &*no_progress())
            .await
            .unwrap();

        let pager = store.search_pager(Section::All, "1").unwrap();
        let page = pager.page(PageRequest::default()).await.unwrap();
        // "movie 1", "series 1", "live 1"
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_season_pager_pages_snapshot() {
        let store = store_with(MockSource::with_counts(0, 1, 0), small_pages()).await;
        let pager = store.series_season_pager(1).await.unwrap();
        let page = pager.page(PageRequest::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].season, 1);
    }
}

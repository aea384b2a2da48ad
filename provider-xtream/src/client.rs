//! Xtream player API client.
//!
//! Implements [`CatalogSource`] over the `player_api.php` endpoint family.
//! Xtream panels return complete listings rather than server-side pages,
//! so the client windows them locally to honor the paged contract: the
//! full listing is fetched (and cached) when a section is read from
//! offset 0, and subsequent windows slice the cached listing.

use crate::error::{Result, XtreamError};
use crate::types::{
    XtreamCategory, XtreamLiveStream, XtreamSeriesInfoResponse, XtreamSeriesItem,
    XtreamShortEpgResponse, XtreamVodInfoResponse, XtreamVodStream,
};
use async_trait::async_trait;
use bridge_traits::catalog::{
    CatalogCategory, CatalogEntry, CatalogPage, CatalogSource, ContentType, MovieDetail, NowNext,
    SeriesDetail,
};
use core_account::PlaylistConfig;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Request timeout for API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent; some panels reject unknown clients.
const USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 9) AppleWebKit/537.36";

/// Xtream player API client.
///
/// # Example
///
/// ```ignore
/// use provider_xtream::XtreamClient;
/// use bridge_traits::catalog::{CatalogSource, ContentType};
///
/// let client = XtreamClient::new(config)?;
/// let page = client.fetch_page(ContentType::Live, 0, 200).await?;
/// ```
pub struct XtreamClient {
    http: reqwest::Client,
    config: PlaylistConfig,
    /// Full listings cached per content type, refreshed on offset-0 reads.
    listings: Mutex<HashMap<ContentType, Vec<CatalogEntry>>>,
}

impl XtreamClient {
    /// Create a client for one playlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: PlaylistConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            config,
            listings: Mutex::new(HashMap::new()),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        action: &str,
        extra: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/player_api.php", self.config.base_url);
        let mut query: Vec<(&str, String)> = vec![
            ("username", self.config.username.clone()),
            ("password", self.config.password.clone()),
            ("action", action.to_string()),
        ];
        query.extend(extra.iter().cloned());

        debug!(action, "issuing player API request");
        let response = self.http.get(&url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(XtreamError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| XtreamError::Parse {
            action: action.to_string(),
            message: e.to_string(),
        })
    }

    fn categories_action(content_type: ContentType) -> &'static str {
        match content_type {
            ContentType::Live => "get_live_categories",
            ContentType::Movie => "get_vod_categories",
            ContentType::Series => "get_series_categories",
        }
    }

    /// Fetch the complete listing of one content type.
    #[instrument(skip(self))]
    async fn fetch_full_listing(&self, content_type: ContentType) -> Result<Vec<CatalogEntry>> {
        let entries: Vec<CatalogEntry> = match content_type {
            ContentType::Live => {
                let streams: Vec<XtreamLiveStream> =
                    self.get_json("get_live_streams", &[]).await?;
                streams.into_iter().map(|s| s.into_entry()).collect()
            }
            ContentType::Movie => {
                let streams: Vec<XtreamVodStream> = self.get_json("get_vod_streams", &[]).await?;
                streams.into_iter().map(|s| s.into_entry()).collect()
            }
            ContentType::Series => {
                let items: Vec<XtreamSeriesItem> = self.get_json("get_series", &[]).await?;
                items.into_iter().map(|i| i.into_entry()).collect()
            }
        };
        debug!(%content_type, count = entries.len(), "fetched full listing");
        Ok(entries)
    }
}

/// Slice one window out of a full listing.
pub(crate) fn window(entries: &[CatalogEntry], offset: u64, limit: u64) -> CatalogPage {
    let start = (offset as usize).min(entries.len());
    let end = start.saturating_add(limit as usize).min(entries.len());
    CatalogPage {
        entries: entries[start..end].to_vec(),
        offset,
        next_offset: (end < entries.len()).then_some(end as u64),
        total: Some(entries.len() as u64),
    }
}

#[async_trait]
impl CatalogSource for XtreamClient {
    async fn fetch_categories(
        &self,
        content_type: ContentType,
    ) -> bridge_traits::error::Result<Vec<CatalogCategory>> {
        let categories: Vec<XtreamCategory> = self
            .get_json(Self::categories_action(content_type), &[])
            .await
            .map_err(bridge_traits::BridgeError::from)?;
        Ok(categories
            .into_iter()
            .map(|c| c.into_category(content_type))
            .collect())
    }

    async fn fetch_page(
        &self,
        content_type: ContentType,
        offset: u64,
        limit: u64,
    ) -> bridge_traits::error::Result<CatalogPage> {
        let mut listings = self.listings.lock().await;

        // Offset 0 starts a fresh pass: refetch so a forced resync sees
        // current upstream content. Later offsets reuse the cached listing
        // for a stable window sequence.
        if offset == 0 || !listings.contains_key(&content_type) {
            let entries = self
                .fetch_full_listing(content_type)
                .await
                .map_err(bridge_traits::BridgeError::from)?;
            listings.insert(content_type, entries);
        }

        let entries = listings
            .get(&content_type)
            .expect("listing inserted above");
        if offset as usize > entries.len() {
            warn!(
                offset,
                len = entries.len(),
                "page offset beyond listing end; upstream shrank between passes"
            );
        }
        Ok(window(entries, offset, limit))
    }

    async fn fetch_movie_detail(
        &self,
        stream_id: i64,
    ) -> bridge_traits::error::Result<MovieDetail> {
        let response: XtreamVodInfoResponse = self
            .get_json("get_vod_info", &[("vod_id", stream_id.to_string())])
            .await
            .map_err(bridge_traits::BridgeError::from)?;
        Ok(response.into_detail())
    }

    async fn fetch_series_detail(
        &self,
        series_id: i64,
    ) -> bridge_traits::error::Result<SeriesDetail> {
        let response: XtreamSeriesInfoResponse = self
            .get_json("get_series_info", &[("series_id", series_id.to_string())])
            .await
            .map_err(bridge_traits::BridgeError::from)?;
        Ok(response.into_detail(series_id))
    }

    async fn fetch_now_next(&self, stream_id: i64) -> bridge_traits::error::Result<NowNext> {
        let response: XtreamShortEpgResponse = self
            .get_json(
                "get_short_epg",
                &[
                    ("stream_id", stream_id.to_string()),
                    ("limit", "2".to_string()),
                ],
            )
            .await
            .map_err(bridge_traits::BridgeError::from)?;
        Ok(response.into_now_next())
    }
}

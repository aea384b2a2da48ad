//! # Stream Candidate Resolution
//!
//! Turns a content identity into an ordered list of playable URIs:
//! the primary URL first, then the alternate encodings/endpoints the
//! resilience controller rotates through on playback errors.
//!
//! URL shapes follow the Xtream-Codes server layout:
//!
//! ```text
//! {base}/live/{user}/{pass}/{stream_id}.ts
//! {base}/movie/{user}/{pass}/{stream_id}.{ext}
//! {base}/series/{user}/{pass}/{episode_id}.{ext}
//! ```
//!
//! Resolution is a pure function of its inputs; nothing here touches the
//! network.

use bridge_traits::catalog::ContentType;
use core_account::PlaylistConfig;
use std::fmt;

/// Structured identity of a remote stream within a playback queue.
///
/// Keys the fallback-URI map: content type plus id, so numerically
/// overlapping ids across types can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub content_type: ContentType,
    pub id: i64,
}

impl StreamKey {
    pub fn new(content_type: ContentType, id: i64) -> Self {
        Self { content_type, id }
    }

    /// Player-facing media id (`"MOVIES:42"`, `"LIVE:7"`).
    pub fn media_id(&self) -> String {
        format!("{}:{}", self.content_type.media_id_prefix(), self.id)
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.media_id())
    }
}

/// Container extensions tried for VOD content, in preference order.
const MOVIE_ALTERNATES: [&str; 3] = ["mp4", "mkv", "avi"];

/// Resolve the ordered candidate URIs for one stream.
///
/// The first candidate is the primary playback URI. Live channels get the
/// raw MPEG-TS endpoint first and the HLS wrapper as fallback; VOD gets
/// its reported container first, then the common alternates; series
/// episodes get their reported container with an `mp4` alternate.
pub fn resolve_candidates(
    config: &PlaylistConfig,
    content_type: ContentType,
    stream_id: i64,
    extension: Option<&str>,
) -> Vec<String> {
    let base = &config.base_url;
    let user = &config.username;
    let pass = &config.password;

    match content_type {
        ContentType::Live => vec![
            format!("{base}/live/{user}/{pass}/{stream_id}.ts"),
            format!("{base}/live/{user}/{pass}/{stream_id}.m3u8"),
        ],
        ContentType::Movie => {
            let primary = extension.unwrap_or("mp4");
            let mut candidates =
                vec![format!("{base}/movie/{user}/{pass}/{stream_id}.{primary}")];
            for alt in MOVIE_ALTERNATES {
                if alt != primary {
                    candidates.push(format!("{base}/movie/{user}/{pass}/{stream_id}.{alt}"));
                }
            }
            candidates
        }
        ContentType::Series => {
            let primary = extension.unwrap_or("mp4");
            let mut candidates =
                vec![format!("{base}/series/{user}/{pass}/{stream_id}.{primary}")];
            if primary != "mp4" {
                candidates.push(format!("{base}/series/{user}/{pass}/{stream_id}.mp4"));
            }
            candidates
        }
    }
}

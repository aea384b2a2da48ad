//! # Decode-Failure Classification
//!
//! Classifies player errors that stem from the device lacking an HEVC
//! decoder, by inspecting the failing format's codec/MIME fields and the
//! error's message chain. The resilience controller surfaces these with a
//! distinct actionable notice instead of burning fallback attempts on a
//! stream no decoder on the device can play.

use bridge_traits::player::PlayerErrorEvent;

/// Codec markers that identify HEVC/H.265 content.
const HEVC_MARKERS: [&str; 5] = ["hevc", "hvc1", "hev1", "h265", "h.265"];

/// Whether a player error points at an HEVC decode failure.
///
/// Checks the failing format's RFC 6381 codec string and MIME type first,
/// then falls back to scanning the error's message/cause chain.
pub fn is_hevc_failure(event: &PlayerErrorEvent) -> bool {
    if let Some(format) = &event.failing_format {
        if format
            .codecs
            .as_deref()
            .is_some_and(contains_hevc_marker)
        {
            return true;
        }
        if format
            .mime_type
            .as_deref()
            .is_some_and(contains_hevc_marker)
        {
            return true;
        }
    }
    event.messages().any(contains_hevc_marker)
}

/// Best-effort codec label for the user-facing notice.
pub fn failing_codec_label(event: &PlayerErrorEvent) -> String {
    event
        .failing_format
        .as_ref()
        .and_then(|f| f.codecs.clone().or_else(|| f.mime_type.clone()))
        .unwrap_or_else(|| "HEVC".to_string())
}

fn contains_hevc_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    HEVC_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::player::FailingFormat;

    #[test]
    fn test_detects_codec_string() {
        let event = PlayerErrorEvent {
            message: "Source error".to_string(),
            cause_messages: vec![],
            failing_format: Some(FailingFormat {
                codecs: Some("hvc1.1.6.L120.90".to_string()),
                mime_type: None,
            }),
        };
        assert!(is_hevc_failure(&event));
    }

    #[test]
    fn test_detects_mime_type() {
        let event = PlayerErrorEvent {
            message: "Decoder init failed".to_string(),
            cause_messages: vec![],
            failing_format: Some(FailingFormat {
                codecs: None,
                mime_type: Some("video/HEVC".to_string()),
            }),
        };
        assert!(is_hevc_failure(&event));
    }

    #[test]
    fn test_detects_cause_chain() {
        let event = PlayerErrorEvent {
            message: "Playback failed".to_string(),
            cause_messages: vec![
                "MediaCodecRenderer error".to_string(),
                "no decoder for h265 stream".to_string(),
            ],
            failing_format: None,
        };
        assert!(is_hevc_failure(&event));
    }

    #[test]
    fn test_avc_not_classified_as_hevc() {
        let event = PlayerErrorEvent {
            message: "Source error".to_string(),
            cause_messages: vec!["connection reset".to_string()],
            failing_format: Some(FailingFormat {
                codecs: Some("avc1.64001f".to_string()),
                mime_type: Some("video/avc".to_string()),
            }),
        };
        assert!(!is_hevc_failure(&event));
    }

    #[test]
    fn test_codec_label_prefers_codec_string() {
        let event = PlayerErrorEvent {
            message: String::new(),
            cause_messages: vec![],
            failing_format: Some(FailingFormat {
                codecs: Some("hev1.2.4".to_string()),
                mime_type: Some("video/hevc".to_string()),
            }),
        };
        assert_eq!(failing_codec_label(&event), "hev1.2.4");
    }
}

//! Video-thumbnail synthesis (C2's "Video-thumbnail synthesis" row): a pure,
//! deterministic derivation of a thumbnail image URL from a video URL or id.
//! No network call of its own — the caller validates the returned URL (C8's
//! image-download path already does this for every image it fetches).

const RESOLUTIONS: &[&str] = &["maxresdefault", "sddefault", "hqdefault", "mqdefault"];

/// Extract a YouTube video id from a watch/share/embed URL.
pub fn extract_youtube_id(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?;

    if host.ends_with("youtu.be") {
        return parsed
            .path_segments()
            .and_then(|mut segs| segs.next())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
    }

    if host.ends_with("youtube.com") {
        if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
        let segs: Vec<&str> = parsed.path_segments().map(|s| s.collect()).unwrap_or_default();
        if let Some(pos) = segs.iter().position(|s| *s == "embed" || *s == "shorts") {
            if let Some(id) = segs.get(pos + 1) {
                if !id.is_empty() {
                    return Some((*id).to_string());
                }
            }
        }
    }

    None
}

/// The ordered list of thumbnail URLs to try for a video id, highest
/// resolution first, falling through to lower resolutions that YouTube
/// always serves even when the higher ones 404.
pub fn thumbnail_candidates(video_id: &str) -> Vec<String> {
    RESOLUTIONS
        .iter()
        .map(|res| format!("https://img.youtube.com/vi/{video_id}/{res}.jpg"))
        .collect()
}

/// Convenience wrapper: derive thumbnail candidates directly from a video
/// URL, or `None` if the id can't be recovered.
pub fn thumbnail_candidates_for_url(video_url: &str) -> Option<Vec<String>> {
    extract_youtube_id(video_url).map(|id| thumbnail_candidates(&id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_watch_url() {
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/watch?v=abc123XYZ_-"),
            Some("abc123XYZ_-".to_string())
        );
    }

    #[test]
    fn extracts_id_from_short_url() {
        assert_eq!(
            extract_youtube_id("https://youtu.be/abc123"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn candidates_are_ordered_highest_resolution_first() {
        let urls = thumbnail_candidates("abc123");
        assert_eq!(urls[0], "https://img.youtube.com/vi/abc123/maxresdefault.jpg");
        assert_eq!(urls.last().unwrap(), "https://img.youtube.com/vi/abc123/mqdefault.jpg");
    }

    #[test]
    fn non_youtube_url_yields_none() {
        assert!(thumbnail_candidates_for_url("https://example.com/video").is_none());
    }
}

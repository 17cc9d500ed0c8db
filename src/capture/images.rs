use std::path::Path;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::core::types::{LocalImage, Platform};

const RATE_LIMIT_GAP: Duration = Duration::from_millis(500);
const LOOKS_LIKE_IMAGE: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp"];

pub struct ImageDownloadTarget {
    pub image_url: String,
    pub title_hint: String,
    pub platform: Option<Platform>,
    pub viral_score: Option<f64>,
}

fn looks_like_image_url(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else { return false };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }
    let lower = parsed.path().to_ascii_lowercase();
    LOOKS_LIKE_IMAGE.iter().any(|ext| lower.ends_with(ext)) || url.contains("img") || url.contains("image") || url.contains("media")
}

fn safe_title(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.chars().take(40).collect()
    }
}

/// Short, stable disambiguator so two images with the same title-slug never
/// collide on disk (e.g. two posts both titled "untitled").
fn url_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

fn ext_from_url(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    for ext in [".png", ".gif", ".webp", ".jpeg", ".jpg"] {
        if lower.ends_with(ext) {
            return match ext {
                ".png" => ".png",
                ".gif" => ".gif",
                ".webp" => ".webp",
                _ => ".jpg",
            };
        }
    }
    ".jpg"
}

/// `DownloadImages(image_urls, session_id) → [LocalImage]`. Rate-limited to
/// at least 500ms between downloads; rejects anything under `min_bytes` or
/// whose MIME doesn't start with `image/`.
pub async fn download_images(
    http: &reqwest::Client,
    targets: &[ImageDownloadTarget],
    images_root: &str,
    session_id: &str,
    min_bytes: u64,
) -> Vec<LocalImage> {
    if targets.is_empty() {
        return Vec::new();
    }

    let dir = Path::new(images_root).join(session_id);
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(error = %e, "failed to create images directory; skipping downloads");
        return Vec::new();
    }

    let mut out = Vec::new();
    for (idx, target) in targets.iter().enumerate() {
        if idx > 0 {
            tokio::time::sleep(RATE_LIMIT_GAP).await;
        }
        if !looks_like_image_url(&target.image_url) {
            continue;
        }
        match download_one(http, target, &dir, idx, min_bytes).await {
            Ok(img) => out.push(img),
            Err(e) => tracing::debug!(url = %target.image_url, error = %e, "image download rejected"),
        }
    }
    out
}

async fn download_one(
    http: &reqwest::Client,
    target: &ImageDownloadTarget,
    dir: &Path,
    idx: usize,
    min_bytes: u64,
) -> Result<LocalImage, String> {
    let resp = http
        .get(&target.image_url)
        .timeout(Duration::from_secs(20))
        .send()
        .await
        .map_err(|e| format!("transport error: {e}"))?;

    if !resp.status().is_success() {
        return Err(format!("http_{}", resp.status()));
    }

    let mime = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_string();

    if !mime.starts_with("image/") {
        return Err(format!("unexpected mime type: {mime}"));
    }

    let bytes = resp.bytes().await.map_err(|e| format!("body read failed: {e}"))?;
    if (bytes.len() as u64) < min_bytes {
        return Err(format!("{} bytes below minimum {}", bytes.len(), min_bytes));
    }

    let ext = ext_from_url(&target.image_url);
    let filename = format!("{:03}_{}_{}{}", idx, safe_title(&target.title_hint), url_hash(&target.image_url), ext);
    let path = dir.join(&filename);
    std::fs::write(&path, &bytes).map_err(|e| format!("write failed: {e}"))?;

    Ok(LocalImage {
        local_path: path.to_string_lossy().to_string(),
        source_url: target.image_url.clone(),
        platform: target.platform,
        viral_score: target.viral_score,
        file_size_bytes: bytes.len() as u64,
        mime_type: mime,
        downloaded_at: crate::core::now_iso8601(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_title_slugifies_and_truncates() {
        assert_eq!(safe_title("Olá Mundo! 2026"), "ol__mundo__2026");
        let long = "a".repeat(100);
        assert_eq!(safe_title(&long).chars().count(), 40);
    }

    #[test]
    fn safe_title_falls_back_when_empty() {
        assert_eq!(safe_title("!!!"), "image");
    }

    #[test]
    fn looks_like_image_url_accepts_extension() {
        assert!(looks_like_image_url("https://example.com/a/b.jpg"));
        assert!(!looks_like_image_url("ftp://example.com/a.jpg"));
    }

    #[test]
    fn ext_from_url_defaults_to_jpg() {
        assert_eq!(ext_from_url("https://example.com/x"), ".jpg");
        assert_eq!(ext_from_url("https://example.com/x.png"), ".png");
    }
}

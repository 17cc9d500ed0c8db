use std::path::Path;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Browser;
use futures::StreamExt;
use sha2::{Digest, Sha256};

use crate::core::types::{ContentMetrics, Platform, Screenshot, ViralCategory};
use crate::scraping::browser_manager;

const VIEWPORT_WIDTH: u32 = 1920;
const VIEWPORT_HEIGHT: u32 = 1080;
const PER_URL_TIMEOUT: Duration = Duration::from_secs(30);
const RENDER_WAIT: Duration = Duration::from_millis(3000);
const SCROLL_PAUSE: Duration = Duration::from_millis(600);

/// DOM-cleanup script hiding cookie/popup/modal containers matched by a
/// class/id substring, run before the shot is taken.
const CLEANUP_SCRIPT: &str = r#"
(function() {
  const needles = ['cookie', 'consent', 'gdpr', 'popup', 'modal', 'overlay', 'newsletter', 'subscribe'];
  document.querySelectorAll('*').forEach((el) => {
    const id = (el.id || '').toLowerCase();
    const cls = (el.className && el.className.toString ? el.className.toString() : '').toLowerCase();
    if (needles.some((n) => id.includes(n) || cls.includes(n))) {
      el.style.display = 'none';
    }
  });
})();
"#;

pub struct CaptureTarget {
    pub url: String,
    pub title: String,
    pub platform: Option<Platform>,
    pub viral_score: Option<f64>,
    pub viral_category: Option<ViralCategory>,
}

/// `CaptureScreenshots(urls, session_id) → [Screenshot]`. Launches one
/// headless browser for the whole batch; any per-URL failure is skipped,
/// never fails the run.
pub async fn capture_screenshots(
    targets: &[CaptureTarget],
    sessions_root: &str,
    session_id: &str,
    subdir: &str,
    prefix: &str,
) -> Vec<Screenshot> {
    if targets.is_empty() {
        return Vec::new();
    }

    let Some(exe) = browser_manager::find_chrome_executable() else {
        tracing::warn!("no browser executable found; skipping screenshot capture");
        return Vec::new();
    };

    let Ok(config) = browser_manager::build_headless_config(&exe, VIEWPORT_WIDTH, VIEWPORT_HEIGHT) else {
        return Vec::new();
    };

    let (mut browser, mut handler) = match Browser::launch(config).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(error = %e, "failed to launch headless browser; skipping screenshot capture");
            return Vec::new();
        }
    };

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::debug!(error = %e, "CDP handler error");
            }
        }
    });

    let files_dir = Path::new(sessions_root).join(session_id).join(subdir);
    if let Err(e) = std::fs::create_dir_all(&files_dir) {
        tracing::warn!(error = %e, "failed to create screenshot directory; skipping capture");
        browser.close().await.ok();
        handler_task.abort();
        return Vec::new();
    }

    let mut out = Vec::new();
    for (idx, target) in targets.iter().enumerate() {
        let attempt = tokio::time::timeout(
            PER_URL_TIMEOUT,
            capture_one(&mut browser, target, &files_dir, session_id, subdir, prefix, idx),
        )
        .await;

        match attempt {
            Ok(Ok(screenshot)) => out.push(screenshot),
            Ok(Err(e)) => tracing::warn!(url = %target.url, error = %e, "screenshot capture failed"),
            Err(_) => tracing::warn!(url = %target.url, "screenshot capture timed out"),
        }
    }

    browser.close().await.ok();
    handler_task.abort();
    out
}

async fn capture_one(
    browser: &mut Browser,
    target: &CaptureTarget,
    files_dir: &Path,
    session_id: &str,
    subdir: &str,
    prefix: &str,
    idx: usize,
) -> Result<Screenshot, String> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| format!("new_page failed: {e}"))?;

    page.goto(&target.url).await.map_err(|e| format!("goto failed: {e}"))?;
    page.wait_for_navigation().await.ok();

    tokio::time::sleep(RENDER_WAIT).await;

    page.evaluate(CLEANUP_SCRIPT).await.ok();

    page.evaluate("window.scrollTo(0, document.body.scrollHeight / 2)").await.ok();
    tokio::time::sleep(SCROLL_PAUSE).await;
    page.evaluate("window.scrollTo(0, 0)").await.ok();
    tokio::time::sleep(SCROLL_PAUSE).await;

    let final_url = page
        .evaluate("location.href")
        .await
        .ok()
        .and_then(|h| h.into_value::<String>().ok())
        .unwrap_or_else(|| target.url.clone());

    let bytes = page
        .screenshot(ScreenshotParams::builder().format(CaptureScreenshotFormat::Png).build())
        .await
        .map_err(|e| format!("screenshot capture failed: {e}"))?;

    if bytes.is_empty() {
        return Err("screenshot produced zero bytes".to_string());
    }

    let hash: String = Sha256::digest(target.url.as_bytes()).iter().take(4).map(|b| format!("{b:02x}")).collect();
    let filename = format!("{prefix}_{idx:02}_{hash}.png");
    let absolute_path = files_dir.join(&filename);
    std::fs::write(&absolute_path, &bytes).map_err(|e| format!("write failed: {e}"))?;

    let file_size_bytes = std::fs::metadata(&absolute_path).map(|m| m.len()).unwrap_or(0);
    if file_size_bytes == 0 {
        return Err("saved screenshot file is empty".to_string());
    }

    let relative_path = format!("{session_id}/{subdir}/{filename}");

    Ok(Screenshot {
        relative_path,
        absolute_path: absolute_path.to_string_lossy().to_string(),
        source_url: target.url.clone(),
        final_url,
        title: target.title.clone(),
        platform: target.platform,
        viral_score: target.viral_score,
        viral_category: target.viral_category,
        captured_at: crate::core::now_iso8601(),
        file_size_bytes,
        content_metrics: ContentMetrics::default(),
    })
}

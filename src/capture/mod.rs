//! Visual Capture (C8): screenshots and image downloads.
//!
//! Screenshot capture owns a single headless browser per call (scoped
//! resource, closed on every exit path) and captures sequentially, since
//! browser drivers are not thread-safe. Image downloads are plain HTTP and
//! may run with a small bounded concurrency.

pub mod images;
pub mod screenshots;

pub use images::download_images;
pub use screenshots::capture_screenshots;

//! Headless-browser plumbing shared by C8's screenshot capture.

pub mod browser_manager;

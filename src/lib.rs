//! Massive multi-source search and viral-content discovery orchestrator.
//!
//! See [`core::app_state::Orchestrator`] for the single public entry point
//! (`Orchestrator::collect`) and [`core::types`] for the wire-level data
//! model every provider, scorer, and report function exchanges.

pub mod capture;
pub mod core;
pub mod deep_study;
pub mod discovery;
pub mod extractor;
pub mod filter;
pub mod keypool;
pub mod providers;
pub mod quality;
pub mod report;
pub mod research;
pub mod scraping;
pub mod viral;

pub use core::types;
pub use core::types::*;
pub use core::Orchestrator;

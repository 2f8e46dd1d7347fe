//! Load and contract testing for the product-catalog HTTP API.
//!
//! Provides typed TOML configuration with per-scenario presets, a request
//! catalog, response validators, a plain HTTP client, and an HdrHistogram
//! metrics pipeline driven by a tokio virtual-user engine.

pub mod catalog;
pub mod client;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod report;
pub mod summary;
pub mod validate;
pub mod vu;

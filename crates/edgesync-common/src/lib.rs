//! EdgeSync Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types and utilities for the EdgeSync workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across all EdgeSync
//! workspace members:
//!
//! - **Error Handling**: Custom error and result types
//! - **Logging**: Tracing configuration and initialization
//! - **Time**: Sync-timestamp formatting shared by the engine and its tests

pub mod error;
pub mod logging;
pub mod time;

// Re-export commonly used types
pub use error::{EdgeSyncError, Result};

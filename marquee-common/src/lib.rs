//! # Marquee Common Library
//!
//! Shared code for the Marquee workspace including:
//! - Error types
//! - TOML configuration loading and data folder resolution
//! - Logging bootstrap

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};

//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the player core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus for queue transitions and download lifecycle
//!
//! ## Overview
//!
//! Other workspace crates depend on this one for their logging conventions,
//! their validated configuration and the broadcast channel through which hosts
//! observe queue and download state changes.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};

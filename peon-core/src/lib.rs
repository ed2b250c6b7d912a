//! # peon-core
//!
//! Core library for peon-ping - audio alerts for coding agent hooks.
//!
//! This library provides:
//! - Domain types for hook events and sound categories
//! - Configuration loading and first-run seeding
//! - Sound pack manifests and sample lookup
//! - The alert decision engine (classification, spam detection, gating)
//! - Locked persistence of cross-invocation hook state
//! - Logging infrastructure
//!
//! ## Flow
//!
//! Each hook invocation is a fresh process:
//! - **Parse** the hook payload into a [`HookEvent`]
//! - **Decide** with [`AlertEngine`], under the state lock
//! - **Dispatch** the [`AlertDecision`] through the [`host`] traits
//!
//! ## Example
//!
//! ```rust,no_run
//! use peon_core::{Config, Paths};
//!
//! let paths = Paths::from_env();
//! let config = Config::load_or_default(&paths.config_path());
//! println!("active pack: {}", config.active_pack);
//! ```

// Re-export commonly used items at the crate root
pub use config::{Config, Paths};
pub use engine::{AlertDecision, AlertEngine, SoundDecision, SuppressReason};
pub use error::{Error, Result};
pub use runner::{HookOutcome, HookRunner, NoOpReason};
pub use types::*;

// Public modules
pub mod config;
pub mod engine;
pub mod error;
pub mod hook;
pub mod host;
pub mod logging;
pub mod pack;
pub mod runner;
pub mod state;
pub mod types;

//! # haktrails library
//!
//! Concurrent lookups against the SecurityTrails API, driven by a stream of
//! domains.
//!
//! Input lines are fed through a bounded channel to a fixed pool of
//! workers; each worker issues one remote call per item (or per batch for
//! `submit`) through the selected command's handler and writes the result
//! without interleaving with other workers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use haktrails_lib::{CommandRegistry, Engine, TrailsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TrailsConfig::default()
//!         .with_api_key("your-key")
//!         .with_concurrency(4);
//!     let engine = Engine::new(config)?;
//!
//!     let tags = CommandRegistry::builtin().get("tags").unwrap();
//!     engine.run(tags, &b"example.com\n"[..]).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Bounded concurrency**: never more requests in flight than workers
//! - **Per-item errors**: a failed lookup is reported and the run continues
//! - **List or JSON output**: flattened fields or the raw API payload
//! - **Layered configuration**: TOML files and environment variables

// Re-export main public API types and functions
pub use client::{ApiMethod, ApiRequest, ApiResponse, HttpTransport, Transport};
pub use commands::{invoke, CommandRegistry, DispatchMode, Handler};
pub use config::{
    load_env_config, parse_timeout_string, ApiSection, ConfigManager, DefaultsConfig, EnvConfig,
    FileConfig,
};
pub use engine::{Engine, RunSummary};
pub use error::TrailsError;
pub use render::{MemorySink, Output};
pub use types::{OutputMode, RecordType, RemoteResult, TrailsConfig, WorkItem};

// Public modules
pub mod batch;
pub mod client;
pub mod commands;
pub mod config;
pub mod input;
pub mod pool;
pub mod render;
pub mod types;

// Internal modules
mod engine;
mod error;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TrailsError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

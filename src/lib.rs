//! websearch: multi-provider web search with persisted API quotas.
//!
//! This crate wires [`websearch_core`] into something an application can
//! open with one call:
//!
//! - **Settings**: `websearch.toml` plus API credentials from the environment
//! - **Paths**: a home directory (`~/.websearch`, or `WEBSEARCH_HOME`)
//!   holding settings, the quota ledger and logs
//! - **Service**: the default slot layout, the assembled [`WebSearch`] and a
//!   page content fetcher
//! - **Logging**: a `tracing-subscriber` helper with a quiet default filter
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! websearch::logging::init();
//! let search = websearch::service::open()?;
//! let response = search.search("rust async runtimes", 10).await;
//! for result in &response.results {
//!     println!("{} {}", result.url(), result.title());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod logging;
pub mod paths;
pub mod service;
pub mod settings;

pub use error::{AppError, Result};
pub use paths::Paths;
pub use settings::{AppSettings, Credentials};
pub use websearch_core::{SearchResponse, WebSearch};

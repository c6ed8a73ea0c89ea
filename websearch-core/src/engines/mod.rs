//! Provider adapters.
//!
//! Three HTML scrapers sharing one parser ([`html`]) and two metered JSON
//! API clients. Every adapter implements [`crate::provider::SearchProvider`].

pub mod bing;
pub mod brave_api;
pub mod duckduckgo;
pub mod google_api;
pub(crate) mod html;
pub mod startpage;

pub use bing::BingEngine;
pub use brave_api::BraveApiEngine;
pub use duckduckgo::DuckDuckGoEngine;
pub use google_api::GoogleApiEngine;
pub use startpage::StartpageEngine;

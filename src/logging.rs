//! Tracing subscriber setup for binaries embedding websearch.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set. Queries are logged at `trace`
/// and stay out of the output at this level.
pub const DEFAULT_FILTER: &str = "websearch=info,websearch_core=info";

/// `RUST_LOG` if set and valid, otherwise [`DEFAULT_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a formatted stderr subscriber.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case the existing one is left in place.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        assert!(filter.to_string().contains("websearch_core=info"));
    }

    #[test]
    fn second_init_is_harmless() {
        init();
        assert!(!init());
    }
}

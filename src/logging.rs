//! Process-wide tracing setup.  The library only emits events; binaries
//! and tests that want to see them call `init_tracing` once.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static INIT_GUARD: OnceLock<bool> = OnceLock::new();

/// Installs a formatting subscriber filtered by `RUST_LOG` (default
/// `warn`).  Safe to call any number of times; returns whether this
/// process ended up with our subscriber installed.
pub fn init_tracing() -> bool {
    *INIT_GUARD.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let first = init_tracing();
        assert_eq!(init_tracing(), first);
    }
}

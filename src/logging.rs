use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the fmt subscriber. `RUST_LOG` adds directives on top of the
/// crate-level `info` default. Safe to call more than once.
pub fn init() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "echallan_dashboard=info".parse() {
            filter = filter.add_directive(directive);
        }

        // Another subscriber may already be installed by a host binary.
        let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
        tracing::debug!("tracing initialized");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init();
        super::init();
    }
}

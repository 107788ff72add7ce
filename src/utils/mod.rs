use std::sync::Once;

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVE: &str = "finsight_engine=info";

/// Initializes the global tracing subscriber. `RUST_LOG` directives win over the default.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = DEFAULT_DIRECTIVE.parse() {
            filter = filter.add_directive(directive);
        }

        // Another subscriber may already be installed by the host.
        let _ = fmt().with_env_filter(filter).try_init();
    });
}

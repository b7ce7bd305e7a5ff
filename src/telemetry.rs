//! Telemetry initialization: tracing subscriber with env-filtered fmt output.
//!
//! The audit log shares the subscriber but uses the dedicated
//! `artifact_sweeper::audit` target so operators can route it separately
//! with an `EnvFilter` directive.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// The default filter keeps the crate at debug and the audit target at info;
/// `RUST_LOG` overrides both.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "artifact_sweeper=debug,artifact_sweeper::audit=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

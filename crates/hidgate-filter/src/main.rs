//! hidgate filter daemon entry point.
//!
//! Wires together the filter session, the simulated keyboard devices from
//! the config file, and the Unix-socket control transport, then runs the
//! Tokio event loop until ctrl-c.
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML daemon configuration
//!  └─ FilterSession::new()     -- registry + detection handshake
//!  └─ attach + connect         -- one device per [[keyboards]] entry
//!  └─ serve()                  -- control socket request loop
//! ```
//!
//! Against the simulated devices, real input can be approximated with the
//! InsertPackets control operation; everything a delivered batch goes
//! through is visible in the log at `debug`/`trace` level.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hidgate_core::attributes::KeyboardAttributes;
use hidgate_core::packet::KeyboardPacket;
use hidgate_filter::application::device::InputSink;
use hidgate_filter::application::session::FilterSession;
use hidgate_filter::infrastructure::config::load_config;
use hidgate_filter::infrastructure::sink::LoggingSink;

#[cfg(unix)]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // First positional argument, if any, is an alternate config path.
    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = load_config(config_path.as_deref()).context("failed to load configuration")?;

    // Initialise structured logging. RUST_LOG overrides the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.daemon.log_level.clone())),
        )
        .init();

    info!("hidgate filter daemon starting");

    let session = Arc::new(FilterSession::<KeyboardPacket>::new());

    for keyboard in &config.keyboards {
        let device = session.attach(KeyboardAttributes::enhanced_101_key().encode());
        device
            .connect(Arc::new(LoggingSink::new(keyboard.name.clone()))
                as Arc<dyn InputSink<KeyboardPacket>>)
            .context("upstream connect failed")?;
        info!(name = %keyboard.name, "simulated keyboard attached");
    }

    // Bind the control socket, replacing any stale one from a previous run.
    let socket_path = &config.daemon.socket_path;
    let _ = std::fs::remove_file(socket_path);
    let listener = tokio::net::UnixListener::bind(socket_path)
        .with_context(|| format!("failed to bind control socket at {socket_path}"))?;
    info!(socket = %socket_path, "control surface listening");

    tokio::select! {
        result = hidgate_filter::infrastructure::server::serve(session, listener) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    let _ = std::fs::remove_file(socket_path);
    info!("hidgate filter daemon stopped");
    Ok(())
}

#[cfg(not(unix))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("the hidgate daemon's control transport requires a Unix platform");
}

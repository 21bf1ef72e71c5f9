use anyhow::Result;
use thiserror::Error;

use crate::config::Config;
use crate::input::SessionExit;

pub mod wayland;

/// Conditions that end the session with exit status 1.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Initialization failed: {0}")]
    FatalInit(String),

    #[error("Monitor {monitor}: {source}")]
    UnsupportedFormat {
        monitor: String,
        #[source]
        source: crate::pixels::PixelError,
    },

    #[error("Screen copy failed on monitor {0}")]
    CaptureFailed(String),
}

/// Runs one capture session on the Wayland compositor.
pub fn run_wayland(config: Config) -> Result<SessionExit> {
    let mut backend = wayland::WaylandBackend::new(config)?;
    backend.run()
}

// Coordinates backend startup/shutdown and drives the event loop while delegating
// protocol state to `WaylandState` and its handler modules.
use anyhow::{Context, Result, anyhow};
use calloop::{EventLoop, channel};
use log::{debug, info, warn};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use smithay_client_toolkit::{
    compositor::CompositorState,
    output::OutputState,
    reexports::calloop_wayland_source::WaylandSource,
    registry::RegistryState,
    seat::SeatState,
    shm::Shm,
};
use std::thread;
use wayland_client::{Connection, globals::registry_queue_init};
use wayland_protocols::wp::{
    cursor_shape::v1::client::wp_cursor_shape_manager_v1::WpCursorShapeManagerV1,
    fractional_scale::v1::client::wp_fractional_scale_manager_v1::WpFractionalScaleManagerV1,
    viewporter::client::wp_viewporter::WpViewporter,
};
use wayland_protocols_wlr::{
    layer_shell::v1::client::zwlr_layer_shell_v1::ZwlrLayerShellV1,
    screencopy::v1::client::zwlr_screencopy_manager_v1::ZwlrScreencopyManagerV1,
};

use super::state::{Globals, SessionEvent, WaylandState};
use crate::{
    backend::SessionError,
    config::Config,
    input::{InputOptions, InputState, SessionExit},
    recognition::{OutcomeSink, RecognitionManager, RecognitionOutcome},
};

/// Forwards recognition outcomes into the dispatch loop.
struct LoopSink(channel::Sender<SessionEvent>);

impl OutcomeSink for LoopSink {
    fn deliver(&self, outcome: RecognitionOutcome) {
        if self.0.send(SessionEvent::Recognition(outcome)).is_err() {
            warn!("Recognition outcome dropped: session loop closed");
        }
    }
}

/// Wayland backend state
pub struct WaylandBackend {
    config: Config,
    /// Tokio runtime for recognition, clipboard and notification work
    tokio_runtime: tokio::runtime::Runtime,
}

impl WaylandBackend {
    pub fn new(config: Config) -> Result<Self> {
        let tokio_runtime = tokio::runtime::Runtime::new()
            .context("Failed to create Tokio runtime for recognition")?;
        Ok(Self {
            config,
            tokio_runtime,
        })
    }

    /// Runs one session: freeze every output, let the user select and
    /// recognize, then tear everything down.
    pub fn run(&mut self) -> Result<SessionExit> {
        info!("Starting Wayland backend");

        // Connect to Wayland compositor
        let conn =
            Connection::connect_to_env().context("Failed to connect to Wayland compositor")?;
        debug!("Connected to Wayland display");

        // Initialize registry and event queue
        let (globals, mut event_queue) =
            registry_queue_init::<WaylandState>(&conn).context("Failed to initialize Wayland registry")?;
        let qh = event_queue.handle();

        // Required globals
        let compositor_state =
            CompositorState::bind(&globals, &qh).context("wl_compositor not available")?;
        let shm = Shm::bind(&globals, &qh).context("wl_shm not available")?;
        let layer_shell = globals
            .bind::<ZwlrLayerShellV1, _, _>(&qh, 1..=4, ())
            .context("zwlr_layer_shell_v1 not available")?;
        let screencopy = globals
            .bind::<ZwlrScreencopyManagerV1, _, _>(&qh, 1..=3, ())
            .context("zwlr_screencopy_manager_v1 not available")?;
        debug!("Bound compositor, shm, layer shell and screencopy");

        // Optional globals
        let fractional_scale: Option<WpFractionalScaleManagerV1> =
            globals.bind(&qh, 1..=1, ()).ok();
        if fractional_scale.is_none() {
            warn!("wp_fractional_scale_manager_v1 not available, using integer scaling");
        }
        let viewporter: Option<WpViewporter> = globals.bind(&qh, 1..=1, ()).ok();
        if viewporter.is_none() {
            warn!("wp_viewporter not available, using integer scaling");
        }
        let cursor_shape: Option<WpCursorShapeManagerV1> = globals.bind(&qh, 1..=1, ()).ok();
        if cursor_shape.is_none() {
            debug!("wp_cursor_shape_manager_v1 not available, keeping default cursor");
        }

        let output_state = OutputState::new(&globals, &qh);
        let seat_state = SeatState::new(&globals, &qh);
        let registry_state = RegistryState::new(&globals);

        let config = self.config.clone();
        debug!("  Render inactive: {}", config.capture.render_inactive);
        debug!("  Fractional scaling: {}", config.capture.fractional_scaling);
        debug!("  Overlay cursor: {}", config.capture.overlay_cursor);
        debug!(
            "  Auto copy: {}, notify: {}",
            config.output.auto_copy, config.output.notify
        );
        debug!("  Auto provider: {:?}", config.auto_provider());

        let input_state = InputState::new(InputOptions {
            auto_copy: config.output.auto_copy,
            notify: config.output.notify,
            auto_provider: config.auto_provider(),
        });

        let (event_tx, event_rx) = channel::channel::<SessionEvent>();
        let tokio_handle = self.tokio_runtime.handle().clone();
        let recognition = RecognitionManager::new(
            &tokio_handle,
            config.recognition.clone(),
            LoopSink(event_tx.clone()),
        );
        info!("Recognition worker started");

        let mut state = WaylandState::new(
            registry_state,
            compositor_state,
            shm,
            output_state,
            seat_state,
            Globals {
                layer_shell,
                screencopy,
                fractional_scale,
                viewporter,
                cursor_shape,
            },
            config,
            input_state,
            recognition,
            tokio_handle,
        );

        // Outputs and seats arrive in the first roundtrip; their overlays and
        // screen copies are requested from the handlers and answered in the second.
        event_queue
            .roundtrip(&mut state)
            .context("Initial Wayland roundtrip failed")?;
        event_queue
            .roundtrip(&mut state)
            .context("Second Wayland roundtrip failed")?;

        if state.monitors.is_empty() {
            return Err(SessionError::FatalInit("no outputs found".to_string()).into());
        }
        if state.pointer.is_none() {
            return Err(SessionError::FatalInit("no pointer device found".to_string()).into());
        }
        info!("{} overlay(s) created", state.monitors.len());

        let mut event_loop: EventLoop<WaylandState> =
            EventLoop::try_new().context("Failed to create event loop")?;
        let loop_handle = event_loop.handle();

        WaylandSource::new(conn.clone(), event_queue)
            .insert(loop_handle.clone())
            .map_err(|e| anyhow!("Failed to register Wayland source: {}", e.error))?;

        loop_handle
            .insert_source(event_rx, |event, _, state: &mut WaylandState| {
                if let channel::Event::Msg(event) = event {
                    state.handle_session_event(event);
                }
            })
            .map_err(|e| anyhow!("Failed to register session channel: {}", e.error))?;

        spawn_signal_thread(event_tx)?;

        // Main event loop
        let mut loop_error: Option<anyhow::Error> = None;
        loop {
            state.process_pending();
            state.render_dirty(&qh);

            if let Err(e) = conn.flush() {
                loop_error = Some(anyhow!("Failed to flush Wayland connection: {}", e));
                break;
            }
            if state.should_stop() {
                break;
            }

            if let Err(e) = event_loop.dispatch(None, &mut state) {
                warn!("Event loop error: {}", e);
                loop_error = Some(anyhow!("Wayland event loop error: {}", e));
                break;
            }
        }

        info!("Wayland backend exiting");
        state.teardown();
        if let Err(e) = conn.flush() {
            debug!("Flush after teardown failed: {}", e);
        }

        if let Some(err) = state.take_fatal() {
            return Err(err.into());
        }
        if let Some(e) = loop_error {
            return Err(e);
        }
        Ok(state.exit_requested().unwrap_or(SessionExit::Closed))
    }
}

/// Turns SIGINT/SIGTERM into a clean session close.
fn spawn_signal_thread(tx: channel::Sender<SessionEvent>) -> Result<()> {
    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    thread::Builder::new()
        .name("wayscan-signals".to_string())
        .spawn(move || {
            // Runs until the process exits; a closed channel means the loop is gone.
            for signal in signals.forever() {
                if tx.send(SessionEvent::Terminate(signal)).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

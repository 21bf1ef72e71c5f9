mod backend;
mod handlers;
mod monitor;
mod overlay;
mod screencopy;
mod shm;
mod state;

pub use backend::WaylandBackend;
pub use overlay::{AckPlan, OverlayLifecycle, OverlayPhase};
pub use shm::{Buffer, ShmError};

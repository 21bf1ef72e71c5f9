mod actions;
mod core;
mod mouse;

pub use core::{
    ActiveMonitor, CapturedRegion, InputOptions, InputState, PendingAction, SessionExit,
    COPIED_MESSAGE, READY_MESSAGE,
};

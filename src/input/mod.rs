//! Input handling: selection gestures, the action menu and session state.
//!
//! The backend translates compositor pointer and keyboard events into the
//! backend-independent types of [`events`] and feeds them to [`InputState`].

pub mod events;
pub mod menu;
pub mod selection;
pub mod state;

pub use events::{Key, MouseButton};
pub use menu::{Menu, MenuAction, MenuButton};
pub use selection::{DragMode, Selection};
pub use state::{
    ActiveMonitor, CapturedRegion, InputOptions, InputState, PendingAction, SessionExit,
    COPIED_MESSAGE, READY_MESSAGE,
};

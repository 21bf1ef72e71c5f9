//! Backend-independent input event types.

/// Keys the session reacts to.
///
/// Backend implementations map their native keysyms to these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Escape,
    /// Unmapped or unrecognized key
    Unknown,
}

/// Mouse button identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    /// Primary button; drives selection and menu clicks
    Left,
    Right,
    Middle,
}

//! Library exports for reusing wayscan subsystems.
//!
//! Exposes the platform-independent pieces (configuration, pixel handling,
//! selection and menu state, recognition providers) alongside the Wayland
//! backend so integration tests and tools such as `dump_config_schema` can
//! share them with the main binary.

pub mod backend;
pub mod clipboard;
pub mod config;
pub mod draw;
pub mod input;
pub mod notification;
pub mod pixels;
pub mod recognition;
pub mod util;

pub use config::Config;

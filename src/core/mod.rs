//! Core module - ambient application infrastructure
//!
//! Everything around the engine that is not chess: settings persistence,
//! logging setup, and the error type for both.
//!
//! - [`settings`] - [`Settings`] with load/save to a JSON file
//! - [`logging`] - `tracing` subscriber installation
//! - [`error`] - [`CoreError`] and [`CoreResult`]

pub mod error;
pub mod logging;
pub mod settings;

pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use settings::{load_settings, save_settings, settings_path, Settings};

//! WhisperFlow settings
//!
//! The configuration layer of the WhisperFlow dictation app: user
//! preferences held in memory for fast access and persisted to a small JSON
//! document without blocking callers or risking a torn file.
//!
//! ## Guarantees
//!
//! 1. **Always valid**: every field holds an in-domain value. Bad input is
//!    replaced by the field default, never rejected wholesale.
//! 2. **Debounced**: a burst of changes produces one write, roughly 500 ms
//!    after the last change.
//! 3. **Crash-safe**: writes go to a temp file that is atomically renamed
//!    over the document.
//! 4. **Never fatal**: a missing, oversized or corrupted file means defaults,
//!    and a failed write leaves the in-memory record authoritative.

pub mod error;
pub mod hotkey;
pub mod logging;
pub mod settings;

pub use error::SettingsError;
pub use hotkey::{HotkeyBinding, Modifier, parse_hotkey};
pub use settings::*;

//! Persistent user settings
//!
//! - `schema`: the recognized fields, their defaults and sanitization
//! - `codec`: bounded JSON load and atomic save
//! - `store`: the concurrent, debounced store applications talk to

pub mod codec;
mod config;
mod notify;
mod scheduler;
mod schema;
mod store;

pub use config::{DEFAULT_SAVE_DELAY_MS, MAX_DOCUMENT_SIZE, SETTINGS_FILE_NAME, StoreConfig};
pub use notify::{ChangeCallback, SubscriptionId};
pub use schema::{
    Field, FormattingLevel, MAX_LANGUAGE_LEN, MAX_PTT_KEY_LEN, OutputMode, SettingValue,
    UNSET_POSITION, UnknownVariant, UserSettings, WindowMode,
};
pub use store::SettingsStore;

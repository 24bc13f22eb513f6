//! Thread-safe settings store with debounced persistence
//!
//! All reads and writes of the record go through one mutex. Persisting
//! `set` calls only arm the debounce timer; the write itself happens on the
//! scheduler thread (or in an explicit `save`/`flush`). Subscribers are
//! notified after the mutex is released.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::codec;
use super::config::StoreConfig;
use super::notify::{SubscriptionId, Subscribers};
use super::scheduler::SaveScheduler;
use super::schema::{Field, FormattingLevel, OutputMode, SettingValue, UserSettings, WindowMode};
use crate::error::SettingsError;
use crate::hotkey::{self, HotkeyBinding};

/// Process-wide user settings.
///
/// Create one at startup and share it (`Arc<SettingsStore>`). Dropping the
/// store writes out any change still waiting on the debounce timer.
pub struct SettingsStore {
    shared: Arc<Shared>,
    subscribers: Subscribers,
    scheduler: SaveScheduler,
}

/// State reachable from the scheduler thread
struct Shared {
    config: StoreConfig,
    state: Mutex<State>,
    /// Serializes snapshot+write so an older snapshot never lands after a newer one
    save_lock: Mutex<()>,
}

struct State {
    settings: UserSettings,
    /// Changed since the last snapshot taken for disk
    dirty: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The record is always in-domain, so a panic elsewhere cannot leave it torn
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    /// Write the current record. With `only_if_dirty`, skip when nothing changed.
    ///
    /// Returns whether a write happened.
    fn persist(&self, only_if_dirty: bool) -> Result<bool, SettingsError> {
        let _save_guard = lock(&self.save_lock);

        let snapshot = {
            let mut state = lock(&self.state);
            if only_if_dirty && !state.dirty {
                return Ok(false);
            }
            state.dirty = false;
            state.settings.clone()
        };

        let path = &self.config.settings_path;
        match codec::store(path, &snapshot) {
            Ok(()) => {
                tracing::debug!("Settings saved to {}", path.display());
                Ok(true)
            }
            Err(e) => {
                // Keep the change pending so the next save retries it
                lock(&self.state).dirty = true;
                tracing::error!("Failed to save settings: {}", e);
                Err(e)
            }
        }
    }
}

impl SettingsStore {
    /// Create a store at defaults without touching the disk
    pub fn new(config: StoreConfig) -> Self {
        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(State {
                settings: UserSettings::default(),
                dirty: false,
            }),
            save_lock: Mutex::new(()),
        });

        let weak = Arc::downgrade(&shared);
        let scheduler = SaveScheduler::spawn(shared.config.save_delay(), move || {
            if let Some(shared) = weak.upgrade() {
                // Failure is already logged; the change stays dirty for the next attempt
                let _ = shared.persist(true);
            }
        });

        Self {
            shared,
            subscribers: Subscribers::new(),
            scheduler,
        }
    }

    /// Create a store and load the persisted settings, falling back to
    /// defaults if the file is missing or rejected
    pub fn open(config: StoreConfig) -> Self {
        let store = Self::new(config);
        // Outcome already logged by load(); defaults are fine on any failure
        let _ = store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.shared.config.settings_path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// Replace the in-memory record with the persisted one.
    ///
    /// On any error the current record is kept and the error returned.
    pub fn load(&self) -> Result<(), SettingsError> {
        let mut state = lock(&self.shared.state);
        let path = &self.shared.config.settings_path;

        match codec::load(path, self.shared.config.max_document_size) {
            Ok(settings) => {
                state.settings = settings;
                tracing::info!(
                    "Settings loaded from {}",
                    path.file_name().unwrap_or(path.as_os_str()).to_string_lossy()
                );
                Ok(())
            }
            Err(e) => {
                if e.is_not_found() {
                    tracing::debug!("No settings file yet at {}, using defaults", path.display());
                } else {
                    tracing::warn!("Ignoring settings file: {}", e);
                }
                Err(e)
            }
        }
    }

    /// Write the current record now, superseding any pending debounced save
    pub fn save(&self) -> Result<(), SettingsError> {
        self.scheduler.cancel();
        self.shared.persist(false).map(|_| ())
    }

    /// Write out a pending change immediately (no-op when nothing is pending).
    ///
    /// Returns whether a write happened.
    pub fn flush(&self) -> Result<bool, SettingsError> {
        self.scheduler.cancel();
        self.shared.persist(true)
    }

    /// True when a change has not reached the disk yet
    pub fn has_pending_save(&self) -> bool {
        lock(&self.shared.state).dirty
    }

    pub fn get(&self, field: Field) -> SettingValue {
        lock(&self.shared.state).settings.get(field)
    }

    /// Look a field up by its document name; `None` for unknown names
    pub fn get_by_name(&self, name: &str) -> Option<SettingValue> {
        Field::from_name(name).map(|field| self.get(field))
    }

    /// Copy of the whole record
    pub fn snapshot(&self) -> UserSettings {
        lock(&self.shared.state).settings.clone()
    }

    fn read<R>(&self, f: impl FnOnce(&UserSettings) -> R) -> R {
        f(&lock(&self.shared.state).settings)
    }

    /// Sanitize and store `value`, then notify subscribers.
    ///
    /// With `persist`, a debounced save is (re)armed. Returns the value
    /// actually stored, which differs from the input when it was out of domain.
    pub fn set(&self, field: Field, value: impl Into<Value>, persist: bool) -> SettingValue {
        let raw = value.into();
        let stored = {
            let mut state = lock(&self.shared.state);
            let stored = state.settings.apply(field, &raw);
            if persist {
                state.dirty = true;
                self.scheduler.arm();
            }
            stored
        };

        self.subscribers.notify(field, &stored);
        stored
    }

    /// Like [`set`](Self::set) but keyed by document name.
    ///
    /// Unknown names are ignored (`None`), nothing is stored or notified.
    pub fn set_by_name(
        &self,
        name: &str,
        value: impl Into<Value>,
        persist: bool,
    ) -> Option<SettingValue> {
        let Some(field) = Field::from_name(name) else {
            tracing::trace!("Ignoring unknown settings field {:?}", name);
            return None;
        };
        Some(self.set(field, value, persist))
    }

    /// Subscribe to changes. Callbacks run on the thread calling `set`, in
    /// subscription order, without the store lock held.
    pub fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Field, &SettingValue) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Unsubscribe; returns false (not an error) for an unknown id
    pub fn remove_callback(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub fn ptt_key(&self) -> String {
        self.read(|s| s.push_to_talk_key.clone())
    }

    pub fn set_ptt_key(&self, key: &str) {
        self.set(Field::PushToTalkKey, key, true);
    }

    /// The push-to-talk key parsed into key + modifiers
    pub fn ptt_binding(&self) -> HotkeyBinding {
        hotkey::parse_hotkey(&self.ptt_key())
    }

    pub fn language(&self) -> String {
        self.read(|s| s.language.clone())
    }

    pub fn set_language(&self, language: &str) {
        self.set(Field::Language, language, true);
    }

    pub fn output_mode(&self) -> OutputMode {
        self.read(|s| s.output_mode)
    }

    pub fn set_output_mode(&self, mode: OutputMode) {
        self.set(Field::OutputMode, mode, true);
    }

    pub fn smart_formatting(&self) -> (bool, FormattingLevel) {
        self.read(|s| (s.smart_formatting_enabled, s.smart_formatting_level))
    }

    /// Both halves are written, but only one save is scheduled
    pub fn set_smart_formatting(&self, enabled: bool, level: FormattingLevel) {
        self.set(Field::SmartFormattingEnabled, enabled, false);
        self.set(Field::SmartFormattingLevel, level, true);
    }

    pub fn window_mode(&self) -> WindowMode {
        self.read(|s| s.window_mode)
    }

    pub fn set_window_mode(&self, mode: WindowMode) {
        self.set(Field::WindowMode, mode, true);
    }

    /// (-1, -1) when the window was never placed
    pub fn window_position(&self) -> (i64, i64) {
        self.read(|s| (s.window_position_x, s.window_position_y))
    }

    pub fn set_window_position(&self, x: i64, y: i64) {
        self.set(Field::WindowPositionX, x, false);
        self.set(Field::WindowPositionY, y, true);
    }
}

impl Drop for SettingsStore {
    fn drop(&mut self) {
        // Runs a pending debounced save before the worker exits
        self.scheduler.shutdown();
    }
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("path", &self.shared.config.settings_path)
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

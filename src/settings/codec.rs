//! Settings file I/O
//!
//! Loading is bounded in size and rejects anything that is not a flat JSON
//! object. Saving goes through a sibling temp file and an atomic rename, so a
//! reader never observes a half-written document.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::schema::UserSettings;
use crate::error::SettingsError;

/// Sibling path used for the in-flight write (`user_settings.json.tmp`)
pub fn temp_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".tmp")
}

/// Sibling path of the advisory lock file (`user_settings.json.lock`)
pub fn lock_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".lock")
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("settings"));
    name.push(suffix);
    path.with_file_name(name)
}

/// Load and sanitize the settings document at `path`.
///
/// Fails with `NotFound` when there is no file, `TooLarge` when it exceeds
/// `max_size` bytes and `InvalidDocument` when it is not a JSON object.
pub fn load(path: &Path, max_size: u64) -> Result<UserSettings, SettingsError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SettingsError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(SettingsError::io(path, e)),
    };

    let size = file
        .metadata()
        .map_err(|e| SettingsError::io(path, e))?
        .len();
    if size > max_size {
        return Err(SettingsError::TooLarge {
            path: path.to_path_buf(),
            size,
            max: max_size,
        });
    }

    // The file may grow between stat and read, so bound the read as well
    let mut bytes = Vec::with_capacity(size as usize);
    file.take(max_size.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| SettingsError::io(path, e))?;
    if bytes.len() as u64 > max_size {
        return Err(SettingsError::TooLarge {
            path: path.to_path_buf(),
            size: bytes.len() as u64,
            max: max_size,
        });
    }

    decode(path, &bytes)
}

/// Parse raw document bytes into a sanitized record
pub fn decode(path: &Path, bytes: &[u8]) -> Result<UserSettings, SettingsError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| SettingsError::invalid(path, format!("malformed JSON: {e}")))?;

    UserSettings::from_value(&value)
        .ok_or_else(|| SettingsError::invalid(path, "top level is not a field/value mapping"))
}

/// Serialize a record to the on-disk text form (pretty JSON, trailing newline)
pub fn encode(settings: &UserSettings) -> Result<String, SettingsError> {
    let mut content = serde_json::to_string_pretty(&settings.to_value())?;
    content.push('\n');
    Ok(content)
}

/// Persist `settings` at `path` with an atomic write and file locking.
///
/// This ensures:
/// 1. Exclusive lock prevents two processes from interleaving saves
/// 2. Atomic write (temp file + rename) prevents corruption on crash
/// 3. Parent directory is created if needed
///
/// On failure the temp file is removed and any previous document is left as it was.
pub fn store(path: &Path, settings: &UserSettings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SettingsError::io(parent, e))?;
    }

    let content = encode(settings)?;

    // Lock file is separate from the document so the rename does not drop it
    let lock_path = lock_path(path);
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&lock_path)
        .map_err(|e| SettingsError::io(&lock_path, e))?;
    lock_file
        .lock_exclusive()
        .map_err(|e| SettingsError::io(&lock_path, e))?;

    let temp_path = temp_path(path);
    let result = write_temp(&temp_path, content.as_bytes()).and_then(|()| {
        std::fs::rename(&temp_path, path).map_err(|e| SettingsError::io(path, e))
    });

    if result.is_err() {
        if let Err(e) = std::fs::remove_file(&temp_path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::debug!("Could not remove {}: {}", temp_path.display(), e);
            }
        }
    }

    // Lock is released when lock_file is dropped
    result
}

fn write_temp(temp_path: &Path, content: &[u8]) -> Result<(), SettingsError> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| SettingsError::io(temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| SettingsError::io(temp_path, e))?;

    temp_file
        .sync_all()
        .map_err(|e| SettingsError::io(temp_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::schema::OutputMode;
    use tempfile::TempDir;

    const MAX: u64 = 10 * 1024;

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("user_settings.json"), MAX).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_store_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("user_settings.json");
        let mut settings = UserSettings::default();
        settings.output_mode = OutputMode::Clipboard;
        settings.language = "日本語".to_string();

        store(&path, &settings).unwrap();
        assert_eq!(load(&path, MAX).unwrap(), settings);
        assert!(!temp_path(&path).exists());

        // Non-ASCII is written verbatim, not \u-escaped
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("日本語"));
        assert!(text.contains("\n  \"language\""));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_settings.json");
        let padding = " ".repeat(11 * 1024);
        std::fs::write(&path, format!("{{\"language\": \"en\"}}{padding}")).unwrap();

        let err = load(&path, MAX).unwrap_err();
        assert!(matches!(err, SettingsError::TooLarge { .. }));
        assert!(err.is_invalid());
    }

    #[test]
    fn test_malformed_json_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_settings.json");
        std::fs::write(&path, "{\"language\": \"en\"").unwrap();
        let err = load(&path, MAX).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidDocument { .. }));
    }

    #[test]
    fn test_non_object_top_level_rejected() {
        let path = Path::new("user_settings.json");
        assert!(decode(path, b"[\"language\", \"en\"]").unwrap_err().is_invalid());
        assert!(decode(path, b"42").unwrap_err().is_invalid());
        assert!(decode(path, b"null").unwrap_err().is_invalid());
    }

    #[test]
    fn test_failed_store_leaves_previous_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_settings.json");
        store(&path, &UserSettings::default()).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        // A directory squatting on the temp path makes the temp write fail
        std::fs::create_dir(temp_path(&path)).unwrap();
        let mut changed = UserSettings::default();
        changed.language = "en".to_string();
        assert!(store(&path, &changed).is_err());

        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_settings.json");
        // A non-empty directory at the target: the temp write succeeds, the rename does not
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupant"), "x").unwrap();

        assert!(store(&path, &UserSettings::default()).is_err());
        assert!(!temp_path(&path).exists());
        assert!(path.join("occupant").exists());
    }

    #[test]
    fn test_size_bound_is_inclusive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_settings.json");
        let document = "{\"language\": \"en\"}";
        let padded = |len: usize| format!("{document}{}", " ".repeat(len - document.len()));

        std::fs::write(&path, padded(10240)).unwrap();
        assert_eq!(load(&path, MAX).unwrap().language, "en");

        std::fs::write(&path, padded(10241)).unwrap();
        match load(&path, MAX).unwrap_err() {
            SettingsError::TooLarge { size, max, .. } => {
                assert_eq!(size, 10241);
                assert_eq!(max, 10240);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_size_bound() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_settings.json");
        store(&path, &UserSettings::default()).unwrap();
        let size = std::fs::metadata(&path).unwrap().len();

        assert!(load(&path, size).is_ok());
        assert!(matches!(
            load(&path, size - 1),
            Err(SettingsError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_sibling_paths() {
        let path = Path::new("/data/user_settings.json");
        assert_eq!(temp_path(path), PathBuf::from("/data/user_settings.json.tmp"));
        assert_eq!(lock_path(path), PathBuf::from("/data/user_settings.json.lock"));
    }
}

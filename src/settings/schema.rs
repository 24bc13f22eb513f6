//! Settings schema: the fixed set of user preferences, their defaults and
//! the sanitization applied to every incoming value.
//!
//! Parsing is total. A value outside a field's domain is replaced by that
//! field's default, so one bad entry never prevents the rest of a document
//! from loading. Unknown keys are ignored.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum length (in characters) of the push-to-talk key string
pub const MAX_PTT_KEY_LEN: usize = 50;

/// Maximum length (in characters) of the language code
pub const MAX_LANGUAGE_LEN: usize = 10;

/// Window position meaning "centred / never placed"
pub const UNSET_POSITION: i64 = -1;

/// How transcribed text is delivered to the focused application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Simulated keystrokes
    #[default]
    Type,
    /// Copy to clipboard
    Clipboard,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Type => "type",
            OutputMode::Clipboard => "clipboard",
        }
    }
}

/// Post-processing aggressiveness for transcribed text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormattingLevel {
    None,
    #[default]
    Basic,
    Smart,
}

impl FormattingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormattingLevel::None => "none",
            FormattingLevel::Basic => "basic",
            FormattingLevel::Smart => "smart",
        }
    }
}

/// Main window behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// Small always-on-top widget
    #[default]
    Floating,
    /// Regular decorated window
    Normal,
}

impl WindowMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowMode::Floating => "floating",
            WindowMode::Normal => "normal",
        }
    }
}

/// Error returned when a string names no known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

// Parsing goes through the serde derive so the wire names live in one place
macro_rules! impl_wire_name {
    ($ty:ident, $kind:literal) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::deserialize(StrDeserializer::<ValueError>::new(s)).map_err(|_| {
                    UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }
                })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_wire_name!(OutputMode, "output mode");
impl_wire_name!(FormattingLevel, "formatting level");
impl_wire_name!(WindowMode, "window mode");

/// Names of the recognized settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    PushToTalkKey,
    OutputMode,
    Language,
    SmartFormattingEnabled,
    SmartFormattingLevel,
    WindowMode,
    WindowPositionX,
    WindowPositionY,
}

impl Field {
    /// All fields in document order
    pub const ALL: [Field; 8] = [
        Field::PushToTalkKey,
        Field::OutputMode,
        Field::Language,
        Field::SmartFormattingEnabled,
        Field::SmartFormattingLevel,
        Field::WindowMode,
        Field::WindowPositionX,
        Field::WindowPositionY,
    ];

    /// Key used in the persisted document
    pub fn name(&self) -> &'static str {
        match self {
            Field::PushToTalkKey => "push_to_talk_key",
            Field::OutputMode => "output_mode",
            Field::Language => "language",
            Field::SmartFormattingEnabled => "smart_formatting_enabled",
            Field::SmartFormattingLevel => "smart_formatting_level",
            Field::WindowMode => "window_mode",
            Field::WindowPositionX => "window_position_x",
            Field::WindowPositionY => "window_position_y",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn default_value(&self) -> SettingValue {
        UserSettings::default().get(*self)
    }
}

impl FromStr for Field {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::from_name(s).ok_or_else(|| UnknownVariant {
            kind: "settings field",
            value: s.to_string(),
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A sanitized value as stored in the record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Text(String),
    Bool(bool),
    Int(i64),
    OutputMode(OutputMode),
    FormattingLevel(FormattingLevel),
    WindowMode(WindowMode),
}

impl SettingValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            SettingValue::OutputMode(m) => Some(m.as_str()),
            SettingValue::FormattingLevel(l) => Some(l.as_str()),
            SettingValue::WindowMode(m) => Some(m.as_str()),
            SettingValue::Bool(_) | SettingValue::Int(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Wire representation used in the persisted document
    pub fn to_json(&self) -> Value {
        match self {
            SettingValue::Text(s) => Value::String(s.clone()),
            SettingValue::Bool(b) => Value::Bool(*b),
            SettingValue::Int(n) => Value::from(*n),
            SettingValue::OutputMode(m) => Value::String(m.as_str().to_string()),
            SettingValue::FormattingLevel(l) => Value::String(l.as_str().to_string()),
            SettingValue::WindowMode(m) => Value::String(m.as_str().to_string()),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(n) => write!(f, "{n}"),
            other => f.write_str(other.as_str().unwrap_or_default()),
        }
    }
}

impl From<SettingValue> for Value {
    fn from(value: SettingValue) -> Self {
        value.to_json()
    }
}

impl From<OutputMode> for Value {
    fn from(mode: OutputMode) -> Self {
        Value::String(mode.as_str().to_string())
    }
}

impl From<FormattingLevel> for Value {
    fn from(level: FormattingLevel) -> Self {
        Value::String(level.as_str().to_string())
    }
}

impl From<WindowMode> for Value {
    fn from(mode: WindowMode) -> Self {
        Value::String(mode.as_str().to_string())
    }
}

/// User-adjustable preferences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSettings {
    pub push_to_talk_key: String,
    pub output_mode: OutputMode,
    /// Transcription locale (e.g. "fr", "en")
    pub language: String,
    pub smart_formatting_enabled: bool,
    pub smart_formatting_level: FormattingLevel,
    pub window_mode: WindowMode,
    /// -1 = centred
    pub window_position_x: i64,
    pub window_position_y: i64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            push_to_talk_key: "f2".to_string(),
            output_mode: OutputMode::Type,
            language: "fr".to_string(),
            smart_formatting_enabled: true,
            smart_formatting_level: FormattingLevel::Basic,
            window_mode: WindowMode::Floating,
            window_position_x: UNSET_POSITION,
            window_position_y: UNSET_POSITION,
        }
    }
}

impl UserSettings {
    /// Build a record from a field/value mapping.
    ///
    /// Never fails: missing or out-of-domain entries take the field default,
    /// unknown keys are ignored.
    pub fn parse(data: &Map<String, Value>) -> Self {
        let mut settings = Self::default();
        for field in Field::ALL {
            if let Some(raw) = data.get(field.name()) {
                settings.apply(field, raw);
            }
        }
        settings
    }

    /// Like [`parse`](Self::parse), but `None` when the top level is not a mapping
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(Self::parse)
    }

    /// Canonical document: exactly the declared fields, nothing else
    pub fn serialize(&self) -> Map<String, Value> {
        Field::ALL
            .into_iter()
            .map(|field| (field.name().to_string(), self.get(field).to_json()))
            .collect()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.serialize())
    }

    pub fn get(&self, field: Field) -> SettingValue {
        match field {
            Field::PushToTalkKey => SettingValue::Text(self.push_to_talk_key.clone()),
            Field::OutputMode => SettingValue::OutputMode(self.output_mode),
            Field::Language => SettingValue::Text(self.language.clone()),
            Field::SmartFormattingEnabled => SettingValue::Bool(self.smart_formatting_enabled),
            Field::SmartFormattingLevel => {
                SettingValue::FormattingLevel(self.smart_formatting_level)
            }
            Field::WindowMode => SettingValue::WindowMode(self.window_mode),
            Field::WindowPositionX => SettingValue::Int(self.window_position_x),
            Field::WindowPositionY => SettingValue::Int(self.window_position_y),
        }
    }

    /// Sanitize `raw` into `field`'s domain, store it, and return what was stored
    pub fn apply(&mut self, field: Field, raw: &Value) -> SettingValue {
        let defaults = Self::default();
        match field {
            Field::PushToTalkKey => {
                self.push_to_talk_key =
                    coerce_text(raw, MAX_PTT_KEY_LEN).unwrap_or(defaults.push_to_talk_key);
            }
            Field::OutputMode => {
                self.output_mode = coerce_enum(raw).unwrap_or(defaults.output_mode);
            }
            Field::Language => {
                self.language = coerce_text(raw, MAX_LANGUAGE_LEN).unwrap_or(defaults.language);
            }
            Field::SmartFormattingEnabled => {
                self.smart_formatting_enabled = truthy(raw);
            }
            Field::SmartFormattingLevel => {
                self.smart_formatting_level =
                    coerce_enum(raw).unwrap_or(defaults.smart_formatting_level);
            }
            Field::WindowMode => {
                self.window_mode = coerce_enum(raw).unwrap_or(defaults.window_mode);
            }
            Field::WindowPositionX => {
                self.window_position_x = coerce_int(raw).unwrap_or(defaults.window_position_x);
            }
            Field::WindowPositionY => {
                self.window_position_y = coerce_int(raw).unwrap_or(defaults.window_position_y);
            }
        }
        self.get(field)
    }
}

/// String form of a scalar, truncated to `max_chars` characters
fn coerce_text(raw: &Value, max_chars: usize) -> Option<String> {
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    Some(text.chars().take(max_chars).collect())
}

/// Only plain strings name a variant; `{"normal": null}` style enum maps are rejected
fn coerce_enum<T: DeserializeOwned>(raw: &Value) -> Option<T> {
    raw.as_str()?;
    T::deserialize(raw).ok()
}

fn truthy(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

fn coerce_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            // `as` saturates, so reject anything outside the i64 range first
            (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64)
                .then(|| f.trunc() as i64)
        }),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

//! Hotkey parsing utilities
//!
//! Normalizes strings such as `"Ctrl+Shift+Space"` or `"win+v"` into a
//! canonical key name plus a set of canonical modifiers.

use std::collections::BTreeSet;
use std::fmt;

/// Canonical modifier keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    /// Command on macOS, Windows/Super key elsewhere
    Cmd,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Ctrl => "ctrl",
            Modifier::Alt => "alt",
            Modifier::Shift => "shift",
            Modifier::Cmd => "cmd",
        }
    }

    /// Resolve a (lowercase) modifier name or alias
    pub fn from_alias(name: &str) -> Option<Modifier> {
        match name {
            "ctrl" | "control" | "ctrl_l" | "ctrl_r" => Some(Modifier::Ctrl),
            "alt" | "alt_l" | "alt_r" | "option" => Some(Modifier::Alt),
            "shift" | "shift_l" | "shift_r" => Some(Modifier::Shift),
            "cmd" | "command" | "win" | "super" | "meta" => Some(Modifier::Cmd),
            _ => None,
        }
    }
}

/// A parsed `modifier+modifier+key` combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    /// Lowercase key name (e.g. "f2", "space", "'")
    pub key: String,
    pub modifiers: BTreeSet<Modifier>,
}

impl HotkeyBinding {
    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}

impl fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier.as_str())?;
        }
        f.write_str(&self.key)
    }
}

/// Parse a hotkey string. Case-insensitive; the last segment is the key.
///
/// Segments before the key that are not known modifiers are ignored.
pub fn parse_hotkey(hotkey_str: &str) -> HotkeyBinding {
    let hotkey_lower = hotkey_str.trim().to_lowercase();
    let parts: Vec<&str> = hotkey_lower.split('+').map(str::trim).collect();

    let (key_part, modifier_parts) = match parts.split_last() {
        Some((key, rest)) => (*key, rest),
        None => ("", &[][..]),
    };

    let modifiers = modifier_parts
        .iter()
        .filter_map(|part| Modifier::from_alias(part))
        .collect();

    HotkeyBinding {
        key: key_part.to_string(),
        modifiers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mods(list: &[Modifier]) -> BTreeSet<Modifier> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_single_key() {
        let binding = parse_hotkey("f2");
        assert_eq!(binding.key, "f2");
        assert!(binding.modifiers.is_empty());

        assert_eq!(parse_hotkey("escape").key, "escape");
        assert_eq!(parse_hotkey("a").key, "a");
    }

    #[test]
    fn test_modifiers() {
        let binding = parse_hotkey("ctrl+f2");
        assert_eq!(binding.key, "f2");
        assert_eq!(binding.modifiers, mods(&[Modifier::Ctrl]));

        let binding = parse_hotkey("ctrl+alt+shift+space");
        assert_eq!(binding.key, "space");
        assert_eq!(
            binding.modifiers,
            mods(&[Modifier::Ctrl, Modifier::Alt, Modifier::Shift])
        );
    }

    #[test]
    fn test_case_insensitive() {
        let binding = parse_hotkey("Ctrl+Shift+Space");
        assert_eq!(binding.key, "space");
        assert_eq!(binding.modifiers, mods(&[Modifier::Ctrl, Modifier::Shift]));
        assert_eq!(parse_hotkey("CTRL+F2").key, "f2");
    }

    #[test]
    fn test_aliases() {
        for (input, expected) in [
            ("control+a", Modifier::Ctrl),
            ("ctrl_l+a", Modifier::Ctrl),
            ("ctrl_r+a", Modifier::Ctrl),
            ("alt_l+x", Modifier::Alt),
            ("alt_r+x", Modifier::Alt),
            ("shift_l+tab", Modifier::Shift),
            ("shift_r+tab", Modifier::Shift),
            ("cmd+c", Modifier::Cmd),
            ("win+v", Modifier::Cmd),
            ("super+l", Modifier::Cmd),
            ("meta+x", Modifier::Cmd),
        ] {
            assert_eq!(parse_hotkey(input).modifiers, mods(&[expected]), "{input}");
        }
    }

    #[test]
    fn test_special_character_key() {
        let binding = parse_hotkey("ctrl+'");
        assert_eq!(binding.key, "'");
        assert!(binding.has_modifier(Modifier::Ctrl));
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(parse_hotkey("Shift+Control+K").to_string(), "ctrl+shift+k");
        assert_eq!(parse_hotkey("f2").to_string(), "f2");
    }
}

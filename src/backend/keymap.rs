//! Key mapping for console input
//!
//! Converts crossterm key events into the raw codes a read delivers. With
//! keypad mode on, special keys become a single decoded code; with keypad
//! off they arrive as their VT byte sequence, one code per byte.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::input::{RawCode, SpecialKey};

const ESC: u8 = 0x1B;

/// CSI parameters of F5..F12
const FKEY_PARAMS: [u8; 8] = [15, 17, 18, 19, 20, 21, 23, 24];

/// Key mapper for converting key events to raw codes
pub struct KeyMapper;

impl KeyMapper {
    /// Map a key event to the raw codes it produces.
    pub fn map(event: &KeyEvent, keypad: bool) -> Vec<RawCode> {
        let mods = event.modifiers;
        if keypad {
            if let Some(key) = Self::special(event.code, mods) {
                return vec![key.code()];
            }
        }
        match event.code {
            KeyCode::Char(ch) => Self::char_codes(ch, mods),
            code => Self::sequence(code, mods)
                .into_iter()
                .map(RawCode::from)
                .collect(),
        }
    }

    /// Special key decoded in keypad mode, if the key is one.
    pub fn special(code: KeyCode, mods: KeyModifiers) -> Option<SpecialKey> {
        let key = match code {
            KeyCode::Up => SpecialKey::Up,
            KeyCode::Down => SpecialKey::Down,
            KeyCode::Left => SpecialKey::Left,
            KeyCode::Right => SpecialKey::Right,
            KeyCode::Home => SpecialKey::Home,
            KeyCode::End => SpecialKey::End,
            KeyCode::PageUp => SpecialKey::PageUp,
            KeyCode::PageDown => SpecialKey::PageDown,
            KeyCode::Insert => SpecialKey::Insert,
            KeyCode::Delete => SpecialKey::Delete,
            KeyCode::Backspace => SpecialKey::Backspace,
            KeyCode::BackTab => SpecialKey::BackTab,
            KeyCode::Tab if mods.contains(KeyModifiers::SHIFT) => SpecialKey::BackTab,
            KeyCode::F(n) => SpecialKey::F(n),
            _ => return None,
        };
        Some(key)
    }

    /// Codes for a typed character: Ctrl folds to a control code, Alt
    /// prefixes ESC.
    fn char_codes(ch: char, mods: KeyModifiers) -> Vec<RawCode> {
        let folded = if mods.contains(KeyModifiers::CONTROL) {
            Self::control(ch)
        } else {
            None
        };
        let code = folded.map_or(RawCode::from(ch), RawCode::from);
        if mods.contains(KeyModifiers::ALT) {
            vec![RawCode::from(ESC), code]
        } else {
            vec![code]
        }
    }

    fn control(ch: char) -> Option<u8> {
        match ch.to_ascii_lowercase() {
            c @ 'a'..='z' => Some(c as u8 - b'a' + 1),
            '@' | '`' | ' ' => Some(0x00),
            '[' => Some(ESC),
            '\\' => Some(0x1C),
            ']' => Some(0x1D),
            '^' | '~' => Some(0x1E),
            '_' | '?' => Some(0x1F),
            _ => None,
        }
    }

    /// Bytes a VT terminal sends for a non-character key
    fn sequence(code: KeyCode, mods: KeyModifiers) -> Vec<u8> {
        match code {
            KeyCode::Enter => vec![b'\n'],
            KeyCode::Esc => vec![ESC],
            KeyCode::Backspace if mods.contains(KeyModifiers::ALT) => vec![ESC, 0x7F],
            KeyCode::Backspace => vec![0x7F],
            KeyCode::BackTab => Self::csi(None, 'Z', KeyModifiers::NONE),
            KeyCode::Tab if mods.contains(KeyModifiers::SHIFT) => {
                Self::csi(None, 'Z', KeyModifiers::NONE)
            }
            KeyCode::Tab => vec![b'\t'],

            KeyCode::Up => Self::csi(None, 'A', mods),
            KeyCode::Down => Self::csi(None, 'B', mods),
            KeyCode::Right => Self::csi(None, 'C', mods),
            KeyCode::Left => Self::csi(None, 'D', mods),
            KeyCode::Home => Self::csi(None, 'H', mods),
            KeyCode::End => Self::csi(None, 'F', mods),

            KeyCode::Insert => Self::csi(Some(2), '~', mods),
            KeyCode::Delete => Self::csi(Some(3), '~', mods),
            KeyCode::PageUp => Self::csi(Some(5), '~', mods),
            KeyCode::PageDown => Self::csi(Some(6), '~', mods),

            // F1..F4 use SS3 unless modified
            KeyCode::F(n @ 1..=4) if mods.is_empty() => vec![ESC, b'O', b'O' + n],
            KeyCode::F(n @ 1..=4) => Self::csi(Some(1), char::from(b'O' + n), mods),
            KeyCode::F(n @ 5..=12) => Self::csi(Some(FKEY_PARAMS[usize::from(n - 5)]), '~', mods),

            _ => Vec::new(),
        }
    }

    /// `ESC [ param ; modifier final`. The modifier parameter is only
    /// present when a modifier is held, and forces a leading `1`.
    fn csi(param: Option<u8>, final_byte: char, mods: KeyModifiers) -> Vec<u8> {
        let seq = match (param, Self::modifier_param(mods)) {
            (None, None) => format!("\x1b[{}", final_byte),
            (Some(p), None) => format!("\x1b[{}{}", p, final_byte),
            (p, Some(m)) => format!("\x1b[{};{}{}", p.unwrap_or(1), m, final_byte),
        };
        seq.into_bytes()
    }

    /// xterm modifier parameter: 1 + shift(1) + alt(2) + ctrl(4)
    fn modifier_param(mods: KeyModifiers) -> Option<u8> {
        let weight: u8 = [
            (KeyModifiers::SHIFT, 1),
            (KeyModifiers::ALT, 2),
            (KeyModifiers::CONTROL, 4),
        ]
        .iter()
        .filter(|(m, _)| mods.contains(*m))
        .map(|(_, w)| w)
        .sum();
        (weight > 0).then_some(1 + weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::{Key, KeyTable};

    fn press(code: KeyCode, mods: KeyModifiers) -> Vec<RawCode> {
        KeyMapper::map(&KeyEvent::new(code, mods), false)
    }

    fn press_keypad(code: KeyCode, mods: KeyModifiers) -> Vec<RawCode> {
        KeyMapper::map(&KeyEvent::new(code, mods), true)
    }

    fn raw(bytes: &[u8]) -> Vec<RawCode> {
        bytes.iter().copied().map(RawCode::from).collect()
    }

    #[test]
    fn test_typed_characters() {
        assert_eq!(press_keypad(KeyCode::Char('a'), KeyModifiers::NONE), raw(b"a"));
        assert_eq!(press(KeyCode::Char('c'), KeyModifiers::CONTROL), raw(&[0x03]));
        assert_eq!(press(KeyCode::Char('x'), KeyModifiers::ALT), raw(b"\x1bx"));
        assert_eq!(
            press(KeyCode::Char('['), KeyModifiers::CONTROL | KeyModifiers::ALT),
            raw(&[ESC, ESC])
        );
        // beyond ASCII the scalar value is the code
        assert_eq!(
            press(KeyCode::Char('é'), KeyModifiers::NONE),
            vec!['é' as RawCode]
        );
    }

    #[test]
    fn test_extended_latin_with_keypad() {
        for ch in ['ă', 'ł'] {
            let codes = press_keypad(KeyCode::Char(ch), KeyModifiers::NONE);
            assert_eq!(codes, vec![ch as RawCode]);
            assert_eq!(KeyTable::standard().decode(codes[0]), Key::Char(ch));
        }
    }

    #[test]
    fn test_cursor_keys_follow_keypad() {
        assert_eq!(
            press_keypad(KeyCode::Up, KeyModifiers::NONE),
            vec![SpecialKey::Up.code()]
        );
        assert_eq!(press(KeyCode::Up, KeyModifiers::NONE), raw(b"\x1b[A"));
        assert_eq!(press(KeyCode::Left, KeyModifiers::CONTROL), raw(b"\x1b[1;5D"));
        assert_eq!(press(KeyCode::PageDown, KeyModifiers::NONE), raw(b"\x1b[6~"));
        assert_eq!(press(KeyCode::Delete, KeyModifiers::SHIFT), raw(b"\x1b[3;2~"));
    }

    #[test]
    fn test_function_key_sequences() {
        assert_eq!(press(KeyCode::F(1), KeyModifiers::NONE), raw(b"\x1bOP"));
        assert_eq!(press(KeyCode::F(4), KeyModifiers::ALT), raw(b"\x1b[1;3S"));
        assert_eq!(press(KeyCode::F(5), KeyModifiers::NONE), raw(b"\x1b[15~"));
        assert_eq!(press(KeyCode::F(12), KeyModifiers::SHIFT), raw(b"\x1b[24;2~"));
        assert_eq!(
            press_keypad(KeyCode::F(1), KeyModifiers::NONE),
            vec![SpecialKey::F(1).code()]
        );
    }

    #[test]
    fn test_enter_and_back_tab() {
        assert_eq!(press_keypad(KeyCode::Enter, KeyModifiers::NONE), raw(b"\n"));
        assert_eq!(
            press_keypad(KeyCode::Tab, KeyModifiers::SHIFT),
            vec![SpecialKey::BackTab.code()]
        );
        assert_eq!(press(KeyCode::Tab, KeyModifiers::SHIFT), raw(b"\x1b[Z"));
        assert_eq!(press(KeyCode::Tab, KeyModifiers::NONE), raw(b"\t"));
    }
}

//! Input codes, special keys and read-shape resolution.
//!
//! A raw input code is what the terminal delivers for one read: a Unicode
//! scalar value for ordinary characters, or a code at or above
//! [`SPECIAL_BASE`] for decoded special keys. The two ranges never overlap,
//! so no typed character can decode as a special key. Which of the four result shapes
//! a read produces depends only on the current window's `(no_delay, keypad)`
//! flags:
//!
//! | no_delay | keypad | shape |
//! |----------|--------|-------|
//! | false | false | `char` |
//! | false | true  | [`Key`] |
//! | true  | false | `Option<char>` |
//! | true  | true  | `Option<Key>` |

use std::collections::HashMap;

use super::state::WindowDesc;

/// Raw code delivered by the terminal for one read.
pub type RawCode = u32;

/// First code used for special keys, just past the last Unicode scalar value.
pub const SPECIAL_BASE: RawCode = char::MAX as RawCode + 1;

/// Function keys occupy their own band after the named keys.
const FKEY_BASE: RawCode = SPECIAL_BASE + 0x100;

/// Whether a raw code is in the special-key range.
pub fn is_special(code: RawCode) -> bool {
    code >= SPECIAL_BASE
}

/// Decoded special (non-character) keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialKey {
    Down,
    Up,
    Left,
    Right,
    Home,
    End,
    Backspace,
    /// Function key F0..F255
    F(u8),
    Delete,
    Insert,
    PageDown,
    PageUp,
    Enter,
    BackTab,
    Resize,
}

impl SpecialKey {
    /// Raw code the terminal uses for this key. Named keys keep their
    /// curses offsets, function keys map one-to-one into their own band.
    pub fn code(self) -> RawCode {
        let offset: RawCode = match self {
            SpecialKey::F(n) => return FKEY_BASE + RawCode::from(n),
            SpecialKey::Down => 0o002,
            SpecialKey::Up => 0o003,
            SpecialKey::Left => 0o004,
            SpecialKey::Right => 0o005,
            SpecialKey::Home => 0o006,
            SpecialKey::Backspace => 0o007,
            SpecialKey::Delete => 0o112,
            SpecialKey::Insert => 0o113,
            SpecialKey::PageDown => 0o122,
            SpecialKey::PageUp => 0o123,
            SpecialKey::Enter => 0o127,
            SpecialKey::BackTab => 0o141,
            SpecialKey::End => 0o150,
            SpecialKey::Resize => 0o232,
        };
        SPECIAL_BASE + offset
    }

    fn all() -> impl Iterator<Item = SpecialKey> {
        [
            SpecialKey::Down,
            SpecialKey::Up,
            SpecialKey::Left,
            SpecialKey::Right,
            SpecialKey::Home,
            SpecialKey::End,
            SpecialKey::Backspace,
            SpecialKey::Delete,
            SpecialKey::Insert,
            SpecialKey::PageDown,
            SpecialKey::PageUp,
            SpecialKey::Enter,
            SpecialKey::BackTab,
            SpecialKey::Resize,
        ]
        .into_iter()
        .chain((0..=u8::MAX).map(SpecialKey::F))
    }
}

/// A character or a decoded special key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Special(SpecialKey),
}

/// Fixed raw-code to special-key mapping, built once per session.
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    keys: HashMap<RawCode, SpecialKey>,
}

impl KeyTable {
    /// Table covering every [`SpecialKey`] at its standard code.
    pub fn standard() -> Self {
        SpecialKey::all().map(|k| (k.code(), k)).collect()
    }

    pub fn lookup(&self, code: RawCode) -> Option<SpecialKey> {
        self.keys.get(&code).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Decode a raw code under keypad mode: a table hit is a special key,
    /// anything else is passed through as a character.
    pub fn decode(&self, code: RawCode) -> Key {
        match self.lookup(code) {
            Some(key) => Key::Special(key),
            None => Key::Char(decode_char(code)),
        }
    }
}

impl FromIterator<(RawCode, SpecialKey)> for KeyTable {
    fn from_iter<I: IntoIterator<Item = (RawCode, SpecialKey)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Interpret a raw code as a character without any key lookup.
pub fn decode_char(code: RawCode) -> char {
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Shape of a read result, computed from the current window's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// Blocking, keypad off.
    Char,
    /// Blocking, keypad on.
    Key,
    /// Non-blocking, keypad off.
    MaybeChar,
    /// Non-blocking, keypad on.
    MaybeKey,
}

impl InputShape {
    pub fn from_flags(no_delay: bool, keypad: bool) -> Self {
        match (no_delay, keypad) {
            (false, false) => InputShape::Char,
            (false, true) => InputShape::Key,
            (true, false) => InputShape::MaybeChar,
            (true, true) => InputShape::MaybeKey,
        }
    }

    pub fn of(window: &WindowDesc) -> Self {
        Self::from_flags(window.no_delay, window.keypad)
    }

    pub fn no_delay(self) -> bool {
        matches!(self, InputShape::MaybeChar | InputShape::MaybeKey)
    }

    pub fn keypad(self) -> bool {
        matches!(self, InputShape::Key | InputShape::MaybeKey)
    }

    /// Build a result of this shape from a raw read. `None` only when a
    /// blocking shape received no code.
    pub fn resolve(self, raw: Option<RawCode>, keys: &KeyTable) -> Option<Input> {
        match self {
            InputShape::Char => Chars::resolve(raw, keys).map(Input::Char),
            InputShape::Key => Keys::resolve(raw, keys).map(Input::Key),
            InputShape::MaybeChar => PollChars::resolve(raw, keys).map(Input::MaybeChar),
            InputShape::MaybeKey => PollKeys::resolve(raw, keys).map(Input::MaybeKey),
        }
    }
}

/// A read result when the shape is only known at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Char(char),
    Key(Key),
    MaybeChar(Option<char>),
    MaybeKey(Option<Key>),
}

impl Input {
    pub fn shape(&self) -> InputShape {
        match self {
            Input::Char(_) => InputShape::Char,
            Input::Key(_) => InputShape::Key,
            Input::MaybeChar(_) => InputShape::MaybeChar,
            Input::MaybeKey(_) => InputShape::MaybeKey,
        }
    }

    /// Flatten to an optional key regardless of shape.
    pub fn key(&self) -> Option<Key> {
        match *self {
            Input::Char(c) => Some(Key::Char(c)),
            Input::Key(k) => Some(k),
            Input::MaybeChar(c) => c.map(Key::Char),
            Input::MaybeKey(k) => k,
        }
    }
}

/// Statically known read shape.
///
/// A typed read names one of the four marker types; it is only accepted when
/// the current window's flags match [`ReadMode::NO_DELAY`] and
/// [`ReadMode::KEYPAD`], and it yields [`ReadMode::Output`] directly.
pub trait ReadMode {
    const NO_DELAY: bool;
    const KEYPAD: bool;
    type Output;

    fn shape() -> InputShape {
        InputShape::from_flags(Self::NO_DELAY, Self::KEYPAD)
    }

    /// `None` only when a blocking mode received no code.
    fn resolve(raw: Option<RawCode>, keys: &KeyTable) -> Option<Self::Output>;
}

/// Blocking read, keypad off.
#[derive(Debug, Clone, Copy)]
pub struct Chars;

/// Blocking read, keypad on.
#[derive(Debug, Clone, Copy)]
pub struct Keys;

/// Non-blocking read, keypad off.
#[derive(Debug, Clone, Copy)]
pub struct PollChars;

/// Non-blocking read, keypad on.
#[derive(Debug, Clone, Copy)]
pub struct PollKeys;

impl ReadMode for Chars {
    const NO_DELAY: bool = false;
    const KEYPAD: bool = false;
    type Output = char;

    fn resolve(raw: Option<RawCode>, _keys: &KeyTable) -> Option<char> {
        raw.map(decode_char)
    }
}

impl ReadMode for Keys {
    const NO_DELAY: bool = false;
    const KEYPAD: bool = true;
    type Output = Key;

    fn resolve(raw: Option<RawCode>, keys: &KeyTable) -> Option<Key> {
        raw.map(|code| keys.decode(code))
    }
}

impl ReadMode for PollChars {
    const NO_DELAY: bool = true;
    const KEYPAD: bool = false;
    type Output = Option<char>;

    fn resolve(raw: Option<RawCode>, _keys: &KeyTable) -> Option<Option<char>> {
        Some(raw.map(decode_char))
    }
}

impl ReadMode for PollKeys {
    const NO_DELAY: bool = true;
    const KEYPAD: bool = true;
    type Output = Option<Key>;

    fn resolve(raw: Option<RawCode>, keys: &KeyTable) -> Option<Option<Key>> {
        Some(raw.map(|code| keys.decode(code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table() {
        let keys = KeyTable::standard();
        assert_eq!(keys.lookup(SpecialKey::Up.code()), Some(SpecialKey::Up));
        assert_eq!(keys.lookup(SpecialKey::F(5).code()), Some(SpecialKey::F(5)));
        assert_eq!(keys.lookup('a' as RawCode), None);
        // 14 named keys plus F0..F255, all at distinct codes
        assert_eq!(keys.len(), 14 + 256);
        assert!(SpecialKey::all().all(|k| is_special(k.code())));
    }

    #[test]
    fn test_shape_from_flags() {
        assert_eq!(InputShape::from_flags(false, false), InputShape::Char);
        assert_eq!(InputShape::from_flags(false, true), InputShape::Key);
        assert_eq!(InputShape::from_flags(true, false), InputShape::MaybeChar);
        assert_eq!(InputShape::from_flags(true, true), InputShape::MaybeKey);
        assert_eq!(Keys::shape(), InputShape::Key);
        assert_eq!(PollChars::shape(), InputShape::MaybeChar);
    }

    #[test]
    fn test_keypad_lookup_hit_and_miss() {
        let keys = KeyTable::standard();
        assert_eq!(
            Keys::resolve(Some(SpecialKey::Left.code()), &keys),
            Some(Key::Special(SpecialKey::Left))
        );
        assert_eq!(Keys::resolve(Some('x' as RawCode), &keys), Some(Key::Char('x')));
    }

    #[test]
    fn test_keypad_off_passes_code_through() {
        let keys = KeyTable::standard();
        // no lookup without keypad, even for a code in the table
        let c = Chars::resolve(Some(SpecialKey::Up.code()), &keys).unwrap();
        assert_eq!(c, char::REPLACEMENT_CHARACTER);
        assert_eq!(Chars::resolve(Some('ł' as RawCode), &keys), Some('ł'));
    }

    #[test]
    fn test_extended_latin_stays_character() {
        let keys = KeyTable::standard();
        for ch in ['ă', 'ł', 'ſ', 'ƚ', '\u{10FFFF}'] {
            assert!(!is_special(ch as RawCode));
            assert_eq!(Keys::resolve(Some(ch as RawCode), &keys), Some(Key::Char(ch)));
            assert_eq!(
                PollKeys::resolve(Some(ch as RawCode), &keys),
                Some(Some(Key::Char(ch)))
            );
        }
    }

    #[test]
    fn test_function_key_codes_distinct() {
        let keys = KeyTable::standard();
        assert_ne!(SpecialKey::F(63).code(), SpecialKey::F(64).code());
        assert_eq!(keys.lookup(SpecialKey::F(200).code()), Some(SpecialKey::F(200)));
        assert_eq!(keys.lookup(SpecialKey::Delete.code()), Some(SpecialKey::Delete));
    }

    #[test]
    fn test_poll_absent() {
        let keys = KeyTable::standard();
        assert_eq!(PollKeys::resolve(None, &keys), Some(None));
        assert_eq!(PollChars::resolve(None, &keys), Some(None));
        assert_eq!(Keys::resolve(None, &keys), None);
    }

    #[test]
    fn test_dynamic_shape_matches_typed() {
        let keys = KeyTable::standard();
        let raw = Some(SpecialKey::Enter.code());
        let input = InputShape::MaybeKey.resolve(raw, &keys).unwrap();
        assert_eq!(input, Input::MaybeKey(Some(Key::Special(SpecialKey::Enter))));
        assert_eq!(input.shape(), InputShape::MaybeKey);
        assert_eq!(input.key(), Some(Key::Special(SpecialKey::Enter)));
    }
}

//! Plain value types shared by the protocol, the runtime and the backends.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::state::RegisteredColor;

/// Row/column position, zero based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: u16,
    pub col: u16,
}

impl Position {
    pub const fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }
}

/// Window extent in cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub rows: u16,
    pub cols: u16,
}

impl Size {
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

/// The eight basic terminal colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    /// Convert to crossterm Color
    pub fn to_crossterm(self) -> crossterm::style::Color {
        use crossterm::style::Color as C;
        match self {
            Color::Black => C::Black,
            Color::Red => C::DarkRed,
            Color::Green => C::DarkGreen,
            Color::Yellow => C::DarkYellow,
            Color::Blue => C::DarkBlue,
            Color::Magenta => C::DarkMagenta,
            Color::Cyan => C::DarkCyan,
            Color::White => C::Grey,
        }
    }
}

/// Index of an allocated foreground/background pair.
///
/// Pair 0 is the terminal's default colors; allocated pairs start at 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ColorPair(pub u16);

impl ColorPair {
    pub const DEFAULT: ColorPair = ColorPair(0);
}

/// Cursor visibility levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorVisibility {
    Invisible,
    #[default]
    Normal,
    HighlyVisible,
}

bitflags! {
    /// Native text attributes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AttrFlags: u16 {
        const UNDERLINE = 0b0000_0000_0001;
        const STANDOUT  = 0b0000_0000_0010;
        const REVERSE   = 0b0000_0000_0100;
        const BLINK     = 0b0000_0000_1000;
        const DIM       = 0b0000_0001_0000;
        const BOLD      = 0b0000_0010_0000;
        const PROTECTED = 0b0000_0100_0000;
        const INVISIBLE = 0b0000_1000_0000;
    }
}

/// An attribute after color names have been resolved against the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeAttr {
    Style(AttrFlags),
    Pair(ColorPair),
}

/// How an attribute is combined with the window's current ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    /// Replace everything.
    Set,
    /// Merge in.
    Enable,
    /// Remove.
    Disable,
}

/// Text attribute as written by programs.
///
/// `Color` holds a [`RegisteredColor`], so an attribute naming an
/// unregistered color cannot be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Normal,
    Underline,
    Standout,
    Reverse,
    Blink,
    Dim,
    Bold,
    Protected,
    Invisible,
    DefaultColors,
    Color(RegisteredColor),
}

impl Attribute {
    /// Style flags for the non-color attributes. `Normal` is the empty set.
    pub fn flags(&self) -> Option<AttrFlags> {
        let flags = match self {
            Attribute::Normal => AttrFlags::empty(),
            Attribute::Underline => AttrFlags::UNDERLINE,
            Attribute::Standout => AttrFlags::STANDOUT,
            Attribute::Reverse => AttrFlags::REVERSE,
            Attribute::Blink => AttrFlags::BLINK,
            Attribute::Dim => AttrFlags::DIM,
            Attribute::Bold => AttrFlags::BOLD,
            Attribute::Protected => AttrFlags::PROTECTED,
            Attribute::Invisible => AttrFlags::INVISIBLE,
            Attribute::DefaultColors | Attribute::Color(_) => return None,
        };
        Some(flags)
    }
}

/// Border glyphs for the eight border slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderGlyphs {
    pub left: char,
    pub right: char,
    pub top: char,
    pub bottom: char,
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
}

impl Default for BorderGlyphs {
    fn default() -> Self {
        Self::single()
    }
}

impl BorderGlyphs {
    pub const fn single() -> Self {
        Self {
            left: '│',
            right: '│',
            top: '─',
            bottom: '─',
            top_left: '┌',
            top_right: '┐',
            bottom_left: '└',
            bottom_right: '┘',
        }
    }

    pub const fn double() -> Self {
        Self {
            left: '║',
            right: '║',
            top: '═',
            bottom: '═',
            top_left: '╔',
            top_right: '╗',
            bottom_left: '╚',
            bottom_right: '╝',
        }
    }

    pub const fn rounded() -> Self {
        Self {
            top_left: '╭',
            top_right: '╮',
            bottom_left: '╰',
            bottom_right: '╯',
            ..Self::single()
        }
    }

    pub const fn ascii() -> Self {
        Self {
            left: '|',
            right: '|',
            top: '-',
            bottom: '-',
            top_left: '+',
            top_right: '+',
            bottom_left: '+',
            bottom_right: '+',
        }
    }

    /// Get glyph set by style name, falling back to `single`
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "double" => Self::double(),
            "rounded" | "round" => Self::rounded(),
            "ascii" | "plain" => Self::ascii(),
            _ => Self::single(),
        }
    }

    /// List available styles
    pub fn list() -> Vec<&'static str> {
        vec!["single", "double", "rounded", "ascii"]
    }
}

/// A window border: glyphs plus an optional registered color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Border {
    pub glyphs: BorderGlyphs,
    pub color: Option<RegisteredColor>,
}

impl Border {
    pub fn new(glyphs: BorderGlyphs) -> Self {
        Self { glyphs, color: None }
    }

    pub fn colored(glyphs: BorderGlyphs, color: RegisteredColor) -> Self {
        Self {
            glyphs,
            color: Some(color),
        }
    }
}

/// A border whose color has been resolved to a native pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedBorder {
    pub glyphs: BorderGlyphs,
    pub pair: Option<ColorPair>,
}

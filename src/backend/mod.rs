//! Terminal collaborators.
//!
//! The interpreter drives a terminal only through the [`Terminal`] trait:
//!
//! - **console**: real terminal over crossterm, windows are screen regions
//! - **keymap**: key events to raw input codes for the console
//! - **mock**: recording terminal with scripted input
//!
//! Every method is synchronous. Failures are reported as [`TerminalError`]
//! and stop the running program.

pub mod console;
pub mod keymap;
pub mod mock;

pub use console::Console;
pub use mock::{Call, MockTerminal};

use crate::core::input::{KeyTable, RawCode};
use crate::core::types::{
    AttrOp, Color, ColorPair, CursorVisibility, NativeAttr, Position, ResolvedBorder, Size,
};
use crate::error::TerminalError;

pub type Result<T> = std::result::Result<T, TerminalError>;

/// Contract the interpreter needs from the underlying terminal library.
pub trait Terminal {
    /// Handle to a native window.
    type Window;

    /// Start the terminal session and return the full-screen window.
    fn open_session(&mut self) -> Result<Self::Window>;
    fn close_session(&mut self) -> Result<()>;

    fn set_raw_mode(&mut self, cbreak: bool, echo: bool) -> Result<()>;
    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> Result<()>;

    fn create_window(&mut self, size: Size, pos: Position) -> Result<Self::Window>;
    /// Release a window. The handle is invalid afterwards.
    fn destroy_window(&mut self, window: Self::Window) -> Result<()>;
    fn draw_border(&mut self, window: &Self::Window, border: &ResolvedBorder) -> Result<()>;

    fn put_char(&mut self, window: &Self::Window, ch: char) -> Result<()>;
    fn put_str(&mut self, window: &Self::Window, s: &str) -> Result<()>;
    fn hline(&mut self, window: &Self::Window, ch: char, len: u16) -> Result<()>;
    fn vline(&mut self, window: &Self::Window, ch: char, len: u16) -> Result<()>;
    fn move_cursor(&mut self, window: &Self::Window, pos: Position) -> Result<()>;

    /// Blank the window and force a full repaint on the next refresh.
    fn clear(&mut self, window: &Self::Window) -> Result<()>;
    /// Blank the window.
    fn erase(&mut self, window: &Self::Window) -> Result<()>;
    fn refresh(&mut self, window: &Self::Window) -> Result<()>;

    fn window_position(&mut self, window: &Self::Window) -> Result<Position>;
    fn window_size(&mut self, window: &Self::Window) -> Result<Size>;
    fn resize_window(&mut self, window: &Self::Window, size: Size) -> Result<()>;

    fn set_keypad(&mut self, window: &Self::Window, on: bool) -> Result<()>;
    fn set_no_delay(&mut self, window: &Self::Window, on: bool) -> Result<()>;

    /// One raw code. Blocks unless no-delay is on for `window`, in which case
    /// `None` means nothing is pending.
    fn read_input(&mut self, window: &Self::Window) -> Result<Option<RawCode>>;

    fn start_color(&mut self) -> Result<()>;
    /// Allocate the next sequential pair.
    fn allocate_color_pair(&mut self, fg: Color, bg: Color) -> Result<ColorPair>;
    fn apply_attribute(&mut self, window: &Self::Window, attr: NativeAttr, op: AttrOp)
        -> Result<()>;

    /// Raw code to special key table, queried once per session.
    fn special_keys(&mut self) -> KeyTable;
}

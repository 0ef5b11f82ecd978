//! Recording terminal for tests and dry runs.
//!
//! Every call is appended to a log, windows are plain geometry records, and
//! input comes from a scripted queue.

use std::collections::VecDeque;
use std::mem::{self, Discriminant};

use super::{Result, Terminal};
use crate::core::input::{KeyTable, RawCode};
use crate::core::types::{
    AttrFlags, AttrOp, Color, ColorPair, CursorVisibility, NativeAttr, Position, ResolvedBorder,
    Size,
};
use crate::error::TerminalError;

/// Handle to a mock window. Window 0 is the full screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockWindow(pub usize);

/// One recorded terminal call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    OpenSession,
    CloseSession,
    SetRawMode { cbreak: bool, echo: bool },
    SetCursor(CursorVisibility),
    CreateWindow { size: Size, pos: Position },
    DestroyWindow(MockWindow),
    DrawBorder { window: MockWindow, border: ResolvedBorder },
    PutChar { window: MockWindow, ch: char },
    PutStr { window: MockWindow, s: String },
    HLine { window: MockWindow, ch: char, len: u16 },
    VLine { window: MockWindow, ch: char, len: u16 },
    Move { window: MockWindow, pos: Position },
    Clear(MockWindow),
    Erase(MockWindow),
    Refresh(MockWindow),
    WindowPosition(MockWindow),
    WindowSize(MockWindow),
    Resize { window: MockWindow, size: Size },
    SetKeypad { window: MockWindow, on: bool },
    SetNoDelay { window: MockWindow, on: bool },
    ReadInput(MockWindow),
    StartColor,
    AllocatePair { fg: Color, bg: Color },
    ApplyAttribute { window: MockWindow, attr: NativeAttr, op: AttrOp },
    SpecialKeys,
}

/// Geometry and flags of a mock window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockWindowState {
    pub pos: Position,
    pub size: Size,
    pub cursor: Position,
    pub keypad: bool,
    pub no_delay: bool,
    pub style: AttrFlags,
    pub pair: ColorPair,
}

impl MockWindowState {
    fn new(pos: Position, size: Size) -> Self {
        Self {
            pos,
            size,
            cursor: Position::default(),
            keypad: false,
            no_delay: false,
            style: AttrFlags::empty(),
            pair: ColorPair::DEFAULT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockTerminal {
    screen: Size,
    calls: Vec<Call>,
    /// Indexed by handle; destroyed windows leave an empty slot.
    windows: Vec<Option<MockWindowState>>,
    pairs: Vec<(Color, Color)>,
    input: VecDeque<RawCode>,
    open: bool,
    raw_mode: (bool, bool),
    cursor: CursorVisibility,
    /// Call kind to fail, and how many matching calls to let through first.
    fail_on: Option<(Discriminant<Call>, usize)>,
}

impl Default for MockTerminal {
    fn default() -> Self {
        Self::new(Size::new(24, 80))
    }
}

impl MockTerminal {
    pub fn new(screen: Size) -> Self {
        Self {
            screen,
            calls: Vec::new(),
            windows: Vec::new(),
            pairs: Vec::new(),
            input: VecDeque::new(),
            open: false,
            raw_mode: (false, true),
            cursor: CursorVisibility::Normal,
            fail_on: None,
        }
    }

    /// Queue raw codes for subsequent reads.
    pub fn with_input<I: IntoIterator<Item = RawCode>>(mut self, codes: I) -> Self {
        self.input.extend(codes);
        self
    }

    /// Queue characters for subsequent reads.
    pub fn with_chars(self, s: &str) -> Self {
        self.with_input(s.chars().map(RawCode::from))
    }

    /// Make the next call of the same kind as `call` fail with an I/O error.
    /// Only the variant of `call` matters, not its fields.
    pub fn failing_on(self, call: &Call) -> Self {
        self.failing_after(call, 0)
    }

    /// Like [`Self::failing_on`], but let `skip` matching calls succeed first.
    pub fn failing_after(mut self, call: &Call, skip: usize) -> Self {
        self.fail_on = Some((mem::discriminant(call), skip));
        self
    }

    pub fn push_input(&mut self, code: RawCode) {
        self.input.push_back(code);
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        mem::take(&mut self.calls)
    }

    pub fn window(&self, window: MockWindow) -> Option<&MockWindowState> {
        self.windows.get(window.0).and_then(Option::as_ref)
    }

    /// Live windows, the full screen included.
    pub fn window_count(&self) -> usize {
        self.windows.iter().flatten().count()
    }

    pub fn pairs(&self) -> &[(Color, Color)] {
        &self.pairs
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn raw_mode(&self) -> (bool, bool) {
        self.raw_mode
    }

    pub fn cursor(&self) -> CursorVisibility {
        self.cursor
    }

    fn record(&mut self, call: Call) -> Result<()> {
        let kind = mem::discriminant(&call);
        self.calls.push(call);
        let fail = match self.fail_on.as_mut() {
            Some((k, 0)) if *k == kind => true,
            Some((k, skip)) if *k == kind => {
                *skip -= 1;
                false
            }
            _ => false,
        };
        if fail {
            self.fail_on = None;
            return Err(TerminalError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected failure",
            )));
        }
        Ok(())
    }

    fn win_mut(&mut self, window: &MockWindow) -> Result<&mut MockWindowState> {
        self.windows
            .get_mut(window.0)
            .and_then(Option::as_mut)
            .ok_or(TerminalError::InvalidHandle)
    }

    fn advance(&mut self, window: &MockWindow, cols: usize) -> Result<()> {
        let state = self.win_mut(window)?;
        let width = usize::from(state.size.cols.max(1));
        let offset = usize::from(state.cursor.col).saturating_add(cols);
        let row = usize::from(state.cursor.row).saturating_add(offset / width);
        let last = state.size.rows.saturating_sub(1);
        state.cursor.row = u16::try_from(row).unwrap_or(u16::MAX).min(last);
        state.cursor.col = u16::try_from(offset % width).unwrap_or(u16::MAX);
        Ok(())
    }
}

impl Terminal for MockTerminal {
    type Window = MockWindow;

    fn open_session(&mut self) -> Result<MockWindow> {
        self.record(Call::OpenSession)?;
        self.open = true;
        self.windows.clear();
        self.windows
            .push(Some(MockWindowState::new(Position::default(), self.screen)));
        Ok(MockWindow(0))
    }

    fn close_session(&mut self) -> Result<()> {
        self.record(Call::CloseSession)?;
        self.open = false;
        Ok(())
    }

    fn set_raw_mode(&mut self, cbreak: bool, echo: bool) -> Result<()> {
        self.record(Call::SetRawMode { cbreak, echo })?;
        self.raw_mode = (cbreak, echo);
        Ok(())
    }

    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> Result<()> {
        self.record(Call::SetCursor(visibility))?;
        self.cursor = visibility;
        Ok(())
    }

    fn create_window(&mut self, size: Size, pos: Position) -> Result<MockWindow> {
        self.record(Call::CreateWindow { size, pos })?;
        self.windows.push(Some(MockWindowState::new(pos, size)));
        Ok(MockWindow(self.windows.len() - 1))
    }

    fn destroy_window(&mut self, window: MockWindow) -> Result<()> {
        self.record(Call::DestroyWindow(window))?;
        self.windows
            .get_mut(window.0)
            .and_then(Option::take)
            .map(|_| ())
            .ok_or(TerminalError::InvalidHandle)
    }

    fn draw_border(&mut self, window: &MockWindow, border: &ResolvedBorder) -> Result<()> {
        self.record(Call::DrawBorder {
            window: *window,
            border: *border,
        })?;
        self.win_mut(window).map(|_| ())
    }

    fn put_char(&mut self, window: &MockWindow, ch: char) -> Result<()> {
        self.record(Call::PutChar {
            window: *window,
            ch,
        })?;
        self.advance(window, 1)
    }

    fn put_str(&mut self, window: &MockWindow, s: &str) -> Result<()> {
        self.record(Call::PutStr {
            window: *window,
            s: s.to_string(),
        })?;
        self.advance(window, s.chars().count())
    }

    fn hline(&mut self, window: &MockWindow, ch: char, len: u16) -> Result<()> {
        self.record(Call::HLine {
            window: *window,
            ch,
            len,
        })?;
        self.win_mut(window).map(|_| ())
    }

    fn vline(&mut self, window: &MockWindow, ch: char, len: u16) -> Result<()> {
        self.record(Call::VLine {
            window: *window,
            ch,
            len,
        })?;
        self.win_mut(window).map(|_| ())
    }

    fn move_cursor(&mut self, window: &MockWindow, pos: Position) -> Result<()> {
        self.record(Call::Move {
            window: *window,
            pos,
        })?;
        self.win_mut(window)?.cursor = pos;
        Ok(())
    }

    fn clear(&mut self, window: &MockWindow) -> Result<()> {
        self.record(Call::Clear(*window))?;
        self.win_mut(window)?.cursor = Position::default();
        Ok(())
    }

    fn erase(&mut self, window: &MockWindow) -> Result<()> {
        self.record(Call::Erase(*window))?;
        self.win_mut(window)?.cursor = Position::default();
        Ok(())
    }

    fn refresh(&mut self, window: &MockWindow) -> Result<()> {
        self.record(Call::Refresh(*window))?;
        self.win_mut(window).map(|_| ())
    }

    fn window_position(&mut self, window: &MockWindow) -> Result<Position> {
        self.record(Call::WindowPosition(*window))?;
        Ok(self.win_mut(window)?.pos)
    }

    fn window_size(&mut self, window: &MockWindow) -> Result<Size> {
        self.record(Call::WindowSize(*window))?;
        Ok(self.win_mut(window)?.size)
    }

    fn resize_window(&mut self, window: &MockWindow, size: Size) -> Result<()> {
        self.record(Call::Resize {
            window: *window,
            size,
        })?;
        self.win_mut(window)?.size = size;
        Ok(())
    }

    fn set_keypad(&mut self, window: &MockWindow, on: bool) -> Result<()> {
        self.record(Call::SetKeypad {
            window: *window,
            on,
        })?;
        self.win_mut(window)?.keypad = on;
        Ok(())
    }

    fn set_no_delay(&mut self, window: &MockWindow, on: bool) -> Result<()> {
        self.record(Call::SetNoDelay {
            window: *window,
            on,
        })?;
        self.win_mut(window)?.no_delay = on;
        Ok(())
    }

    fn read_input(&mut self, window: &MockWindow) -> Result<Option<RawCode>> {
        self.record(Call::ReadInput(*window))?;
        self.win_mut(window)?;
        Ok(self.input.pop_front())
    }

    fn start_color(&mut self) -> Result<()> {
        self.record(Call::StartColor)
    }

    fn allocate_color_pair(&mut self, fg: Color, bg: Color) -> Result<ColorPair> {
        self.record(Call::AllocatePair { fg, bg })?;
        let next = u16::try_from(self.pairs.len() + 1)
            .map_err(|_| TerminalError::ColorPairsExhausted)?;
        self.pairs.push((fg, bg));
        Ok(ColorPair(next))
    }

    fn apply_attribute(&mut self, window: &MockWindow, attr: NativeAttr, op: AttrOp) -> Result<()> {
        self.record(Call::ApplyAttribute {
            window: *window,
            attr,
            op,
        })?;
        let state = self.win_mut(window)?;
        match (attr, op) {
            (NativeAttr::Style(flags), AttrOp::Set) => {
                state.style = flags;
                state.pair = ColorPair::DEFAULT;
            }
            (NativeAttr::Style(flags), AttrOp::Enable) => state.style |= flags,
            (NativeAttr::Style(flags), AttrOp::Disable) => state.style &= !flags,
            (NativeAttr::Pair(pair), AttrOp::Set) => {
                state.style = AttrFlags::empty();
                state.pair = pair;
            }
            (NativeAttr::Pair(pair), AttrOp::Enable) => state.pair = pair,
            (NativeAttr::Pair(pair), AttrOp::Disable) => {
                if state.pair == pair {
                    state.pair = ColorPair::DEFAULT;
                }
            }
        }
        Ok(())
    }

    fn special_keys(&mut self) -> KeyTable {
        self.calls.push(Call::SpecialKeys);
        KeyTable::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls() {
        let mut term = MockTerminal::default();
        let screen = term.open_session().unwrap();
        term.put_str(&screen, "hello").unwrap();
        term.refresh(&screen).unwrap();
        assert_eq!(
            term.calls(),
            &[
                Call::OpenSession,
                Call::PutStr {
                    window: screen,
                    s: "hello".into()
                },
                Call::Refresh(screen),
            ]
        );
        assert_eq!(term.window(screen).unwrap().cursor, Position::new(0, 5));
    }

    #[test]
    fn test_cursor_wraps() {
        let mut term = MockTerminal::new(Size::new(3, 4));
        let screen = term.open_session().unwrap();
        term.put_str(&screen, "abcdef").unwrap();
        assert_eq!(term.window(screen).unwrap().cursor, Position::new(1, 2));
    }

    #[test]
    fn test_long_string_saturates() {
        let mut term = MockTerminal::new(Size::new(3, 4));
        let screen = term.open_session().unwrap();
        let long = "x".repeat(usize::from(u16::MAX) * 3);
        term.put_str(&screen, &long).unwrap();
        term.put_str(&screen, &long).unwrap();
        let cursor = term.window(screen).unwrap().cursor;
        assert_eq!(cursor.row, 2);
        assert!(cursor.col < 4);
    }

    #[test]
    fn test_destroy_window() {
        let mut term = MockTerminal::default();
        term.open_session().unwrap();
        let win = term.create_window(Size::new(2, 2), Position::default()).unwrap();
        assert_eq!(term.window_count(), 2);
        term.destroy_window(win).unwrap();
        assert_eq!(term.window_count(), 1);
        assert!(term.window(win).is_none());
        assert!(matches!(
            term.refresh(&win),
            Err(TerminalError::InvalidHandle)
        ));
        // handles are not reused
        let next = term.create_window(Size::new(2, 2), Position::default()).unwrap();
        assert_ne!(next, win);
    }

    #[test]
    fn test_scripted_input() {
        let mut term = MockTerminal::default().with_chars("ab");
        let screen = term.open_session().unwrap();
        assert_eq!(term.read_input(&screen).unwrap(), Some('a' as RawCode));
        assert_eq!(term.read_input(&screen).unwrap(), Some('b' as RawCode));
        assert_eq!(term.read_input(&screen).unwrap(), None);
    }

    #[test]
    fn test_attribute_merge() {
        let mut term = MockTerminal::default();
        let screen = term.open_session().unwrap();
        let flags = AttrFlags::BOLD | AttrFlags::UNDERLINE;
        term.apply_attribute(&screen, NativeAttr::Style(flags), AttrOp::Enable)
            .unwrap();
        term.apply_attribute(&screen, NativeAttr::Style(AttrFlags::BOLD), AttrOp::Disable)
            .unwrap();
        assert_eq!(term.window(screen).unwrap().style, AttrFlags::UNDERLINE);
    }

    #[test]
    fn test_injected_failure() {
        let mut term = MockTerminal::default().failing_on(&Call::CreateWindow {
            size: Size::default(),
            pos: Position::default(),
        });
        term.open_session().unwrap();
        assert!(term
            .create_window(Size::new(1, 1), Position::default())
            .is_err());
        // only the first matching call fails
        assert!(term
            .create_window(Size::new(1, 1), Position::default())
            .is_ok());

        let mut term = MockTerminal::default().failing_after(&Call::Refresh(MockWindow(0)), 1);
        let screen = term.open_session().unwrap();
        assert!(term.refresh(&screen).is_ok());
        assert!(term.refresh(&screen).is_err());
        assert!(term.refresh(&screen).is_ok());
    }

    #[test]
    fn test_invalid_handle() {
        let mut term = MockTerminal::default();
        term.open_session().unwrap();
        assert!(matches!(
            term.refresh(&MockWindow(9)),
            Err(TerminalError::InvalidHandle)
        ));
    }
}

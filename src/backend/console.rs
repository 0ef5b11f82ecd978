//! Console terminal using crossterm
//!
//! crossterm has no native sub-windows, so each window is a rectangle of the
//! real screen with its own cursor, style and input flags. Drawing is queued
//! on the writer and flushed on refresh. Input comes from crossterm events,
//! translated to raw codes by [`KeyMapper`].

use std::collections::VecDeque;
use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::{
    cursor::{Hide, MoveTo, SetCursorStyle, Show},
    event::{self, Event, KeyEventKind},
    execute, queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{debug, info};
use unicode_width::UnicodeWidthChar;

use super::keymap::KeyMapper;
use super::{Result, Terminal};
use crate::core::input::{KeyTable, RawCode, SpecialKey};
use crate::core::types::{
    AttrFlags, AttrOp, Color, ColorPair, CursorVisibility, NativeAttr, Position, ResolvedBorder,
    Size,
};
use crate::error::TerminalError;

/// Highest pair index the console hands out.
pub const MAX_COLOR_PAIRS: usize = 255;

/// Handle to a console window. Window 0 is the full screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsoleWindow(usize);

/// A window's rectangle, cursor, style and input flags
#[derive(Debug, Clone, Copy)]
struct Region {
    origin: Position,
    size: Size,
    cursor: Position,
    style: AttrFlags,
    pair: ColorPair,
    keypad: bool,
    no_delay: bool,
}

impl Region {
    fn new(origin: Position, size: Size) -> Self {
        Self {
            origin,
            size,
            cursor: Position::default(),
            style: AttrFlags::empty(),
            pair: ColorPair::DEFAULT,
            keypad: false,
            no_delay: false,
        }
    }

    /// Absolute screen coordinates of a window-relative cell (column, row)
    fn screen_at(&self, pos: Position) -> (u16, u16) {
        (
            self.origin.col.saturating_add(pos.col),
            self.origin.row.saturating_add(pos.row),
        )
    }

    fn clamp(&self, pos: Position) -> Position {
        Position::new(
            pos.row.min(self.size.rows.saturating_sub(1)),
            pos.col.min(self.size.cols.saturating_sub(1)),
        )
    }
}

/// Terminal backed by crossterm
pub struct Console<W: Write = Stdout> {
    out: W,
    /// Whether this console owns the real tty (raw mode, alternate screen)
    tty: bool,
    screen: Size,
    /// Indexed by handle; destroyed windows leave an empty slot
    regions: Vec<Option<Region>>,
    pairs: Vec<(Color, Color)>,
    colors_started: bool,
    cbreak: bool,
    echo: bool,
    /// Codes already decoded but not yet returned by a read
    pending: VecDeque<RawCode>,
    /// Line being assembled while cbreak is off
    line: Vec<RawCode>,
    open: bool,
}

impl Console<Stdout> {
    /// Console drawing on stdout and reading the process's terminal.
    pub fn stdout() -> Self {
        let mut console = Self::headless(io::stdout(), Size::new(24, 80));
        console.tty = true;
        console
    }
}

impl<W: Write> Console<W> {
    /// Console that only writes escape sequences to `out`. It never switches
    /// the tty into raw mode and assumes a screen of `screen` cells.
    pub fn headless(out: W, screen: Size) -> Self {
        Self {
            out,
            tty: false,
            screen,
            regions: Vec::new(),
            pairs: Vec::new(),
            colors_started: false,
            cbreak: true,
            echo: false,
            pending: VecDeque::new(),
            line: Vec::new(),
            open: false,
        }
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Cursor of a window, relative to its origin.
    pub fn cursor(&self, window: &ConsoleWindow) -> Option<Position> {
        self.regions.get(window.0).copied().flatten().map(|r| r.cursor)
    }

    fn region(&self, window: &ConsoleWindow) -> Result<Region> {
        self.regions
            .get(window.0)
            .copied()
            .flatten()
            .ok_or(TerminalError::InvalidHandle)
    }

    fn region_mut(&mut self, window: &ConsoleWindow) -> Result<&mut Region> {
        self.regions
            .get_mut(window.0)
            .and_then(Option::as_mut)
            .ok_or(TerminalError::InvalidHandle)
    }

    /// Queue the SGR state for a style and color pair
    fn queue_style(&mut self, style: AttrFlags, pair: ColorPair) -> io::Result<()> {
        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;

        if let Some(&(fg, bg)) = pair
            .0
            .checked_sub(1)
            .and_then(|i| self.pairs.get(i as usize))
        {
            queue!(
                self.out,
                SetForegroundColor(fg.to_crossterm()),
                SetBackgroundColor(bg.to_crossterm())
            )?;
        }

        let attrs = [
            (AttrFlags::UNDERLINE, Attribute::Underlined),
            (AttrFlags::STANDOUT, Attribute::Reverse),
            (AttrFlags::REVERSE, Attribute::Reverse),
            (AttrFlags::BLINK, Attribute::SlowBlink),
            (AttrFlags::DIM, Attribute::Dim),
            (AttrFlags::BOLD, Attribute::Bold),
            (AttrFlags::INVISIBLE, Attribute::Hidden),
        ];
        for (flag, attr) in attrs {
            if style.contains(flag) {
                queue!(self.out, SetAttribute(attr))?;
            }
        }
        Ok(())
    }

    /// Draw one character at the window cursor and advance it
    fn put_cell(&mut self, window: &ConsoleWindow, ch: char) -> Result<()> {
        let mut region = self.region(window)?;
        let last_row = region.size.rows.saturating_sub(1);

        if ch == '\n' {
            region.cursor = Position::new((region.cursor.row + 1).min(last_row), 0);
            *self.region_mut(window)? = region;
            return Ok(());
        }

        let width = ch.width().unwrap_or(0) as u16;
        if region.cursor.col + width > region.size.cols {
            region.cursor = Position::new((region.cursor.row + 1).min(last_row), 0);
        }

        let (x, y) = region.screen_at(region.cursor);
        queue!(self.out, MoveTo(x, y), Print(ch))?;

        region.cursor.col += width;
        if region.cursor.col >= region.size.cols {
            region.cursor = Position::new((region.cursor.row + 1).min(last_row), 0);
        }
        *self.region_mut(window)? = region;
        Ok(())
    }

    /// Fill the window with blanks in its current colors
    fn blank(&mut self, window: &ConsoleWindow) -> Result<()> {
        let region = self.region(window)?;
        self.queue_style(AttrFlags::empty(), region.pair)?;
        let row = " ".repeat(region.size.cols as usize);
        for r in 0..region.size.rows {
            let (x, y) = region.screen_at(Position::new(r, 0));
            queue!(self.out, MoveTo(x, y), Print(&row))?;
        }
        self.region_mut(window)?.cursor = Position::default();
        Ok(())
    }

    /// Apply cbreak/echo to freshly decoded codes
    fn discipline(&mut self, window: &ConsoleWindow, codes: Vec<RawCode>) -> Result<()> {
        if self.echo {
            for &code in &codes {
                match char::from_u32(code) {
                    Some(ch) if !ch.is_control() || ch == '\n' => self.put_cell(window, ch)?,
                    _ => {}
                }
            }
            self.out.flush()?;
        }

        if self.cbreak {
            self.pending.extend(codes);
        } else {
            for code in codes {
                self.line.push(code);
                if code == RawCode::from(b'\n') {
                    self.pending.extend(self.line.drain(..));
                }
            }
        }
        Ok(())
    }
}

impl<W: Write> Terminal for Console<W> {
    type Window = ConsoleWindow;

    fn open_session(&mut self) -> Result<ConsoleWindow> {
        if self.tty {
            terminal::enable_raw_mode()?;
            execute!(self.out, EnterAlternateScreen, Clear(ClearType::All), MoveTo(0, 0))?;
            let (cols, rows) = terminal::size()?;
            self.screen = Size::new(rows, cols);
        }
        self.regions = vec![Some(Region::new(Position::default(), self.screen))];
        self.pending.clear();
        self.line.clear();
        self.open = true;
        info!(
            "Console session opened: {}x{} (tty: {})",
            self.screen.cols, self.screen.rows, self.tty
        );
        Ok(ConsoleWindow(0))
    }

    fn close_session(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor, Show)?;
        if self.tty {
            execute!(self.out, LeaveAlternateScreen)?;
            terminal::disable_raw_mode()?;
        }
        self.out.flush()?;
        info!("Console session closed");
        Ok(())
    }

    fn set_raw_mode(&mut self, cbreak: bool, echo: bool) -> Result<()> {
        self.cbreak = cbreak;
        self.echo = echo;
        if cbreak {
            // leaving line mode releases whatever was typed so far
            self.pending.extend(self.line.drain(..));
        }
        Ok(())
    }

    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> Result<()> {
        match visibility {
            CursorVisibility::Invisible => queue!(self.out, Hide)?,
            CursorVisibility::Normal => {
                queue!(self.out, Show, SetCursorStyle::DefaultUserShape)?
            }
            CursorVisibility::HighlyVisible => {
                queue!(self.out, Show, SetCursorStyle::SteadyBlock)?
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn create_window(&mut self, size: Size, pos: Position) -> Result<ConsoleWindow> {
        self.regions.push(Some(Region::new(pos, size)));
        debug!(
            "Created window {} at {},{} size {}x{}",
            self.regions.len() - 1,
            pos.row,
            pos.col,
            size.rows,
            size.cols
        );
        Ok(ConsoleWindow(self.regions.len() - 1))
    }

    fn destroy_window(&mut self, window: ConsoleWindow) -> Result<()> {
        // cells already drawn stay on screen until overwritten
        self.regions
            .get_mut(window.0)
            .and_then(Option::take)
            .ok_or(TerminalError::InvalidHandle)?;
        debug!("Destroyed window {}", window.0);
        Ok(())
    }

    fn draw_border(&mut self, window: &ConsoleWindow, border: &ResolvedBorder) -> Result<()> {
        let region = self.region(window)?;
        let (rows, cols) = (region.size.rows, region.size.cols);
        if rows < 2 || cols < 2 {
            return Ok(());
        }
        let g = &border.glyphs;

        self.queue_style(AttrFlags::empty(), border.pair.unwrap_or(region.pair))?;

        let inner = (cols - 2) as usize;
        let top = format!(
            "{}{}{}",
            g.top_left,
            g.top.to_string().repeat(inner),
            g.top_right
        );
        let bottom = format!(
            "{}{}{}",
            g.bottom_left,
            g.bottom.to_string().repeat(inner),
            g.bottom_right
        );

        let (x, y) = region.screen_at(Position::new(0, 0));
        queue!(self.out, MoveTo(x, y), Print(&top))?;
        for r in 1..rows - 1 {
            let (lx, ly) = region.screen_at(Position::new(r, 0));
            let (rx, ry) = region.screen_at(Position::new(r, cols - 1));
            queue!(
                self.out,
                MoveTo(lx, ly),
                Print(g.left),
                MoveTo(rx, ry),
                Print(g.right)
            )?;
        }
        let (x, y) = region.screen_at(Position::new(rows - 1, 0));
        queue!(self.out, MoveTo(x, y), Print(&bottom))?;
        Ok(())
    }

    fn put_char(&mut self, window: &ConsoleWindow, ch: char) -> Result<()> {
        let region = self.region(window)?;
        self.queue_style(region.style, region.pair)?;
        self.put_cell(window, ch)
    }

    fn put_str(&mut self, window: &ConsoleWindow, s: &str) -> Result<()> {
        let region = self.region(window)?;
        self.queue_style(region.style, region.pair)?;
        for ch in s.chars() {
            self.put_cell(window, ch)?;
        }
        Ok(())
    }

    fn hline(&mut self, window: &ConsoleWindow, ch: char, len: u16) -> Result<()> {
        let region = self.region(window)?;
        let len = len.min(region.size.cols.saturating_sub(region.cursor.col));
        self.queue_style(region.style, region.pair)?;
        let (x, y) = region.screen_at(region.cursor);
        queue!(self.out, MoveTo(x, y), Print(ch.to_string().repeat(len as usize)))?;
        Ok(())
    }

    fn vline(&mut self, window: &ConsoleWindow, ch: char, len: u16) -> Result<()> {
        let region = self.region(window)?;
        let len = len.min(region.size.rows.saturating_sub(region.cursor.row));
        self.queue_style(region.style, region.pair)?;
        for i in 0..len {
            let at = Position::new(region.cursor.row + i, region.cursor.col);
            let (x, y) = region.screen_at(at);
            queue!(self.out, MoveTo(x, y), Print(ch))?;
        }
        Ok(())
    }

    fn move_cursor(&mut self, window: &ConsoleWindow, pos: Position) -> Result<()> {
        let region = self.region_mut(window)?;
        region.cursor = region.clamp(pos);
        Ok(())
    }

    fn clear(&mut self, window: &ConsoleWindow) -> Result<()> {
        if window.0 == 0 {
            queue!(self.out, Clear(ClearType::All))?;
        }
        self.blank(window)
    }

    fn erase(&mut self, window: &ConsoleWindow) -> Result<()> {
        self.blank(window)
    }

    fn refresh(&mut self, window: &ConsoleWindow) -> Result<()> {
        let region = self.region(window)?;
        let (x, y) = region.screen_at(region.cursor);
        queue!(self.out, MoveTo(x, y))?;
        self.out.flush()?;
        Ok(())
    }

    fn window_position(&mut self, window: &ConsoleWindow) -> Result<Position> {
        Ok(self.region(window)?.origin)
    }

    fn window_size(&mut self, window: &ConsoleWindow) -> Result<Size> {
        Ok(self.region(window)?.size)
    }

    fn resize_window(&mut self, window: &ConsoleWindow, size: Size) -> Result<()> {
        let region = self.region_mut(window)?;
        region.size = size;
        region.cursor = region.clamp(region.cursor);
        Ok(())
    }

    fn set_keypad(&mut self, window: &ConsoleWindow, on: bool) -> Result<()> {
        self.region_mut(window)?.keypad = on;
        Ok(())
    }

    fn set_no_delay(&mut self, window: &ConsoleWindow, on: bool) -> Result<()> {
        self.region_mut(window)?.no_delay = on;
        Ok(())
    }

    fn read_input(&mut self, window: &ConsoleWindow) -> Result<Option<RawCode>> {
        let region = self.region(window)?;
        loop {
            if let Some(code) = self.pending.pop_front() {
                return Ok(Some(code));
            }

            if region.no_delay && !event::poll(Duration::ZERO)? {
                return Ok(None);
            }

            let codes = match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    KeyMapper::map(&key, region.keypad)
                }
                Event::Resize(cols, rows) => {
                    self.screen = Size::new(rows, cols);
                    if let Some(Some(full)) = self.regions.first_mut() {
                        full.size = self.screen;
                    }
                    if region.keypad {
                        vec![SpecialKey::Resize.code()]
                    } else {
                        Vec::new()
                    }
                }
                _ => Vec::new(),
            };
            self.discipline(window, codes)?;
        }
    }

    fn start_color(&mut self) -> Result<()> {
        self.colors_started = true;
        debug!("Color support started");
        Ok(())
    }

    fn allocate_color_pair(&mut self, fg: Color, bg: Color) -> Result<ColorPair> {
        if self.pairs.len() >= MAX_COLOR_PAIRS {
            return Err(TerminalError::ColorPairsExhausted);
        }
        self.pairs.push((fg, bg));
        Ok(ColorPair(self.pairs.len() as u16))
    }

    fn apply_attribute(
        &mut self,
        window: &ConsoleWindow,
        attr: NativeAttr,
        op: AttrOp,
    ) -> Result<()> {
        let region = self.region_mut(window)?;
        match (attr, op) {
            (NativeAttr::Style(flags), AttrOp::Set) => {
                region.style = flags;
                region.pair = ColorPair::DEFAULT;
            }
            (NativeAttr::Style(flags), AttrOp::Enable) => region.style |= flags,
            (NativeAttr::Style(flags), AttrOp::Disable) => region.style &= !flags,
            (NativeAttr::Pair(pair), AttrOp::Set) => {
                region.style = AttrFlags::empty();
                region.pair = pair;
            }
            (NativeAttr::Pair(pair), AttrOp::Enable) => region.pair = pair,
            (NativeAttr::Pair(pair), AttrOp::Disable) => {
                if region.pair == pair {
                    region.pair = ColorPair::DEFAULT;
                }
            }
        }
        Ok(())
    }

    fn special_keys(&mut self) -> KeyTable {
        KeyTable::standard()
    }
}

impl<W: Write> Drop for Console<W> {
    fn drop(&mut self) {
        if self.open && self.tty {
            let _ = self.close_session();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BorderGlyphs;

    fn console() -> (Console<Vec<u8>>, ConsoleWindow) {
        let mut console = Console::headless(Vec::new(), Size::new(10, 20));
        let screen = console.open_session().unwrap();
        (console, screen)
    }

    fn output(console: &Console<Vec<u8>>) -> String {
        String::from_utf8_lossy(console.writer()).into_owned()
    }

    #[test]
    fn test_put_str_advances_cursor() {
        let (mut console, screen) = console();
        console.put_str(&screen, "hi").unwrap();
        assert_eq!(console.cursor(&screen), Some(Position::new(0, 2)));
        assert!(output(&console).contains('h'));
    }

    #[test]
    fn test_wide_chars_and_wrap() {
        let (mut console, _) = console();
        let win = console
            .create_window(Size::new(3, 4), Position::new(2, 2))
            .unwrap();
        // two wide chars fill the row, the cursor moves to the next one
        console.put_str(&win, "日本").unwrap();
        assert_eq!(console.cursor(&win), Some(Position::new(1, 0)));
        console.put_str(&win, "abc\nd").unwrap();
        assert_eq!(console.cursor(&win), Some(Position::new(2, 1)));
    }

    #[test]
    fn test_destroyed_window_rejected() {
        let (mut console, screen) = console();
        let win = console
            .create_window(Size::new(3, 4), Position::new(1, 1))
            .unwrap();
        console.destroy_window(win).unwrap();
        assert_eq!(console.cursor(&win), None);
        assert!(matches!(
            console.put_str(&win, "x"),
            Err(TerminalError::InvalidHandle)
        ));
        assert!(console.destroy_window(win).is_err());
        console.put_str(&screen, "ok").unwrap();
    }

    #[test]
    fn test_cursor_clamped_to_window() {
        let (mut console, _) = console();
        let win = console
            .create_window(Size::new(3, 4), Position::new(0, 0))
            .unwrap();
        console.move_cursor(&win, Position::new(9, 9)).unwrap();
        assert_eq!(console.cursor(&win), Some(Position::new(2, 3)));
        assert_eq!(console.window_position(&win).unwrap(), Position::new(0, 0));
    }

    #[test]
    fn test_border_glyphs_written() {
        let (mut console, _) = console();
        let win = console
            .create_window(Size::new(3, 5), Position::new(1, 1))
            .unwrap();
        let border = ResolvedBorder {
            glyphs: BorderGlyphs::double(),
            pair: None,
        };
        console.draw_border(&win, &border).unwrap();
        let out = output(&console);
        assert!(out.contains("╔═══╗"));
        assert!(out.contains("╚═══╝"));
    }

    #[test]
    fn test_sequential_pairs() {
        let (mut console, _) = console();
        console.start_color().unwrap();
        let a = console.allocate_color_pair(Color::White, Color::Red).unwrap();
        let b = console.allocate_color_pair(Color::Black, Color::Cyan).unwrap();
        assert_eq!((a, b), (ColorPair(1), ColorPair(2)));
    }

    #[test]
    fn test_line_discipline() {
        let (mut console, screen) = console();
        console.set_raw_mode(false, false).unwrap();
        console
            .discipline(&screen, vec!['a' as RawCode, 'b' as RawCode])
            .unwrap();
        assert!(console.pending.is_empty());
        console.discipline(&screen, vec!['\n' as RawCode]).unwrap();
        assert_eq!(console.pending.len(), 3);
        assert_eq!(console.read_input(&screen).unwrap(), Some('a' as RawCode));
    }

    #[test]
    fn test_echo_draws_typed_chars() {
        let (mut console, screen) = console();
        console.set_raw_mode(true, true).unwrap();
        console.discipline(&screen, vec!['z' as RawCode]).unwrap();
        assert!(output(&console).contains('z'));
        assert_eq!(console.cursor(&screen), Some(Position::new(0, 1)));
    }
}

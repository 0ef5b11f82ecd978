//! Live session handle.
//!
//! A [`Session`] exists only while a terminal session is open: [`Session::init`]
//! consumes a terminal and [`Session::deinit`] gives it back, so drawing
//! outside a session cannot be written. Every method checks its command
//! against the current state before the terminal sees it, which lets a
//! program branch on what it reads.

use tracing::warn;

use crate::backend::Terminal;
use crate::core::capability::Capability;
use crate::core::command::{Command, Outcome, Output};
use crate::core::input::{Input, InputShape, ReadMode};
use crate::core::state::{ActiveState, RegisteredColor, SessionOptions};
use crate::core::types::{Attribute, Border, Color, CursorVisibility, Position, Size};
use crate::error::{ProtocolError, Result};

use super::interpreter::Interpreter;

pub struct Session<T: Terminal> {
    /// Taken by `deinit`; present for the whole life of a live handle.
    inner: Option<Interpreter<T>>,
}

impl<T: Terminal> Session<T> {
    /// Open a session with default options.
    pub fn init(term: T) -> Result<Self> {
        Self::init_with(term, SessionOptions::default())
    }

    pub fn init_with(term: T, options: SessionOptions) -> Result<Self> {
        let mut interp = Interpreter::new(term);
        interp.execute(&Command::Init(options))?;
        Ok(Self {
            inner: Some(interp),
        })
    }

    /// Close the session and hand the terminal back.
    pub fn deinit(mut self) -> Result<T> {
        let mut interp = self.inner.take().ok_or(ProtocolError::NotActive)?;
        if let Err(e) = interp.execute(&Command::Deinit) {
            // leave it for drop to retry
            self.inner = Some(interp);
            return Err(e);
        }
        Ok(interp.into_terminal())
    }

    pub fn interpreter(&self) -> Result<&Interpreter<T>> {
        Ok(self.inner.as_ref().ok_or(ProtocolError::NotActive)?)
    }

    /// Current abstract state.
    pub fn state(&self) -> Result<&ActiveState> {
        Ok(self.interpreter()?.state().active()?)
    }

    /// Look up a registered color.
    pub fn color(&self, name: &str) -> Result<RegisteredColor> {
        Ok(self.state()?.color(name)?)
    }

    pub fn input_shape(&self) -> Result<InputShape> {
        Ok(self.state()?.input_shape())
    }

    fn exec(&mut self, command: Command) -> Result<Outcome> {
        self.inner
            .as_mut()
            .ok_or(ProtocolError::NotActive)?
            .execute(&command)
    }

    fn unit(&mut self, command: Command) -> Result<()> {
        self.exec(command).map(|_| ())
    }

    /// Run `command` and pull the expected value out of its outcome.
    fn query<V>(
        &mut self,
        command: Command,
        expected: &'static str,
        extract: impl FnOnce(Outcome) -> Option<V>,
    ) -> Result<V> {
        let label = command.to_string();
        let outcome = self.exec(command)?;
        extract(outcome).ok_or_else(|| {
            ProtocolError::UnexpectedOutcome {
                command: label,
                expected,
            }
            .into()
        })
    }

    pub fn add_window(
        &mut self,
        name: &str,
        pos: Position,
        size: Size,
        border: Option<Border>,
    ) -> Result<()> {
        self.unit(Command::AddWindow {
            name: name.to_string(),
            pos,
            size,
            border,
        })
    }

    pub fn set_window(&mut self, name: &str) -> Result<()> {
        self.unit(Command::SetWindow(name.to_string()))
    }

    pub fn unset_window(&mut self) -> Result<()> {
        self.unit(Command::UnsetWindow)
    }

    /// Register a color and get its proof back.
    pub fn add_color(&mut self, name: &str, fg: Color, bg: Color) -> Result<RegisteredColor> {
        self.unit(Command::AddColor {
            name: name.to_string(),
            fg,
            bg,
        })?;
        self.color(name)
    }

    pub fn set_attr(&mut self, attr: Attribute) -> Result<()> {
        self.unit(Command::SetAttr(attr))
    }

    pub fn enable_attr(&mut self, attr: Attribute) -> Result<()> {
        self.unit(Command::EnableAttr(attr))
    }

    pub fn disable_attr(&mut self, attr: Attribute) -> Result<()> {
        self.unit(Command::DisableAttr(attr))
    }

    pub fn clear(&mut self) -> Result<()> {
        self.unit(Command::Clear)
    }

    pub fn erase(&mut self) -> Result<()> {
        self.unit(Command::Erase)
    }

    pub fn refresh(&mut self) -> Result<()> {
        self.unit(Command::Refresh)
    }

    pub fn put_char(&mut self, ch: char) -> Result<()> {
        self.unit(Command::Output(Output::Char(ch)))
    }

    pub fn put_str(&mut self, s: &str) -> Result<()> {
        self.unit(Command::Output(Output::Str(s.to_string())))
    }

    pub fn put_line(&mut self, s: &str) -> Result<()> {
        self.unit(Command::Output(Output::Line(s.to_string())))
    }

    pub fn hline(&mut self, ch: char, len: u16) -> Result<()> {
        self.unit(Command::Output(Output::HLine { ch, len }))
    }

    pub fn vline(&mut self, ch: char, len: u16) -> Result<()> {
        self.unit(Command::Output(Output::VLine { ch, len }))
    }

    pub fn move_to(&mut self, pos: Position) -> Result<()> {
        self.unit(Command::Output(Output::Move(pos)))
    }

    pub fn get_pos(&mut self) -> Result<Position> {
        self.query(Command::GetPos, "a position", Outcome::position)
    }

    pub fn get_size(&mut self) -> Result<Size> {
        self.query(Command::GetSize, "a size", Outcome::size)
    }

    pub fn set_size(&mut self, size: Size) -> Result<()> {
        self.unit(Command::SetSize(size))
    }

    pub fn set_echo(&mut self, on: bool) -> Result<()> {
        self.unit(Command::SetEcho(on))
    }

    pub fn set_cbreak(&mut self, on: bool) -> Result<()> {
        self.unit(Command::SetCBreak(on))
    }

    pub fn set_keypad(&mut self, on: bool) -> Result<()> {
        self.unit(Command::SetKeypad(on))
    }

    pub fn set_no_delay(&mut self, on: bool) -> Result<()> {
        self.unit(Command::SetNoDelay(on))
    }

    pub fn set_cursor(&mut self, visibility: CursorVisibility) -> Result<()> {
        self.unit(Command::SetCursor(visibility))
    }

    /// Read with a shape fixed at compile time. Rejected unless the current
    /// window's flags produce exactly that shape.
    pub fn read<M: ReadMode>(&mut self) -> Result<M::Output> {
        self.inner
            .as_mut()
            .ok_or(ProtocolError::NotActive)?
            .read::<M>()
    }

    /// Read with whatever shape the current window has.
    pub fn read_any(&mut self) -> Result<Input> {
        self.query(Command::GetInput, "input", Outcome::input)
    }

    /// Check a capability against the current state.
    pub fn require(&mut self, cap: Capability) -> Result<()> {
        self.unit(Command::Require(cap))
    }
}

impl<T: Terminal> Drop for Session<T> {
    fn drop(&mut self) {
        if let Some(interp) = self.inner.as_mut() {
            if interp.state().is_active() {
                if let Err(e) = interp.execute(&Command::Deinit) {
                    warn!("Failed to close terminal session: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{Call, MockTerminal};
    use crate::core::input::{Chars, Key, Keys, PollChars, PollKeys, SpecialKey};
    use crate::core::state::DEFAULT_WINDOW;
    use crate::core::types::BorderGlyphs;
    use crate::error::Error;

    fn open(term: MockTerminal) -> Session<MockTerminal> {
        Session::init(term).unwrap()
    }

    fn square() -> (Position, Size) {
        (Position::new(0, 0), Size::new(4, 10))
    }

    #[test]
    fn test_default_window_after_init() {
        let session = open(MockTerminal::default());
        let state = session.state().unwrap();
        let current = state.current_window();
        assert_eq!(current.id, DEFAULT_WINDOW);
        assert!(current.keypad);
        assert!(!current.no_delay);
        assert!(!state.input().echo);
        assert!(state.input().cbreak);
    }

    #[test]
    fn test_deinit_returns_terminal() {
        let mut session = open(MockTerminal::default());
        session.put_str("bye").unwrap();
        let term = session.deinit().unwrap();
        assert!(!term.is_open());
        assert_eq!(term.calls().last(), Some(&Call::CloseSession));
    }

    #[test]
    fn test_missing_window_rejected_before_terminal() {
        let mut session = open(MockTerminal::default());
        let before = session.interpreter().unwrap().terminal().calls().len();
        let err = session.set_window("missing").unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::UnknownWindow(_))
        ));
        let after = session.interpreter().unwrap().terminal().calls().len();
        assert_eq!(before, after);
    }

    #[test]
    fn test_flag_locality() {
        let mut session = open(MockTerminal::default());
        let (pos, size) = square();
        session.add_window("A", pos, size, None).unwrap();
        session.add_window("B", pos, size, None).unwrap();
        session.set_window("A").unwrap();
        session.set_keypad(false).unwrap();

        let state = session.state().unwrap();
        let b = &state.windows()[state.find_window("B").unwrap()];
        assert!(b.keypad);
        assert!(!state.current_window().keypad);

        let mirror = session.interpreter().unwrap().mirror().unwrap();
        let b = &mirror.windows()[mirror.find_window("B").unwrap()];
        assert!(b.desc.keypad);
    }

    #[test]
    fn test_color_monotonic() {
        let mut session = open(MockTerminal::default());
        let alert = session.add_color("alert", Color::White, Color::Red).unwrap();
        let (pos, size) = square();
        for name in ["a", "b", "c"] {
            session.add_window(name, pos, size, None).unwrap();
            session.set_window(name).unwrap();
            session.add_color(name, Color::Blue, Color::Black).unwrap();
            assert!(session.color("alert").is_ok());
        }
        session.set_attr(Attribute::Color(alert)).unwrap();
    }

    #[test]
    fn test_typed_reads() {
        let term = MockTerminal::default().with_input([SpecialKey::Left.code(), 'q' as u32]);
        let mut session = open(term);

        let key: Key = session.read::<Keys>().unwrap();
        assert_eq!(key, Key::Special(SpecialKey::Left));

        session.set_keypad(false).unwrap();
        let ch: char = session.read::<Chars>().unwrap();
        assert_eq!(ch, 'q');

        session.set_no_delay(true).unwrap();
        let none: Option<char> = session.read::<PollChars>().unwrap();
        assert_eq!(none, None);

        let err = session.read::<PollKeys>().unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::WrongInputMode { .. })
        ));
    }

    #[test]
    fn test_input_shape_correctness() {
        let mut session = open(MockTerminal::default().with_chars("x"));
        assert_eq!(session.input_shape().unwrap(), InputShape::Key);
        assert_eq!(session.read_any().unwrap(), Input::Key(Key::Char('x')));

        session.set_no_delay(true).unwrap();
        assert_eq!(session.input_shape().unwrap(), InputShape::MaybeKey);
        assert_eq!(session.read_any().unwrap(), Input::MaybeKey(None));
    }

    #[test]
    fn test_scenario_alert_win1() {
        let mut session = open(MockTerminal::default().with_chars("k"));
        session.add_color("alert", Color::White, Color::Red).unwrap();
        let (pos, size) = square();
        session.add_window("win1", pos, size, None).unwrap();
        session.set_window("win1").unwrap();
        session.set_keypad(false).unwrap();

        // keypad is now off on win1, so reads are plain blocking chars
        assert_eq!(session.input_shape().unwrap(), InputShape::Char);
        assert_eq!(session.read_any().unwrap(), Input::Char('k'));

        let mirror = session.interpreter().unwrap().mirror().unwrap();
        assert_eq!(mirror.windows().len(), 2);
        assert_eq!(mirror.current().desc.id, "win1");
    }

    #[test]
    fn test_require() {
        let mut session = open(MockTerminal::default());
        session
            .require(Capability::CurrentWindow(DEFAULT_WINDOW.into()))
            .unwrap();
        let err = session
            .require(Capability::CurrentWindow("other".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::WrongWindow { .. })
        ));
    }

    #[test]
    fn test_bordered_window_and_geometry() {
        let mut session = open(MockTerminal::default());
        let frame = session.add_color("frame", Color::Cyan, Color::Black).unwrap();
        session
            .add_window(
                "box",
                Position::new(3, 4),
                Size::new(5, 12),
                Some(Border::colored(BorderGlyphs::rounded(), frame)),
            )
            .unwrap();
        session.set_window("box").unwrap();
        assert_eq!(session.get_pos().unwrap(), Position::new(3, 4));
        session.set_size(Size::new(6, 14)).unwrap();
        assert_eq!(session.get_size().unwrap(), Size::new(6, 14));
    }

    #[test]
    fn test_query_reports_wrong_outcome() {
        let mut session = open(MockTerminal::default());
        let err = session
            .query(Command::Refresh, "a size", Outcome::size)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::UnexpectedOutcome {
                expected: "a size",
                ..
            })
        ));
        assert_eq!(err.to_string(), "refresh finished without a size");
    }

    #[test]
    fn test_extended_latin_reads_as_characters() {
        let mut session = open(MockTerminal::default().with_chars("ăłą"));
        assert_eq!(session.read::<Keys>().unwrap(), Key::Char('ă'));
        assert_eq!(session.read::<Keys>().unwrap(), Key::Char('ł'));
        session.set_no_delay(true).unwrap();
        assert_eq!(session.read::<PollKeys>().unwrap(), Some(Key::Char('ą')));
        assert_eq!(session.read::<PollKeys>().unwrap(), None);
    }
}

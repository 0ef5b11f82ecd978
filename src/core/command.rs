//! The closed command algebra.
//!
//! Every terminal operation is one [`Command`]. A command knows the
//! capabilities it needs from its pre-state and how it transforms that state;
//! it carries no behavior of its own. Running it is the interpreter's job.

use std::fmt;

use crate::error::ProtocolError;

use super::capability::{check_all, Capability};
use super::input::{Input, InputShape};
use super::state::{SessionOptions, SessionState, DEFAULT_WINDOW};
use super::types::{Attribute, Border, Color, CursorVisibility, Position, Size};

/// Drawing operations on the current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Char(char),
    Str(String),
    /// String followed by a newline.
    Line(String),
    HLine { ch: char, len: u16 },
    VLine { ch: char, len: u16 },
    Move(Position),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init(SessionOptions),
    Deinit,
    AddWindow {
        name: String,
        pos: Position,
        size: Size,
        border: Option<Border>,
    },
    SetWindow(String),
    UnsetWindow,
    AddColor {
        name: String,
        fg: Color,
        bg: Color,
    },
    SetAttr(Attribute),
    EnableAttr(Attribute),
    DisableAttr(Attribute),
    Clear,
    Erase,
    Refresh,
    Output(Output),
    GetPos,
    GetSize,
    SetSize(Size),
    SetEcho(bool),
    SetCBreak(bool),
    SetKeypad(bool),
    SetNoDelay(bool),
    SetCursor(CursorVisibility),
    /// Read with whatever shape the current window has.
    GetInput,
    /// Read that insists on a particular shape.
    ReadAs(InputShape),
    /// Assert a capability without touching the terminal.
    Require(Capability),
}

/// Result of executing one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unit,
    Position(Position),
    Size(Size),
    Input(Input),
}

impl Outcome {
    pub fn position(self) -> Option<Position> {
        match self {
            Outcome::Position(pos) => Some(pos),
            _ => None,
        }
    }

    pub fn size(self) -> Option<Size> {
        match self {
            Outcome::Size(size) => Some(size),
            _ => None,
        }
    }

    pub fn input(self) -> Option<Input> {
        match self {
            Outcome::Input(input) => Some(input),
            _ => None,
        }
    }
}

impl Command {
    /// Capabilities the pre-state must satisfy.
    pub fn requirements(&self) -> Vec<Capability> {
        let mut caps = match self {
            Command::Init(_) => return vec![Capability::SessionInactive],
            _ => vec![Capability::SessionActive],
        };

        match self {
            Command::AddWindow { name, border, .. } => {
                caps.push(Capability::WindowNameFree(name.clone()));
                if let Some(color) = border.as_ref().and_then(|b| b.color.as_ref()) {
                    caps.push(Capability::ColorExists(color.name().to_string()));
                }
            }
            Command::SetWindow(name) => caps.push(Capability::WindowExists(name.clone())),
            Command::UnsetWindow => caps.push(Capability::WindowExists(DEFAULT_WINDOW.into())),
            Command::AddColor { name, .. } => caps.push(Capability::ColorNameFree(name.clone())),
            Command::SetAttr(attr) | Command::EnableAttr(attr) | Command::DisableAttr(attr) => {
                if let Attribute::Color(color) = attr {
                    caps.push(Capability::ColorExists(color.name().to_string()));
                }
            }
            Command::ReadAs(shape) => caps.push(Capability::InputMode(*shape)),
            Command::Require(cap) => caps.push(cap.clone()),
            _ => {}
        }
        caps
    }

    /// Check the requirements against `state`.
    pub fn check(&self, state: &SessionState) -> Result<(), ProtocolError> {
        check_all(&self.requirements(), state)
    }

    /// Post-state of this command, or the first unmet requirement.
    pub fn apply(&self, state: SessionState) -> Result<SessionState, ProtocolError> {
        self.check(&state)?;
        match self {
            Command::Init(options) => state.init(*options),
            Command::Deinit => state.deinit(),
            Command::AddWindow { name, .. } => state.map_active(|s| s.add_window(name)),
            Command::SetWindow(name) => state.map_active(|s| s.set_window(name)),
            Command::UnsetWindow => state.map_active(|s| s.unset_window()),
            Command::AddColor { name, .. } => state.map_active(|s| s.add_color(name)),
            Command::SetEcho(on) => state.map_active(|s| Ok(s.set_echo(*on))),
            Command::SetCBreak(on) => state.map_active(|s| Ok(s.set_cbreak(*on))),
            Command::SetKeypad(on) => state.map_active(|s| Ok(s.set_keypad(*on))),
            Command::SetNoDelay(on) => state.map_active(|s| Ok(s.set_no_delay(*on))),
            _ => Ok(state),
        }
    }

    /// Whether this command can change the abstract state.
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            Command::Init(_)
                | Command::Deinit
                | Command::AddWindow { .. }
                | Command::SetWindow(_)
                | Command::UnsetWindow
                | Command::AddColor { .. }
                | Command::SetEcho(_)
                | Command::SetCBreak(_)
                | Command::SetKeypad(_)
                | Command::SetNoDelay(_)
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Init(_) => write!(f, "init"),
            Command::Deinit => write!(f, "deinit"),
            Command::AddWindow { name, .. } => write!(f, "add_window({})", name),
            Command::SetWindow(name) => write!(f, "set_window({})", name),
            Command::UnsetWindow => write!(f, "unset_window"),
            Command::AddColor { name, .. } => write!(f, "add_color({})", name),
            Command::SetAttr(attr) => write!(f, "set_attr({:?})", attr),
            Command::EnableAttr(attr) => write!(f, "enable_attr({:?})", attr),
            Command::DisableAttr(attr) => write!(f, "disable_attr({:?})", attr),
            Command::Clear => write!(f, "clear"),
            Command::Erase => write!(f, "erase"),
            Command::Refresh => write!(f, "refresh"),
            Command::Output(out) => write!(f, "output({:?})", out),
            Command::GetPos => write!(f, "get_pos"),
            Command::GetSize => write!(f, "get_size"),
            Command::SetSize(size) => write!(f, "set_size({}x{})", size.rows, size.cols),
            Command::SetEcho(on) => write!(f, "set_echo({})", on),
            Command::SetCBreak(on) => write!(f, "set_cbreak({})", on),
            Command::SetKeypad(on) => write!(f, "set_keypad({})", on),
            Command::SetNoDelay(on) => write!(f, "set_no_delay({})", on),
            Command::SetCursor(v) => write!(f, "set_cursor({:?})", v),
            Command::GetInput => write!(f, "get_input"),
            Command::ReadAs(shape) => write!(f, "read_as({:?})", shape),
            Command::Require(cap) => write!(f, "require({})", cap),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(cmds: &[Command]) -> Result<SessionState, ProtocolError> {
        cmds.iter()
            .try_fold(SessionState::Inactive, |state, cmd| cmd.apply(state))
    }

    #[test]
    fn test_requirements() {
        assert_eq!(
            Command::Init(SessionOptions::default()).requirements(),
            vec![Capability::SessionInactive]
        );
        assert_eq!(
            Command::SetWindow("w".into()).requirements(),
            vec![
                Capability::SessionActive,
                Capability::WindowExists("w".into())
            ]
        );
        assert_eq!(Command::Refresh.requirements(), vec![Capability::SessionActive]);
    }

    #[test]
    fn test_apply_sequence() {
        let state = run(&[
            Command::Init(SessionOptions::default()),
            Command::AddColor {
                name: "alert".into(),
                fg: Color::White,
                bg: Color::Red,
            },
            Command::AddWindow {
                name: "win1".into(),
                pos: Position::new(0, 0),
                size: Size::new(5, 10),
                border: None,
            },
            Command::SetWindow("win1".into()),
            Command::SetKeypad(false),
        ])
        .unwrap();
        let active = state.active().unwrap();
        assert_eq!(active.current_window().id, "win1");
        assert!(!active.current_window().keypad);
        assert!(active.has_color("alert"));
    }

    #[test]
    fn test_non_transitions_keep_state() {
        let state = run(&[Command::Init(SessionOptions::default())]).unwrap();
        for cmd in [
            Command::Clear,
            Command::Refresh,
            Command::GetSize,
            Command::Output(Output::Str("hi".into())),
        ] {
            assert!(!cmd.is_transition());
            assert_eq!(cmd.apply(state.clone()).unwrap(), state);
        }
    }

    #[test]
    fn test_apply_rejects_inactive() {
        assert_eq!(run(&[Command::Refresh]), Err(ProtocolError::NotActive));
        assert_eq!(
            run(&[Command::Init(SessionOptions::default()), Command::Deinit, Command::Clear]),
            Err(ProtocolError::NotActive)
        );
    }

    #[test]
    fn test_read_as_checks_mode() {
        let err = run(&[
            Command::Init(SessionOptions::default()),
            Command::ReadAs(InputShape::Char),
        ])
        .unwrap_err();
        assert!(matches!(err, ProtocolError::WrongInputMode { .. }));
    }
}

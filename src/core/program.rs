//! Program construction with step-by-step validation.
//!
//! [`ProgramBuilder`] threads the abstract state through every step. The
//! phase parameter makes session-order mistakes (drawing before `init`,
//! `init` twice, anything after `deinit`) fail to compile; name lookups,
//! color proofs and read shapes are checked at the step that uses them. A
//! finished [`Program`] has passed every check.
//!
//! ```
//! use termguard::core::program::ProgramBuilder;
//! use termguard::core::types::{Color, Position, Size};
//!
//! let program = ProgramBuilder::new()
//!     .init()
//!     .add_color("alert", Color::White, Color::Red)?
//!     .add_window("win1", Position::new(1, 1), Size::new(5, 20), None)?
//!     .set_window("win1")?
//!     .put_str("hello")
//!     .refresh()
//!     .deinit()
//!     .build();
//! assert_eq!(program.len(), 7);
//! # Ok::<(), termguard::error::ProtocolError>(())
//! ```

use crate::error::ProtocolError;

use super::capability::Capability;
use super::command::{Command, Output};
use super::input::{InputShape, ReadMode};
use super::state::{ActiveState, RegisteredColor, SessionOptions, SessionState};
use super::types::{Attribute, Border, Color, CursorVisibility, Position, Size};

/// Phase marker: no session running.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inactive;

/// Phase marker carrying the state of the running session.
#[derive(Debug, Clone)]
pub struct Active(ActiveState);

/// Builder for a validated command sequence.
#[derive(Debug, Clone)]
pub struct ProgramBuilder<P> {
    phase: P,
    commands: Vec<Command>,
}

impl Default for ProgramBuilder<Inactive> {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder<Inactive> {
    pub fn new() -> Self {
        Self {
            phase: Inactive,
            commands: Vec::new(),
        }
    }

    pub fn init(self) -> ProgramBuilder<Active> {
        self.init_with(SessionOptions::default())
    }

    pub fn init_with(mut self, options: SessionOptions) -> ProgramBuilder<Active> {
        self.commands.push(Command::Init(options));
        ProgramBuilder {
            phase: Active(ActiveState::new(options)),
            commands: self.commands,
        }
    }

    pub fn build(self) -> Program {
        Program {
            commands: self.commands,
        }
    }
}

impl ProgramBuilder<Active> {
    /// Abstract state after the last step.
    pub fn state(&self) -> &ActiveState {
        &self.phase.0
    }

    /// Look up a registered color, for use in attributes and borders.
    pub fn color(&self, name: &str) -> Result<RegisteredColor, ProtocolError> {
        self.state().color(name)
    }

    /// Shape a `get_input` at this point would produce.
    pub fn input_shape(&self) -> InputShape {
        self.state().input_shape()
    }

    /// Finish without `deinit`. Running the program leaves the session open.
    pub fn build_active(self) -> Program {
        Program {
            commands: self.commands,
        }
    }

    pub fn deinit(mut self) -> ProgramBuilder<Inactive> {
        self.commands.push(Command::Deinit);
        ProgramBuilder {
            phase: Inactive,
            commands: self.commands,
        }
    }

    /// Requirements of `command` against the state after the last step.
    /// Color proofs are re-checked here: a proof minted by another builder or
    /// an earlier session is only accepted when this state has the color.
    fn check(&self, command: &Command) -> Result<(), ProtocolError> {
        command
            .requirements()
            .iter()
            .try_for_each(|cap| cap.check_active(self.state()))
    }

    fn transition<F>(mut self, command: Command, f: F) -> Result<Self, ProtocolError>
    where
        F: FnOnce(ActiveState) -> Result<ActiveState, ProtocolError>,
    {
        self.check(&command)?;
        self.phase = Active(f(self.phase.0)?);
        self.commands.push(command);
        Ok(self)
    }

    fn update<F>(mut self, command: Command, f: F) -> Self
    where
        F: FnOnce(ActiveState) -> ActiveState,
    {
        self.phase = Active(f(self.phase.0));
        self.commands.push(command);
        self
    }

    fn push(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    fn checked(self, command: Command) -> Result<Self, ProtocolError> {
        self.check(&command)?;
        Ok(self.push(command))
    }

    pub fn add_window(
        self,
        name: &str,
        pos: Position,
        size: Size,
        border: Option<Border>,
    ) -> Result<Self, ProtocolError> {
        let command = Command::AddWindow {
            name: name.to_string(),
            pos,
            size,
            border,
        };
        self.transition(command, |s| s.add_window(name))
    }

    pub fn set_window(self, name: &str) -> Result<Self, ProtocolError> {
        self.transition(Command::SetWindow(name.to_string()), |s| s.set_window(name))
    }

    pub fn unset_window(self) -> Result<Self, ProtocolError> {
        self.transition(Command::UnsetWindow, |s| s.unset_window())
    }

    pub fn add_color(self, name: &str, fg: Color, bg: Color) -> Result<Self, ProtocolError> {
        let command = Command::AddColor {
            name: name.to_string(),
            fg,
            bg,
        };
        self.transition(command, |s| s.add_color(name))
    }

    pub fn set_attr(self, attr: Attribute) -> Result<Self, ProtocolError> {
        self.checked(Command::SetAttr(attr))
    }

    pub fn enable_attr(self, attr: Attribute) -> Result<Self, ProtocolError> {
        self.checked(Command::EnableAttr(attr))
    }

    pub fn disable_attr(self, attr: Attribute) -> Result<Self, ProtocolError> {
        self.checked(Command::DisableAttr(attr))
    }

    pub fn clear(self) -> Self {
        self.push(Command::Clear)
    }

    pub fn erase(self) -> Self {
        self.push(Command::Erase)
    }

    pub fn refresh(self) -> Self {
        self.push(Command::Refresh)
    }

    pub fn put_char(self, ch: char) -> Self {
        self.push(Command::Output(Output::Char(ch)))
    }

    pub fn put_str(self, s: impl Into<String>) -> Self {
        self.push(Command::Output(Output::Str(s.into())))
    }

    pub fn put_line(self, s: impl Into<String>) -> Self {
        self.push(Command::Output(Output::Line(s.into())))
    }

    pub fn hline(self, ch: char, len: u16) -> Self {
        self.push(Command::Output(Output::HLine { ch, len }))
    }

    pub fn vline(self, ch: char, len: u16) -> Self {
        self.push(Command::Output(Output::VLine { ch, len }))
    }

    pub fn move_to(self, pos: Position) -> Self {
        self.push(Command::Output(Output::Move(pos)))
    }

    pub fn get_pos(self) -> Self {
        self.push(Command::GetPos)
    }

    pub fn get_size(self) -> Self {
        self.push(Command::GetSize)
    }

    pub fn set_size(self, size: Size) -> Self {
        self.push(Command::SetSize(size))
    }

    pub fn set_echo(self, on: bool) -> Self {
        self.update(Command::SetEcho(on), |s| s.set_echo(on))
    }

    pub fn set_cbreak(self, on: bool) -> Self {
        self.update(Command::SetCBreak(on), |s| s.set_cbreak(on))
    }

    pub fn set_keypad(self, on: bool) -> Self {
        self.update(Command::SetKeypad(on), |s| s.set_keypad(on))
    }

    pub fn set_no_delay(self, on: bool) -> Self {
        self.update(Command::SetNoDelay(on), |s| s.set_no_delay(on))
    }

    pub fn set_cursor(self, visibility: CursorVisibility) -> Self {
        self.push(Command::SetCursor(visibility))
    }

    /// Read with the current window's shape, see [`Self::input_shape`].
    pub fn get_input(self) -> Self {
        self.push(Command::GetInput)
    }

    /// Read that is only accepted when the current window matches `M`.
    pub fn read<M: ReadMode>(self) -> Result<Self, ProtocolError> {
        Capability::InputMode(M::shape()).check_active(self.state())?;
        Ok(self.push(Command::ReadAs(M::shape())))
    }

    /// Assert a capability at this point of the program.
    pub fn require(self, cap: Capability) -> Result<Self, ProtocolError> {
        cap.check_active(self.state())?;
        Ok(self.push(Command::Require(cap)))
    }
}

/// A command sequence whose every step has been validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    commands: Vec<Command>,
}

impl Program {
    /// Validate a dynamically assembled command list from an inactive state.
    pub fn validate(commands: Vec<Command>) -> Result<Program, ProtocolError> {
        Self::validate_from(SessionState::Inactive, commands).map(|(program, _)| program)
    }

    /// Validate starting at `state`, returning the program and its final state.
    pub fn validate_from(
        state: SessionState,
        commands: Vec<Command>,
    ) -> Result<(Program, SessionState), ProtocolError> {
        let mut state = state;
        for (index, command) in commands.iter().enumerate() {
            state = command
                .apply(state)
                .map_err(|source| ProtocolError::Rejected {
                    index,
                    command: command.to_string(),
                    source: Box::new(source),
                })?;
        }
        Ok((Program { commands }, state))
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

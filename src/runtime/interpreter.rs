//! Command dispatch.
//!
//! The interpreter owns the terminal, the abstract state the commands are
//! checked against, and the runtime mirror. Each command is checked, sent to
//! the terminal, reflected in the mirror, and only then committed to the
//! abstract state. A terminal failure stops execution with both left at the
//! last completed step.

use tracing::{debug, info, warn};

use crate::backend::Terminal;
use crate::core::command::{Command, Outcome, Output};
use crate::core::input::{InputShape, ReadMode};
use crate::core::program::Program;
use crate::core::state::{ActiveState, SessionState};
use crate::core::types::{AttrOp, ResolvedBorder};
use crate::error::{ProtocolError, Result, TerminalError};

use super::mirror::Mirror;

pub struct Interpreter<T: Terminal> {
    term: T,
    state: SessionState,
    mirror: Option<Mirror<T::Window>>,
}

impl<T: Terminal> Interpreter<T> {
    pub fn new(term: T) -> Self {
        Self {
            term,
            state: SessionState::Inactive,
            mirror: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The mirror, while a session is active.
    pub fn mirror(&self) -> Option<&Mirror<T::Window>> {
        self.mirror.as_ref()
    }

    pub fn terminal(&self) -> &T {
        &self.term
    }

    pub fn into_terminal(self) -> T {
        self.term
    }

    /// Execute every command of a program, left to right.
    pub fn run(&mut self, program: &Program) -> Result<Vec<Outcome>> {
        program.iter().map(|command| self.execute(command)).collect()
    }

    /// Execute one command.
    pub fn execute(&mut self, command: &Command) -> Result<Outcome> {
        let next = command.apply(self.state.clone())?;
        debug!("Executing {}", command);

        let outcome = self.dispatch(command)?;
        self.state = next;

        debug_assert!(
            self.is_consistent(),
            "runtime mirror diverged from session state after {}",
            command
        );
        Ok(outcome)
    }

    /// Read from the current window with a statically known shape.
    pub fn read<M: ReadMode>(&mut self) -> Result<M::Output> {
        Command::ReadAs(M::shape()).check(&self.state)?;
        let mirror = self.mirror.as_ref().ok_or(ProtocolError::NotActive)?;
        let raw = self.term.read_input(&mirror.current().handle)?;
        Ok(M::resolve(raw, mirror.keys()).ok_or(TerminalError::NoInput)?)
    }

    /// Abstract state and mirror agree.
    pub fn is_consistent(&self) -> bool {
        match (&self.state, &self.mirror) {
            (SessionState::Inactive, None) => true,
            (SessionState::Active(state), Some(mirror)) => {
                state.is_well_formed() && mirror.is_consistent_with(state)
            }
            _ => false,
        }
    }

    fn dispatch(&mut self, command: &Command) -> Result<Outcome> {
        match command {
            Command::Init(_) => {
                let screen = self.term.open_session()?;
                self.term.set_raw_mode(true, false)?;
                self.term.set_keypad(&screen, true)?;
                self.term.set_no_delay(&screen, false)?;
                let keys = self.term.special_keys();
                info!("Session started ({} special keys)", keys.len());
                self.mirror = Some(Mirror::new(screen, keys));
                Ok(Outcome::Unit)
            }
            Command::Deinit => {
                self.term.close_session()?;
                self.mirror = None;
                info!("Session ended");
                Ok(Outcome::Unit)
            }
            _ => {
                let state = self.state.active()?;
                let mirror = self.mirror.as_mut().ok_or(ProtocolError::NotActive)?;
                dispatch_active(&mut self.term, mirror, state, command)
            }
        }
    }
}

/// Library defaults for a fresh window, then its border.
fn prepare_window<T: Terminal>(
    term: &mut T,
    handle: &T::Window,
    border: Option<&ResolvedBorder>,
) -> std::result::Result<(), TerminalError> {
    term.set_keypad(handle, true)?;
    term.set_no_delay(handle, false)?;
    if let Some(border) = border {
        term.draw_border(handle, border)?;
    }
    Ok(())
}

/// Commands that run inside an active session.
fn dispatch_active<T: Terminal>(
    term: &mut T,
    mirror: &mut Mirror<T::Window>,
    state: &ActiveState,
    command: &Command,
) -> Result<Outcome> {
    match command {
        Command::AddWindow {
            name,
            pos,
            size,
            border,
        } => {
            let border = border
                .as_ref()
                .map(|b| mirror.resolve_border(b))
                .transpose()?;
            let handle = term.create_window(*size, *pos)?;
            if let Err(e) = prepare_window(term, &handle, border.as_ref()) {
                // the window never reached the mirror, so it must not outlive the failure
                if let Err(cleanup) = term.destroy_window(handle) {
                    warn!("Failed to destroy window '{}': {}", name, cleanup);
                }
                return Err(e.into());
            }
            mirror.add_window(name, border, handle);
        }
        Command::SetWindow(name) => mirror.set_window(name)?,
        Command::UnsetWindow => mirror.unset_window()?,
        Command::AddColor { name, fg, bg } => {
            if mirror.colors().is_empty() {
                term.start_color()?;
            }
            let pair = term.allocate_color_pair(*fg, *bg)?;
            debug!("Color '{}' bound to pair {}", name, pair.0);
            mirror.add_color(name, pair);
        }
        Command::SetAttr(attr) => {
            let native = mirror.resolve_attr(attr)?;
            term.apply_attribute(&mirror.current().handle, native, AttrOp::Set)?;
        }
        Command::EnableAttr(attr) => {
            let native = mirror.resolve_attr(attr)?;
            term.apply_attribute(&mirror.current().handle, native, AttrOp::Enable)?;
        }
        Command::DisableAttr(attr) => {
            let native = mirror.resolve_attr(attr)?;
            term.apply_attribute(&mirror.current().handle, native, AttrOp::Disable)?;
        }
        Command::Clear => term.clear(&mirror.current().handle)?,
        Command::Erase => term.erase(&mirror.current().handle)?,
        Command::Refresh => term.refresh(&mirror.current().handle)?,
        Command::Output(output) => {
            let window = &mirror.current().handle;
            match output {
                Output::Char(ch) => term.put_char(window, *ch)?,
                Output::Str(s) => term.put_str(window, s)?,
                Output::Line(s) => {
                    term.put_str(window, s)?;
                    term.put_char(window, '\n')?;
                }
                Output::HLine { ch, len } => term.hline(window, *ch, *len)?,
                Output::VLine { ch, len } => term.vline(window, *ch, *len)?,
                Output::Move(pos) => term.move_cursor(window, *pos)?,
            }
        }
        Command::GetPos => {
            return Ok(Outcome::Position(
                term.window_position(&mirror.current().handle)?,
            ))
        }
        Command::GetSize => return Ok(Outcome::Size(term.window_size(&mirror.current().handle)?)),
        Command::SetSize(size) => term.resize_window(&mirror.current().handle, *size)?,
        Command::SetEcho(on) => term.set_raw_mode(state.input().cbreak, *on)?,
        Command::SetCBreak(on) => term.set_raw_mode(*on, state.input().echo)?,
        Command::SetKeypad(on) => {
            term.set_keypad(&mirror.current().handle, *on)?;
            mirror.set_keypad(*on);
        }
        Command::SetNoDelay(on) => {
            term.set_no_delay(&mirror.current().handle, *on)?;
            mirror.set_no_delay(*on);
        }
        Command::SetCursor(visibility) => term.set_cursor_visibility(*visibility)?,
        Command::GetInput | Command::ReadAs(_) => {
            let window = mirror.current();
            let shape = InputShape::of(&window.desc);
            let raw = term.read_input(&window.handle)?;
            let input = shape
                .resolve(raw, mirror.keys())
                .ok_or(TerminalError::NoInput)?;
            return Ok(Outcome::Input(input));
        }
        // checked only; the terminal is not involved
        Command::Require(_) => {}
        // phase changes are handled by the interpreter itself
        Command::Init(_) | Command::Deinit => {}
    }
    Ok(Outcome::Unit)
}

//! Session state model.
//!
//! [`SessionState`] is the abstract state that commands are checked against.
//! It never touches the terminal: every transition is a pure function from
//! one state to the next, and the runtime mirror is kept structurally equal
//! to it step by step.

use crate::error::ProtocolError;

use super::input::InputShape;

/// Identifier of the window every session starts with.
pub const DEFAULT_WINDOW: &str = "default";

/// Per-window input flags plus the window's identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowDesc {
    pub id: String,
    pub keypad: bool,
    pub no_delay: bool,
}

impl WindowDesc {
    /// A window with the library defaults: keypad on, blocking reads.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            keypad: true,
            no_delay: false,
        }
    }
}

/// Session-wide input flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputState {
    pub cbreak: bool,
    pub echo: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            cbreak: true,
            echo: false,
        }
    }
}

/// Whether window and color names must be unique within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamePolicy {
    /// Duplicates allowed; lookups resolve to the first match.
    #[default]
    Permissive,
    /// Adding an existing name is rejected.
    Unique,
}

/// Options fixed at session start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub names: NamePolicy,
}

impl SessionOptions {
    pub fn unique_names() -> Self {
        Self {
            names: NamePolicy::Unique,
        }
    }
}

/// Proof that a color name is registered in the session.
///
/// Only [`ActiveState::color`] hands these out. The registry never shrinks,
/// so the proof stays valid for the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegisteredColor(String);

impl RegisteredColor {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// State of a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveState {
    input: InputState,
    /// Most recently added first. Never empty.
    windows: Vec<WindowDesc>,
    /// Index into `windows`.
    current: usize,
    colors: Vec<String>,
    options: SessionOptions,
}

impl ActiveState {
    pub(crate) fn new(options: SessionOptions) -> Self {
        Self {
            input: InputState::default(),
            windows: vec![WindowDesc::new(DEFAULT_WINDOW)],
            current: 0,
            colors: Vec::new(),
            options,
        }
    }

    pub fn input(&self) -> InputState {
        self.input
    }

    pub fn windows(&self) -> &[WindowDesc] {
        &self.windows
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_window(&self) -> &WindowDesc {
        &self.windows[self.current]
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Shape a read on the current window produces.
    pub fn input_shape(&self) -> InputShape {
        InputShape::of(self.current_window())
    }

    /// Index of the first window with this identifier.
    pub fn find_window(&self, name: &str) -> Option<usize> {
        self.windows.iter().position(|w| w.id == name)
    }

    pub fn has_window(&self, name: &str) -> bool {
        self.find_window(name).is_some()
    }

    pub fn has_color(&self, name: &str) -> bool {
        self.colors.iter().any(|c| c == name)
    }

    /// Check a color name once and get a value that proves it is registered.
    pub fn color(&self, name: &str) -> Result<RegisteredColor, ProtocolError> {
        if self.has_color(name) {
            Ok(RegisteredColor(name.to_string()))
        } else {
            Err(ProtocolError::UnknownColor(name.to_string()))
        }
    }

    /// Structural invariant: at least one window, current points at one of them.
    pub fn is_well_formed(&self) -> bool {
        !self.windows.is_empty() && self.current < self.windows.len()
    }

    pub fn add_window(mut self, name: &str) -> Result<Self, ProtocolError> {
        if self.options.names == NamePolicy::Unique && self.has_window(name) {
            return Err(ProtocolError::DuplicateWindow(name.to_string()));
        }
        self.windows.insert(0, WindowDesc::new(name));
        self.current += 1;
        Ok(self)
    }

    pub fn set_window(mut self, name: &str) -> Result<Self, ProtocolError> {
        self.current = self
            .find_window(name)
            .ok_or_else(|| ProtocolError::UnknownWindow(name.to_string()))?;
        Ok(self)
    }

    pub fn unset_window(self) -> Result<Self, ProtocolError> {
        self.set_window(DEFAULT_WINDOW)
    }

    pub fn add_color(mut self, name: &str) -> Result<Self, ProtocolError> {
        if self.options.names == NamePolicy::Unique && self.has_color(name) {
            return Err(ProtocolError::DuplicateColor(name.to_string()));
        }
        self.colors.push(name.to_string());
        Ok(self)
    }

    pub fn set_echo(mut self, on: bool) -> Self {
        self.input.echo = on;
        self
    }

    pub fn set_cbreak(mut self, on: bool) -> Self {
        self.input.cbreak = on;
        self
    }

    pub fn set_keypad(mut self, on: bool) -> Self {
        self.windows[self.current].keypad = on;
        self
    }

    pub fn set_no_delay(mut self, on: bool) -> Self {
        self.windows[self.current].no_delay = on;
        self
    }
}

/// Abstract session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Inactive,
    Active(ActiveState),
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }

    pub fn active(&self) -> Result<&ActiveState, ProtocolError> {
        match self {
            SessionState::Active(state) => Ok(state),
            SessionState::Inactive => Err(ProtocolError::NotActive),
        }
    }

    pub fn init(self, options: SessionOptions) -> Result<Self, ProtocolError> {
        match self {
            SessionState::Inactive => Ok(SessionState::Active(ActiveState::new(options))),
            SessionState::Active(_) => Err(ProtocolError::AlreadyActive),
        }
    }

    pub fn deinit(self) -> Result<Self, ProtocolError> {
        match self {
            SessionState::Active(_) => Ok(SessionState::Inactive),
            SessionState::Inactive => Err(ProtocolError::NotActive),
        }
    }

    /// Apply a transition that requires an active session.
    pub fn map_active<F>(self, f: F) -> Result<Self, ProtocolError>
    where
        F: FnOnce(ActiveState) -> Result<ActiveState, ProtocolError>,
    {
        match self {
            SessionState::Active(state) => f(state).map(SessionState::Active),
            SessionState::Inactive => Err(ProtocolError::NotActive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active() -> ActiveState {
        match SessionState::Inactive.init(SessionOptions::default()).unwrap() {
            SessionState::Active(state) => state,
            SessionState::Inactive => unreachable!(),
        }
    }

    #[test]
    fn test_init_defaults() {
        let state = active();
        let current = state.current_window();
        assert_eq!(current.id, DEFAULT_WINDOW);
        assert!(current.keypad);
        assert!(!current.no_delay);
        assert!(!state.input().echo);
        assert!(state.input().cbreak);
        assert!(state.colors().is_empty());
        assert_eq!(state.windows().len(), 1);
    }

    #[test]
    fn test_init_twice_rejected() {
        let state = SessionState::Inactive.init(SessionOptions::default()).unwrap();
        assert_eq!(
            state.init(SessionOptions::default()),
            Err(ProtocolError::AlreadyActive)
        );
        assert_eq!(SessionState::Inactive.deinit(), Err(ProtocolError::NotActive));
    }

    #[test]
    fn test_add_window_keeps_current() {
        let state = active().add_window("w1").unwrap();
        // new windows prepend, current still names the default window
        assert_eq!(state.windows()[0].id, "w1");
        assert_eq!(state.current_window().id, DEFAULT_WINDOW);
        assert_eq!(state.current_index(), 1);
        assert!(state.is_well_formed());
    }

    #[test]
    fn test_set_window_first_match() {
        let state = active()
            .add_window("w1")
            .unwrap()
            .add_window("w2")
            .unwrap()
            .set_window("w1")
            .unwrap();
        assert_eq!(state.current_window().id, "w1");
        assert_eq!(state.current_index(), 1);

        let state = state.unset_window().unwrap();
        assert_eq!(state.current_window().id, DEFAULT_WINDOW);
    }

    #[test]
    fn test_set_missing_window() {
        assert_eq!(
            active().set_window("missing"),
            Err(ProtocolError::UnknownWindow("missing".into()))
        );
    }

    #[test]
    fn test_duplicate_names_resolve_to_newest() {
        let state = active()
            .add_window("dup")
            .unwrap()
            .set_window("dup")
            .unwrap()
            .set_keypad(false)
            .add_window("dup")
            .unwrap()
            .set_window("dup")
            .unwrap();
        // the most recently added "dup" is first in creation order lookup
        assert_eq!(state.current_index(), 0);
        assert!(state.current_window().keypad);
        assert!(!state.windows()[1].keypad);
    }

    #[test]
    fn test_unique_policy() {
        let state = match SessionState::Inactive
            .init(SessionOptions::unique_names())
            .unwrap()
        {
            SessionState::Active(state) => state,
            SessionState::Inactive => unreachable!(),
        };
        assert_eq!(
            state.clone().add_window(DEFAULT_WINDOW),
            Err(ProtocolError::DuplicateWindow(DEFAULT_WINDOW.into()))
        );
        let state = state.add_color("alert").unwrap();
        assert_eq!(
            state.add_color("alert"),
            Err(ProtocolError::DuplicateColor("alert".into()))
        );
    }

    #[test]
    fn test_flag_locality() {
        let state = active()
            .add_window("a")
            .unwrap()
            .add_window("b")
            .unwrap()
            .set_window("a")
            .unwrap()
            .set_keypad(false)
            .set_no_delay(true);
        let a = &state.windows()[state.find_window("a").unwrap()];
        let b = &state.windows()[state.find_window("b").unwrap()];
        assert!(!a.keypad);
        assert!(a.no_delay);
        assert!(b.keypad);
        assert!(!b.no_delay);
        assert_eq!(state.current_window(), a);
    }

    #[test]
    fn test_color_monotonic() {
        let mut state = active().add_color("alert").unwrap();
        assert!(state.color("alert").is_ok());
        for name in ["a", "b", "c"] {
            state = state.add_color(name).unwrap().add_window(name).unwrap();
            assert!(state.has_color("alert"));
        }
        assert_eq!(
            state.color("nope"),
            Err(ProtocolError::UnknownColor("nope".into()))
        );
    }

    #[test]
    fn test_map_active_requires_session() {
        assert_eq!(
            SessionState::Inactive.map_active(|s| s.add_color("x")),
            Err(ProtocolError::NotActive)
        );
    }
}

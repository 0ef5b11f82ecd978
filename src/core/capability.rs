//! Capability predicates gating each command.

use std::fmt;

use crate::error::ProtocolError;

use super::input::InputShape;
use super::state::{ActiveState, NamePolicy, SessionState};

/// Something that must hold in the pre-state for a command to be legal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    SessionActive,
    SessionInactive,
    WindowExists(String),
    ColorExists(String),
    /// Only required under [`NamePolicy::Unique`].
    WindowNameFree(String),
    /// Only required under [`NamePolicy::Unique`].
    ColorNameFree(String),
    CurrentWindow(String),
    /// Current window reads with this `(no_delay, keypad)` combination.
    InputMode(InputShape),
}

impl Capability {
    /// Check the capability, explaining the failure.
    pub fn check(&self, state: &SessionState) -> Result<(), ProtocolError> {
        if let Capability::SessionInactive = self {
            return match state {
                SessionState::Inactive => Ok(()),
                SessionState::Active(_) => Err(ProtocolError::AlreadyActive),
            };
        }

        self.check_active(state.active()?)
    }

    /// Check the capability against a running session.
    pub fn check_active(&self, active: &ActiveState) -> Result<(), ProtocolError> {
        match self {
            Capability::SessionActive => Ok(()),
            Capability::SessionInactive => Err(ProtocolError::AlreadyActive),
            Capability::WindowExists(name) => match active.has_window(name) {
                true => Ok(()),
                false => Err(ProtocolError::UnknownWindow(name.clone())),
            },
            Capability::ColorExists(name) => active.color(name).map(|_| ()),
            Capability::WindowNameFree(name) => {
                if active.options().names == NamePolicy::Unique && active.has_window(name) {
                    Err(ProtocolError::DuplicateWindow(name.clone()))
                } else {
                    Ok(())
                }
            }
            Capability::ColorNameFree(name) => {
                if active.options().names == NamePolicy::Unique && active.has_color(name) {
                    Err(ProtocolError::DuplicateColor(name.clone()))
                } else {
                    Ok(())
                }
            }
            Capability::CurrentWindow(name) => {
                let actual = &active.current_window().id;
                if actual == name {
                    Ok(())
                } else {
                    Err(ProtocolError::WrongWindow {
                        expected: name.clone(),
                        actual: actual.clone(),
                    })
                }
            }
            Capability::InputMode(expected) => {
                let actual = active.input_shape();
                if actual == *expected {
                    Ok(())
                } else {
                    Err(ProtocolError::WrongInputMode {
                        window: active.current_window().id.clone(),
                        expected: *expected,
                        actual,
                    })
                }
            }
        }
    }

    pub fn holds(&self, state: &SessionState) -> bool {
        self.check(state).is_ok()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::SessionActive => write!(f, "session active"),
            Capability::SessionInactive => write!(f, "session inactive"),
            Capability::WindowExists(name) => write!(f, "window '{}' exists", name),
            Capability::ColorExists(name) => write!(f, "color '{}' exists", name),
            Capability::WindowNameFree(name) => write!(f, "window name '{}' free", name),
            Capability::ColorNameFree(name) => write!(f, "color name '{}' free", name),
            Capability::CurrentWindow(name) => write!(f, "current window is '{}'", name),
            Capability::InputMode(shape) => write!(
                f,
                "input mode no_delay={} keypad={}",
                shape.no_delay(),
                shape.keypad()
            ),
        }
    }
}

/// Check every capability in order, stopping at the first that fails.
pub fn check_all(caps: &[Capability], state: &SessionState) -> Result<(), ProtocolError> {
    caps.iter().try_for_each(|cap| cap.check(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::SessionOptions;

    fn active() -> SessionState {
        SessionState::Inactive.init(SessionOptions::default()).unwrap()
    }

    #[test]
    fn test_session_phase() {
        assert!(Capability::SessionInactive.holds(&SessionState::Inactive));
        assert!(!Capability::SessionActive.holds(&SessionState::Inactive));
        assert!(Capability::SessionActive.holds(&active()));
        assert_eq!(
            Capability::SessionInactive.check(&active()),
            Err(ProtocolError::AlreadyActive)
        );
    }

    #[test]
    fn test_current_window() {
        let state = active()
            .map_active(|s| s.add_window("w1")?.set_window("w1"))
            .unwrap();
        assert!(Capability::CurrentWindow("w1".into()).holds(&state));
        assert_eq!(
            Capability::CurrentWindow("default".into()).check(&state),
            Err(ProtocolError::WrongWindow {
                expected: "default".into(),
                actual: "w1".into(),
            })
        );
        assert!(Capability::WindowExists("default".into()).holds(&state));
    }

    #[test]
    fn test_input_mode() {
        let state = active();
        assert!(Capability::InputMode(InputShape::Key).holds(&state));
        assert!(!Capability::InputMode(InputShape::MaybeKey).holds(&state));

        let state = state.map_active(|s| Ok(s.set_no_delay(true))).unwrap();
        assert!(Capability::InputMode(InputShape::MaybeKey).holds(&state));
    }

    #[test]
    fn test_name_free_only_under_unique() {
        let state = active();
        assert!(Capability::WindowNameFree("default".into()).holds(&state));

        let strict = SessionState::Inactive
            .init(SessionOptions::unique_names())
            .unwrap();
        assert!(!Capability::WindowNameFree("default".into()).holds(&strict));
        assert!(Capability::ColorNameFree("alert".into()).holds(&strict));
    }

    #[test]
    fn test_check_all_stops_at_first() {
        let caps = [
            Capability::SessionActive,
            Capability::ColorExists("alert".into()),
            Capability::WindowExists("missing".into()),
        ];
        assert_eq!(
            check_all(&caps, &active()),
            Err(ProtocolError::UnknownColor("alert".into()))
        );
    }
}

//! termguard - session-safe terminal commands
//!
//! Terminal programs are written against a small command protocol whose
//! preconditions are checked before anything reaches the terminal: no drawing
//! outside a session, no switching to a window that does not exist, no color
//! attribute for an unregistered color, no read whose result shape does not
//! match the window's input flags.
//!
//! # Layers
//!
//! - **core**: abstract session state, capabilities, commands, program builder
//! - **runtime**: mirror of native handles, interpreter, live `Session` handle
//! - **backend**: the [`backend::Terminal`] trait with crossterm and mock
//!   implementations
//! - **config**: TOML settings from `~/.termguard/config.toml`
//!
//! # Example
//!
//! ```
//! use termguard::backend::MockTerminal;
//! use termguard::core::input::{Key, Keys};
//! use termguard::runtime::Session;
//!
//! let mut session = Session::init(MockTerminal::default().with_chars("q"))?;
//! session.put_str("press a key")?;
//! session.refresh()?;
//! assert_eq!(session.read::<Keys>()?, Key::Char('q'));
//! let term = session.deinit()?;
//! assert!(!term.is_open());
//! # Ok::<(), termguard::error::Error>(())
//! ```

pub mod backend;
pub mod config;
pub mod core;
pub mod error;
pub mod runtime;

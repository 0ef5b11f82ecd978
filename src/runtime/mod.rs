//! Runtime - executing validated programs against a terminal.
//!
//! - **mirror**: `Mirror` (native handles in lock-step with the abstract state)
//! - **interpreter**: `Interpreter` (dispatches commands to a [`Terminal`])
//! - **session**: `Session` (typed, step-checked live handle)
//!
//! # Module Hierarchy
//!
//! ```text
//! runtime/
//! ├── mod.rs          - Module exports
//! ├── mirror.rs       - Mirror, RuntimeWindow
//! ├── interpreter.rs  - Interpreter (dispatch loop)
//! └── session.rs      - Session (owns the interpreter while active)
//! ```
//!
//! [`Terminal`]: crate::backend::Terminal

pub mod interpreter;
pub mod mirror;
pub mod session;

pub use interpreter::Interpreter;
pub use mirror::{Mirror, RuntimeWindow};
pub use session::Session;

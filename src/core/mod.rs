//! Session state model and command protocol.
//!
//! Nothing in this module touches a terminal. It describes which commands
//! are legal in which state and what state they leave behind:
//!
//! - **types**: positions, sizes, colors, attributes, borders
//! - **input**: raw codes, special keys, read shapes
//! - **state**: the abstract session state and its transitions
//! - **capability**: predicates a command needs from its pre-state
//! - **command**: the closed set of commands
//! - **program**: typestate builder producing validated programs
//!
//! # Architecture
//!
//! ```text
//! ProgramBuilder<Inactive> --init--> ProgramBuilder<Active> --deinit--> ...
//!                                      │
//!                                      └── ActiveState
//!                                          ├── InputState (cbreak, echo)
//!                                          ├── windows (newest first)
//!                                          ├── current (index)
//!                                          └── colors (grow only)
//! ```

pub mod capability;
pub mod command;
pub mod input;
pub mod program;
pub mod state;
pub mod types;

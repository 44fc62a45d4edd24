//! Core terminal emulation components.
//!
//! This module contains the low-level pieces a pane is built from:
//!
//! - **pty**: Unix pseudo-terminal wrapper owning one shell process
//! - **term**: screen buffer, escape sequence dispatcher and its handlers
//!
//! # Architecture
//!
//! ```text
//! Pane (wm::pane)
//! ├── ProcessHandle (PTY I/O with shell process)
//! ├── ScreenBuffer (cell grid + cursor)
//! └── EscapeDispatcher
//!     └── HandlerTable (final character → buffer operations)
//! ```

pub mod pty;
pub mod term;

//! User interface: drawing surface, keyboard input and the command console.
//!
//! - **surface**: `Surface` trait panes draw through, and its crossterm backend
//! - **keymapper**: keyboard input to PTY byte sequence mapping
//! - **console**: one-line command prompt on the bottom row

pub mod console;
pub mod keymapper;
pub mod surface;

pub use console::{Console, LineConsole};
pub use keymapper::{CrosstermInput, InputEvent, KeySource};
pub use surface::{Rect, Surface, TermSurface};

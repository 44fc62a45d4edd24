//! Terminal emulation: screen buffer, escape sequence dispatch and the
//! handlers that connect the two.

pub mod escape;
pub mod handlers;
pub mod screen;

pub use escape::{Dispatch, EscapeDispatcher, ESC};
pub use handlers::default_handlers;
pub use screen::ScreenBuffer;

//! Window management - panes and the multiplexer that lays them out.
//!
//! - **pane**: a shell session with its screen buffer, drawn inside a border
//! - **manager**: `Multiplexer` owning the panes, focus, splits and key routing
//!
//! ```text
//! wm/
//! ├── mod.rs      - Module exports
//! ├── manager.rs  - Multiplexer (top-level coordinator)
//! └── pane.rs     - Pane (screen buffer + shell process)
//! ```

pub mod manager;
pub mod pane;

pub use manager::{Multiplexer, SplitDirection};

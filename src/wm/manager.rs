//! Multiplexer - owns the panes, the focus, the split geometry and key routing

use std::io;

use thiserror::Error;
use tracing::{error, info, info_span, warn};

use super::pane::{Pane, PaneId, PaneUpdate};
use crate::commands::{self, Command};
use crate::config::Hotkeys;
use crate::core::pty::{PtyError, Spawner};
use crate::ui::{Console, InputEvent, KeySource, Rect, Surface};

/// Smallest frame a split may produce (border plus one cell)
const MIN_PANE_SIZE: u16 = 3;

#[derive(Debug, Error)]
pub enum MuxError {
    #[error("failed to start shell for new pane: {0}")]
    Spawn(#[from] PtyError),

    #[error("pane {width}x{height} is too small to split")]
    TooSmall { width: u16, height: u16 },

    #[error("display error: {0}")]
    Io(#[from] io::Error),
}

/// Which way a pane is divided
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitDirection {
    /// New pane on the right
    Vertical,
    /// New pane below
    Horizontal,
}

/// What a keystroke turned into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Forwarded,
    Split(SplitDirection),
    Cycle,
    FocusConsole,
}

pub struct Multiplexer<S: Surface> {
    panes: Vec<Pane>,
    active: usize,
    spawner: Box<dyn Spawner>,
    surface: S,
    hotkeys: Hotkeys,
    read_chunk: usize,
    /// Area shared by all panes; the host's bottom row is left to the console
    region: Rect,
    next_id: PaneId,
    running: bool,
}

impl<S: Surface> Multiplexer<S> {
    /// Start with one pane filling the host terminal above the console row
    pub fn new(
        spawner: Box<dyn Spawner>,
        surface: S,
        host_size: (u16, u16),
        hotkeys: Hotkeys,
        read_chunk: usize,
    ) -> Result<Self, MuxError> {
        let region = Self::pane_region(host_size);
        let mut mux = Self {
            panes: Vec::new(),
            active: 0,
            spawner,
            surface,
            hotkeys,
            read_chunk,
            region,
            next_id: 0,
            running: true,
        };
        let mut pane = mux.create_pane(region)?;
        pane.set_active(true);
        pane.draw(&mut mux.surface)?;
        mux.panes.push(pane);
        info!(?region, "multiplexer started");
        Ok(mux)
    }

    fn pane_region((cols, rows): (u16, u16)) -> Rect {
        Rect::new(0, 0, cols, rows.saturating_sub(1))
    }

    fn create_pane(&mut self, frame: Rect) -> Result<Pane, MuxError> {
        let content = frame.inner();
        let process = self.spawner.spawn(content.width, content.height)?;
        let id = self.next_id;
        self.next_id += 1;
        let span = info_span!("pane", id);
        span.in_scope(|| info!(?frame, "pane created"));
        Ok(Pane::new(id, frame, process, self.read_chunk, span))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn quit(&mut self) {
        info!("quit requested");
        self.running = false;
    }

    #[cfg(test)]
    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    #[cfg(test)]
    pub fn active_index(&self) -> usize {
        self.active
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Split the active pane; the new pane takes the right or bottom half
    /// and becomes active.
    pub fn split(&mut self, direction: SplitDirection) -> Result<(), MuxError> {
        let frame = self.panes[self.active].frame();
        let (keep, new_frame) = match direction {
            SplitDirection::Vertical => frame.split_right(),
            SplitDirection::Horizontal => frame.split_bottom(),
        };
        if new_frame.width < MIN_PANE_SIZE || new_frame.height < MIN_PANE_SIZE {
            return Err(MuxError::TooSmall {
                width: frame.width,
                height: frame.height,
            });
        }

        let mut pane = self.create_pane(new_frame)?;

        let old = &mut self.panes[self.active];
        old.set_active(false);
        old.resize(keep, &mut self.surface)?;

        pane.set_active(true);
        pane.draw(&mut self.surface)?;
        self.panes.push(pane);
        self.active = self.panes.len() - 1;
        info!(?direction, panes = self.panes.len(), "pane split");
        Ok(())
    }

    /// Move focus to `target` if it is a valid index, else to the next pane.
    /// Returns the new active index.
    pub fn cycle(&mut self, target: Option<usize>) -> io::Result<usize> {
        let len = self.panes.len();
        if len == 0 {
            return Ok(0);
        }
        self.panes[self.active].set_active(false);
        self.panes[self.active].draw(&mut self.surface)?;

        self.active = match target {
            Some(index) if index < len => index,
            _ => (self.active + 1) % len,
        };
        let pane = &mut self.panes[self.active];
        pane.set_active(true);
        pane.draw(&mut self.surface)?;
        Ok(self.active)
    }

    /// Tear down the pane at `index` after its shell exited
    pub fn on_pane_exit(&mut self, index: usize) -> io::Result<()> {
        if index >= self.panes.len() {
            return Ok(());
        }
        if index == self.active && self.panes.len() > 1 {
            self.cycle(None)?;
        }
        let pane = self.panes.remove(index);
        if self.active > index {
            self.active -= 1;
        }
        self.surface.clear(pane.frame())?;
        self.surface.flush()?;
        info!(id = pane.id(), remaining = self.panes.len(), "pane removed");

        if self.panes.is_empty() {
            info!("last pane exited, ending session");
            self.active = 0;
            self.running = false;
        } else {
            self.restore_cursor()?;
        }
        Ok(())
    }

    /// Classify a keystroke; anything but a reserved hotkey goes to the
    /// active pane.
    pub fn handle_key(&mut self, bytes: &[u8]) -> KeyAction {
        if let [byte] = bytes {
            let byte = *byte;
            if byte == self.hotkeys.split_vertical {
                return KeyAction::Split(SplitDirection::Vertical);
            }
            if byte == self.hotkeys.split_horizontal {
                return KeyAction::Split(SplitDirection::Horizontal);
            }
            if byte == self.hotkeys.cycle {
                return KeyAction::Cycle;
            }
            if byte == self.hotkeys.console {
                return KeyAction::FocusConsole;
            }
        }
        if let Some(pane) = self.panes.get_mut(self.active) {
            if let Err(e) = pane.send(bytes) {
                warn!(id = pane.id(), error = %e, "failed to forward keys");
            }
        }
        KeyAction::Forwarded
    }

    /// Run a console command, returning the text to show
    pub fn execute(&mut self, command: Command) -> Result<Option<String>, MuxError> {
        match command {
            Command::Quit => {
                self.quit();
                Ok(None)
            }
            Command::Split(direction) => {
                self.split(direction)?;
                Ok(Some(commands::split_message(self.panes.len())))
            }
            Command::Help(topic) => Ok(Some(commands::help_text(topic))),
            Command::Cycle(target) => {
                let index = self.cycle(target)?;
                Ok(Some(commands::cycle_message(target.map(|_| index))))
            }
        }
    }

    /// Parse and run a console line
    pub fn submit(&mut self, line: &str) -> Option<String> {
        let command = match commands::parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return None,
            Err(message) => return Some(message),
        };
        match self.execute(command) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, line, "command failed");
                Some(format!("Error: {e}"))
            }
        }
    }

    /// Rescale every pane to a new host size
    pub fn resize_host(&mut self, host_size: (u16, u16)) -> io::Result<()> {
        let old = self.region;
        let new = Self::pane_region(host_size);
        if old == new {
            return Ok(());
        }
        self.region = new;

        let from = (old.width, old.height);
        let to = (new.width, new.height);
        for pane in &mut self.panes {
            let frame = pane.frame();
            let local = Rect { x: frame.x - old.x, y: frame.y - old.y, ..frame };
            let scaled = local.scale(from, to);
            let moved = Rect { x: scaled.x + new.x, y: scaled.y + new.y, ..scaled };
            pane.resize(moved, &mut self.surface)?;
        }
        // Clearing an old frame may have wiped a neighbour's fresh content
        for pane in &self.panes {
            pane.draw(&mut self.surface)?;
        }
        self.restore_cursor()?;
        info!(?new, "host resized");
        Ok(())
    }

    /// Show the active pane's cursor again after other panes drew
    fn restore_cursor(&mut self) -> io::Result<()> {
        if let Some(pane) = self.panes.get(self.active) {
            self.surface.set_cursor_visible(true)?;
            pane.place_cursor(&mut self.surface)?;
            self.surface.flush()?;
        }
        Ok(())
    }

    /// One loop iteration: update panes in order, then poll input once.
    pub fn tick(&mut self, keys: &mut dyn KeySource, console: &mut dyn Console) -> io::Result<()> {
        let mut exited = Vec::new();
        let mut redrawn = false;
        for (index, pane) in self.panes.iter_mut().enumerate() {
            match pane.update(&mut self.surface)? {
                PaneUpdate::Exited => exited.push(index),
                PaneUpdate::Redrawn => redrawn = true,
                PaneUpdate::Idle => {}
            }
        }
        for index in exited.into_iter().rev() {
            self.on_pane_exit(index)?;
        }
        if !self.running {
            return Ok(());
        }
        if redrawn {
            self.restore_cursor()?;
        }

        match keys.poll()? {
            Some(InputEvent::Key(bytes)) => self.route_key(&bytes, console),
            Some(InputEvent::Resize(cols, rows)) => {
                self.resize_host((cols, rows))?;
                console.relocate(rows.saturating_sub(1), cols);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn route_key(&mut self, bytes: &[u8], console: &mut dyn Console) -> io::Result<()> {
        match self.handle_key(bytes) {
            KeyAction::Forwarded => Ok(()),
            KeyAction::Split(direction) => match self.split(direction) {
                Ok(()) => Ok(()),
                Err(MuxError::Io(e)) => Err(e),
                Err(e) => {
                    error!(error = %e, ?direction, "split failed");
                    console.show(&format!("Error: {e}"))
                }
            },
            KeyAction::Cycle => self.cycle(None).map(|_| ()),
            KeyAction::FocusConsole => self.focus_console(console),
        }
    }

    /// Hand focus to the console; blocks until the line is submitted or
    /// cancelled.
    fn focus_console(&mut self, console: &mut dyn Console) -> io::Result<()> {
        if let Some(line) = console.interact()? {
            info!(%line, "console command");
            if let Some(message) = self.submit(&line) {
                console.show(&message)?;
            }
        }
        if self.running {
            self.restore_cursor()?;
        }
        Ok(())
    }
}

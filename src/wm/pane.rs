//! Pane - one shell session in a bordered region of the host terminal
//!
//! A pane owns its screen buffer, its escape dispatcher and its process. The
//! streaming pipeline turning process output into buffer mutations lives in
//! [`Pane::feed`].

use std::io;

use tracing::{info, warn, Span};

use crate::core::pty::{self, Channel, ShellProcess};
use crate::core::term::{default_handlers, Dispatch, EscapeDispatcher, ScreenBuffer, ESC};
use crate::ui::{Rect, Surface};

/// Unique identifier for a pane
pub type PaneId = u64;

const BACKSPACE: char = '\x08';

/// Outcome of one [`Pane::update`] tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneUpdate {
    /// The child process is gone; the pane should be torn down
    Exited,
    /// Nothing new to show
    Idle,
    /// New output was parsed and the pane redrawn
    Redrawn,
}

pub struct Pane {
    id: PaneId,
    buffer: ScreenBuffer,
    dispatcher: EscapeDispatcher,
    process: Box<dyn ShellProcess>,
    /// Full region, border included
    frame: Rect,
    /// Drawable region inside the border
    content: Rect,
    active: bool,
    /// Tail of a sequence split across reads
    pending: String,
    read_chunk: usize,
    span: Span,
}

impl Pane {
    pub fn new(
        id: PaneId,
        frame: Rect,
        process: Box<dyn ShellProcess>,
        read_chunk: usize,
        span: Span,
    ) -> Self {
        let content = frame.inner();
        Self {
            id,
            buffer: ScreenBuffer::new(usize::from(content.width), usize::from(content.height)),
            dispatcher: EscapeDispatcher::new(default_handlers()),
            process,
            frame,
            content,
            active: false,
            pending: String::new(),
            read_chunk: read_chunk.max(1),
            span,
        }
    }

    pub fn id(&self) -> PaneId {
        self.id
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    #[cfg(test)]
    pub fn buffer(&self) -> &ScreenBuffer {
        &self.buffer
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Run a chunk of process output through the buffer.
    pub fn feed(&mut self, chunk: &str) {
        let span = self.span.clone();
        let _entered = span.enter();

        let joined;
        let text: &str = if self.pending.is_empty() {
            chunk
        } else {
            joined = std::mem::take(&mut self.pending) + chunk;
            &joined
        };

        let mut run = String::new();
        let mut rest = text;
        while let Some(ch) = rest.chars().next() {
            let next = &rest[ch.len_utf8()..];
            match ch {
                '\n' => {
                    self.flush_run(&mut run);
                    self.buffer.newline();
                }
                '\r' => {
                    self.flush_run(&mut run);
                    self.buffer.carriage_return();
                }
                BACKSPACE => {
                    self.flush_run(&mut run);
                    self.buffer.move_cursor(-1, 0);
                }
                ESC => {
                    self.flush_run(&mut run);
                    match self.dispatcher.handle_head(&mut self.buffer, rest) {
                        Dispatch::Consumed(remainder) => {
                            rest = remainder;
                            continue;
                        }
                        Dispatch::Incomplete => {
                            self.pending = rest.to_string();
                            return;
                        }
                        Dispatch::NoSequence => run.push(ESC),
                    }
                }
                _ => run.push(ch),
            }
            rest = next;
        }
        self.flush_run(&mut run);
    }

    fn flush_run(&mut self, run: &mut String) {
        if !run.is_empty() {
            self.buffer.write(run);
            run.clear();
        }
    }

    /// Redraw border and content, then place the cursor
    pub fn draw(&self, surface: &mut dyn Surface) -> io::Result<()> {
        surface.set_cursor_visible(self.active)?;
        surface.draw_border(self.frame, &self.id.to_string(), self.active)?;
        surface.clear(self.content)?;

        for (y, row) in self.buffer.rows().enumerate() {
            for (x, cell) in row.iter().enumerate().filter(|(_, cell)| !cell.is_empty()) {
                match cell.ch() {
                    Some(ch) if !ch.is_control() => {
                        surface.put_char(self.content.y + y as u16, self.content.x + x as u16, ch)?
                    }
                    _ => {}
                }
            }
        }
        self.place_cursor(surface)?;
        surface.flush()
    }

    /// Move the host cursor to this pane's logical cursor
    pub fn place_cursor(&self, surface: &mut dyn Surface) -> io::Result<()> {
        let cursor = self.buffer.cursor();
        surface.set_cursor(
            self.content.y + cursor.y as u16,
            self.content.x + cursor.x as u16,
        )
    }

    /// Move to a new frame, resizing the buffer and the child's terminal
    pub fn resize(&mut self, frame: Rect, surface: &mut dyn Surface) -> io::Result<()> {
        let _entered = self.span.enter();
        surface.clear(self.frame)?;
        self.frame = frame;
        self.content = frame.inner();

        let (cols, rows) = (self.content.width, self.content.height);
        self.buffer.resize(usize::from(cols), usize::from(rows));
        if let Err(e) = self.process.resize(cols, rows) {
            warn!(error = %e, cols, rows, "failed to resize child terminal");
        }
        info!(?frame, size = ?self.buffer.size(), "pane resized");
        self.draw(surface)
    }

    /// One event-loop tick: check liveness, drain output, redraw on change
    pub fn update(&mut self, surface: &mut dyn Surface) -> io::Result<PaneUpdate> {
        if !self.process.is_running() {
            let _entered = self.span.enter();
            info!("shell exited");
            return Ok(PaneUpdate::Exited);
        }

        let mut received = false;
        for channel in [Channel::Primary, Channel::Secondary] {
            let text = self.process.read(channel, self.read_chunk);
            if !text.is_empty() {
                self.feed(&text);
                received = true;
            }
        }

        if received {
            self.draw(surface)?;
            Ok(PaneUpdate::Redrawn)
        } else {
            Ok(PaneUpdate::Idle)
        }
    }

    /// Forward keystrokes to the shell
    pub fn send(&mut self, data: &[u8]) -> pty::Result<()> {
        self.process.send(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeHandle, FakeProcess, MemorySurface};

    fn pane(width: u16, height: u16) -> (Pane, FakeHandle) {
        let frame = Rect::new(0, 0, width + 2, height + 2);
        let (process, handle) = FakeProcess::new(width, height);
        let pane = Pane::new(0, frame, Box::new(process), 4096, Span::none());
        (pane, handle)
    }

    #[test]
    fn test_feed_plain_text_and_controls() {
        let (mut pane, _) = pane(10, 3);
        pane.feed("hello\r\nwor\x08ld");
        assert_eq!(pane.buffer().row_text(0), "hello");
        assert_eq!(pane.buffer().row_text(1), "wold");
        assert_eq!(pane.buffer().cursor().x, 4);
    }

    #[test]
    fn test_feed_dispatches_sequences() {
        let (mut pane, _) = pane(10, 3);
        pane.feed("abc\x1b[2Dx\x1b[3;5Hy");
        assert_eq!(pane.buffer().row_text(0), "axc");
        assert_eq!(pane.buffer().row_text(2), "    y");
    }

    #[test]
    fn test_feed_charset_select_is_dropped() {
        let (mut pane, _) = pane(10, 2);
        pane.feed("\x1b(Bok");
        assert_eq!(pane.buffer().row_text(0), "ok");
    }

    #[test]
    fn test_feed_literal_escape() {
        let (mut pane, _) = pane(10, 2);
        pane.feed("a\x1bZb");
        assert_eq!(pane.buffer().cell(1, 0).and_then(|c| c.ch()), Some(ESC));
        assert_eq!(pane.buffer().cell(2, 0).and_then(|c| c.ch()), Some('Z'));
        assert_eq!(pane.buffer().cursor().x, 4);
    }

    #[test]
    fn test_sequence_split_across_reads() {
        let (mut pane, _) = pane(10, 2);
        pane.feed("ab\x1b[1");
        assert_eq!(pane.buffer().row_text(0), "ab");
        assert_eq!(pane.buffer().cursor().x, 2);
        pane.feed("0Gz");
        assert_eq!(pane.buffer().row_text(0), "ab       z");
    }

    #[test]
    fn test_draw_blits_content_inside_border() {
        let (mut pane, _) = pane(6, 2);
        pane.set_active(true);
        pane.feed("hi\r\nyo");
        let mut surface = MemorySurface::new();
        pane.draw(&mut surface).unwrap();

        assert_eq!(surface.text(1, 1, 7), "hi");
        assert_eq!(surface.text(2, 1, 7), "yo");
        assert_eq!(surface.cursor, (2, 3));
        assert!(surface.cursor_visible);
        assert_eq!(surface.last_border(pane.frame()).map(|b| b.2), Some(true));
    }

    #[test]
    fn test_update_redraws_only_on_output() {
        let (mut pane, handle) = pane(8, 2);
        let mut surface = MemorySurface::new();
        assert_eq!(pane.update(&mut surface).unwrap(), PaneUpdate::Idle);
        assert_eq!(surface.flushes, 0);

        handle.borrow_mut().output.push_back("$ ".to_string());
        assert_eq!(pane.update(&mut surface).unwrap(), PaneUpdate::Redrawn);
        assert_eq!(surface.text(1, 1, 9), "$");

        handle.borrow_mut().running = false;
        assert_eq!(pane.update(&mut surface).unwrap(), PaneUpdate::Exited);
    }

    #[test]
    fn test_resize_updates_buffer_and_process() {
        let (mut pane, handle) = pane(10, 4);
        let mut surface = MemorySurface::new();
        pane.resize(Rect::new(0, 0, 7, 5), &mut surface).unwrap();
        assert_eq!(pane.buffer().size(), (5, 3));
        assert_eq!(handle.borrow().size, (5, 3));
        assert_eq!(surface.cleared.first(), Some(&Rect::new(0, 0, 12, 6)));
    }

    #[test]
    fn test_send_forwards_bytes() {
        let (mut pane, handle) = pane(4, 1);
        pane.send(b"ls\r").unwrap();
        assert_eq!(handle.borrow().sent, b"ls\r");
    }
}

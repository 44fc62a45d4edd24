//! In-memory doubles for the surface and process seams.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::rc::Rc;

use crate::core::pty::{self, Channel, PtyError, ShellProcess, Spawner};
use crate::ui::{Console, InputEvent, KeySource, Rect, Surface};

/// Surface that records what was drawn
#[derive(Debug, Default)]
pub struct MemorySurface {
    pub cells: HashMap<(u16, u16), char>,
    pub borders: Vec<(Rect, String, bool)>,
    pub cleared: Vec<Rect>,
    pub cursor: (u16, u16),
    pub cursor_visible: bool,
    pub flushes: usize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of host row `row` between columns `from` and `to` (exclusive)
    pub fn text(&self, row: u16, from: u16, to: u16) -> String {
        (from..to)
            .map(|col| self.cells.get(&(row, col)).copied().unwrap_or(' '))
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    /// Most recent border drawn for `frame`
    pub fn last_border(&self, frame: Rect) -> Option<&(Rect, String, bool)> {
        self.borders.iter().rev().find(|(r, _, _)| *r == frame)
    }
}

impl Surface for MemorySurface {
    fn draw_border(&mut self, frame: Rect, title: &str, active: bool) -> io::Result<()> {
        self.borders.push((frame, title.to_string(), active));
        Ok(())
    }

    fn clear(&mut self, area: Rect) -> io::Result<()> {
        self.cells.retain(|(row, col), _| {
            !(*row >= area.y
                && *row < area.y + area.height
                && *col >= area.x
                && *col < area.x + area.width)
        });
        self.cleared.push(area);
        Ok(())
    }

    fn put_char(&mut self, row: u16, col: u16, ch: char) -> io::Result<()> {
        self.cells.insert((row, col), ch);
        Ok(())
    }

    fn set_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        self.cursor = (row, col);
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.cursor_visible = visible;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// State shared between a [`FakeProcess`] and the test driving it
#[derive(Debug)]
pub struct FakeState {
    pub output: VecDeque<String>,
    pub sent: Vec<u8>,
    pub running: bool,
    pub size: (u16, u16),
}

pub type FakeHandle = Rc<RefCell<FakeState>>;

/// Scripted process: output is queued by the test, input is recorded
pub struct FakeProcess {
    state: FakeHandle,
}

impl FakeProcess {
    pub fn new(cols: u16, rows: u16) -> (Self, FakeHandle) {
        let state = Rc::new(RefCell::new(FakeState {
            output: VecDeque::new(),
            sent: Vec::new(),
            running: true,
            size: (cols, rows),
        }));
        (
            Self {
                state: Rc::clone(&state),
            },
            state,
        )
    }
}

impl ShellProcess for FakeProcess {
    fn read(&mut self, channel: Channel, _max_bytes: usize) -> String {
        match channel {
            Channel::Primary => self.state.borrow_mut().output.pop_front().unwrap_or_default(),
            Channel::Secondary => String::new(),
        }
    }

    fn send(&mut self, data: &[u8]) -> pty::Result<()> {
        self.state.borrow_mut().sent.extend_from_slice(data);
        Ok(())
    }

    fn resize(&mut self, cols: u16, rows: u16) -> pty::Result<()> {
        self.state.borrow_mut().size = (cols, rows);
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        self.state.borrow().running
    }
}

/// Spawner handing out [`FakeProcess`]es; clones share the spawned list
#[derive(Clone, Default)]
pub struct FakeSpawner {
    pub spawned: Rc<RefCell<Vec<FakeHandle>>>,
    pub fail: Rc<RefCell<bool>>,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the `n`th process spawned
    pub fn handle(&self, n: usize) -> FakeHandle {
        Rc::clone(&self.spawned.borrow()[n])
    }
}

impl Spawner for FakeSpawner {
    fn spawn(&self, cols: u16, rows: u16) -> pty::Result<Box<dyn ShellProcess>> {
        if *self.fail.borrow() {
            return Err(PtyError::ProcessSpawn {
                shell: "fake".to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        let (process, state) = FakeProcess::new(cols, rows);
        self.spawned.borrow_mut().push(state);
        Ok(Box::new(process))
    }
}

/// Key source replaying queued events
#[derive(Default)]
pub struct ScriptedKeys {
    pub events: VecDeque<InputEvent>,
}

impl ScriptedKeys {
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

impl KeySource for ScriptedKeys {
    fn poll(&mut self) -> io::Result<Option<InputEvent>> {
        Ok(self.events.pop_front())
    }
}

/// Console answering `interact` from a queue of lines (`None` = cancel)
#[derive(Default)]
pub struct ScriptedConsole {
    pub lines: VecDeque<Option<String>>,
    pub shown: Vec<String>,
    pub position: (u16, u16),
}

impl ScriptedConsole {
    pub fn new(lines: impl IntoIterator<Item = Option<&'static str>>) -> Self {
        Self {
            lines: lines.into_iter().map(|l| l.map(str::to_string)).collect(),
            ..Self::default()
        }
    }
}

impl Console for ScriptedConsole {
    fn interact(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front().flatten())
    }

    fn show(&mut self, text: &str) -> io::Result<()> {
        self.shown.push(text.to_string());
        Ok(())
    }

    fn relocate(&mut self, row: u16, width: u16) {
        self.position = (row, width);
    }
}

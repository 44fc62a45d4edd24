//! Single-line command console
//!
//! The console owns the bottom row of the host terminal. Taking focus blocks
//! the event loop until the line is submitted or cancelled.

use std::io::{self, Write};

use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use unicode_width::UnicodeWidthStr;

/// Prompt shown while editing
pub const PROMPT: &str = "> ";

/// A line-input widget the multiplexer hands focus to
pub trait Console {
    /// Edit one line. `Ok(None)` means the user cancelled.
    fn interact(&mut self) -> io::Result<Option<String>>;

    /// Show a message in place of the prompt
    fn show(&mut self, text: &str) -> io::Result<()>;

    /// Move to a new row after the host terminal was resized
    fn relocate(&mut self, row: u16, width: u16);
}

/// What a keystroke did to the line
#[derive(Debug, PartialEq, Eq)]
pub enum EditAction {
    Continue,
    Submit(String),
    Cancel,
}

/// Line buffer with a character cursor
#[derive(Debug, Default)]
pub struct LineEditor {
    chars: Vec<char>,
    cursor: usize,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Apply one key event
    pub fn handle(&mut self, key: &KeyEvent) -> EditAction {
        match key.code {
            KeyCode::Enter => {
                let line = self.text().trim().to_string();
                self.clear();
                return EditAction::Submit(line);
            }
            KeyCode::Esc => {
                self.clear();
                return EditAction::Cancel;
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear();
                return EditAction::Cancel;
            }
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => self.cursor = 0,
            KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.cursor = self.chars.len()
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.chars.insert(self.cursor, ch);
                self.cursor += 1;
            }
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.chars.remove(self.cursor);
            }
            KeyCode::Delete if self.cursor < self.chars.len() => {
                self.chars.remove(self.cursor);
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.chars.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.chars.len(),
            _ => {}
        }
        EditAction::Continue
    }

    fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
    }
}

/// Console drawn on one row of a crossterm terminal
pub struct LineConsole<W: Write> {
    out: W,
    row: u16,
    width: u16,
    editor: LineEditor,
}

impl<W: Write> LineConsole<W> {
    pub fn new(out: W, row: u16, width: u16) -> Self {
        Self {
            out,
            row,
            width,
            editor: LineEditor::new(),
        }
    }

    fn render(&mut self, text: &str, cursor: Option<usize>) -> io::Result<()> {
        let max = usize::from(self.width);
        let visible: String = text.chars().take(max).collect();
        queue!(
            self.out,
            MoveTo(0, self.row),
            Clear(ClearType::CurrentLine),
            Print(&visible)
        )?;
        if let Some(col) = cursor {
            let col = u16::try_from(col.min(max.saturating_sub(1))).unwrap_or(0);
            queue!(self.out, MoveTo(col, self.row))?;
        }
        self.out.flush()
    }

    fn render_line(&mut self) -> io::Result<()> {
        let text = format!("{}{}", PROMPT, self.editor.text());
        let before: String = self.editor.chars[..self.editor.cursor()].iter().collect();
        let col = PROMPT.width() + before.width();
        self.render(&text, Some(col))
    }
}

impl<W: Write> Console for LineConsole<W> {
    fn interact(&mut self) -> io::Result<Option<String>> {
        self.render_line()?;
        loop {
            let key = match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => key,
                _ => continue,
            };
            match self.editor.handle(&key) {
                EditAction::Continue => self.render_line()?,
                EditAction::Submit(line) => {
                    self.render("", None)?;
                    return Ok(Some(line));
                }
                EditAction::Cancel => {
                    self.render("", None)?;
                    return Ok(None);
                }
            }
        }
    }

    fn show(&mut self, text: &str) -> io::Result<()> {
        self.render(text, None)
    }

    fn relocate(&mut self, row: u16, width: u16) {
        self.row = row;
        self.width = width;
    }
}

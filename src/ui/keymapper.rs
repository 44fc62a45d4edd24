//! Key mapping for terminal input
//!
//! Converts crossterm key events to the byte sequences a terminal would send
//! and polls the host for input without blocking.

use std::io;
use std::time::Duration;

use bitflags::bitflags;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// Key mapper for converting key events to bytes
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent to bytes for the PTY
    pub fn map(event: &KeyEvent) -> Option<Vec<u8>> {
        let mods = Modifiers::from(event.modifiers);

        match event.code {
            KeyCode::Char(ch) => Some(Self::map_char(ch, mods)),
            KeyCode::Enter => Some(vec![0x0D]),
            KeyCode::Backspace => {
                if mods.contains(Modifiers::ALT) {
                    Some(vec![0x1B, 0x7F])
                } else {
                    Some(vec![0x7F])
                }
            }
            KeyCode::Tab => Some(vec![0x09]),
            KeyCode::BackTab => Some(b"\x1b[Z".to_vec()),
            KeyCode::Esc => Some(vec![0x1B]),

            KeyCode::Up => Some(Self::cursor_key(b'A', mods)),
            KeyCode::Down => Some(Self::cursor_key(b'B', mods)),
            KeyCode::Right => Some(Self::cursor_key(b'C', mods)),
            KeyCode::Left => Some(Self::cursor_key(b'D', mods)),
            KeyCode::Home => Some(Self::cursor_key(b'H', mods)),
            KeyCode::End => Some(Self::cursor_key(b'F', mods)),

            KeyCode::PageUp => Some(Self::tilde_key(5, mods)),
            KeyCode::PageDown => Some(Self::tilde_key(6, mods)),
            KeyCode::Insert => Some(Self::tilde_key(2, mods)),
            KeyCode::Delete => Some(Self::tilde_key(3, mods)),

            KeyCode::F(n) => Some(Self::function_key(n, mods)).filter(|b| !b.is_empty()),

            _ => None,
        }
    }

    /// Map a character with modifiers
    fn map_char(ch: char, mods: Modifiers) -> Vec<u8> {
        if mods.contains(Modifiers::CTRL) {
            let ctrl_code = if ch.is_ascii_alphabetic() {
                Some((ch.to_ascii_lowercase() as u8) - b'a' + 1)
            } else {
                match ch {
                    '@' | '`' | ' ' | '2' => Some(0x00),
                    '[' | '3' => Some(0x1B),
                    '\\' | '4' => Some(0x1C),
                    ']' | '5' => Some(0x1D),
                    '^' | '~' | '6' => Some(0x1E),
                    '_' | '?' | '7' => Some(0x1F),
                    _ => None,
                }
            };
            if let Some(code) = ctrl_code {
                return if mods.contains(Modifiers::ALT) {
                    vec![0x1B, code]
                } else {
                    vec![code]
                };
            }
        }

        let mut bytes = Vec::with_capacity(5);
        if mods.contains(Modifiers::ALT) {
            bytes.push(0x1B);
        }
        let mut buf = [0u8; 4];
        bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        bytes
    }

    /// Arrow/Home/End: ESC [ <key>, or ESC [ 1 ; <mod> <key> with modifiers
    fn cursor_key(key: u8, mods: Modifiers) -> Vec<u8> {
        if mods.is_empty() {
            vec![0x1B, b'[', key]
        } else {
            format!("\x1b[1;{}{}", Self::modifier_code(mods), key as char).into_bytes()
        }
    }

    /// Tilde key sequence (PageUp, PageDown, Insert, Delete)
    fn tilde_key(code: u8, mods: Modifiers) -> Vec<u8> {
        if mods.is_empty() {
            format!("\x1b[{}~", code).into_bytes()
        } else {
            format!("\x1b[{};{}~", code, Self::modifier_code(mods)).into_bytes()
        }
    }

    /// Function key sequence
    fn function_key(n: u8, mods: Modifiers) -> Vec<u8> {
        let (code, ss3) = match n {
            1 => (b'P', true),
            2 => (b'Q', true),
            3 => (b'R', true),
            4 => (b'S', true),
            5 => (15, false),
            6 => (17, false),
            7 => (18, false),
            8 => (19, false),
            9 => (20, false),
            10 => (21, false),
            11 => (23, false),
            12 => (24, false),
            _ => return vec![],
        };

        match (ss3, mods.is_empty()) {
            (true, true) => vec![0x1B, b'O', code],
            (true, false) => {
                format!("\x1b[1;{}{}", Self::modifier_code(mods), code as char).into_bytes()
            }
            (false, _) => Self::tilde_key(code, mods),
        }
    }

    /// Calculate xterm modifier code
    fn modifier_code(mods: Modifiers) -> u8 {
        1 + if mods.contains(Modifiers::SHIFT) { 1 } else { 0 }
            + if mods.contains(Modifiers::ALT) { 2 } else { 0 }
            + if mods.contains(Modifiers::CTRL) { 4 } else { 0 }
    }
}

/// Input from the host, already translated for the multiplexer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Bytes a keystroke produces
    Key(Vec<u8>),
    /// Host terminal resized to (columns, rows)
    Resize(u16, u16),
}

/// Non-blocking source of host input
pub trait KeySource {
    /// The next pending input, or `None` when nothing is waiting.
    fn poll(&mut self) -> io::Result<Option<InputEvent>>;
}

/// Reads keys from the crossterm event queue, waiting at most `timeout`.
/// The default never waits.
pub struct CrosstermInput {
    timeout: Duration,
}

impl CrosstermInput {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for CrosstermInput {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl KeySource for CrosstermInput {
    fn poll(&mut self) -> io::Result<Option<InputEvent>> {
        if !event::poll(self.timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                Ok(KeyMapper::map(&key).map(InputEvent::Key))
            }
            Event::Paste(text) => Ok(Some(InputEvent::Key(text.into_bytes()))),
            Event::Resize(cols, rows) => Ok(Some(InputEvent::Resize(cols, rows))),
            _ => Ok(None),
        }
    }
}

//! Escape sequence recognizer and dispatcher
//!
//! Recognizes the control sequence at the head of a text chunk that starts with
//! ESC, and hands the parsed parameters to the callbacks registered for its
//! final character. Recognizers are tried in order, most specific first:
//!
//! ```text
//! 1. ESC [ <digits>? @          blank-characters form
//! 2. ESC ( B                    character set select (consumed, never dispatched)
//! 3. ESC [ <params>? <letter>   generic CSI, params = digits and '?' split by ';'
//! ```

use std::collections::HashMap;

use tracing::debug;

use super::screen::ScreenBuffer;

pub const ESC: char = '\x1b';

/// Longest unterminated sequence held back waiting for more input
const MAX_PARTIAL_LEN: usize = 32;

/// Callback invoked with the owning buffer and the parameter list
pub type Handler = Box<dyn Fn(&mut ScreenBuffer, &[String])>;

/// A recognized sequence at the head of a chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sequence {
    /// Control sequence to dispatch. `len` covers ESC through the final character.
    Csi { code: char, params: Vec<String>, len: usize },
    /// Sequence consumed without dispatching
    Ignored { len: usize },
}

/// Result of looking at the head of a chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Sequence(Sequence),
    /// Chunk ends part way through something that may still become a sequence
    Incomplete,
    /// No sequence here; the ESC is literal data
    NoSequence,
}

enum Match {
    Csi { code: char, raw: String, len: usize },
    Ignore { len: usize },
    Partial,
    Miss,
}

type Recognizer = fn(&str) -> Match;

const RECOGNIZERS: &[Recognizer] = &[blank_chars_form, charset_select, generic_csi];

/// ESC [ <digits>? @
fn blank_chars_form(text: &str) -> Match {
    let bytes = text.as_bytes();
    match bytes.get(1) {
        None => return Match::Partial,
        Some(b'[') => {}
        Some(_) => return Match::Miss,
    }
    let digits = bytes[2..].iter().take_while(|b| b.is_ascii_digit()).count();
    match bytes.get(2 + digits) {
        None => Match::Partial,
        Some(b'@') => Match::Csi {
            code: '@',
            raw: text[2..2 + digits].to_string(),
            len: 3 + digits,
        },
        Some(_) => Match::Miss,
    }
}

/// ESC ( B
fn charset_select(text: &str) -> Match {
    let bytes = text.as_bytes();
    match (bytes.get(1), bytes.get(2)) {
        (None, _) | (Some(b'('), None) => Match::Partial,
        (Some(b'('), Some(b'B')) => Match::Ignore { len: 3 },
        _ => Match::Miss,
    }
}

/// ESC [ <[0-9?;]*> <letter>
fn generic_csi(text: &str) -> Match {
    let bytes = text.as_bytes();
    match bytes.get(1) {
        None => return Match::Partial,
        Some(b'[') => {}
        Some(_) => return Match::Miss,
    }
    let params = bytes[2..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b'?' || **b == b';')
        .count();
    match bytes.get(2 + params) {
        None => Match::Partial,
        Some(b) if b.is_ascii_alphabetic() => Match::Csi {
            code: char::from(*b),
            raw: text[2..2 + params].to_string(),
            len: 3 + params,
        },
        Some(_) => Match::Miss,
    }
}

/// Split a raw parameter string on `;`, replacing empty tokens with "0".
pub fn split_params(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(|token| if token.is_empty() { "0".to_string() } else { token.to_string() })
        .collect()
}

/// Recognize the sequence at the head of `text`, which must start with ESC.
pub fn parse_head(text: &str) -> Head {
    if !text.starts_with(ESC) {
        return Head::NoSequence;
    }
    let mut partial = false;
    for recognize in RECOGNIZERS {
        match recognize(text) {
            Match::Csi { code, raw, len } => {
                return Head::Sequence(Sequence::Csi {
                    code,
                    params: split_params(&raw),
                    len,
                })
            }
            Match::Ignore { len } => return Head::Sequence(Sequence::Ignored { len }),
            Match::Partial => partial = true,
            Match::Miss => {}
        }
    }
    if partial && text.len() <= MAX_PARTIAL_LEN {
        Head::Incomplete
    } else {
        Head::NoSequence
    }
}

/// Final character → ordered callbacks
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<char, Vec<Handler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; callbacks for one code run in registration order.
    pub fn on<F>(&mut self, code: char, handler: F)
    where
        F: Fn(&mut ScreenBuffer, &[String]) + 'static,
    {
        self.handlers.entry(code).or_default().push(Box::new(handler));
    }

    /// Invoke every callback registered for `code`. Returns how many ran.
    pub fn dispatch(&self, code: char, buffer: &mut ScreenBuffer, params: &[String]) -> usize {
        let Some(handlers) = self.handlers.get(&code) else {
            return 0;
        };
        for handler in handlers {
            handler(buffer, params);
        }
        handlers.len()
    }
}

/// Outcome of handing a chunk to the dispatcher
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch<'a> {
    /// Sequence consumed; scanning resumes at the remainder
    Consumed(&'a str),
    /// Chunk ended mid-sequence; the whole chunk should be held back
    Incomplete,
    /// Not a sequence; treat ESC as literal
    NoSequence,
}

/// Parses sequences and routes them through a [`HandlerTable`]
pub struct EscapeDispatcher {
    table: HandlerTable,
}

impl EscapeDispatcher {
    pub fn new(table: HandlerTable) -> Self {
        Self { table }
    }

    /// Handle the sequence at the head of `text` against `buffer`.
    pub fn handle_head<'a>(&self, buffer: &mut ScreenBuffer, text: &'a str) -> Dispatch<'a> {
        match parse_head(text) {
            Head::Sequence(Sequence::Csi { code, params, len }) => {
                debug!(%code, ?params, "escape sequence");
                self.table.dispatch(code, buffer, &params);
                Dispatch::Consumed(&text[len..])
            }
            Head::Sequence(Sequence::Ignored { len }) => Dispatch::Consumed(&text[len..]),
            Head::Incomplete => Dispatch::Incomplete,
            Head::NoSequence => Dispatch::NoSequence,
        }
    }
}

//! Buffer-mutating handlers for the supported control sequences
//!
//! | Code | Effect | Default |
//! |------|--------|---------|
//! | A/B/C/D | cursor up/down/right/left by N | 1 |
//! | H | cursor to line;col (1-based) | 1;1 |
//! | d | absolute row (1-based) | 1 |
//! | G | absolute column (1-based) | 1 |
//! | J | erase display: 0 to cursor, 1 from cursor, 2 all | - |
//! | K | erase line from cursor (code 0) | - |
//! | P | delete N characters, shift left | 1 |
//! | @ | blank N characters, no shift | 1 |

use tracing::{error, warn};

use super::escape::HandlerTable;
use super::screen::ScreenBuffer;

/// Numeric argument at `idx`; missing, zero, or unparsable values give `default`.
fn count_arg(params: &[String], idx: usize, default: usize) -> usize {
    match params.get(idx).map(|p| p.parse::<usize>()) {
        Some(Ok(0)) | None => default,
        Some(Ok(n)) => n,
        Some(Err(_)) => {
            warn!(param = %params[idx], "non-numeric escape parameter, using default");
            default
        }
    }
}

/// Selector code at `idx` (J/K); missing means 0, unparsable means none.
fn code_arg(params: &[String], idx: usize) -> Option<usize> {
    match params.get(idx) {
        None => Some(0),
        Some(p) => p.parse().ok(),
    }
}

fn signed(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

fn cursor_up(buf: &mut ScreenBuffer, params: &[String]) {
    buf.move_cursor(0, -signed(count_arg(params, 0, 1)));
}

fn cursor_down(buf: &mut ScreenBuffer, params: &[String]) {
    buf.move_cursor(0, signed(count_arg(params, 0, 1)));
}

fn cursor_right(buf: &mut ScreenBuffer, params: &[String]) {
    buf.move_cursor(signed(count_arg(params, 0, 1)), 0);
}

fn cursor_left(buf: &mut ScreenBuffer, params: &[String]) {
    buf.move_cursor(-signed(count_arg(params, 0, 1)), 0);
}

fn cursor_home(buf: &mut ScreenBuffer, params: &[String]) {
    let line = count_arg(params, 0, 1);
    let col = count_arg(params, 1, 1);
    buf.set_cursor(col - 1, line - 1);
}

fn line_absolute(buf: &mut ScreenBuffer, params: &[String]) {
    buf.set_cursor_y(count_arg(params, 0, 1) - 1);
}

fn column_absolute(buf: &mut ScreenBuffer, params: &[String]) {
    buf.set_cursor_x(count_arg(params, 0, 1) - 1);
}

fn erase_display(buf: &mut ScreenBuffer, params: &[String]) {
    match code_arg(params, 0) {
        Some(0) => buf.erase_to_cursor(),
        Some(1) => buf.erase_from_cursor(),
        Some(2) => buf.erase_all(),
        _ => warn!(params = ?params, "unsupported erase-display code"),
    }
}

fn erase_line(buf: &mut ScreenBuffer, params: &[String]) {
    match code_arg(params, 0) {
        Some(0) => buf.erase_inline_from_cursor(),
        _ => warn!(params = ?params, "unsupported erase-line code"),
    }
}

fn delete_chars(buf: &mut ScreenBuffer, params: &[String]) {
    let count = count_arg(params, 0, 1);
    if let Err(e) = buf.delete_chars(count) {
        error!(
            error = %e,
            cursor = %buf.cursor(),
            params = ?params,
            buffer = ?buf,
            "Rejected delete-characters request"
        );
    }
}

fn blank_chars(buf: &mut ScreenBuffer, params: &[String]) {
    buf.blank_chars(count_arg(params, 0, 1));
}

/// Handler table wired to the buffer operations above
pub fn default_handlers() -> HandlerTable {
    let mut table = HandlerTable::new();
    table.on('A', cursor_up);
    table.on('B', cursor_down);
    table.on('C', cursor_right);
    table.on('D', cursor_left);
    table.on('H', cursor_home);
    table.on('d', line_absolute);
    table.on('G', column_absolute);
    table.on('J', erase_display);
    table.on('K', erase_line);
    table.on('P', delete_chars);
    table.on('@', blank_chars);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::screen::Cursor;

    fn run(buf: &mut ScreenBuffer, code: char, params: &[&str]) {
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        default_handlers().dispatch(code, buf, &params);
    }

    #[test]
    fn test_cursor_moves_default_and_clamp() {
        let mut buf = ScreenBuffer::new(10, 5);
        buf.set_cursor(5, 2);
        run(&mut buf, 'A', &["0"]);
        assert_eq!(buf.cursor(), Cursor { x: 5, y: 1 });
        run(&mut buf, 'B', &["3"]);
        assert_eq!(buf.cursor(), Cursor { x: 5, y: 4 });
        run(&mut buf, 'C', &["20"]);
        assert_eq!(buf.cursor(), Cursor { x: 9, y: 4 });
        run(&mut buf, 'D', &["4"]);
        assert_eq!(buf.cursor(), Cursor { x: 5, y: 4 });
    }

    #[test]
    fn test_cursor_home() {
        let mut buf = ScreenBuffer::new(10, 5);
        run(&mut buf, 'H', &["3", "4"]);
        assert_eq!(buf.cursor(), Cursor { x: 3, y: 2 });
        run(&mut buf, 'H', &["0"]);
        assert_eq!(buf.cursor(), Cursor { x: 0, y: 0 });
        run(&mut buf, 'H', &["0", "5"]);
        assert_eq!(buf.cursor(), Cursor { x: 4, y: 0 });
        run(&mut buf, 'H', &["99", "99"]);
        assert_eq!(buf.cursor(), Cursor { x: 9, y: 4 });
    }

    #[test]
    fn test_absolute_positioning() {
        let mut buf = ScreenBuffer::new(10, 5);
        run(&mut buf, 'G', &["7"]);
        run(&mut buf, 'd', &["2"]);
        assert_eq!(buf.cursor(), Cursor { x: 6, y: 1 });
        run(&mut buf, 'G', &["0"]);
        assert_eq!(buf.cursor(), Cursor { x: 0, y: 1 });
    }

    #[test]
    fn test_erase_display_codes() {
        let mut buf = ScreenBuffer::new(4, 2);
        buf.write("abcdefg");
        buf.set_cursor(1, 1);
        run(&mut buf, 'J', &["0"]);
        assert_eq!(buf.row_text(0), "");
        assert_eq!(buf.row_text(1), "  g");

        run(&mut buf, 'J', &["2"]);
        assert_eq!(buf.row_text(1), "");
    }

    #[test]
    fn test_erase_line_is_code_gated() {
        let mut buf = ScreenBuffer::new(6, 1);
        buf.write("abcde");
        buf.set_cursor(2, 0);
        run(&mut buf, 'K', &["1"]);
        assert_eq!(buf.row_text(0), "abcde");
        run(&mut buf, 'K', &["0"]);
        assert_eq!(buf.row_text(0), "ab");
    }

    #[test]
    fn test_delete_chars_overrun_is_noop() {
        let mut buf = ScreenBuffer::new(10, 1);
        buf.write("abcdefghi");
        buf.set_cursor(8, 0);
        run(&mut buf, 'P', &["5"]);
        assert_eq!(buf.row_text(0), "abcdefghi");
        run(&mut buf, 'P', &["0"]);
        assert_eq!(buf.row_text(0), "abcdefgh");
    }

    #[test]
    fn test_blank_chars_default() {
        let mut buf = ScreenBuffer::new(6, 1);
        buf.write("abcde");
        buf.set_cursor(1, 0);
        run(&mut buf, '@', &["0"]);
        assert_eq!(buf.row_text(0), "a cde");
    }
}

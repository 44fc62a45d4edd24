//! Screen buffer
//!
//! A fixed-size grid of cells plus the cursor that writes into it. The grid is
//! only ever changed through the operations on [`ScreenBuffer`]; rows scroll off
//! the top once the cursor advances past the last row.

use std::fmt;

use thiserror::Error;
use tracing::error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("deleting {count} cells at column {col} overruns a row of width {width}")]
    DeleteOverrun { col: usize, count: usize, width: usize },
}

/// A single character cell; `None` is blank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    ch: Option<char>,
}

impl Cell {
    pub fn new(ch: char) -> Self {
        Self { ch: Some(ch) }
    }

    pub fn ch(&self) -> Option<char> {
        self.ch
    }

    pub fn is_empty(&self) -> bool {
        self.ch.is_none()
    }

    pub fn clear(&mut self) {
        self.ch = None;
    }
}

/// A grid position, column first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Cursor position inside the owning buffer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pub x: usize,
    pub y: usize,
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Cursor x={} y={}>", self.x, self.y)
    }
}

type Row = Vec<Cell>;

fn blank_row(cols: usize) -> Row {
    vec![Cell::default(); cols]
}

/// Fixed-size character grid with its own cursor
pub struct ScreenBuffer {
    cols: usize,
    rows: usize,
    grid: Vec<Row>,
    cursor: Cursor,
}

impl ScreenBuffer {
    /// Create a blank buffer. Zero dimensions are bumped to one so the cursor
    /// always has a cell to sit on.
    pub fn new(cols: usize, rows: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            grid: (0..rows).map(|_| blank_row(cols)).collect(),
            cursor: Cursor::default(),
        }
    }

    /// (columns, rows)
    pub fn size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.grid.iter().map(Vec::as_slice)
    }

    #[cfg(test)]
    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        self.grid.get(y).and_then(|row| row.get(x))
    }

    /// Text of one row with blanks rendered as spaces and trailing blanks trimmed
    pub fn row_text(&self, y: usize) -> String {
        self.grid
            .get(y)
            .map(|row| {
                let line: String = row.iter().map(|c| c.ch().unwrap_or(' ')).collect();
                line.trim_end().to_string()
            })
            .unwrap_or_default()
    }

    /// Store each character at the cursor and advance, wrapping onto the next row.
    pub fn write(&mut self, text: &str) {
        for ch in text.chars() {
            if !self.cursor_in_bounds() {
                error!(
                    cursor = %self.cursor,
                    cols = self.cols,
                    rows = self.rows,
                    "Cursor out of bounds while writing, resetting to origin"
                );
                self.cursor = Cursor::default();
            }
            self.grid[self.cursor.y][self.cursor.x] = Cell::new(ch);
            self.advance_cursor();
        }
    }

    /// Move to the next row, scrolling the oldest row away when already on the last one.
    pub fn newline(&mut self) {
        if self.cursor.y + 1 >= self.rows {
            self.grid.remove(0);
            self.grid.push(blank_row(self.cols));
            self.cursor.y = self.rows - 1;
            return;
        }
        self.cursor.y += 1;
    }

    pub fn carriage_return(&mut self) {
        self.cursor.x = 0;
    }

    fn advance_cursor(&mut self) {
        if self.cursor.x + 1 >= self.cols {
            self.cursor.x = 0;
            self.newline();
            return;
        }
        self.cursor.x += 1;
    }

    fn cursor_in_bounds(&self) -> bool {
        self.cursor.x < self.cols && self.cursor.y < self.rows
    }

    /// Relative cursor move, clamped to the buffer edges
    pub fn move_cursor(&mut self, dx: isize, dy: isize) {
        let x = self.cursor.x as isize + dx;
        let y = self.cursor.y as isize + dy;
        self.cursor.x = x.clamp(0, self.cols as isize - 1) as usize;
        self.cursor.y = y.clamp(0, self.rows as isize - 1) as usize;
    }

    /// Absolute cursor placement (0-based), clamped to the buffer edges
    pub fn set_cursor(&mut self, x: usize, y: usize) {
        self.cursor.x = x.min(self.cols - 1);
        self.cursor.y = y.min(self.rows - 1);
    }

    pub fn set_cursor_x(&mut self, x: usize) {
        self.set_cursor(x, self.cursor.y);
    }

    pub fn set_cursor_y(&mut self, y: usize) {
        self.set_cursor(self.cursor.x, y);
    }

    /// Resize the grid.
    ///
    /// Shrinking rows keeps the rows ending at the cursor row when there are at
    /// least `rows` of them, otherwise the newest `rows` rows. Shrinking columns
    /// truncates every row. Growth pads blanks at the trailing edge.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        let cols = cols.max(1);
        let rows = rows.max(1);

        if rows < self.grid.len() {
            let (start, end) = if self.cursor.y + 1 >= rows {
                (self.cursor.y + 1 - rows, self.cursor.y + 1)
            } else {
                (self.grid.len() - rows, self.grid.len())
            };
            self.grid.truncate(end);
            self.grid.drain(..start);
        }
        while self.grid.len() < rows {
            self.grid.push(blank_row(cols));
        }
        for row in &mut self.grid {
            row.resize(cols, Cell::default());
        }

        self.cols = cols;
        self.rows = rows;
        self.cursor.x = self.cursor.x.min(cols - 1);
        self.cursor.y = self.cursor.y.min(rows - 1);
    }

    /// Clear every cell from `start` to `end` inclusive, in reading order.
    pub fn erase(&mut self, start: Point, end: Point) {
        if end.y < start.y || start.y >= self.rows {
            return;
        }
        let last_row = end.y.min(self.rows - 1);
        let last_col = self.cols - 1;
        for y in start.y..=last_row {
            let from = if y == start.y { start.x } else { 0 };
            let to = if y == end.y { end.x.min(last_col) } else { last_col };
            if from > to {
                continue;
            }
            for cell in &mut self.grid[y][from..=to] {
                cell.clear();
            }
        }
    }

    pub fn erase_all(&mut self) {
        self.erase(Point::new(0, 0), Point::new(self.cols - 1, self.rows - 1));
    }

    pub fn erase_to_cursor(&mut self) {
        self.erase(Point::new(0, 0), self.cursor_point());
    }

    pub fn erase_from_cursor(&mut self) {
        self.erase(self.cursor_point(), Point::new(self.cols - 1, self.rows - 1));
    }

    pub fn erase_inline_from_cursor(&mut self) {
        self.erase(self.cursor_point(), Point::new(self.cols - 1, self.cursor.y));
    }

    /// Delete `count` cells at the cursor, shifting the rest of the row left
    /// and padding the right edge with blanks.
    pub fn delete_chars(&mut self, count: usize) -> Result<(), BufferError> {
        let Cursor { x, y } = self.cursor;
        // Columns x through x + count - 1 must all lie inside the row.
        if x + count > self.cols {
            return Err(BufferError::DeleteOverrun {
                col: x,
                count,
                width: self.cols,
            });
        }
        let row = &mut self.grid[y];
        row.drain(x..x + count);
        row.resize(self.cols, Cell::default());
        Ok(())
    }

    /// Blank `count` cells starting at the cursor without shifting anything.
    pub fn blank_chars(&mut self, count: usize) {
        let Cursor { x, y } = self.cursor;
        let end = (x + count).min(self.cols);
        for cell in &mut self.grid[y][x..end] {
            cell.clear();
        }
    }

    fn cursor_point(&self) -> Point {
        Point::new(self.cursor.x, self.cursor.y)
    }
}

impl fmt::Debug for ScreenBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ScreenBuffer {}x{} {}", self.cols, self.rows, self.cursor)?;
        for y in 0..self.rows {
            writeln!(f, "|{}|", self.row_text(y))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(cols: usize, rows: usize) -> ScreenBuffer {
        let mut buf = ScreenBuffer::new(cols, rows);
        for y in 0..rows {
            buf.set_cursor(0, y);
            let line: String = std::iter::repeat(char::from(b'a' + y as u8))
                .take(cols - 1)
                .collect();
            buf.write(&line);
        }
        buf
    }

    #[test]
    fn test_write_advances_cursor() {
        let mut buf = ScreenBuffer::new(10, 3);
        buf.write("abc");
        assert_eq!(buf.row_text(0), "abc");
        assert_eq!(buf.cursor(), Cursor { x: 3, y: 0 });
    }

    #[test]
    fn test_write_wraps_at_width() {
        let mut buf = ScreenBuffer::new(4, 5);
        buf.write("abcdefghij");
        // 10 chars over width 4: two row transitions
        assert_eq!(buf.cursor(), Cursor { x: 2, y: 2 });
        assert_eq!(buf.row_text(0), "abcd");
        assert_eq!(buf.row_text(1), "efgh");
        assert_eq!(buf.row_text(2), "ij");
    }

    #[test]
    fn test_write_exact_width_moves_to_next_row() {
        let mut buf = ScreenBuffer::new(4, 3);
        buf.write("abcd");
        assert_eq!(buf.cursor(), Cursor { x: 0, y: 1 });
    }

    #[test]
    fn test_newline_scrolls_when_full() {
        let mut buf = ScreenBuffer::new(3, 2);
        buf.write("ab");
        buf.newline();
        buf.carriage_return();
        buf.write("cd");
        buf.newline();
        assert_eq!(buf.cursor().y, 1);
        assert_eq!(buf.row_text(0), "cd");
        assert_eq!(buf.row_text(1), "");
        assert_eq!(buf.rows().count(), 2);
        assert!(buf.rows().all(|r| r.len() == 3));
    }

    #[test]
    fn test_write_recovers_from_out_of_bounds_cursor() {
        let mut buf = ScreenBuffer::new(4, 4);
        buf.cursor = Cursor { x: 9, y: 9 };
        buf.write("x");
        assert_eq!(buf.row_text(0), "x");
        assert_eq!(buf.cursor(), Cursor { x: 1, y: 0 });
    }

    #[test]
    fn test_move_cursor_clamps() {
        let mut buf = ScreenBuffer::new(5, 5);
        buf.move_cursor(-3, -3);
        assert_eq!(buf.cursor(), Cursor { x: 0, y: 0 });
        buf.move_cursor(10, 2);
        assert_eq!(buf.cursor(), Cursor { x: 4, y: 2 });
        buf.set_cursor(100, 100);
        assert_eq!(buf.cursor(), Cursor { x: 4, y: 4 });
    }

    #[test]
    fn test_resize_shrink_keeps_rows_at_cursor() {
        let mut buf = filled(5, 6);
        buf.set_cursor(1, 4);
        buf.resize(5, 3);
        assert_eq!(buf.size(), (5, 3));
        assert_eq!(buf.row_text(0), "cccc");
        assert_eq!(buf.row_text(1), "dddd");
        assert_eq!(buf.row_text(2), "eeee");
        assert_eq!(buf.cursor(), Cursor { x: 1, y: 2 });
    }

    #[test]
    fn test_resize_shrink_falls_back_to_newest_rows() {
        let mut buf = filled(5, 6);
        buf.set_cursor(0, 1);
        buf.resize(5, 4);
        assert_eq!(buf.rows().count(), 4);
        assert_eq!(buf.row_text(0), "cccc");
        assert_eq!(buf.row_text(3), "ffff");
        assert_eq!(buf.cursor(), Cursor { x: 0, y: 1 });
    }

    #[test]
    fn test_resize_columns_truncate_and_pad() {
        let mut buf = filled(6, 2);
        buf.set_cursor(5, 1);
        buf.resize(3, 2);
        assert_eq!(buf.row_text(0), "aaa");
        assert_eq!(buf.cursor(), Cursor { x: 2, y: 1 });

        buf.resize(8, 4);
        assert_eq!(buf.size(), (8, 4));
        assert_eq!(buf.rows().count(), 4);
        assert!(buf.rows().all(|r| r.len() == 8));
        assert_eq!(buf.row_text(1), "bbb");
        assert_eq!(buf.row_text(3), "");
    }

    #[test]
    fn test_erase_inclusive_bounds() {
        let mut buf = filled(6, 5);
        buf.erase(Point::new(2, 1), Point::new(4, 3));
        assert_eq!(buf.row_text(0), "aaaaa");
        assert_eq!(buf.row_text(1), "bb");
        assert_eq!(buf.row_text(2), "");
        // columns 0..=4 cleared, column 5 was already blank
        assert_eq!(buf.row_text(3), "");
        assert_eq!(buf.row_text(4), "eeeee");
    }

    #[test]
    fn test_erase_last_row_stops_at_end_column() {
        let mut buf = filled(6, 3);
        buf.erase(Point::new(0, 1), Point::new(1, 2));
        assert_eq!(buf.row_text(1), "");
        assert_eq!(buf.row_text(2), "  ccc");
    }

    #[test]
    fn test_erase_variants() {
        let mut buf = filled(5, 3);
        buf.set_cursor(2, 1);
        buf.erase_inline_from_cursor();
        assert_eq!(buf.row_text(1), "bb");

        let mut buf = filled(5, 3);
        buf.set_cursor(2, 1);
        buf.erase_to_cursor();
        assert_eq!(buf.row_text(0), "");
        assert_eq!(buf.row_text(1), "   b");
        assert_eq!(buf.row_text(2), "cccc");

        let mut buf = filled(5, 3);
        buf.set_cursor(2, 1);
        buf.erase_from_cursor();
        assert_eq!(buf.row_text(0), "aaaa");
        assert_eq!(buf.row_text(1), "bb");
        assert_eq!(buf.row_text(2), "");

        buf.erase_all();
        assert!(buf.rows().flatten().all(Cell::is_empty));
    }

    #[test]
    fn test_delete_chars_shifts_left() {
        let mut buf = ScreenBuffer::new(7, 1);
        buf.write("abcdef");
        buf.set_cursor(1, 0);
        buf.delete_chars(2).unwrap();
        assert_eq!(buf.row_text(0), "adef");
        assert_eq!(buf.rows().next().map(|r| r.len()), Some(7));
    }

    #[test]
    fn test_delete_chars_overrun_rejected() {
        let mut buf = ScreenBuffer::new(10, 1);
        buf.write("012345678");
        buf.set_cursor(8, 0);
        let err = buf.delete_chars(5).unwrap_err();
        assert_eq!(err, BufferError::DeleteOverrun { col: 8, count: 5, width: 10 });
        assert_eq!(buf.row_text(0), "012345678");
    }

    #[test]
    fn test_delete_chars_up_to_last_column() {
        let mut buf = ScreenBuffer::new(10, 2);
        buf.write("0123456789");
        buf.set_cursor(8, 0);
        let err = buf.delete_chars(3).unwrap_err();
        assert_eq!(err, BufferError::DeleteOverrun { col: 8, count: 3, width: 10 });
        assert_eq!(buf.row_text(0), "0123456789");

        buf.delete_chars(2).unwrap();
        assert_eq!(buf.row_text(0), "01234567");
        let row = buf.rows().next().unwrap();
        assert!(row[8..].iter().all(Cell::is_empty));
    }

    #[test]
    fn test_blank_chars_does_not_shift() {
        let mut buf = ScreenBuffer::new(7, 1);
        buf.write("abcdef");
        buf.set_cursor(1, 0);
        buf.blank_chars(2);
        assert_eq!(buf.row_text(0), "a  def");
        buf.set_cursor(4, 0);
        buf.blank_chars(10);
        assert_eq!(buf.row_text(0), "a  d");
    }
}

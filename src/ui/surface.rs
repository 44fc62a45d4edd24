//! Drawing surface for panes
//!
//! Panes only need a handful of primitives from the host display: draw a
//! border, clear a rectangle, put a character at a cell, place the cursor.
//! [`TermSurface`] implements them on top of crossterm.

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    style::{Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use unicode_width::UnicodeWidthStr;

use crate::config::Color;

/// A rectangular screen region in host cells
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    /// Region left inside a one-cell border (never smaller than 1x1)
    pub fn inner(&self) -> Rect {
        Rect {
            x: self.x + 1,
            y: self.y + 1,
            width: self.width.saturating_sub(2).max(1),
            height: self.height.saturating_sub(2).max(1),
        }
    }

    /// Split into (left, right); the right half gets `width / 2` columns.
    pub fn split_right(&self) -> (Rect, Rect) {
        let right_width = self.width / 2;
        let left_width = self.width - right_width;
        (
            Rect { width: left_width, ..*self },
            Rect {
                x: self.x + left_width,
                width: right_width,
                ..*self
            },
        )
    }

    /// Split into (top, bottom); the bottom half gets `height / 2` rows.
    pub fn split_bottom(&self) -> (Rect, Rect) {
        let bottom_height = self.height / 2;
        let top_height = self.height - bottom_height;
        (
            Rect { height: top_height, ..*self },
            Rect {
                y: self.y + top_height,
                height: bottom_height,
                ..*self
            },
        )
    }

    /// Rescale from a `from` sized area to a `to` sized one. Edges are scaled
    /// rather than sizes so neighbouring regions stay flush.
    pub fn scale(&self, from: (u16, u16), to: (u16, u16)) -> Rect {
        fn edge(v: u16, from: u16, to: u16) -> u16 {
            if from == 0 {
                return v;
            }
            (u32::from(v) * u32::from(to) / u32::from(from)) as u16
        }
        let x0 = edge(self.x, from.0, to.0);
        let y0 = edge(self.y, from.1, to.1);
        let x1 = edge(self.x + self.width, from.0, to.0);
        let y1 = edge(self.y + self.height, from.1, to.1);
        Rect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

/// Primitives a pane draws with. Coordinates are absolute host cells.
pub trait Surface {
    fn draw_border(&mut self, frame: Rect, title: &str, active: bool) -> io::Result<()>;

    fn clear(&mut self, area: Rect) -> io::Result<()>;

    fn put_char(&mut self, row: u16, col: u16, ch: char) -> io::Result<()>;

    fn set_cursor(&mut self, row: u16, col: u16) -> io::Result<()>;

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

/// Border characters
struct BorderChars {
    top_left: char,
    top_right: char,
    bottom_left: char,
    bottom_right: char,
    horizontal: char,
    vertical: char,
}

impl BorderChars {
    fn single() -> Self {
        Self {
            top_left: '┌',
            top_right: '┐',
            bottom_left: '└',
            bottom_right: '┘',
            horizontal: '─',
            vertical: '│',
        }
    }
}

/// Surface drawing into a crossterm-controlled terminal
pub struct TermSurface<W: Write> {
    out: W,
    border: Color,
    border_active: Color,
    initialized: bool,
}

impl<W: Write> TermSurface<W> {
    pub fn new(out: W, border: Color, border_active: Color) -> Self {
        Self {
            out,
            border,
            border_active,
            initialized: false,
        }
    }

    /// Enter raw mode and the alternate screen
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        queue!(self.out, EnterAlternateScreen, Clear(ClearType::All), MoveTo(0, 0))?;
        self.out.flush()?;
        self.initialized = true;
        Ok(())
    }

    /// Restore the host terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        queue!(self.out, ResetColor, Show, LeaveAlternateScreen)?;
        self.out.flush()?;
        terminal::disable_raw_mode()
    }

    /// Host terminal size (columns, rows)
    pub fn size() -> io::Result<(u16, u16)> {
        terminal::size()
    }
}

impl<W: Write> Surface for TermSurface<W> {
    fn draw_border(&mut self, frame: Rect, title: &str, active: bool) -> io::Result<()> {
        if frame.width < 2 || frame.height < 2 {
            return Ok(());
        }
        let chars = BorderChars::single();
        let color = if active { self.border_active } else { self.border };
        queue!(self.out, SetForegroundColor(color.to_crossterm()))?;

        // Top border with the title centred in it
        let space = usize::from(frame.width.saturating_sub(4));
        let title: String = if title.width() > space {
            title.chars().take(space).collect()
        } else {
            title.to_string()
        };
        let remaining = usize::from(frame.width - 2).saturating_sub(title.width());
        let left_pad = remaining / 2;
        let right_pad = remaining - left_pad;
        let mut top = String::with_capacity(usize::from(frame.width) * 3);
        top.push(chars.top_left);
        top.extend(std::iter::repeat(chars.horizontal).take(left_pad));
        top.push_str(&title);
        top.extend(std::iter::repeat(chars.horizontal).take(right_pad));
        top.push(chars.top_right);
        queue!(self.out, MoveTo(frame.x, frame.y), Print(top))?;

        for row in 1..frame.height - 1 {
            queue!(
                self.out,
                MoveTo(frame.x, frame.y + row),
                Print(chars.vertical),
                MoveTo(frame.x + frame.width - 1, frame.y + row),
                Print(chars.vertical)
            )?;
        }

        let mut bottom = String::with_capacity(usize::from(frame.width) * 3);
        bottom.push(chars.bottom_left);
        bottom.extend(std::iter::repeat(chars.horizontal).take(usize::from(frame.width - 2)));
        bottom.push(chars.bottom_right);
        queue!(
            self.out,
            MoveTo(frame.x, frame.y + frame.height - 1),
            Print(bottom),
            ResetColor
        )
    }

    fn clear(&mut self, area: Rect) -> io::Result<()> {
        let blank = " ".repeat(usize::from(area.width));
        for row in 0..area.height {
            queue!(self.out, MoveTo(area.x, area.y + row), Print(&blank))?;
        }
        Ok(())
    }

    fn put_char(&mut self, row: u16, col: u16, ch: char) -> io::Result<()> {
        queue!(self.out, MoveTo(col, row), Print(ch))
    }

    fn set_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(col, row))
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        if visible {
            queue!(self.out, Show)
        } else {
            queue!(self.out, Hide)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl<W: Write> Drop for TermSurface<W> {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_rect() {
        assert_eq!(Rect::new(2, 3, 10, 6).inner(), Rect::new(3, 4, 8, 4));
        assert_eq!(Rect::new(0, 0, 2, 1).inner(), Rect::new(1, 1, 1, 1));
    }

    #[test]
    fn test_split_right_conserves_width() {
        let (left, right) = Rect::new(0, 0, 81, 24).split_right();
        assert_eq!(left, Rect::new(0, 0, 41, 24));
        assert_eq!(right, Rect::new(41, 0, 40, 24));
        assert_eq!(left.width + right.width, 81);
    }

    #[test]
    fn test_split_bottom_conserves_height() {
        let (top, bottom) = Rect::new(5, 1, 40, 20).split_bottom();
        assert_eq!(top, Rect::new(5, 1, 40, 10));
        assert_eq!(bottom, Rect::new(5, 11, 40, 10));
    }

    #[test]
    fn test_scale_keeps_neighbours_flush() {
        let (left, right) = Rect::new(0, 0, 80, 24).split_right();
        let left = left.scale((80, 24), (120, 48));
        let right = right.scale((80, 24), (120, 48));
        assert_eq!(left, Rect::new(0, 0, 60, 48));
        assert_eq!(right.x, left.x + left.width);
        assert_eq!(left.width + right.width, 120);
    }

    #[test]
    fn test_border_draws_into_writer() {
        let mut surface = TermSurface::new(Vec::new(), Color::new(1, 1, 1), Color::new(2, 2, 2));
        surface.draw_border(Rect::new(0, 0, 10, 3), "0", true).unwrap();
        let out = String::from_utf8_lossy(&surface.out).to_string();
        assert!(out.contains("┌───0────┐"));
        assert!(out.contains("└────────┘"));
    }
}

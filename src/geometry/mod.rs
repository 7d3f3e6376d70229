//! Geometric primitives for stamp placement.
//!
//! OFD expresses every box as `ST_Box`: four space-separated numbers
//! `x y width height` in millimetres, with the origin at the top-left
//! corner of the page and y growing downwards.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A box in page space (`ST_Box`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StBox {
    /// X coordinate of top-left corner
    pub x: f64,
    /// Y coordinate of top-left corner
    pub y: f64,
    /// Width of the box
    pub width: f64,
    /// Height of the box
    pub height: f64,
}

impl StBox {
    /// Create a new box from position and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use ofd_sign::geometry::StBox;
    ///
    /// let b = StBox::new(0.0, 0.0, 210.0, 297.0);
    /// assert_eq!(b.width, 210.0);
    /// assert_eq!(b.height, 297.0);
    /// ```
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the left edge x-coordinate.
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Get the top edge y-coordinate.
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Compute the area of the box.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Format a coordinate the way OFD files carry them: no trailing zeros.
fn fmt_num(v: f64) -> String {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

impl fmt::Display for StBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            fmt_num(self.x),
            fmt_num(self.y),
            fmt_num(self.width),
            fmt_num(self.height)
        )
    }
}

impl FromStr for StBox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<f64> = s
            .split_whitespace()
            .map(|p| p.parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::InvalidOfd(format!("Bad ST_Box '{}': {}", s, e)))?;
        match parts.as_slice() {
            [x, y, w, h] => Ok(StBox::new(*x, *y, *w, *h)),
            _ => Err(Error::InvalidOfd(format!(
                "ST_Box expects 4 numbers, found {} in '{}'",
                parts.len(),
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_creation() {
        let b = StBox::new(5.0, 10.0, 100.0, 50.0);
        assert_eq!(b.x, 5.0);
        assert_eq!(b.y, 10.0);
        assert_eq!(b.width, 100.0);
        assert_eq!(b.height, 50.0);
    }

    #[test]
    fn test_box_edges() {
        let b = StBox::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(b.left(), 10.0);
        assert_eq!(b.right(), 110.0);
        assert_eq!(b.top(), 20.0);
        assert_eq!(b.bottom(), 70.0);
        assert_eq!(b.area(), 5000.0);
    }

    #[test]
    fn test_box_display() {
        assert_eq!(StBox::new(0.0, 0.0, 210.0, 297.0).to_string(), "0 0 210 297");
        assert_eq!(StBox::new(-20.5, 1.25, 40.0, 40.0).to_string(), "-20.5 1.25 40 40");
    }

    #[test]
    fn test_box_parse() {
        let b: StBox = "0 0 210 297".parse().unwrap();
        assert_eq!(b, StBox::new(0.0, 0.0, 210.0, 297.0));

        let b: StBox = "  10.5   2 3 4 ".parse().unwrap();
        assert_eq!(b.x, 10.5);
    }

    #[test]
    fn test_box_parse_rejects_wrong_arity() {
        assert!("0 0 210".parse::<StBox>().is_err());
        assert!("a b c d".parse::<StBox>().is_err());
    }
}

//! Rectangle type and tolerant comparison helpers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in the host's usable-screen coordinate space.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    pub fn min_x(&self) -> f64 { self.x }

    pub fn max_x(&self) -> f64 { self.x + self.width }

    pub fn min_y(&self) -> f64 { self.y }

    pub fn max_y(&self) -> f64 { self.y + self.height }

    pub fn area(&self) -> f64 { self.width * self.height }

    pub fn intersection(&self, other: &Self) -> Self {
        let min_x = f64::max(self.min_x(), other.min_x());
        let max_x = f64::min(self.max_x(), other.max_x());
        let min_y = f64::max(self.min_y(), other.min_y());
        let max_y = f64::min(self.max_y(), other.max_y());
        Rect::new(
            min_x,
            min_y,
            f64::max(max_x - min_x, 0.),
            f64::max(max_y - min_y, 0.),
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("expected `x,y,width,height`, got {0:?}")]
pub struct ParseRectError(String);

impl FromStr for Rect {
    type Err = ParseRectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| ParseRectError(s.to_owned()))?;
        match parts.as_slice() {
            &[x, y, width, height] if width >= 0.0 && height >= 0.0 => {
                Ok(Rect::new(x, y, width, height))
            }
            _ => Err(ParseRectError(s.to_owned())),
        }
    }
}

pub trait IsWithin {
    fn is_within(&self, how_much: f64, other: Self) -> bool;
}

impl IsWithin for Rect {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.x.is_within(how_much, other.x)
            && self.y.is_within(how_much, other.y)
            && self.width.is_within(how_much, other.width)
            && self.height.is_within(how_much, other.height)
    }
}

impl IsWithin for f64 {
    fn is_within(&self, how_much: f64, other: Self) -> bool { (self - other).abs() < how_much }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_disjoint_rects_is_empty() {
        let left = Rect::new(0.0, 0.0, 495.0, 800.0);
        let right = Rect::new(505.0, 0.0, 495.0, 800.0);
        assert_eq!(left.intersection(&right).area(), 0.0);
    }

    #[test]
    fn parse_rect() {
        assert_eq!(
            "0, 25,1440,875".parse::<Rect>(),
            Ok(Rect::new(0.0, 25.0, 1440.0, 875.0))
        );
        assert!("0,0,100".parse::<Rect>().is_err());
        assert!("0,0,-1,10".parse::<Rect>().is_err());
        assert!("a,b,c,d".parse::<Rect>().is_err());
    }
}

//! Geometric types for integer-nanometer photonic layout.
//!
//! All coordinates are database units (nanometers). Values that arrive as
//! physical lengths (micrometers) must be snapped to the fabrication grid
//! before they become coordinates; see [`snap_to_grid`].

use std::fmt::Display;
use std::str::FromStr;

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::bbox::Bbox;
use self::transform::Translate;

pub mod bbox;
pub mod orientation;
pub mod transform;

/// Snaps `pos` to the nearest multiple of `grid`.
///
/// Ties round down, so the result is always within half a grid unit of `pos`.
pub fn snap_to_grid(pos: i64, grid: i64) -> i64 {
    assert!(grid > 0);

    let rem = pos.rem_euclid(grid);
    if rem <= grid / 2 {
        pos - rem
    } else {
        pos + grid - rem
    }
}

/// A point in two-dimensional layout-space.
#[derive(
    Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    /// Creates a new [`Point`] from (x,y) coordinates.
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Returns the origin, (0, 0).
    #[inline]
    pub fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Creates a new [`Point`] that serves as an offset in direction `dir`.
    pub fn offset(val: i64, dir: Dir) -> Self {
        match dir {
            Dir::Horiz => Self { x: val, y: 0 },
            Dir::Vert => Self { x: 0, y: val },
        }
    }

    /// Gets the coordinate associated with direction `dir`.
    pub fn coord(&self, dir: Dir) -> i64 {
        match dir {
            Dir::Horiz => self.x,
            Dir::Vert => self.y,
        }
    }

    /// Creates a new [`Point`] shifted by `p.x` in x and by `p.y` in y.
    #[inline]
    pub fn translated(&self, p: Point) -> Self {
        let mut pt = *self;
        pt.translate(p);
        pt
    }

    /// Snaps both coordinates to the nearest multiple of `grid`.
    #[inline]
    pub fn snap_to_grid(&self, grid: i64) -> Self {
        Self {
            x: snap_to_grid(self.x, grid),
            y: snap_to_grid(self.y, grid),
        }
    }
}

impl std::ops::Add<Point> for Point {
    type Output = Self;
    fn add(self, rhs: Point) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign<Point> for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub<Point> for Point {
    type Output = Self;
    fn sub(self, rhs: Point) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::SubAssign<Point> for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl From<(i64, i64)> for Point {
    fn from(value: (i64, i64)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

/// An enumeration of the axis-aligned directions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Dir {
    /// The horizontal, or x-aligned, direction.
    Horiz,
    /// The vertical, or y-aligned, direction.
    Vert,
}

impl Dir {
    /// Returns the other direction.
    #[inline]
    pub fn other(&self) -> Self {
        match self {
            Self::Horiz => Self::Vert,
            Self::Vert => Self::Horiz,
        }
    }
}

impl std::ops::Not for Dir {
    type Output = Self;
    fn not(self) -> Self::Output {
        self.other()
    }
}

impl Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Horiz => write!(f, "horizontal"),
            Self::Vert => write!(f, "vertical"),
        }
    }
}

/// An enumeration of the sides of an axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Bot,
    Right,
    Top,
}

impl Side {
    /// The direction of the axis perpendicular to this side.
    pub fn coord_dir(&self) -> Dir {
        match self {
            Self::Left | Self::Right => Dir::Horiz,
            Self::Top | Self::Bot => Dir::Vert,
        }
    }

    /// Returns the opposite side.
    pub fn other(&self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Top => Self::Bot,
            Self::Bot => Self::Top,
        }
    }

    /// The outward-facing angle of this side, in degrees.
    ///
    /// Matches the port-orientation convention: a port on the west (left)
    /// side of a cell faces 180 degrees.
    pub fn facing_angle(&self) -> f64 {
        match self {
            Self::Right => 0.0,
            Self::Top => 90.0,
            Self::Left => 180.0,
            Self::Bot => 270.0,
        }
    }
}

/// An error returned when parsing a [`Side`] from a string fails.
#[derive(Debug, Error)]
#[error("unknown side: {0}")]
pub struct ParseSideError(String);

impl FromStr for Side {
    type Err = ParseSideError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "W" | "west" | "left" => Self::Left,
            "E" | "east" | "right" => Self::Right,
            "N" | "north" | "top" => Self::Top,
            "S" | "south" | "bot" => Self::Bot,
            _ => return Err(ParseSideError(s.to_string())),
        })
    }
}

/// A one-dimensional span of coordinates.
#[derive(
    Debug, Default, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize, PartialEq, Eq,
)]
pub struct Span {
    start: i64,
    stop: i64,
}

impl Span {
    /// Creates a new [`Span`] between two coordinates, in either order.
    pub fn new(start: i64, stop: i64) -> Self {
        use std::cmp::{max, min};
        Self {
            start: min(start, stop),
            stop: max(start, stop),
        }
    }

    /// Creates a new [`Span`] from 0 until the specified stop.
    pub fn until(stop: i64) -> Self {
        debug_assert!(stop >= 0);
        Self { start: 0, stop }
    }

    /// Creates a new [`Span`] with center `center` and length `span`.
    ///
    /// # Panics
    ///
    /// Panics if `span` is negative or odd.
    pub fn from_center_span(center: i64, span: i64) -> Self {
        assert!(span >= 0);
        assert_eq!(span % 2, 0);
        Self::new(center - (span / 2), center + (span / 2))
    }

    /// Creates a span with the given starting point and length.
    pub fn with_start_and_length(start: i64, length: i64) -> Self {
        Self {
            stop: start + length,
            start,
        }
    }

    /// The lesser coordinate of the span.
    #[inline]
    pub fn start(&self) -> i64 {
        self.start
    }

    /// The greater coordinate of the span.
    #[inline]
    pub fn stop(&self) -> i64 {
        self.stop
    }

    /// The center of the span.
    #[inline]
    pub fn center(&self) -> i64 {
        (self.start + self.stop) / 2
    }

    /// The length of the span.
    #[inline]
    pub fn length(&self) -> i64 {
        self.stop - self.start
    }

    /// Returns true if the two spans overlap (shared endpoints count).
    pub fn intersects(&self, other: &Self) -> bool {
        self.stop >= other.start && other.stop >= self.start
    }

    /// The union of two spans.
    pub fn union(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
        }
    }
}

/// An axis-aligned rectangle, specified by opposite corners.
///
/// `p0` is the lower-left corner and `p1` the upper-right corner; the
/// constructors normalize their arguments to maintain this.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub p0: Point,
    pub p1: Point,
}

impl Rect {
    /// Creates a rectangle from two opposite corner points.
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates a rectangle from a horizontal and a vertical [`Span`].
    pub fn from_spans(h: Span, v: Span) -> Self {
        Self {
            p0: Point::new(h.start(), v.start()),
            p1: Point::new(h.stop(), v.stop()),
        }
    }

    /// The horizontal span of the rectangle.
    pub fn hspan(&self) -> Span {
        Span::new(self.p0.x, self.p1.x)
    }

    /// The vertical span of the rectangle.
    pub fn vspan(&self) -> Span {
        Span::new(self.p0.y, self.p1.y)
    }

    /// The width of the rectangle in the x-direction.
    #[inline]
    pub fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    /// The height of the rectangle in the y-direction.
    #[inline]
    pub fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    /// The center point of the rectangle.
    pub fn center(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2, (self.p0.y + self.p1.y) / 2)
    }

}

impl From<Bbox> for Rect {
    fn from(b: Bbox) -> Self {
        debug_assert!(!b.is_empty());
        Self { p0: b.p0, p1: b.p1 }
    }
}

/// An arbitrary closed polygon, described by its vertices in order.
///
/// The closing edge from the last vertex back to the first is implicit.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon from a list of vertices.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }
}

/// An enumeration of geometric shapes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[enum_dispatch(ShapeTrait)]
pub enum Shape {
    Rect(Rect),
    Polygon(Polygon),
}

impl Shape {
    /// Returns the underlying [`Rect`], if this shape is one.
    pub fn as_rect(&self) -> Option<Rect> {
        match self {
            Shape::Rect(r) => Some(*r),
            _ => None,
        }
    }
}

/// Operations available on all [`Shape`] variants.
#[enum_dispatch]
pub trait ShapeTrait {
    /// The vertices of the shape, in order, without the closing vertex.
    fn vertices(&self) -> Vec<Point>;
}

impl ShapeTrait for Rect {
    fn vertices(&self) -> Vec<Point> {
        vec![
            self.p0,
            Point::new(self.p1.x, self.p0.y),
            self.p1,
            Point::new(self.p0.x, self.p1.y),
        ]
    }
}

impl ShapeTrait for Polygon {
    fn vertices(&self) -> Vec<Point> {
        self.points.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_to_grid_basic() {
        assert_eq!(snap_to_grid(0, 5), 0);
        assert_eq!(snap_to_grid(2, 5), 0);
        assert_eq!(snap_to_grid(3, 5), 5);
        assert_eq!(snap_to_grid(-2, 5), 0);
        assert_eq!(snap_to_grid(-3, 5), -5);
        assert_eq!(snap_to_grid(1047, 1), 1047);
    }

    #[test]
    fn snap_to_grid_is_within_half_grid() {
        for grid in [1i64, 2, 5, 10] {
            for pos in -25..=25 {
                let snapped = snap_to_grid(pos, grid);
                assert_eq!(snapped % grid, 0);
                assert!((snapped - pos).abs() * 2 <= grid);
            }
        }
    }

    #[test]
    fn point_ops() {
        let p = Point::new(3, 4).translated(Point::offset(10, Dir::Horiz));
        assert_eq!(p, Point::new(13, 4));
        assert_eq!(p.coord(Dir::Horiz), 13);
        assert_eq!(p.coord(Dir::Vert), 4);
        assert_eq!(Point::new(7, -7).snap_to_grid(5), Point::new(5, -5));
        assert_eq!(!Dir::Horiz, Dir::Vert);
    }

    #[test]
    fn rect_normalizes_corners() {
        let r = Rect::new(Point::new(10, -5), Point::new(-10, 5));
        assert_eq!(r.p0, Point::new(-10, -5));
        assert_eq!(r.p1, Point::new(10, 5));
        assert_eq!(r.width(), 20);
        assert_eq!(r.height(), 10);
        assert_eq!(r.center(), Point::zero());
        assert_eq!(r.hspan(), Span::new(-10, 10));
        assert_eq!(r.vspan(), Span::new(-5, 5));
    }

    #[test]
    fn span_ops() {
        let s = Span::from_center_span(100, 50);
        assert_eq!(s.start(), 75);
        assert_eq!(s.stop(), 125);
        assert_eq!(s.center(), 100);
        assert_eq!(s.length(), 50);

        let t = Span::with_start_and_length(120, 30);
        assert!(s.intersects(&t));
        assert_eq!(s.union(t), Span::new(75, 150));
        assert!(!Span::until(10).intersects(&Span::new(11, 20)));
    }

    #[test]
    fn side_facing_angles() {
        assert_eq!(Side::Left.facing_angle(), 180.0);
        assert_eq!(Side::Right.facing_angle(), 0.0);
        assert_eq!(Side::Top.facing_angle(), 90.0);
        assert_eq!(Side::Bot.facing_angle(), 270.0);
        assert_eq!(Side::Left.other(), Side::Right);
        assert_eq!(Side::Top.coord_dir(), Dir::Vert);
        assert_eq!("W".parse::<Side>().unwrap(), Side::Left);
        assert!("Q".parse::<Side>().is_err());
    }
}

//! Rectangular bounding boxes and associated trait implementations.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use super::{Point, Rect, Shape};

/// An axis-aligned rectangular bounding box.
///
/// Unlike [`Rect`], a bounding box may be empty, which is encoded by `p0`
/// lying to the upper right of `p1`.
#[derive(Debug, Default, Copy, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Bbox {
    pub p0: Point,
    pub p1: Point,
}

impl Bbox {
    /// Creates a new [`Bbox`] from two corner [`Point`]s, in either order.
    #[inline]
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates a new [`Bbox`] enclosing a single [`Point`].
    pub fn from_point(pt: Point) -> Self {
        Self { p0: pt, p1: pt }
    }

    /// Creates an empty bounding box.
    pub fn empty() -> Self {
        Self {
            p0: Point::new(i64::MAX, i64::MAX),
            p1: Point::new(i64::MIN, i64::MIN),
        }
    }

    /// Returns `true` if the bounding box is empty.
    pub fn is_empty(&self) -> bool {
        self.p0.x > self.p1.x || self.p0.y > self.p1.y
    }

    /// Returns `true` if [`Point`] `pt` lies inside the bounding box.
    pub fn contains(&self, pt: Point) -> bool {
        self.p0.x <= pt.x && self.p1.x >= pt.x && self.p0.y <= pt.y && self.p1.y >= pt.y
    }

    /// The width of the bounding box in the x-direction.
    #[inline]
    pub fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    /// The height of the bounding box in the y-direction.
    #[inline]
    pub fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    /// The center of the bounding box.
    pub fn center(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2, (self.p0.y + self.p1.y) / 2)
    }

    /// Converts the bounding box into a [`Rect`].
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the bounding box is empty.
    #[inline]
    pub fn into_rect(self) -> Rect {
        Rect::from(self)
    }
}

impl From<Rect> for Bbox {
    fn from(r: Rect) -> Self {
        Self { p0: r.p0, p1: r.p1 }
    }
}

/// A trait for objects with a rectangular bounding box.
#[enum_dispatch]
pub trait BoundBox {
    /// Computes a rectangular bounding box around the implementing type.
    fn bbox(&self) -> Bbox;

    /// Computes the bounding box and converts it to a [`Rect`].
    ///
    /// # Panics
    ///
    /// May panic if the bounding box is empty.
    fn brect(&self) -> Rect {
        self.bbox().into_rect()
    }

    /// Computes the union with bounding box `bbox`.
    fn union(&self, bbox: Bbox) -> Bbox {
        self.bbox().union(bbox)
    }
}

impl<T> BoundBox for &T
where
    T: BoundBox,
{
    fn bbox(&self) -> Bbox {
        T::bbox(*self)
    }
}

impl BoundBox for Bbox {
    fn bbox(&self) -> Bbox {
        *self
    }

    fn union(&self, bbox: Bbox) -> Bbox {
        if bbox.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return bbox;
        }
        Bbox::new(
            Point::new(self.p0.x.min(bbox.p0.x), self.p0.y.min(bbox.p0.y)),
            Point::new(self.p1.x.max(bbox.p1.x), self.p1.y.max(bbox.p1.y)),
        )
    }
}

impl BoundBox for Point {
    fn bbox(&self) -> Bbox {
        Bbox::from_point(*self)
    }
}

impl BoundBox for Rect {
    fn bbox(&self) -> Bbox {
        Bbox {
            p0: self.p0,
            p1: self.p1,
        }
    }
}

impl BoundBox for Shape {
    fn bbox(&self) -> Bbox {
        match self {
            Shape::Rect(r) => r.bbox(),
            Shape::Polygon(p) => p.points.bbox(),
        }
    }
}

impl BoundBox for Vec<Point> {
    fn bbox(&self) -> Bbox {
        let mut bbox = Bbox::empty();
        for pt in self {
            bbox = bbox.union(pt.bbox());
        }
        bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_union_is_identity() {
        let b = Bbox::new(Point::new(-3, 1), Point::new(7, 9));
        assert_eq!(b.union(Bbox::empty()), b);
        assert_eq!(Bbox::empty().union(b), b);
        assert!(Bbox::empty().is_empty());
    }

    #[test]
    fn shape_bbox() {
        let poly = Shape::Polygon(crate::Polygon::new(vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 4),
            Point::new(5, 8),
        ]));
        let b = poly.bbox();
        assert_eq!(b.p0, Point::new(0, 0));
        assert_eq!(b.p1, Point::new(10, 8));
        assert_eq!(b.center(), Point::new(5, 4));
    }
}

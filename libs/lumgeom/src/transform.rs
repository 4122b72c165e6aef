//! Transformation types and traits.

use super::orientation::{wrap_angle, Orientation};
use super::{Point, Polygon, Rect, Shape};

/// A 2x2 rotation/reflection matrix and a translation vector, used for
/// relative placement of [`Point`]s and [`Shape`]s.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Transformation {
    /// The transformation matrix, in row-major order.
    pub a: [[f64; 2]; 2],
    /// The x-y translation applied after the matrix.
    pub b: [f64; 2],
}

impl Transformation {
    /// Returns the identity transform, leaving any transformed object
    /// unmodified.
    pub fn identity() -> Self {
        Self {
            a: [[1., 0.], [0., 1.]],
            b: [0., 0.],
        }
    }

    /// Returns a translation by `(x,y)`.
    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            a: [[1., 0.], [0., 1.]],
            b: [x, y],
        }
    }

    /// Returns a counterclockwise rotation by `angle` degrees.
    pub fn rotate(angle: f64) -> Self {
        let sin = angle.to_radians().sin();
        let cos = angle.to_radians().cos();
        Self {
            a: [[cos, -sin], [sin, cos]],
            b: [0., 0.],
        }
    }

    /// Creates a transform from a location and an [`Orientation`].
    pub fn with_loc_and_orientation(loc: Point, orientation: impl Into<Orientation>) -> Self {
        let o = orientation.into();
        let sin = o.angle.to_radians().sin();
        let cos = o.angle.to_radians().cos();
        let sin_refl = if o.reflect_vert { sin } else { -sin };
        let cos_refl = if o.reflect_vert { -cos } else { cos };
        Self {
            a: [[cos, sin_refl], [sin, cos_refl]],
            b: [loc.x as f64, loc.y as f64],
        }
    }

    /// Creates a new [`Transformation`] that is the cascade of `parent` and
    /// `child`.
    ///
    /// "Parents" and "children" refer to layout-instance hierarchies: each
    /// level of instance carries a transformation relative to its parent.
    /// This operation is not commutative.
    pub fn cascade(parent: Transformation, child: Transformation) -> Transformation {
        let mut b = matvec(&parent.a, &child.b);
        b[0] += parent.b[0];
        b[1] += parent.b[1];
        let a = matmul(&parent.a, &child.a);
        Self { a, b }
    }

    /// The translation encoded by this transformation, rounded to the
    /// nearest database unit.
    pub fn offset_point(&self) -> Point {
        Point {
            x: self.b[0].round() as i64,
            y: self.b[1].round() as i64,
        }
    }

    /// Returns `true` if this transformation maps axis-aligned geometry to
    /// axis-aligned geometry, i.e. its rotation is a multiple of 90 degrees.
    ///
    /// Uses a small tolerance since cardinal rotation matrices built from
    /// trigonometric functions carry epsilon-sized off-axis terms.
    pub fn is_rectilinear(&self) -> bool {
        const EPS: f64 = 1e-9;
        (self.a[0][1].abs() < EPS && self.a[1][0].abs() < EPS)
            || (self.a[0][0].abs() < EPS && self.a[1][1].abs() < EPS)
    }

    /// Recovers the [`Orientation`] encoded by this transformation's matrix.
    pub fn orientation(&self) -> Orientation {
        let reflect_vert = self.a[0][0].signum() != self.a[1][1].signum();
        let sin = self.a[1][0];
        let cos = self.a[0][0];
        let angle = cos.acos().to_degrees();
        let angle = if sin >= 0f64 {
            angle
        } else {
            wrap_angle(-angle)
        };
        Orientation {
            reflect_vert,
            angle,
        }
    }
}

impl<T> From<T> for Transformation
where
    T: Into<Orientation>,
{
    fn from(value: T) -> Self {
        Self::with_loc_and_orientation(Point::zero(), value)
    }
}

/// Multiplies two 2x2 matrices, returning a new 2x2 matrix.
fn matmul(a: &[[f64; 2]; 2], b: &[[f64; 2]; 2]) -> [[f64; 2]; 2] {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}

/// Multiplies a 2x2 matrix by a 2-entry vector, returning a new 2-entry
/// vector.
fn matvec(a: &[[f64; 2]; 2], b: &[f64; 2]) -> [f64; 2] {
    [
        a[0][0] * b[0] + a[0][1] * b[1],
        a[1][0] * b[0] + a[1][1] * b[1],
    ]
}

/// A trait for specifying how an object is changed by a [`Transformation`].
pub trait Transform {
    /// Applies the matrix-vector transformation `trans`, creating a new
    /// object.
    fn transform(&self, trans: Transformation) -> Self;
}

impl Transform for Point {
    fn transform(&self, trans: Transformation) -> Self {
        let xf = self.x as f64;
        let yf = self.y as f64;
        let x = trans.a[0][0] * xf + trans.a[0][1] * yf + trans.b[0];
        let y = trans.a[1][0] * xf + trans.a[1][1] * yf + trans.b[1];
        Self {
            x: x.round() as i64,
            y: y.round() as i64,
        }
    }
}

impl Transform for Rect {
    fn transform(&self, trans: Transformation) -> Self {
        let p0 = self.p0.transform(trans);
        let p1 = self.p1.transform(trans);
        Rect::new(p0, p1)
    }
}

impl Transform for Polygon {
    fn transform(&self, trans: Transformation) -> Self {
        Polygon {
            points: self.points.iter().map(|p| p.transform(trans)).collect(),
        }
    }
}

impl Transform for Shape {
    fn transform(&self, trans: Transformation) -> Self {
        match self {
            // A rotated rectangle is in general no longer axis-aligned,
            // so rectangles transform into polygons unless the rotation
            // is a multiple of 90 degrees.
            Shape::Rect(r) => {
                if trans.is_rectilinear() {
                    Shape::Rect(r.transform(trans))
                } else {
                    Shape::Polygon(Polygon {
                        points: vec![
                            r.p0.transform(trans),
                            Point::new(r.p1.x, r.p0.y).transform(trans),
                            r.p1.transform(trans),
                            Point::new(r.p0.x, r.p1.y).transform(trans),
                        ],
                    })
                }
            }
            Shape::Polygon(p) => Shape::Polygon(p.transform(trans)),
        }
    }
}

/// A trait for specifying how an object is translated by a [`Point`].
pub trait Translate {
    /// Translates the object by `p`, mutating it in place.
    fn translate(&mut self, p: Point);
}

impl Translate for Point {
    fn translate(&mut self, p: Point) {
        self.x += p.x;
        self.y += p.y;
    }
}

impl Translate for Rect {
    fn translate(&mut self, p: Point) {
        self.p0.translate(p);
        self.p1.translate(p);
    }
}

impl Translate for Polygon {
    fn translate(&mut self, p: Point) {
        for pt in self.points.iter_mut() {
            pt.translate(p);
        }
    }
}

impl Translate for Shape {
    fn translate(&mut self, p: Point) {
        match self {
            Shape::Rect(r) => r.translate(p),
            Shape::Polygon(poly) => poly.translate(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::Named;

    #[test]
    fn test_matvec() {
        let a = [[1., 2.], [3., 4.]];
        let b = [5., 6.];
        assert_eq!(matvec(&a, &b), [17., 39.]);
    }

    #[test]
    fn test_matmul() {
        let a = [[1., 2.], [3., 4.]];
        let b = [[5., 6.], [7., 8.]];
        assert_eq!(matmul(&a, &b), [[19., 22.], [43., 50.]]);
    }

    #[test]
    fn cascade_identity() {
        for orientation in Named::all_rectangular() {
            let tf = Transformation::with_loc_and_orientation(Point::new(520, 130), orientation);
            let casc = Transformation::cascade(tf, Transformation::identity());
            assert_eq!(
                tf, casc,
                "cascading with identity changed the transformation for {orientation:?}",
            );
        }
    }

    #[test]
    fn translate_moves_the_origin() {
        let tf = Transformation::translate(40.0, -10.0);
        assert_eq!(Point::zero().transform(tf), Point::new(40, -10));
        assert!(tf.is_rectilinear());
    }

    #[test]
    fn rotation_of_point_is_exact_for_cardinals() {
        let p = Point::new(100, 0);
        let tf = Transformation::rotate(90.0);
        assert_eq!(p.transform(tf), Point::new(0, 100));
        let tf = Transformation::rotate(180.0);
        assert_eq!(p.transform(tf), Point::new(-100, 0));
        let tf = Transformation::rotate(270.0);
        assert_eq!(p.transform(tf), Point::new(0, -100));
    }

    #[test]
    fn orientation_roundtrip() {
        let pt = Point::new(8930, 730);
        for orientation in Named::all_rectangular() {
            let tf = Transformation::with_loc_and_orientation(pt, orientation);
            assert_eq!(tf.orientation(), orientation.into());
            assert_eq!(tf.offset_point(), pt);
        }
    }

    #[test]
    fn reflected_transform_flips_y() {
        let tf = Transformation::with_loc_and_orientation(Point::zero(), Named::ReflectVert);
        assert_eq!(Point::new(3, 4).transform(tf), Point::new(3, -4));
    }
}

//! A 90 degree circular waveguide bend.

use lumgeom::{Point, Polygon, Shape};
use serde::{Deserialize, Serialize};

use crate::component::{error::Error, Component};
use crate::data::LumenCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::grid::snap_um_to_grid;
use crate::layout::cell::Port;
use crate::layout::context::LayoutCtx;
use crate::layout::layers::LayerSpec;

fn default_segments() -> usize {
    64
}

/// Parameters of a [`BendCircular`], in micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BendCircularParams {
    /// Bend radius, measured to the waveguide centerline.
    pub radius: f64,
    /// Waveguide width.
    pub width: f64,
    /// Number of line segments approximating each 90 degree arc.
    #[serde(default = "default_segments")]
    pub segments: usize,
}

impl Default for BendCircularParams {
    fn default() -> Self {
        Self {
            radius: 10.0,
            width: 0.5,
            segments: default_segments(),
        }
    }
}

/// A 90 degree circular bend.
///
/// The bend enters heading east at the origin and exits heading north: port
/// `W0` faces west at the origin, port `N0` faces north at
/// `(radius, radius)`. The center of curvature is at `(0, radius)`. The
/// annular sector is drawn as a single polygon; each arc vertex is rounded
/// to the database grid.
pub struct BendCircular {
    radius: i64,
    width: i64,
    segments: usize,
}

impl Component for BendCircular {
    type Params = BendCircularParams;

    fn new(params: &Self::Params, ctx: &LumenCtx) -> Result<Self> {
        if params.radius <= 0.0 || params.width <= 0.0 {
            return Err(Error::InvalidParams(format!(
                "bend dimensions must be positive: radius {}, width {}",
                params.radius, params.width
            ))
            .into());
        }
        if params.width >= 2.0 * params.radius {
            return Err(Error::InvalidParams(format!(
                "bend width {} must be smaller than the bend diameter {}",
                params.width,
                2.0 * params.radius
            ))
            .into());
        }
        if params.segments < 1 {
            return Err(Error::InvalidParams("bend must have at least 1 segment".into()).into());
        }
        let grid = ctx.grid();
        Ok(Self {
            radius: snap_um_to_grid(params.radius, grid),
            width: snap_um_to_grid(params.width, grid),
            segments: params.segments,
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("bend_circular_r{}_w{}", self.radius, self.width)
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let wg = ctx.layer("wg")?;

        let center = Point::new(0, self.radius);
        let r_outer = (self.radius + self.width / 2) as f64;
        let r_inner = (self.radius - (self.width - self.width / 2)) as f64;
        let n = self.segments;

        // Outer arc from the entry (angle -90 from the center of curvature)
        // to the exit (angle 0), then the inner arc back.
        let mut points = Vec::with_capacity(2 * (n + 1));
        for i in 0..=n {
            let theta = (-90.0 + 90.0 * i as f64 / n as f64).to_radians();
            points.push(arc_point(center, r_outer, theta));
        }
        for i in (0..=n).rev() {
            let theta = (-90.0 + 90.0 * i as f64 / n as f64).to_radians();
            points.push(arc_point(center, r_inner, theta));
        }
        ctx.draw_shape(LayerSpec::drawing(wg), Shape::Polygon(Polygon::new(points)));

        ctx.add_port(Port::new("W0", Point::zero(), self.width, 180.0))?;
        ctx.add_port(Port::new(
            "N0",
            Point::new(self.radius, self.radius),
            self.width,
            90.0,
        ))?;
        Ok(())
    }
}

fn arc_point(center: Point, r: f64, theta: f64) -> Point {
    Point::new(
        center.x + (r * theta.cos()).round() as i64,
        center.y + (r * theta.sin()).round() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bend_ports_and_extent() {
        let ctx = LumenCtx::new().unwrap();
        let inst = ctx
            .instantiate::<BendCircular>(&BendCircularParams {
                radius: 10.0,
                width: 0.5,
                segments: 64,
            })
            .unwrap();
        let cell = inst.cell();
        assert_eq!(cell.name(), "bend_circular_r10000_w500");

        let w0 = cell.port("W0").unwrap();
        assert_eq!(w0.midpoint(), Point::zero());
        assert_eq!(w0.orientation(), 180.0);
        let n0 = cell.port("N0").unwrap();
        assert_eq!(n0.midpoint(), Point::new(10_000, 10_000));
        assert_eq!(n0.orientation(), 90.0);

        // The bend spans from the outer edge at the entry to the exit plane.
        let bbox = cell.bbox();
        assert_eq!(bbox.p0, Point::new(0, -250));
        assert_eq!(bbox.p1, Point::new(10_250, 10_000));
    }

    #[test]
    fn degenerate_bend_is_rejected() {
        let ctx = LumenCtx::new().unwrap();
        assert!(ctx
            .instantiate::<BendCircular>(&BendCircularParams {
                radius: 0.2,
                width: 0.5,
                segments: 64,
            })
            .is_err());
    }
}

//! A linear waveguide width taper.

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

/// Parameters of a [`Taper`], in micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaperParams {
    /// Length along the propagation direction.
    pub length: f64,
    /// Width at the west end (port `1`).
    pub width1: f64,
    /// Width at the east end (port `2`).
    pub width2: f64,
}

impl Default for TaperParams {
    fn default() -> Self {
        Self {
            length: 10.0,
            width1: 0.5,
            width2: 0.95,
        }
    }
}

/// A linear taper between two waveguide widths.
///
/// Port `1` faces west at the origin with `width1`; port `2` faces east at
/// `(length, 0)` with `width2`.
pub struct Taper {
    length: i64,
    width1: i64,
    width2: i64,
}

impl Component for Taper {
    type Params = TaperParams;

    fn new(params: &Self::Params, ctx: &LumenCtx) -> Result<Self> {
        if params.length <= 0.0 || params.width1 <= 0.0 || params.width2 <= 0.0 {
            return Err(Error::InvalidParams(format!(
                "taper dimensions must be positive: length {}, width1 {}, width2 {}",
                params.length, params.width1, params.width2
            ))
            .into());
        }
        let grid = ctx.grid();
        Ok(Self {
            length: snap_um_to_grid(params.length, grid),
            width1: snap_um_to_grid(params.width1, grid),
            width2: snap_um_to_grid(params.width2, grid),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!(
            "taper_l{}_w{}_w{}",
            self.length,
            self.width1,
            self.width2
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let wg = ctx.layer("wg")?;
        let (l, w1, w2) = (self.length, self.width1, self.width2);
        ctx.draw_shape(
            LayerSpec::drawing(wg),
            Shape::Polygon(Polygon::new(vec![
                Point::new(0, -(w1 / 2)),
                Point::new(l, -(w2 / 2)),
                Point::new(l, w2 - w2 / 2),
                Point::new(0, w1 - w1 / 2),
            ])),
        );
        ctx.add_port(Port::new("1", Point::zero(), w1, 180.0))?;
        ctx.add_port(Port::new("2", Point::new(l, 0), w2, 0.0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taper_ports_have_their_end_widths() {
        let ctx = LumenCtx::new().unwrap();
        let inst = ctx.instantiate::<Taper>(&TaperParams::default()).unwrap();
        let cell = inst.cell();
        assert_eq!(cell.name(), "taper_l10000_w500_w950");
        let p1 = cell.port("1").unwrap();
        assert_eq!(p1.width(), 500);
        assert_eq!(p1.orientation(), 180.0);
        let p2 = cell.port("2").unwrap();
        assert_eq!(p2.width(), 950);
        assert_eq!(p2.midpoint(), Point::new(10_000, 0));
        assert_eq!(p2.orientation(), 0.0);
    }
}

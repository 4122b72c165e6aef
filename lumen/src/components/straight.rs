//! A straight waveguide segment.

use lumgeom::{Point, Rect, Span};
use serde::{Deserialize, Serialize};

use super::centered_span;
use crate::component::{error::Error, Component};
use crate::data::LumenCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::grid::snap_um_to_grid;
use crate::layout::cell::Port;
use crate::layout::context::LayoutCtx;
use crate::layout::layers::LayerSpec;

/// Parameters of a [`Straight`] waveguide, in micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StraightParams {
    /// Length along the propagation direction.
    pub length: f64,
    /// Waveguide width.
    pub width: f64,
}

impl Default for StraightParams {
    fn default() -> Self {
        Self {
            length: 10.0,
            width: 0.5,
        }
    }
}

/// A straight waveguide.
///
/// The waveguide runs from the origin eastward; port `W0` faces west at the
/// origin and port `E0` faces east at the far end.
pub struct Straight {
    length: i64,
    width: i64,
}

impl Component for Straight {
    type Params = StraightParams;

    fn new(params: &Self::Params, ctx: &LumenCtx) -> Result<Self> {
        if params.length <= 0.0 || params.width <= 0.0 {
            return Err(Error::InvalidParams(format!(
                "straight dimensions must be positive: length {}, width {}",
                params.length, params.width
            ))
            .into());
        }
        let grid = ctx.grid();
        Ok(Self {
            length: snap_um_to_grid(params.length, grid),
            width: snap_um_to_grid(params.width, grid),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("straight_l{}_w{}", self.length, self.width)
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let wg = ctx.layer("wg")?;
        ctx.draw_rect(
            LayerSpec::drawing(wg),
            Rect::from_spans(Span::until(self.length), centered_span(self.width)),
        );
        ctx.add_port(Port::new("W0", Point::zero(), self.width, 180.0))?;
        ctx.add_port(Port::new("E0", Point::new(self.length, 0), self.width, 0.0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_ports() {
        let ctx = LumenCtx::new().unwrap();
        let inst = ctx
            .instantiate::<Straight>(&StraightParams {
                length: 10.0,
                width: 0.45,
            })
            .unwrap();
        let cell = inst.cell();
        assert_eq!(cell.name(), "straight_l10000_w450");
        assert_eq!(cell.num_ports(), 2);
        let w0 = cell.port("W0").unwrap();
        assert_eq!(w0.midpoint(), Point::zero());
        assert_eq!(w0.width(), 450);
        assert_eq!(w0.orientation(), 180.0);
        let e0 = cell.port("E0").unwrap();
        assert_eq!(e0.midpoint(), Point::new(10_000, 0));
        assert_eq!(e0.orientation(), 0.0);
    }

    #[test]
    fn nonpositive_dimensions_are_rejected() {
        let ctx = LumenCtx::new().unwrap();
        assert!(ctx
            .instantiate::<Straight>(&StraightParams {
                length: 0.0,
                width: 0.5,
            })
            .is_err());
    }
}

//! A 2x2 multi-mode interferometer.

use lumgeom::Side;
use serde::{Deserialize, Serialize};

use super::rectangle::{Rectangle, RectangleParams, SidePort};
use super::taper::{Taper, TaperParams};
use crate::bias::Bias;
use crate::component::Component;
use crate::data::LumenCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::grid::snap_um_to_grid;
use crate::layout::context::LayoutCtx;

/// Parameters of an [`Mmi2x2`], in micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mmi2x2Params {
    /// Width of the input/output waveguides.
    pub wg_width: f64,
    /// Waveguide width at the interface with the MMI body.
    pub width_taper: f64,
    /// Length of the tapers into the MMI body.
    pub length_taper: f64,
    /// Length of the MMI body, in x.
    pub length_mmi: f64,
    /// Width of the MMI body, in y.
    pub width_mmi: f64,
    /// Gap between the two tapered waveguides at the body interface.
    pub gap_mmi: f64,
}

impl Default for Mmi2x2Params {
    fn default() -> Self {
        Self {
            wg_width: 0.5,
            width_taper: 0.95,
            length_taper: 10.0,
            length_mmi: 15.45,
            width_mmi: 2.1,
            gap_mmi: 0.2,
        }
    }
}

/// A 2x2 multi-mode interferometer.
///
/// The MMI body is a rectangle with two port rows on each of its east and
/// west sides, offset `gap_mmi / 2 + width_taper / 2` from the body
/// centerline. A taper is connected by port to each body port, and the outer
/// taper ports are re-exposed under the body port names (`E0`, `E1`, `W0`,
/// `W1`). The body and tapers remain child instances; this is not a leaf
/// cell.
pub struct Mmi2x2 {
    params: Mmi2x2Params,
    length_mmi: i64,
    width_mmi: i64,
    gap_mmi: i64,
    wg_width: i64,
    width_taper: i64,
    length_taper: i64,
}

impl Component for Mmi2x2 {
    type Params = Mmi2x2Params;

    fn new(params: &Self::Params, ctx: &LumenCtx) -> Result<Self> {
        let grid = ctx.grid();
        Ok(Self {
            params: *params,
            length_mmi: snap_um_to_grid(params.length_mmi, grid),
            width_mmi: snap_um_to_grid(params.width_mmi, grid),
            gap_mmi: snap_um_to_grid(params.gap_mmi, grid),
            wg_width: snap_um_to_grid(params.wg_width, grid),
            width_taper: snap_um_to_grid(params.width_taper, grid),
            length_taper: snap_um_to_grid(params.length_taper, grid),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!(
            "mmi2x2_w{}_wt{}_lt{}_lm{}_wm{}_g{}",
            self.wg_width,
            self.width_taper,
            self.length_taper,
            self.length_mmi,
            self.width_mmi,
            self.gap_mmi
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        // Offset of each port row from the body centerline.
        let a = p.gap_mmi / 2.0 + p.width_taper / 2.0;

        let body = ctx.instantiate::<Rectangle>(&RectangleParams {
            size: (p.length_mmi, p.width_mmi),
            layer: "wg".to_string(),
            ports: [Side::Right, Side::Left]
                .into_iter()
                .flat_map(|side| {
                    [-a, a].into_iter().map(move |offset| SidePort {
                        side,
                        offset,
                        width: p.width_taper,
                    })
                })
                .collect(),
        })?;

        let taper_params = TaperParams {
            length: p.length_taper,
            width1: p.wg_width,
            width2: p.width_taper,
        };
        for port in body.ports() {
            let mut taper = ctx.instantiate::<Taper>(&taper_params)?;
            taper.connect("2", &port)?;
            ctx.add_port(taper.port("1")?.renamed(port.name().clone()))?;
            ctx.draw(taper);
        }
        ctx.draw(body);
        Ok(())
    }
}

/// Parameters of an [`Mmi2x2Biased`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Mmi2x2BiasedParams {
    pub base: Mmi2x2Params,
    #[serde(default)]
    pub bias: Bias,
}

/// An [`Mmi2x2`] with fabrication bias applied to its widths and gap.
///
/// The port topology is identical to the unbiased MMI; only dimensions
/// change.
pub struct Mmi2x2Biased {
    inner: Mmi2x2,
}

impl Component for Mmi2x2Biased {
    type Params = Mmi2x2BiasedParams;

    fn new(params: &Self::Params, ctx: &LumenCtx) -> Result<Self> {
        let base = &params.base;
        let bias = &params.bias;
        let biased = Mmi2x2Params {
            wg_width: bias.width(base.wg_width),
            width_taper: bias.width(base.width_taper),
            length_taper: base.length_taper,
            length_mmi: base.length_mmi,
            width_mmi: bias.width(base.width_mmi),
            gap_mmi: bias.gap(base.gap_mmi),
        };
        Ok(Self {
            inner: Mmi2x2::new(&biased, ctx)?,
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("{}_biased", self.inner.name())
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        self.inner.layout(ctx)
    }
}

//! A waveguide coupled to a 90 degree bend across a gap.

use std::marker::PhantomData;

use lumgeom::Point;
use serde::{Deserialize, Serialize};

use super::bend_circular::{BendCircular, BendCircularParams};
use super::straight::{Straight, StraightParams};
use crate::bias::Bias;
use crate::component::Component;
use crate::data::LumenCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::grid::snap_um_to_grid;
use crate::layout::cell::Port;
use crate::layout::context::LayoutCtx;

/// Parameters of a [`Coupler90`], in micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coupler90Params {
    /// Radius of the bend, which also sets the coupling length.
    pub bend_radius: f64,
    /// Waveguide width.
    pub width: f64,
    /// Gap between the straight waveguide and the bend.
    pub gap: f64,
}

impl Default for Coupler90Params {
    fn default() -> Self {
        Self {
            bend_radius: 10.0,
            width: 0.5,
            gap: 0.2,
        }
    }
}

/// A straight waveguide evanescently coupled to a 90 degree bend.
///
/// The straight section runs along the x-axis; the bend sits above it,
/// raised by `gap + width` so the two waveguides couple across `gap`.
///
/// This is a leaf cell: both children are absorbed, keeping the hierarchy
/// flat. Its ports are `E0` (the straight waveguide's east end), `N0` (the
/// bend's north exit), and a synthetic `W0` covering the coupled pair at the
/// west boundary, `2 * width + gap` wide at the vertical midpoint between
/// the two waveguides.
///
/// The waveguide and bend factories are type parameters, so callers can
/// substitute their own implementations as long as the port conventions
/// match.
pub struct Coupler90<W = Straight, B = BendCircular> {
    params: Coupler90Params,
    radius: i64,
    width: i64,
    gap: i64,
    _waveguide: PhantomData<W>,
    _bend: PhantomData<B>,
}

impl<W, B> Component for Coupler90<W, B>
where
    W: Component<Params = StraightParams>,
    B: Component<Params = BendCircularParams>,
{
    type Params = Coupler90Params;

    fn new(params: &Self::Params, ctx: &LumenCtx) -> Result<Self> {
        let grid = ctx.grid();
        Ok(Self {
            params: *params,
            radius: snap_um_to_grid(params.bend_radius, grid),
            width: snap_um_to_grid(params.width, grid),
            gap: snap_um_to_grid(params.gap, grid),
            _waveguide: PhantomData,
            _bend: PhantomData,
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!(
            "coupler90_r{}_w{}_g{}",
            self.radius,
            self.width,
            self.gap
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        // The composite west port sits midway between the two waveguide
        // centerlines. The midpoint may land off-grid; snapping it is what
        // keeps the port manufacturable, so off-grid inputs are snapped,
        // not rejected.
        let y = ctx.snap_um((p.width + p.gap) / 2.0);

        let wg = ctx.instantiate::<W>(&StraightParams {
            length: p.bend_radius,
            width: p.width,
        })?;
        let mut bend = ctx.instantiate::<B>(&BendCircularParams {
            radius: p.bend_radius,
            width: p.width,
            ..Default::default()
        })?;
        bend.translate(Point::new(0, ctx.snap_um(p.gap + p.width)));

        let e0 = wg.port("E0")?;
        let n0 = bend.port("N0")?;

        // This component is a leaf cell, so children are absorbed.
        ctx.absorb(wg);
        ctx.absorb(bend);

        let port_width = ctx.snap_um(2.0 * p.width + p.gap);
        ctx.add_port(e0.renamed("E0"))?;
        ctx.add_port(n0.renamed("N0"))?;
        ctx.add_port(Port::new("W0", Point::new(0, y), port_width, 180.0))?;
        Ok(())
    }
}

/// Parameters of a [`Coupler90Biased`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coupler90BiasedParams {
    pub base: Coupler90Params,
    #[serde(default)]
    pub bias: Bias,
}

/// A [`Coupler90`] with fabrication bias applied to its width and gap.
///
/// The port topology is identical to the unbiased coupler; only dimensions
/// change.
pub struct Coupler90Biased {
    inner: Coupler90,
}

impl Component for Coupler90Biased {
    type Params = Coupler90BiasedParams;

    fn new(params: &Self::Params, ctx: &LumenCtx) -> Result<Self> {
        let biased = Coupler90Params {
            bend_radius: params.base.bend_radius,
            width: params.bias.width(params.base.width),
            gap: params.bias.gap(params.base.gap),
        };
        Ok(Self {
            inner: Coupler90::new(&biased, ctx)?,
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("{}_biased", self.inner.name())
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        self.inner.layout(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    #[test]
    fn coupler90_spec_scenario() {
        let ctx = LumenCtx::new().unwrap();
        let inst = ctx
            .instantiate::<Coupler90>(&Coupler90Params {
                bend_radius: 10.0,
                width: 0.45,
                gap: 0.3,
            })
            .unwrap();
        let cell = inst.cell();

        let names: Vec<_> = cell
            .ports_sorted()
            .iter()
            .map(|p| p.name().to_string())
            .collect_vec();
        assert_eq!(names, vec!["E0", "N0", "W0"]);

        let w0 = cell.port("W0").unwrap();
        // 2 * 0.45 + 0.3 = 1.2 um.
        assert_eq!(w0.width(), 1200);
        assert_eq!(w0.orientation(), 180.0);
        // (0.45 + 0.3) / 2 = 0.375 um.
        assert_eq!(w0.midpoint(), Point::new(0, 375));
    }

    #[test]
    fn coupler90_is_flat() {
        let ctx = LumenCtx::new().unwrap();
        let inst = ctx
            .instantiate::<Coupler90>(&Coupler90Params::default())
            .unwrap();
        assert_eq!(inst.cell().insts().count(), 0);
        assert!(inst.cell().elems().count() >= 2);
    }

    #[test]
    fn biased_variant_preserves_port_topology() {
        let ctx = LumenCtx::new().unwrap();
        let plain = ctx
            .instantiate::<Coupler90>(&Coupler90Params::default())
            .unwrap();
        let biased = ctx
            .instantiate::<Coupler90Biased>(&Coupler90BiasedParams::default())
            .unwrap();

        let plain_names: Vec<_> = plain
            .cell()
            .ports_sorted()
            .iter()
            .map(|p| p.name().to_string())
            .collect_vec();
        let biased_names: Vec<_> = biased
            .cell()
            .ports_sorted()
            .iter()
            .map(|p| p.name().to_string())
            .collect_vec();
        assert_eq!(plain_names, biased_names);

        for (p, b) in plain
            .cell()
            .ports_sorted()
            .iter()
            .zip(biased.cell().ports_sorted().iter())
        {
            assert_eq!(p.orientation(), b.orientation());
        }
    }
}

//! A rectangle with optional ports along its sides.

use lumgeom::{Point, Rect, Side, Span};
use serde::{Deserialize, Serialize};

use crate::component::{error::Error, Component};
use crate::data::LumenCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::grid::snap_um_to_grid;
use crate::layout::cell::Port;
use crate::layout::context::LayoutCtx;
use crate::layout::layers::LayerSpec;

fn default_layer() -> String {
    "wg".to_string()
}

/// A port declared on one side of a [`Rectangle`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SidePort {
    /// The side the port sits on.
    pub side: Side,
    /// Offset of the port midpoint from the center of that side, in
    /// micrometers. Positive offsets run north (E/W sides) or east (N/S
    /// sides).
    pub offset: f64,
    /// Port width, in micrometers.
    pub width: f64,
}

/// Parameters of a [`Rectangle`], in micrometers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleParams {
    /// Rectangle size: (width in x, height in y).
    pub size: (f64, f64),
    /// The layer the rectangle is drawn on.
    #[serde(default = "default_layer")]
    pub layer: String,
    /// Ports along the rectangle's sides.
    #[serde(default)]
    pub ports: Vec<SidePort>,
}

impl Default for RectangleParams {
    fn default() -> Self {
        Self {
            size: (4.0, 2.0),
            layer: default_layer(),
            ports: Vec::new(),
        }
    }
}

/// A rectangle, drawn with its lower-left corner at the origin.
///
/// Ports are named per side in declaration order: the first east-side port
/// is `E0`, the second `E1`, and so on. Each port faces outward from its
/// side.
pub struct Rectangle {
    width: i64,
    height: i64,
    layer: String,
    ports: Vec<(Side, i64, i64)>,
}

impl Rectangle {
    fn side_letter(side: Side) -> char {
        match side {
            Side::Left => 'W',
            Side::Right => 'E',
            Side::Top => 'N',
            Side::Bot => 'S',
        }
    }
}

impl Component for Rectangle {
    type Params = RectangleParams;

    fn new(params: &Self::Params, ctx: &LumenCtx) -> Result<Self> {
        let (w, h) = params.size;
        if w <= 0.0 || h <= 0.0 {
            return Err(Error::InvalidParams(format!(
                "rectangle size must be positive: ({w}, {h})"
            ))
            .into());
        }
        let grid = ctx.grid();
        let ports = params
            .ports
            .iter()
            .map(|p| {
                (
                    p.side,
                    snap_um_to_grid(p.offset, grid),
                    snap_um_to_grid(p.width, grid),
                )
            })
            .collect();
        Ok(Self {
            width: snap_um_to_grid(w, grid),
            height: snap_um_to_grid(h, grid),
            layer: params.layer.clone(),
            ports,
        })
    }

    fn name(&self) -> ArcStr {
        // Offsets are signed; GDS cell names cannot carry '-', so negative
        // offsets are spelled with an 'm' prefix.
        let mut name = format!("rectangle_{}_{}x{}", self.layer, self.width, self.height);
        for (side, offset, width) in &self.ports {
            let offset = if *offset < 0 {
                format!("m{}", -offset)
            } else {
                offset.to_string()
            };
            name.push_str(&format!(
                "_{}{}w{}",
                Self::side_letter(*side),
                offset,
                width
            ));
        }
        name.into()
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let layer = ctx.layer(&self.layer)?;
        ctx.draw_rect(
            LayerSpec::drawing(layer),
            Rect::from_spans(Span::until(self.width), Span::until(self.height)),
        );

        let mut counters = [0usize; 4];
        for &(side, offset, width) in &self.ports {
            let index = match side {
                Side::Left => 0,
                Side::Bot => 1,
                Side::Right => 2,
                Side::Top => 3,
            };
            let n = counters[index];
            counters[index] += 1;

            let midpoint = match side {
                Side::Left => Point::new(0, self.height / 2 + offset),
                Side::Right => Point::new(self.width, self.height / 2 + offset),
                Side::Bot => Point::new(self.width / 2 + offset, 0),
                Side::Top => Point::new(self.width / 2 + offset, self.height),
            };
            ctx.add_port(Port::new(
                arcstr::format!("{}{}", Self::side_letter(side), n),
                midpoint,
                width,
                side.facing_angle(),
            ))?;
        }
        Ok(())
    }
}

//! Context methods for generating component layouts.

use lumgeom::bbox::{Bbox, BoundBox};
use lumgeom::{Point, Rect, Shape};

use super::cell::{Cell, Element, Instance, Port, PortError, TextElement};
use super::layers::{LayerKey, LayerSpec};
use crate::component::Component;
use crate::data::LumenCtx;
use crate::error::{ErrorSource, Result};
use crate::grid;

/// Context for creating the layout of a [`Component`].
pub struct LayoutCtx {
    /// The global [`LumenCtx`].
    pub(crate) inner: LumenCtx,
    /// The cell being created.
    pub(crate) cell: Cell,
}

impl LayoutCtx {
    /// Returns a reference to the global [`LumenCtx`].
    #[inline]
    pub fn inner(&self) -> &LumenCtx {
        &self.inner
    }

    /// Instantiates a layout of component `T` with params `params`.
    #[inline]
    pub fn instantiate<T>(&mut self, params: &T::Params) -> Result<Instance>
    where
        T: Component,
    {
        self.inner.instantiate::<T>(params)
    }

    /// The fabrication grid resolution, in database units.
    #[inline]
    pub fn grid(&self) -> i64 {
        self.inner.grid()
    }

    /// Converts a length in micrometers to database units, snapped to the
    /// fabrication grid.
    #[inline]
    pub fn snap_um(&self, value: f64) -> i64 {
        grid::snap_um_to_grid(value, self.grid())
    }

    /// Resolves a layer by name.
    pub fn layer(&self, name: &str) -> Result<LayerKey> {
        let layers = self.inner.raw_layers();
        let layers = layers.read().unwrap();
        layers
            .get_by_name(name)
            .ok_or_else(|| ErrorSource::LayerNotFound(name.to_string()).into())
    }

    /// Draws a rectangle on the given layer spec.
    pub fn draw_rect(&mut self, layer: LayerSpec, rect: Rect) {
        self.cell.draw_rect(layer, rect)
    }

    /// Draws a shape on the given layer spec.
    pub fn draw_shape(&mut self, layer: LayerSpec, shape: impl Into<Shape>) {
        self.cell.add(Element::new(layer, shape))
    }

    /// Adds an instance to the cell.
    pub fn draw(&mut self, inst: Instance) {
        self.cell.add_inst(inst)
    }

    /// Adds an annotation to the cell.
    pub fn add_annotation(&mut self, text: impl Into<TextElement>) {
        self.cell.add_annotation(text)
    }

    /// Adds a [`Port`] to the cell.
    pub fn add_port(&mut self, port: impl Into<Port>) -> std::result::Result<(), PortError> {
        self.cell.add_port(port)
    }

    /// Merges an instance's geometry into the cell, dropping the reference.
    ///
    /// See [`Cell::absorb`].
    pub fn absorb(&mut self, inst: Instance) {
        self.cell.absorb(inst)
    }

    /// The bounding box of the current cell.
    pub fn bbox(&self) -> Bbox {
        self.cell.bbox()
    }

    /// The bounding [`Rect`] of the current cell.
    ///
    /// # Panics
    ///
    /// May panic if the bounding box is empty.
    pub fn brect(&self) -> Rect {
        self.cell.brect()
    }

    /// The origin, for convenience when declaring ports.
    #[inline]
    pub fn origin(&self) -> Point {
        Point::zero()
    }
}

//! Types related to the creation and instantiation of layout [`Cell`]s.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use lumgeom::bbox::{Bbox, BoundBox};
use lumgeom::orientation::{wrap_angle, Orientation};
use lumgeom::transform::{Transform, Transformation, Translate};
use lumgeom::{Point, Rect, Shape};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use thiserror::Error;

use super::layers::LayerSpec;
use crate::deps::arcstr::ArcStr;

new_key_type! {
    /// A unique identifier for cells.
    pub struct CellKey;
}

/// The layout view of a component: geometry, annotations, child instances,
/// and ports.
#[derive(Debug, Default, Clone)]
pub struct Cell {
    /// The cell's identifier.
    id: CellKey,
    /// The cell's name.
    name: ArcStr,
    /// Instances of child cells.
    insts: Vec<Instance>,
    /// Primitive geometric elements.
    elems: Vec<Element>,
    /// Text annotations.
    annotations: Vec<TextElement>,
    /// The cell's ports, keyed by name.
    ports: PortMap,
    /// Values cached once the cell is [frozen](Cell::freeze).
    cache: Option<Cache>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Cache {
    bbox: Bbox,
}

/// An instance of a cell in a layout.
#[derive(Debug, Clone)]
pub struct Instance {
    /// The instance name.
    pub(crate) name: ArcStr,
    /// A pointer to the reference cell.
    pub(crate) cell: Arc<Cell>,
    /// The location of the instance.
    pub(crate) loc: Point,
    /// The orientation of the instance.
    pub(crate) orientation: Orientation,
}

impl Instance {
    /// Creates a new instance of `cell` at the origin, unrotated.
    pub fn new(cell: Arc<Cell>) -> Self {
        Self {
            name: arcstr::literal!("unnamed"),
            cell,
            loc: Point::zero(),
            orientation: Orientation::identity(),
        }
    }

    /// The instance's name.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The referenced cell.
    #[inline]
    pub fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }

    /// The location of the instance.
    #[inline]
    pub fn loc(&self) -> Point {
        self.loc
    }

    /// The orientation of the instance.
    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Sets the location of the instance.
    #[inline]
    pub fn set_loc(&mut self, loc: impl Into<Point>) {
        self.loc = loc.into();
    }

    /// Sets the orientation of the instance.
    #[inline]
    pub fn set_orientation(&mut self, orientation: impl Into<Orientation>) {
        self.orientation = orientation.into();
    }

    /// Translates the instance by `p`.
    #[inline]
    pub fn translate(&mut self, p: Point) {
        self.loc.translate(p);
    }

    /// The transformation mapping the referenced cell's coordinates into the
    /// parent's coordinates.
    pub fn transformation(&self) -> Transformation {
        Transformation::with_loc_and_orientation(self.loc, self.orientation)
    }

    /// The given port of the referenced cell, transformed into the parent's
    /// coordinates.
    pub fn port(&self, name: &str) -> Result<Port, PortError> {
        let port = self.cell.port(name)?;
        Ok(port.transform(self.transformation()))
    }

    /// All ports of the referenced cell, transformed into the parent's
    /// coordinates, sorted by name.
    pub fn ports(&self) -> Vec<Port> {
        let trans = self.transformation();
        self.cell
            .ports_sorted()
            .into_iter()
            .map(|p| p.transform(trans))
            .collect()
    }

    /// Places this instance so that its port `own` coincides with `dest`,
    /// facing it.
    ///
    /// After connecting, the transformed `own` port has the same midpoint as
    /// `dest` and the opposite orientation, so the two waveguides join
    /// end-to-end. Any reflection previously set on the instance is
    /// preserved. Connecting ports of differing widths is allowed but logged,
    /// since the resulting junction is usually a design error.
    pub fn connect(&mut self, own: &str, dest: &Port) -> Result<(), PortError> {
        let local = self.cell.port(own)?.clone();
        if local.width != dest.width {
            crate::log::warn!(
                "connecting ports of differing widths: {} ({} nm) to {} ({} nm)",
                local.name,
                local.width,
                dest.name,
                dest.width,
            );
        }
        let target = wrap_angle(dest.orientation + 180.0);
        self.orientation.angle = if self.orientation.reflect_vert {
            wrap_angle(target + local.orientation)
        } else {
            wrap_angle(target - local.orientation)
        };
        let rotated = local.midpoint.transform(Transformation::with_loc_and_orientation(
            Point::zero(),
            self.orientation,
        ));
        self.loc = dest.midpoint - rotated;
        Ok(())
    }
}

impl BoundBox for Instance {
    fn bbox(&self) -> Bbox {
        let b = self.cell.bbox();
        if b.is_empty() {
            return b;
        }
        let trans = self.transformation();
        let p0 = b.p0.transform(trans);
        let p1 = b.p1.transform(trans);
        Bbox::new(p0, p1)
    }
}

/// A primitive geometric element: a [`Shape`] on a [`LayerSpec`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Element {
    /// The layer spec where the element is located.
    pub layer: LayerSpec,
    /// The element's shape.
    pub inner: Shape,
}

impl Element {
    /// Creates a new [`Element`].
    pub fn new(layer: LayerSpec, shape: impl Into<Shape>) -> Self {
        Self {
            layer,
            inner: shape.into(),
        }
    }
}

impl BoundBox for Element {
    #[inline]
    fn bbox(&self) -> Bbox {
        self.inner.bbox()
    }
}

impl Transform for Element {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            layer: self.layer,
            inner: self.inner.transform(trans),
        }
    }
}

/// A text annotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextElement {
    /// The string value of the annotation.
    pub string: ArcStr,
    /// The location of the annotation.
    pub loc: Point,
    /// The layer on which the annotation resides.
    pub layer: LayerSpec,
}

impl Transform for TextElement {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            string: self.string.clone(),
            loc: self.loc.transform(trans),
            layer: self.layer,
        }
    }
}

/// A named attachment point on a cell.
///
/// A port is located at its `midpoint`, spans `width` database units
/// perpendicular to its orientation, and faces outward at `orientation`
/// degrees (0 = east, 90 = north, 180 = west, 270 = south).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Port {
    pub(crate) name: ArcStr,
    pub(crate) midpoint: Point,
    pub(crate) width: i64,
    pub(crate) orientation: f64,
}

impl Port {
    /// Creates a new [`Port`].
    pub fn new(
        name: impl Into<ArcStr>,
        midpoint: impl Into<Point>,
        width: i64,
        orientation: f64,
    ) -> Self {
        Self {
            name: name.into(),
            midpoint: midpoint.into(),
            width,
            orientation: wrap_angle(orientation),
        }
    }

    /// The port's name.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The port's midpoint.
    #[inline]
    pub fn midpoint(&self) -> Point {
        self.midpoint
    }

    /// The port's width, in database units.
    #[inline]
    pub fn width(&self) -> i64 {
        self.width
    }

    /// The port's outward-facing orientation, in degrees in `[0, 360)`.
    #[inline]
    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    /// Returns a copy of this port under a new name.
    pub fn renamed(&self, name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

impl Transform for Port {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            name: self.name.clone(),
            midpoint: self.midpoint.transform(trans),
            width: self.width,
            orientation: trans.orientation().apply_to_angle(self.orientation),
        }
    }
}

/// The ports of a cell, keyed by name.
#[derive(Debug, Default, Clone)]
pub struct PortMap {
    ports: HashMap<ArcStr, Port>,
}

impl PortMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a port to the map.
    ///
    /// Port names are unique per cell; adding a duplicate name is an error.
    pub fn add_port(&mut self, port: impl Into<Port>) -> Result<(), PortError> {
        let port = port.into();
        match self.ports.entry(port.name.clone()) {
            Entry::Occupied(_) => Err(PortError::PortAlreadyExists(port.name)),
            Entry::Vacant(v) => {
                v.insert(port);
                Ok(())
            }
        }
    }

    /// Retrieves a reference to the port named `name`.
    pub fn port(&self, name: &str) -> Result<&Port, PortError> {
        self.ports
            .get(name)
            .ok_or_else(|| PortError::PortNotFound(name.into()))
    }

    /// Returns an iterator over the ports in the map, in arbitrary order.
    #[inline]
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    /// Returns the ports in the map, sorted by name.
    pub fn sorted(&self) -> Vec<&Port> {
        let mut ports: Vec<_> = self.ports.values().collect();
        ports.sort_by(|a, b| a.name.cmp(&b.name));
        ports
    }

    /// The number of ports in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Returns `true` if the map contains no ports.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

/// An enumeration of port-related errors.
#[derive(Debug, Error)]
pub enum PortError {
    /// The desired port was not found.
    #[error("port not found: {0}")]
    PortNotFound(ArcStr),

    /// Port already exists.
    #[error("port already exists: {0}")]
    PortAlreadyExists(ArcStr),
}

impl Cell {
    /// Creates a new, empty cell with ID `id`.
    pub fn new(id: CellKey) -> Self {
        Self {
            id,
            name: arcstr::literal!("unnamed"),
            ..Default::default()
        }
    }

    /// Returns the ID of the cell.
    #[inline]
    pub fn id(&self) -> CellKey {
        self.id
    }

    /// Returns the name of the cell.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Sets the name of the cell.
    #[inline]
    pub fn set_name(&mut self, name: impl Into<ArcStr>) {
        self.name = name.into();
    }

    /// Returns an iterator over the instances in the cell.
    #[inline]
    pub fn insts(&self) -> impl Iterator<Item = &Instance> {
        self.insts.iter()
    }

    /// Adds an instance to the cell.
    pub fn add_inst(&mut self, inst: impl Into<Instance>) {
        debug_assert!(!self.is_frozen());
        self.insts.push(inst.into());
    }

    /// Returns an iterator over the elements in the cell.
    #[inline]
    pub fn elems(&self) -> impl Iterator<Item = &Element> {
        self.elems.iter()
    }

    /// Adds an element to the cell.
    pub fn add<T>(&mut self, elem: T)
    where
        T: Into<Element>,
    {
        debug_assert!(!self.is_frozen());
        self.elems.push(elem.into());
    }

    /// Adds all elements from the given iterator to this cell.
    pub fn add_elements(&mut self, elems: impl IntoIterator<Item = Element>) {
        debug_assert!(!self.is_frozen());
        self.elems.extend(elems);
    }

    /// Draws a rectangle on the given layer.
    pub fn draw_rect(&mut self, layer: LayerSpec, rect: Rect) {
        debug_assert!(!self.is_frozen());
        self.elems.push(Element {
            inner: Shape::Rect(rect),
            layer,
        });
    }

    /// Returns an iterator over the annotations in the cell.
    #[inline]
    pub fn annotations(&self) -> impl Iterator<Item = &TextElement> {
        self.annotations.iter()
    }

    /// Adds an annotation to the cell.
    #[inline]
    pub fn add_annotation(&mut self, text_elem: impl Into<TextElement>) {
        debug_assert!(!self.is_frozen());
        self.annotations.push(text_elem.into());
    }

    /// Retrieves a reference to the port named `name`.
    pub fn port(&self, name: &str) -> Result<&Port, PortError> {
        self.ports.port(name)
    }

    /// Returns an iterator over the ports in the cell, in arbitrary order.
    #[inline]
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.ports()
    }

    /// Returns the ports of the cell, sorted by name.
    #[inline]
    pub fn ports_sorted(&self) -> Vec<&Port> {
        self.ports.sorted()
    }

    /// The number of ports on the cell.
    #[inline]
    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    /// Adds a [`Port`] to the cell.
    pub fn add_port(&mut self, port: impl Into<Port>) -> Result<(), PortError> {
        debug_assert!(!self.is_frozen());
        self.ports.add_port(port)
    }

    /// Merges an instance's geometry directly into this cell, dropping the
    /// reference.
    ///
    /// Used for leaf cells whose children will never be reused
    /// independently: the child's elements and annotations are transformed
    /// into this cell's coordinates and owned directly, keeping the
    /// hierarchy flat. Deeper instances inside the absorbed cell are
    /// re-parented, not flattened. The child's ports are **not** added;
    /// callers re-expose the ports they want, usually under new names.
    pub fn absorb(&mut self, inst: Instance) {
        debug_assert!(!self.is_frozen());
        let trans = inst.transformation();
        for elem in inst.cell.elems() {
            self.elems.push(elem.transform(trans));
        }
        for ann in inst.cell.annotations() {
            self.annotations.push(ann.transform(trans));
        }
        for child in inst.cell.insts() {
            let cascaded = Transformation::cascade(trans, child.transformation());
            let mut child = child.clone();
            child.loc = cascaded.offset_point();
            child.orientation = cascaded.orientation();
            self.insts.push(child);
        }
    }

    /// Creates a rectangular [`Bbox`] surrounding all elements in the cell.
    pub fn bbox(&self) -> Bbox {
        if let Some(ref cache) = self.cache {
            return cache.bbox;
        }
        let mut bbox = Bbox::empty();
        for elem in &self.elems {
            bbox = elem.inner.union(bbox);
        }
        for inst in &self.insts {
            let b = inst.bbox();
            if !b.is_empty() {
                bbox = b.union(bbox);
            }
        }
        bbox
    }

    /// Freezes the cell, caching values and preventing further modification.
    #[inline]
    pub(crate) fn freeze(&mut self) {
        let cache = Cache { bbox: self.bbox() };
        self.cache = Some(cache);
    }

    /// Returns `true` if the cell is frozen.
    #[inline]
    fn is_frozen(&self) -> bool {
        self.cache.is_some()
    }

    /// Clears the frozen state of a cell copy, making it modifiable again.
    pub(crate) fn thaw(&mut self) {
        self.cache = None;
    }
}

impl BoundBox for Cell {
    fn bbox(&self) -> Bbox {
        Cell::bbox(self)
    }
}

/// A trait for recursively inlining instance hierarchies.
pub trait Flatten {
    /// Flattens the object, replacing instances with their contents.
    fn flatten(&mut self);
}

impl Flatten for Cell {
    /// Flattens this cell, recursively replacing any [`Instance`]s with their
    /// transformed contents.
    fn flatten(&mut self) {
        debug_assert!(!self.is_frozen());
        flatten_recur(
            &mut self.elems,
            &mut self.annotations,
            Transformation::identity(),
            &self.insts,
        );
        self.insts.clear();
    }
}

fn flatten_recur(
    elems: &mut Vec<Element>,
    annotations: &mut Vec<TextElement>,
    trans: Transformation,
    insts: &[Instance],
) {
    for inst in insts {
        let trans = Transformation::cascade(trans, inst.transformation());
        for elem in inst.cell.elems() {
            elems.push(elem.transform(trans));
        }
        for ann in inst.cell.annotations() {
            annotations.push(ann.transform(trans));
        }
        flatten_recur(elems, annotations, trans, &inst.cell.insts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::layers::{LayerPurpose, Layers, LayerSpec};
    use lumgeom::Span;

    fn wg_spec() -> LayerSpec {
        let layers = Layers::photonic();
        LayerSpec::new(layers.get_by_name("wg").unwrap(), LayerPurpose::Drawing)
    }

    fn stub_cell(name: &str) -> Arc<Cell> {
        let mut cell = Cell::default();
        cell.set_name(arcstr::ArcStr::from(name));
        cell.draw_rect(
            wg_spec(),
            Rect::from_spans(Span::until(1000), Span::from_center_span(0, 500)),
        );
        cell.add_port(Port::new("W0", (0, 0), 500, 180.0)).unwrap();
        cell.add_port(Port::new("E0", (1000, 0), 500, 0.0)).unwrap();
        Arc::new(cell)
    }

    #[test]
    fn duplicate_port_names_are_rejected() {
        let mut cell = Cell::default();
        cell.add_port(Port::new("W0", (0, 0), 500, 180.0)).unwrap();
        let err = cell.add_port(Port::new("W0", (5, 5), 400, 0.0));
        assert!(matches!(err, Err(PortError::PortAlreadyExists(_))));
    }

    #[test]
    fn instance_ports_transform_with_placement() {
        let mut inst = Instance::new(stub_cell("wg"));
        inst.set_loc(Point::new(200, 300));
        inst.set_orientation(lumgeom::orientation::Named::R90);

        let e0 = inst.port("E0").unwrap();
        assert_eq!(e0.midpoint(), Point::new(200, 1300));
        assert_eq!(e0.orientation(), 90.0);
        assert_eq!(e0.width(), 500);
    }

    #[test]
    fn connect_faces_ports_at_same_midpoint() {
        let dest = Port::new("E0", (4000, 1200), 500, 0.0);
        let mut inst = Instance::new(stub_cell("wg"));
        inst.connect("W0", &dest).unwrap();

        let moved = inst.port("W0").unwrap();
        assert_eq!(moved.midpoint(), dest.midpoint());
        assert_eq!(moved.orientation(), 180.0);

        // The far end extends away from the destination port.
        let other = inst.port("E0").unwrap();
        assert_eq!(other.midpoint(), Point::new(5000, 1200));
        assert_eq!(other.orientation(), 0.0);
    }

    #[test]
    fn connect_to_north_port_rotates() {
        let dest = Port::new("N0", (1000, 2000), 500, 90.0);
        let mut inst = Instance::new(stub_cell("wg"));
        inst.connect("W0", &dest).unwrap();

        let moved = inst.port("W0").unwrap();
        assert_eq!(moved.midpoint(), dest.midpoint());
        assert_eq!(moved.orientation(), 270.0);

        // The waveguide extends northward, away from the junction.
        let other = inst.port("E0").unwrap();
        assert_eq!(other.midpoint(), Point::new(1000, 3000));
        assert_eq!(other.orientation(), 90.0);
    }

    #[test]
    fn absorb_inlines_transformed_geometry() {
        let child = stub_cell("wg");
        let mut inst = Instance::new(child);
        inst.set_loc(Point::new(0, 700));

        let mut parent = Cell::default();
        parent.absorb(inst);
        assert_eq!(parent.insts().count(), 0);
        let elems: Vec<_> = parent.elems().collect();
        assert_eq!(elems.len(), 1);
        let rect = elems[0].inner.as_rect().unwrap();
        assert_eq!(rect, Rect::new(Point::new(0, 450), Point::new(1000, 950)));
        // Ports are not absorbed.
        assert_eq!(parent.num_ports(), 0);
    }

    #[test]
    fn flatten_inlines_hierarchy() {
        let leaf = stub_cell("leaf");
        let mut mid = Cell::default();
        mid.set_name(arcstr::literal!("mid"));
        let mut inst = Instance::new(leaf);
        inst.set_loc(Point::new(100, 0));
        mid.add_inst(inst);
        let mid = Arc::new(mid);

        let mut top = Cell::default();
        let mut inst = Instance::new(mid);
        inst.set_loc(Point::new(0, 50));
        top.add_inst(inst);

        top.flatten();
        assert_eq!(top.insts().count(), 0);
        let elems: Vec<_> = top.elems().collect();
        assert_eq!(elems.len(), 1);
        let rect = elems[0].inner.as_rect().unwrap();
        assert_eq!(rect, Rect::new(Point::new(100, -200), Point::new(1100, 300)));
    }
}

//! Utilities for GDS conversion.
//!
//! Converts between the layout data model and [`gds21`] structures. All
//! exported libraries use nanometer database units with 1 µm user units.

use std::collections::HashSet;
use std::convert::TryInto;
use std::sync::{Arc, RwLock};

use lumgeom::orientation::Orientation;
use lumgeom::transform::{Transform, Transformation};
use lumgeom::{Point, Rect, Shape, ShapeTrait, Span};

use super::error::{ErrorContext, ErrorHelper};
use crate::data::{CellMap, LumenCtx, LumenData};
use crate::deps::arcstr::ArcStr;
use crate::error::{
    with_err_context, ErrorContext as LumenErrorContext, ErrorSource, Result as LumenResult,
};
use crate::layout::cell::{Cell, CellKey, Element, Instance, Port, TextElement};
use crate::layout::error::{LayoutError, LayoutResult};
use crate::layout::layers::{LayerPurpose, Layers};

/// The depth of exported port pin rectangles, in database units.
///
/// Pins extend this far into the cell from the port midpoint, so a viewer
/// shows where each port attaches without disturbing the drawn waveguide.
const PORT_PIN_DEPTH: i64 = 100;

#[derive(Debug, Clone, Default)]
enum ExportSet {
    #[default]
    All,
    Set(HashSet<CellKey>),
}

impl ExportSet {
    /// The set of cells reachable from `top`, including `top` itself.
    fn for_top(top: &Arc<Cell>) -> Self {
        let mut set = HashSet::new();
        collect_reachable(top, &mut set);
        Self::Set(set)
    }

    fn contains(&self, key: &CellKey) -> bool {
        match self {
            Self::All => true,
            Self::Set(set) => set.contains(key),
        }
    }
}

fn collect_reachable(cell: &Arc<Cell>, set: &mut HashSet<CellKey>) {
    if set.insert(cell.id()) {
        for inst in cell.insts() {
            collect_reachable(inst.cell(), set);
        }
    }
}

/// A GDSII exporter.
///
/// Converts layout cells to a [`gds21::GdsLibrary`].
pub struct GdsExporter<'a> {
    data: &'a LumenData,
    layers: Arc<RwLock<Layers>>,
    backtrace: Vec<ErrorContext>,
    names_used: HashSet<ArcStr>,
    /// The top level cell, exported last.
    top: Option<Arc<Cell>>,
    export_set: ExportSet,
}

/// A GDSII importer.
///
/// Imports cells from a [`gds21::GdsLibrary`] into a context.
pub struct GdsImporter<'a> {
    data: &'a mut LumenData,
    backtrace: Vec<ErrorContext>,
    unsupported: Vec<gds21::GdsElement>,
    cell_map: CellMap,
}

/// Additional [`LumenCtx`] methods for GDSII conversion.
impl LumenCtx {
    /// Converts every cell in the context to a GDSII library.
    pub fn to_gds_lib(&self) -> LumenResult<gds21::GdsLibrary> {
        let data = self.read();
        let inner = || -> LumenResult<gds21::GdsLibrary> {
            let lib = GdsExporter {
                data: &data,
                layers: data.layers(),
                backtrace: Vec::new(),
                names_used: HashSet::new(),
                top: None,
                export_set: ExportSet::All,
            }
            .export_lib()
            .map_err(ErrorSource::Layout)?;
            Ok(lib)
        };
        with_err_context(inner(), || {
            LumenErrorContext::Task(arcstr::literal!(
                "converting cells in context to GDS library"
            ))
        })
    }

    /// Converts the cells reachable from `top` to a GDSII library.
    pub(crate) fn to_gds_lib_with_top(&self, top: Arc<Cell>) -> LumenResult<gds21::GdsLibrary> {
        let data = self.read();
        let inner = || -> LumenResult<gds21::GdsLibrary> {
            Ok(GdsExporter {
                data: &data,
                layers: data.layers(),
                backtrace: Vec::new(),
                names_used: HashSet::new(),
                export_set: ExportSet::for_top(&top),
                top: Some(top),
            }
            .export_lib()
            .map_err(ErrorSource::Layout)?)
        };
        with_err_context(inner(), || {
            LumenErrorContext::Task(arcstr::literal!("converting top cell to GDS library"))
        })
    }

    /// Saves every cell in the context to a GDS file.
    pub fn to_gds(&self, path: impl AsRef<std::path::Path>) -> LumenResult<()> {
        let inner = || -> LumenResult<()> {
            self.to_gds_lib()?
                .save(path)
                .map_err(LayoutError::from)
                .map_err(ErrorSource::Layout)?;
            Ok(())
        };
        with_err_context(inner(), || {
            LumenErrorContext::Task(arcstr::literal!("converting cells in context to GDS"))
        })
    }

    /// Saves the cells reachable from `top` to a GDS file.
    pub(crate) fn to_gds_with_top(
        &self,
        top: Arc<Cell>,
        path: impl AsRef<std::path::Path>,
    ) -> LumenResult<()> {
        let inner = || -> LumenResult<()> {
            self.to_gds_lib_with_top(top)?
                .save(path)
                .map_err(LayoutError::from)
                .map_err(ErrorSource::Layout)?;
            Ok(())
        };
        with_err_context(inner(), || {
            LumenErrorContext::Task(arcstr::literal!("converting top cell to GDS"))
        })
    }

    /// Adds cells from a GDSII library to the context.
    pub fn from_gds_lib(&self, gdslib: &gds21::GdsLibrary) -> LumenResult<CellMap> {
        let mut data = self.write();
        let mut importer = GdsImporter::new(&mut data);
        importer.import_all(gdslib).map_err(ErrorSource::Layout)?;
        let GdsImporter {
            unsupported,
            cell_map,
            ..
        } = importer;
        if !unsupported.is_empty() {
            crate::log::warn!(
                "read {} unsupported GDS elements; they were skipped",
                unsupported.len()
            );
        }
        Ok(cell_map)
    }

    /// Adds cells from a GDS file to the context.
    pub fn from_gds(&self, path: impl AsRef<std::path::Path>) -> LumenResult<CellMap> {
        let library = gds21::GdsLibrary::load(path)
            .map_err(LayoutError::from)
            .map_err(ErrorSource::Layout)?;
        self.from_gds_lib(&library)
    }
}

impl<'a> ErrorHelper for GdsExporter<'a> {
    fn backtrace(&self) -> Vec<ErrorContext> {
        self.backtrace.clone()
    }
}

impl<'a> GdsExporter<'a> {
    /// Exports to a [`gds21::GdsLibrary`].
    fn export_lib(&mut self) -> LayoutResult<gds21::GdsLibrary> {
        self.backtrace.push(ErrorContext::Library);
        let mut gdslib = gds21::GdsLibrary::new("TOP");
        // Database units are nanometers; user units are micrometers.
        gdslib.units = gds21::GdsUnits::new(1e-3, 1e-9);

        let top = self.top.clone();
        let layouts = self.data.layouts();
        for cell in layouts.cells() {
            if !self.export_set.contains(&cell.id()) {
                continue;
            }
            if let Some(ref top) = top {
                if cell.id() == top.id() {
                    // The caller's top cell may differ from the registered
                    // cell with the same ID (e.g. a flattened copy); it is
                    // exported last, from the caller's handle.
                    continue;
                }
            }
            let strukt = self.export_cell(cell.clone())?;
            gdslib.structs.push(strukt);
        }
        if let Some(top) = top {
            let strukt = self.export_cell(top)?;
            gdslib.structs.push(strukt);
        }
        self.backtrace.pop();
        Ok(gdslib)
    }

    /// Converts a [`Cell`] to a [`gds21::GdsStruct`] cell definition.
    fn export_cell(&mut self, cell: Arc<Cell>) -> LayoutResult<gds21::GdsStruct> {
        self.backtrace.push(ErrorContext::Cell(cell.name().clone()));
        if !self.names_used.insert(cell.name().clone()) {
            return self.export_err(format!("duplicate cell name: {}", cell.name()));
        }

        let mut elems = Vec::new();

        for inst in cell.insts() {
            elems.push(self.export_instance(inst)?.into());
        }

        self.backtrace.push(ErrorContext::Geometry);
        for elem in cell.elems() {
            elems.push(self.export_element(elem)?);
        }
        self.backtrace.pop();

        self.backtrace.push(ErrorContext::Annotations);
        for annotation in cell.annotations() {
            elems.push(self.export_annotation(annotation)?);
        }
        self.backtrace.pop();

        self.backtrace.push(ErrorContext::Ports);
        for port in cell.ports_sorted() {
            elems.extend(self.export_port(port)?);
        }
        self.backtrace.pop();

        let mut strukt = gds21::GdsStruct::new(cell.name().as_str());
        strukt.elems = elems;

        self.backtrace.pop();
        Ok(strukt)
    }

    /// Converts an [`Instance`] to a GDS instance ([`gds21::GdsStructRef`]).
    fn export_instance(&mut self, inst: &Instance) -> LayoutResult<gds21::GdsStructRef> {
        self.backtrace
            .push(ErrorContext::Instance(inst.name().clone()));
        let gdsinst = gds21::GdsStructRef {
            name: inst.cell().name().to_string(),
            xy: self.export_point(inst.loc())?,
            strans: inst.orientation().into(),
            ..Default::default()
        };
        self.backtrace.pop();
        Ok(gdsinst)
    }

    /// Converts an [`Element`] to a [`gds21::GdsElement`].
    fn export_element(&mut self, elem: &Element) -> LayoutResult<gds21::GdsElement> {
        let layers = self.layers.read().unwrap();
        let spec = self.unwrap_or_fail(
            layers.to_gds_spec(&elem.layer),
            format!("no GDS spec found for layer spec {:?}", elem.layer),
        )?;
        drop(layers);
        self.export_shape(&elem.inner, spec.into())
    }

    /// Converts a [`Shape`] to a [`gds21::GdsElement`].
    ///
    /// GDS boundaries include an explicit repetition of their origin for
    /// closure, so an N-sided polygon is described by an (N+1)-point vector.
    fn export_shape(
        &mut self,
        shape: &Shape,
        layerspec: gds21::GdsLayerSpec,
    ) -> LayoutResult<gds21::GdsElement> {
        let vertices = shape.vertices();
        if vertices.len() < 3 {
            return self.export_err("boundary with fewer than 3 vertices");
        }
        let mut xy = vertices
            .iter()
            .map(|p| self.export_point(*p))
            .collect::<Result<Vec<_>, _>>()?;
        // Repeat the origin to close the boundary.
        xy.push(self.export_point(vertices[0])?);
        Ok(gds21::GdsBoundary {
            layer: layerspec.layer,
            datatype: layerspec.xtype,
            xy,
            ..Default::default()
        }
        .into())
    }

    /// Converts a [`TextElement`] to a [`gds21::GdsElement`].
    fn export_annotation(&mut self, annotation: &TextElement) -> LayoutResult<gds21::GdsElement> {
        let layers = self.layers.read().unwrap();
        let spec = self.unwrap_or_fail(
            layers.to_gds_spec(&annotation.layer),
            format!("no GDS spec found for layer spec {:?}", annotation.layer),
        )?;
        drop(layers);
        Ok(gds21::GdsTextElem {
            string: annotation.string.to_string(),
            layer: spec.0,
            texttype: spec.1,
            xy: self.export_point(annotation.loc)?,
            ..Default::default()
        }
        .into())
    }

    /// Converts a [`Port`] to its GDS representation: a pin rectangle
    /// extending into the cell plus a label at the midpoint.
    ///
    /// Ports are skipped if the technology declares no port layer.
    fn export_port(&mut self, port: &Port) -> LayoutResult<Vec<gds21::GdsElement>> {
        let layers = self.layers.read().unwrap();
        let Some(port_layer) = layers.port_layer() else {
            return Ok(Vec::new());
        };
        let info = self.unwrap_or_fail(layers.get(port_layer), "invalid port layer key")?;
        let pin_spec = info.spec(LayerPurpose::Pin);
        let label_spec = info.spec(LayerPurpose::Label);
        drop(layers);

        let mut elems = Vec::new();
        if let Some(pin) = pin_spec {
            // The pin is drawn in the port's local frame (facing 0 degrees,
            // midpoint at the origin) and transformed into place.
            let w = port.width();
            let local = Shape::Rect(Rect::from_spans(
                Span::new(-PORT_PIN_DEPTH, 0),
                Span::new(-(w / 2), w - w / 2),
            ));
            let trans = Transformation::with_loc_and_orientation(
                port.midpoint(),
                Orientation::from_angle(port.orientation()),
            );
            elems.push(self.export_shape(&local.transform(trans), pin.into())?);
        }
        if let Some(label) = label_spec {
            elems.push(
                gds21::GdsTextElem {
                    string: port.name().to_string(),
                    layer: label.0,
                    texttype: label.1,
                    xy: self.export_point(port.midpoint())?,
                    ..Default::default()
                }
                .into(),
            );
        }
        Ok(elems)
    }

    /// Converts a [`Point`] to a [`gds21::GdsPoint`], converting to 32 bits
    /// along the way.
    fn export_point(&self, p: Point) -> Result<gds21::GdsPoint, std::num::TryFromIntError> {
        let x = p.x.try_into()?;
        let y = p.y.try_into()?;
        Ok(gds21::GdsPoint::new(x, y))
    }
}

impl<'a> ErrorHelper for GdsImporter<'a> {
    fn backtrace(&self) -> Vec<ErrorContext> {
        self.backtrace.clone()
    }
}

impl<'a> GdsImporter<'a> {
    pub(crate) fn new(data: &'a mut LumenData) -> Self {
        Self {
            data,
            backtrace: Vec::new(),
            unsupported: Vec::new(),
            cell_map: CellMap::new(),
        }
    }

    /// Imports every struct in `gdslib`.
    fn import_all(&mut self, gdslib: &gds21::GdsLibrary) -> LayoutResult<()> {
        self.backtrace.push(ErrorContext::Library);
        self.validate_units(gdslib)?;

        // Structs may reference each other in any order; resolve children
        // before parents, failing if a pass makes no progress.
        let mut pending: Vec<&gds21::GdsStruct> = gdslib.structs.iter().collect();
        while !pending.is_empty() {
            let mut next = Vec::new();
            let mut progress = false;
            for strukt in pending {
                if self.refs_resolved(strukt) {
                    let cell = self.import_cell(strukt)?;
                    self.cell_map.insert(cell.name().clone(), cell);
                    progress = true;
                } else {
                    next.push(strukt);
                }
            }
            if !progress {
                let names: Vec<_> = next.iter().map(|s| s.name.clone()).collect();
                return self.import_err(format!("unresolved cell references in {names:?}"));
            }
            pending = next;
        }
        self.backtrace.pop();
        Ok(())
    }

    fn validate_units(&mut self, gdslib: &gds21::GdsLibrary) -> LayoutResult<()> {
        self.backtrace.push(ErrorContext::Units);
        let dbunit = gdslib.units.db_unit();
        if (dbunit - 1e-9).abs() > 1e-12 {
            return self.import_err(format!(
                "unsupported GDSII database unit: {dbunit:10.3e} (expected 1 nm)"
            ));
        }
        self.backtrace.pop();
        Ok(())
    }

    /// Returns `true` if every struct reference in `strukt` has already been
    /// imported.
    fn refs_resolved(&self, strukt: &gds21::GdsStruct) -> bool {
        strukt.elems.iter().all(|elem| match elem {
            gds21::GdsElement::GdsStructRef(sref) => {
                self.cell_map.contains_key(sref.name.as_str())
            }
            _ => true,
        })
    }

    /// Imports a single GDS struct into a [`Cell`].
    fn import_cell(&mut self, strukt: &gds21::GdsStruct) -> LayoutResult<Arc<Cell>> {
        self.backtrace
            .push(ErrorContext::Cell(strukt.name.as_str().into()));
        let id = self.data.layouts_mut().gen_id();
        let mut cell = Cell::new(id);
        cell.set_name(strukt.name.as_str());

        for elem in &strukt.elems {
            use gds21::GdsElement::*;
            match elem {
                GdsBoundary(ref x) => {
                    let elem = self.import_boundary(x)?;
                    cell.add(elem);
                }
                GdsBox(ref x) => {
                    let elem = self.import_box(x)?;
                    cell.add(elem);
                }
                GdsStructRef(ref x) => {
                    let inst = self.import_instance(x)?;
                    cell.add_inst(inst);
                }
                GdsTextElem(ref x) => {
                    let text = self.import_text(x)?;
                    cell.add_annotation(text);
                }
                other => self.unsupported.push(other.clone()),
            }
        }

        cell.freeze();
        let cell = self.data.layouts_mut().set_cell(cell);
        self.backtrace.pop();
        Ok(cell)
    }

    /// Imports a [`gds21::GdsBoundary`] into an [`Element`].
    ///
    /// Four-point boundaries that form an axis-aligned rectangle import as
    /// [`Shape::Rect`]; everything else imports as a polygon.
    fn import_boundary(&mut self, x: &gds21::GdsBoundary) -> LayoutResult<Element> {
        self.backtrace.push(ErrorContext::Geometry);
        let mut pts: Vec<Point> = x
            .xy
            .iter()
            .map(|p| Point::new(p.x as i64, p.y as i64))
            .collect();
        if pts.is_empty() {
            return self.import_err("empty GDS boundary");
        }
        if pts.first() != pts.last() {
            return self.import_err("GDS boundary must start and end at the same point");
        }
        pts.pop();

        let inner = if pts.len() == 4 && is_axis_aligned_rect(&pts) {
            Shape::Rect(Rect::new(pts[0], pts[2]))
        } else {
            Shape::Polygon(lumgeom::Polygon::new(pts))
        };

        let layer = self.layer_spec(gds21::GdsLayerSpec {
            layer: x.layer,
            xtype: x.datatype,
        });
        self.backtrace.pop();
        Ok(Element { layer, inner })
    }

    /// Imports a [`gds21::GdsBox`] into an [`Element`].
    ///
    /// GDS stores five coordinates per box; the first and third are opposite
    /// corners.
    fn import_box(&mut self, x: &gds21::GdsBox) -> LayoutResult<Element> {
        self.backtrace.push(ErrorContext::Geometry);
        if x.xy.len() != 5 {
            return self.import_err("invalid GDS box coordinate count");
        }
        let p0 = Point::new(x.xy[0].x as i64, x.xy[0].y as i64);
        let p1 = Point::new(x.xy[2].x as i64, x.xy[2].y as i64);
        let layer = self.layer_spec(gds21::GdsLayerSpec {
            layer: x.layer,
            xtype: x.boxtype,
        });
        self.backtrace.pop();
        Ok(Element {
            layer,
            inner: Shape::Rect(Rect::new(p0, p1)),
        })
    }

    /// Imports a [`gds21::GdsStructRef`] into an [`Instance`].
    fn import_instance(&mut self, sref: &gds21::GdsStructRef) -> LayoutResult<Instance> {
        self.backtrace
            .push(ErrorContext::Instance(sref.name.as_str().into()));
        let cell = match self.cell_map.get(sref.name.as_str()) {
            Some(cell) => cell.clone(),
            None => return self.import_err(format!("reference to unknown cell {}", sref.name)),
        };
        let mut orientation = Orientation::identity();
        if let Some(ref strans) = sref.strans {
            if strans.abs_mag || strans.abs_angle {
                return self.import_err("unsupported GDSII instance: absolute transform");
            }
            if strans.mag.is_some() {
                return self.import_err("unsupported GDSII instance: magnification");
            }
            orientation.reflect_vert = strans.reflected;
            orientation.angle = strans.angle.unwrap_or(0.0);
        }
        let mut inst = Instance::new(cell);
        inst.set_loc(Point::new(sref.xy.x as i64, sref.xy.y as i64));
        inst.set_orientation(orientation);
        self.backtrace.pop();
        Ok(inst)
    }

    /// Imports a [`gds21::GdsTextElem`] into a [`TextElement`] annotation.
    fn import_text(&mut self, x: &gds21::GdsTextElem) -> LayoutResult<TextElement> {
        self.backtrace.push(ErrorContext::Annotations);
        let layer = self.layer_spec(gds21::GdsLayerSpec {
            layer: x.layer,
            xtype: x.texttype,
        });
        self.backtrace.pop();
        Ok(TextElement {
            string: x.string.as_str().into(),
            loc: Point::new(x.xy.x as i64, x.xy.y as i64),
            layer,
        })
    }

    /// Resolves a GDS layer spec against the context's layer table, creating
    /// an ad-hoc layer for unknown specs.
    fn layer_spec(&mut self, spec: gds21::GdsLayerSpec) -> crate::layout::layers::LayerSpec {
        let layers = self.data.layers();
        let mut layers = layers.write().unwrap();
        let (key, purpose) = layers.get_or_insert_spec(spec.into());
        crate::layout::layers::LayerSpec::new(key, purpose)
    }
}

fn is_axis_aligned_rect(pts: &[Point]) -> bool {
    debug_assert_eq!(pts.len(), 4);
    (pts[0].x == pts[1].x // Clockwise
        && pts[1].y == pts[2].y
        && pts[2].x == pts[3].x
        && pts[3].y == pts[0].y)
        || (pts[0].y == pts[1].y // Counter-clockwise
            && pts[1].x == pts[2].x
            && pts[2].y == pts[3].y
            && pts[3].x == pts[0].x)
}

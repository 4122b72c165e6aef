//! The global context: technology data plus the cache of generated cells.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::deps::arcstr::ArcStr;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::generation::{GeneratedCheck, GenerationMap, ParamKey};
use crate::io::create_dir_all;
use crate::layout::cell::{Cell, CellKey, Instance};
use crate::layout::context::LayoutCtx;
use crate::layout::layers::Layers;

/// A description of the fabrication technology: name, grid resolution, and
/// layer set.
///
/// Database units are nanometers; `grid` is the fabrication grid in database
/// units. All drawn coordinates must be multiples of `grid`.
#[derive(Debug, Clone)]
pub struct Technology {
    pub name: ArcStr,
    pub grid: i64,
    pub layers: Layers,
}

impl Technology {
    /// A generic silicon-photonics technology with a 1 nm grid and the
    /// standard photonic layer set.
    pub fn silicon_photonics() -> Self {
        Self {
            name: arcstr::literal!("generic_si_photonics"),
            grid: 1,
            layers: Layers::photonic(),
        }
    }
}

impl Default for Technology {
    fn default() -> Self {
        Self::silicon_photonics()
    }
}

/// On-disk form of a [`Technology`] override, loadable from TOML.
///
/// Only the name and grid can be overridden from configuration files; custom
/// layer tables are constructed programmatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnologyConfig {
    pub name: String,
    /// Fabrication grid, in nanometers.
    pub grid: i64,
}

impl TechnologyConfig {
    /// Builds a [`Technology`] from this override, using the standard
    /// photonic layer set.
    pub fn to_technology(&self) -> Technology {
        Technology {
            name: self.name.as_str().into(),
            grid: self.grid,
            layers: Layers::photonic(),
        }
    }
}

/// Configuration for a [`LumenCtx`].
pub struct LumenConfig {
    pub technology: Technology,
}

impl LumenConfig {
    #[inline]
    pub fn builder() -> LumenConfigBuilder {
        LumenConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct LumenConfigBuilder {
    pub technology: Option<Technology>,
}

impl LumenConfigBuilder {
    pub fn technology(&mut self, technology: Technology) -> &mut Self {
        self.technology = Some(technology);
        self
    }

    pub fn build(&mut self) -> LumenConfig {
        LumenConfig {
            technology: self.technology.take().unwrap_or_default(),
        }
    }
}

pub(crate) struct LumenData {
    technology: Technology,
    layers: Arc<RwLock<Layers>>,
    layouts: LayoutData,
}

/// Cell data for a context.
pub(crate) struct LayoutData {
    cells: GenerationMap<ParamKey, CellKey, Cell>,
}

impl LayoutData {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            cells: GenerationMap::new(),
        }
    }

    /// Returns the generated cell if it already exists, or reserves an ID.
    pub(crate) fn get_generated_cell<T>(
        &mut self,
        params: &T::Params,
    ) -> GeneratedCheck<Arc<Cell>, CellKey>
    where
        T: Component,
    {
        self.cells.get(ParamKey::from_params::<T>(params))
    }

    /// Stores a generated cell under its reserved ID.
    pub(crate) fn set_cell(&mut self, cell: Cell) -> Arc<Cell> {
        self.cells.set(cell.id(), cell.name().clone(), cell)
    }

    /// Generates a fresh [`CellKey`], allowing a new cell to be created.
    pub(crate) fn gen_id(&mut self) -> CellKey {
        self.cells.gen_id()
    }

    /// Allocates an unused cell name derived from the given base name.
    pub(crate) fn alloc_name(&self, base_name: impl Into<ArcStr>) -> ArcStr {
        self.cells.alloc_name(base_name)
    }

    /// Returns an iterator over the cells in the map, in generation order.
    pub(crate) fn cells(&self) -> impl Iterator<Item = &Arc<Cell>> {
        self.cells.values()
    }
}

impl LumenData {
    pub(crate) fn from_config(cfg: LumenConfig) -> Result<Self> {
        Ok(Self {
            layers: Arc::new(RwLock::new(cfg.technology.layers.clone())),
            technology: cfg.technology,
            layouts: LayoutData::new(),
        })
    }

    #[inline]
    pub(crate) fn layouts(&self) -> &LayoutData {
        &self.layouts
    }

    #[inline]
    pub(crate) fn layouts_mut(&mut self) -> &mut LayoutData {
        &mut self.layouts
    }

    #[inline]
    pub(crate) fn layers(&self) -> Arc<RwLock<Layers>> {
        self.layers.clone()
    }

    #[inline]
    pub(crate) fn technology(&self) -> &Technology {
        &self.technology
    }
}

/// The global context, cheaply cloneable and shareable.
#[derive(Clone)]
pub struct LumenCtx {
    inner: Arc<RwLock<LumenData>>,
}

impl LumenCtx {
    /// Creates a context from a configuration.
    pub fn from_config(cfg: LumenConfig) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(RwLock::new(LumenData::from_config(cfg)?)),
        })
    }

    /// Creates a context with the default silicon-photonics technology.
    pub fn new() -> Result<Self> {
        Self::from_config(LumenConfig::builder().build())
    }

    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<LumenData> {
        self.inner.read().unwrap()
    }

    #[inline]
    pub(crate) fn write(&self) -> RwLockWriteGuard<LumenData> {
        self.inner.write().unwrap()
    }

    /// The fabrication grid resolution, in database units.
    pub fn grid(&self) -> i64 {
        self.read().technology().grid
    }

    /// The name of the configured technology.
    pub fn technology_name(&self) -> ArcStr {
        self.read().technology().name.clone()
    }

    /// The context's layer set.
    pub fn raw_layers(&self) -> Arc<RwLock<Layers>> {
        self.read().layers()
    }

    /// Instantiates a layout of component `T` with params `params`.
    ///
    /// The cell is generated on first use; subsequent instantiations with
    /// identical parameters share the same [`Cell`].
    pub fn instantiate<T>(&self, params: &T::Params) -> Result<Instance>
    where
        T: Component,
    {
        let check = {
            let mut inner = self.write();
            inner.layouts_mut().get_generated_cell::<T>(params)
        };

        Ok(match check {
            GeneratedCheck::Exists(cell) => Instance::new(cell),
            GeneratedCheck::MustGenerate(id) => {
                let cell = self.generate_layout::<T>(params, id)?;
                Instance::new(cell)
            }
        })
    }

    /// Writes the layout of component `T` to a GDS file at `path`.
    pub fn write_layout<T>(&self, params: &T::Params, path: impl AsRef<Path>) -> Result<()>
    where
        T: Component,
    {
        let path = path.as_ref();

        let inner = || -> Result<()> {
            let inst = self.instantiate::<T>(params)?;
            let top = inst.cell().clone();
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            self.to_gds_with_top(top, path)?;
            Ok(())
        };

        with_err_context(inner(), || {
            ErrorContext::Task(arcstr::format!("writing layout to file {:?}", path))
        })
    }

    /// Writes an already generated cell to a GDS file at `path`.
    pub fn write_cell(&self, cell: Arc<Cell>, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let inner = || -> Result<()> {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            self.to_gds_with_top(cell.clone(), path)?;
            Ok(())
        };
        with_err_context(inner(), || {
            ErrorContext::Task(arcstr::format!("writing cell to file {:?}", path))
        })
    }

    pub(crate) fn init_component<T>(&self, params: &T::Params) -> Result<T>
    where
        T: Component,
    {
        let component = with_err_context(T::new(params, self), || ErrorContext::InitComponent {
            type_name: std::any::type_name::<T>().into(),
        })?;
        Ok(component)
    }

    pub(crate) fn generate_layout<T>(&self, params: &T::Params, id: CellKey) -> Result<Arc<Cell>>
    where
        T: Component,
    {
        let mut ctx = LayoutCtx {
            inner: self.clone(),
            cell: Cell::new(id),
        };
        let component = self.init_component::<T>(params)?;
        let name = {
            let inner = self.read();
            inner.layouts().alloc_name(component.name())
        };
        ctx.cell.set_name(name.clone());
        with_err_context(component.layout(&mut ctx), || ErrorContext::GenComponent {
            name,
            type_name: std::any::type_name::<T>().into(),
        })?;
        ctx.cell.freeze();

        // Now that the cell is frozen, mark `ctx` as immutable
        // so we don't accidentally modify the cell in any way.
        let ctx = ctx;

        let cell = {
            let mut inner = self.write();
            inner.layouts_mut().set_cell(ctx.cell)
        };

        Ok(cell)
    }

    /// Returns the names of all cells generated in this context so far.
    pub fn cell_names(&self) -> Vec<ArcStr> {
        let inner = self.read();
        inner.layouts().cells().map(|c| c.name().clone()).collect()
    }
}

/// A handle to cells imported from a GDS file: a map from cell name to cell.
pub type CellMap = HashMap<ArcStr, Arc<Cell>>;

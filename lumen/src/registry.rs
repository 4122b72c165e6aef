//! The component factory registry.
//!
//! A [`ComponentRegistry`] maps component-type names to factories, so batch
//! operations (locking, regression reports) can enumerate every known
//! component. Registries are explicitly constructed values, created for and
//! passed into each batch run; there is no process-wide registry.

use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;
use serde::Serialize;

use crate::component::Component;
use crate::data::LumenCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::layout::cell::Cell;

type Factory = Box<dyn Fn(&LumenCtx) -> Result<Arc<Cell>> + Send + Sync>;

struct RegistryEntry {
    factory: Factory,
    /// The registered parameters, serialized for the settings sidecar and
    /// for settings diffs on hash mismatches.
    settings: serde_json::Value,
}

/// A mapping from component-type names to component factories.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: HashMap<ArcStr, RegistryEntry>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers component type `T` under `name`, to be built with `params`.
    ///
    /// Names are unique: registering a name twice is an error.
    pub fn register<T>(&mut self, name: impl Into<ArcStr>, params: T::Params) -> Result<()>
    where
        T: Component,
        T::Params: Serialize + Send + Sync + 'static,
    {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(ErrorSource::DuplicateComponentType(name).into());
        }
        let settings = serde_json::to_value(&params).map_err(ErrorSource::Json)?;
        let factory: Factory = Box::new(move |ctx: &LumenCtx| {
            let inst = ctx.instantiate::<T>(&params)?;
            Ok(inst.cell().clone())
        });
        self.entries.insert(name, RegistryEntry { factory, settings });
        Ok(())
    }

    /// Builds the component registered under `component_type`.
    ///
    /// Build failures are wrapped with the component type and the registry's
    /// known names, so one bad entry is diagnosable in batch output.
    pub fn build(&self, ctx: &LumenCtx, component_type: &str) -> Result<Arc<Cell>> {
        let entry = self
            .entries
            .get(component_type)
            .ok_or_else(|| ErrorSource::ComponentTypeNotFound(component_type.into()))?;
        with_err_context((entry.factory)(ctx), || ErrorContext::BuildRegistered {
            component_type: component_type.into(),
            available: self.names(),
        })
    }

    /// The settings the given component type was registered with.
    pub fn settings(&self, component_type: &str) -> Result<&serde_json::Value> {
        self.entries
            .get(component_type)
            .map(|e| &e.settings)
            .ok_or_else(|| ErrorSource::ComponentTypeNotFound(component_type.into()).into())
    }

    /// The registered component-type names, sorted.
    ///
    /// Batch operations iterate in this order, so their output is
    /// deterministic run to run.
    pub fn names(&self) -> Vec<ArcStr> {
        self.entries.keys().cloned().sorted().collect()
    }

    /// The number of registered component types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Creates a registry containing the default variant of every component
    /// factory in [`crate::components`].
    pub fn standard() -> Result<Self> {
        use crate::components::bend_circular::{BendCircular, BendCircularParams};
        use crate::components::coupler90::{Coupler90, Coupler90Biased, Coupler90Params};
        use crate::components::mmi2x2::{Mmi2x2, Mmi2x2Biased, Mmi2x2Params};
        use crate::components::rectangle::{Rectangle, RectangleParams};
        use crate::components::straight::{Straight, StraightParams};
        use crate::components::taper::{Taper, TaperParams};

        let mut registry = Self::new();
        registry.register::<Straight>("straight", StraightParams::default())?;
        registry.register::<BendCircular>("bend_circular", BendCircularParams::default())?;
        registry.register::<Taper>("taper", TaperParams::default())?;
        registry.register::<Rectangle>("rectangle", RectangleParams::default())?;
        registry.register::<Coupler90>("coupler90", Coupler90Params::default())?;
        registry.register::<Coupler90Biased>("coupler90_biased", Default::default())?;
        registry.register::<Mmi2x2>("mmi2x2", Mmi2x2Params::default())?;
        registry.register::<Mmi2x2Biased>("mmi2x2_biased", Default::default())?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::straight::{Straight, StraightParams};

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ComponentRegistry::new();
        registry
            .register::<Straight>("straight", StraightParams::default())
            .unwrap();
        let err = registry
            .register::<Straight>("straight", StraightParams::default())
            .unwrap_err();
        assert!(matches!(
            err.source(),
            ErrorSource::DuplicateComponentType(_)
        ));
    }

    #[test]
    fn missing_type_is_an_error() {
        let registry = ComponentRegistry::new();
        let ctx = LumenCtx::new().unwrap();
        let err = registry.build(&ctx, "nonexistent").unwrap_err();
        assert!(matches!(
            err.source(),
            ErrorSource::ComponentTypeNotFound(_)
        ));
    }

    #[test]
    fn standard_registry_builds_every_entry() {
        let registry = ComponentRegistry::standard().unwrap();
        let ctx = LumenCtx::new().unwrap();
        for name in registry.names() {
            let cell = registry.build(&ctx, &name).unwrap();
            assert!(
                !cell.name().is_empty(),
                "component {name} produced an unnamed cell"
            );
        }
    }
}

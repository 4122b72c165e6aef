//! APIs for defining parametric layout components.

use std::any::Any;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::data::LumenCtx;
use crate::error::Result;
use crate::layout::context::LayoutCtx;

pub mod error;

/// The trait implemented by every component factory.
///
/// A component is constructed from its parameters and a context, and then
/// asked to generate its layout. Construction must be pure: the same
/// parameters always produce the same name, the same geometry, and the same
/// ports.
pub trait Component: Any {
    /// The parameter type.
    ///
    /// Parameters are serialized both for cell-reuse keys and for the
    /// settings sidecar written next to locked GDS files, so they must be
    /// plain data.
    type Params: Serialize;

    /// Creates a new instance of this component with the given parameters.
    ///
    /// Derived dimensions should be snapped to the technology grid here,
    /// so that [`Component::name`] and [`Component::layout`] agree on the
    /// values actually drawn.
    fn new(params: &Self::Params, ctx: &LumenCtx) -> Result<Self>
    where
        Self: Sized;

    /// Returns the name of this component, derived from the factory name and
    /// the (snapped) parameter values.
    ///
    /// The name becomes the GDS cell name and must be a valid GDSII
    /// identifier. Two different parameter sets must produce two different
    /// names.
    fn name(&self) -> ArcStr {
        arcstr::literal!("unnamed")
    }

    /// Generates the layout of this component.
    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()>;
}

/// An empty type for components that are not parametrized.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub struct NoParams;

/// Uses [`flexbuffers`] to serialize component parameters.
///
/// Used to key the cell-generation cache.
pub(crate) fn serialize_params<T>(x: &T) -> Vec<u8>
where
    T: Serialize,
{
    let mut s = flexbuffers::FlexbufferSerializer::new();
    x.serialize(&mut s).unwrap();
    s.take_buffer()
}

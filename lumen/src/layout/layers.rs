//! Process-layer management.
//!
//! Layers are registered in a [`Layers`] table owned by the context's
//! technology description. Each layer carries one GDS (layer, datatype) pair
//! per [`LayerPurpose`] it supports.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::deps::arcstr::ArcStr;

new_key_type! {
    /// A unique identifier for a process layer.
    pub struct LayerKey;
}

/// A GDS layer specification: GDSII layer number and datatype.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct GdsLayerSpec(pub i16, pub i16);

impl From<gds21::GdsLayerSpec> for GdsLayerSpec {
    fn from(other: gds21::GdsLayerSpec) -> Self {
        Self(other.layer, other.xtype)
    }
}

#[allow(clippy::from_over_into)]
impl Into<gds21::GdsLayerSpec> for GdsLayerSpec {
    fn into(self) -> gds21::GdsLayerSpec {
        gds21::GdsLayerSpec {
            layer: self.0,
            xtype: self.1,
        }
    }
}

/// An enumeration of layer purposes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Ord, PartialOrd, PartialEq, Eq, Hash)]
pub enum LayerPurpose {
    /// Drawn geometry.
    Drawing,
    /// Port pin markers.
    Pin,
    /// Text labels (port names, annotations).
    Label,
}

/// A (layer, purpose) pair identifying where an element is drawn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LayerSpec(LayerKey, LayerPurpose);

impl LayerSpec {
    #[inline]
    pub fn new(layer: LayerKey, purpose: LayerPurpose) -> Self {
        Self(layer, purpose)
    }

    /// The drawing spec for the given layer.
    #[inline]
    pub fn drawing(layer: LayerKey) -> Self {
        Self(layer, LayerPurpose::Drawing)
    }

    #[inline]
    pub fn layer(&self) -> LayerKey {
        self.0
    }

    #[inline]
    pub fn purpose(&self) -> LayerPurpose {
        self.1
    }
}

/// Information about a process layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    /// The layer's name.
    pub name: ArcStr,
    purposes: Vec<(LayerPurpose, GdsLayerSpec)>,
}

impl LayerInfo {
    /// Creates a new layer with no purposes.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            purposes: Vec::new(),
        }
    }

    /// Adds a GDS spec for the given purpose, consuming and returning `self`
    /// for chaining.
    pub fn with_spec(mut self, purpose: LayerPurpose, spec: GdsLayerSpec) -> Self {
        self.purposes.push((purpose, spec));
        self
    }

    /// The GDS spec associated with `purpose`, if any.
    pub fn spec(&self, purpose: LayerPurpose) -> Option<GdsLayerSpec> {
        self.purposes
            .iter()
            .find(|(p, _)| *p == purpose)
            .map(|(_, s)| *s)
    }
}

/// The set of layers known to a technology.
#[derive(Debug, Default, Clone)]
pub struct Layers {
    slots: SlotMap<LayerKey, LayerInfo>,
    by_name: HashMap<ArcStr, LayerKey>,
    by_spec: HashMap<GdsLayerSpec, (LayerKey, LayerPurpose)>,
    /// The layer on which component ports are exported.
    port_layer: Option<LayerKey>,
}

impl Layers {
    /// Creates an empty layer set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the standard silicon-photonics layer set.
    ///
    /// The waveguide layer is GDS (1, 0), with port pins on (1, 10) and port
    /// labels on (66, 0).
    pub fn photonic() -> Self {
        let mut layers = Self::new();
        let wg = layers.add(
            LayerInfo::new("wg")
                .with_spec(LayerPurpose::Drawing, GdsLayerSpec(1, 0))
                .with_spec(LayerPurpose::Pin, GdsLayerSpec(1, 10))
                .with_spec(LayerPurpose::Label, GdsLayerSpec(66, 0)),
        );
        layers.add(LayerInfo::new("text").with_spec(LayerPurpose::Drawing, GdsLayerSpec(66, 0)));
        layers.set_port_layer(wg);
        layers
    }

    /// Adds a layer to the set, returning its key.
    pub fn add(&mut self, info: LayerInfo) -> LayerKey {
        let name = info.name.clone();
        let purposes: Vec<_> = info.purposes.clone();
        let key = self.slots.insert(info);
        self.by_name.insert(name, key);
        for (purpose, spec) in purposes {
            self.by_spec.entry(spec).or_insert((key, purpose));
        }
        key
    }

    /// Gets the information associated with a layer key.
    pub fn get(&self, key: LayerKey) -> Option<&LayerInfo> {
        self.slots.get(key)
    }

    /// Looks up a layer by name.
    pub fn get_by_name(&self, name: &str) -> Option<LayerKey> {
        self.by_name.get(name).copied()
    }

    /// Looks up the layer and purpose associated with a GDS spec.
    pub fn get_from_spec(&self, spec: GdsLayerSpec) -> Option<(LayerKey, LayerPurpose)> {
        self.by_spec.get(&spec).copied()
    }

    /// Looks up the layer for a GDS spec, creating an ad-hoc drawing layer if
    /// the spec is unknown.
    ///
    /// Used when importing GDS files that reference layers outside the
    /// technology's table.
    pub fn get_or_insert_spec(&mut self, spec: GdsLayerSpec) -> (LayerKey, LayerPurpose) {
        if let Some(found) = self.get_from_spec(spec) {
            return found;
        }
        let name = arcstr::format!("gds_{}_{}", spec.0, spec.1);
        let key = self.add(LayerInfo::new(name).with_spec(LayerPurpose::Drawing, spec));
        (key, LayerPurpose::Drawing)
    }

    /// Converts a [`LayerSpec`] into its corresponding [`GdsLayerSpec`].
    pub fn to_gds_spec(&self, spec: &LayerSpec) -> Option<GdsLayerSpec> {
        self.get(spec.layer()).and_then(|info| info.spec(spec.purpose()))
    }

    /// The layer on which ports are exported.
    pub fn port_layer(&self) -> Option<LayerKey> {
        self.port_layer
    }

    /// Sets the layer on which ports are exported.
    pub fn set_port_layer(&mut self, key: LayerKey) {
        self.port_layer = Some(key);
    }
}

//! Named fabrication layers and their GDS numbers.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::deps::arcstr::ArcStr;
use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::io::read_to_string;

/// Bottom-gate metal.
pub const GATE: &str = "gate";
/// Openings in the gate dielectric.
pub const VIA: &str = "via";
/// Source/drain metal.
pub const SOURCEDRAIN: &str = "sourcedrain";
/// Semiconductor islands.
pub const MESA: &str = "mesa";
/// First metal of the back-gate process.
pub const W1: &str = "w1";
/// Second metal of the back-gate process.
pub const W2: &str = "w2";

/// Layer used for wafer outlines and die frames.
pub const OUTLINE_LAYER: GdsLayerSpec = GdsLayerSpec(255, 0);

/// A GDS layer/datatype pair.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct GdsLayerSpec(pub i16, pub i16);

impl GdsLayerSpec {
    #[inline]
    pub fn layer(&self) -> i16 {
        self.0
    }

    #[inline]
    pub fn datatype(&self) -> i16 {
        self.1
    }

    /// The tone in which this layer is written on the mask.
    #[inline]
    pub fn tone(&self) -> Tone {
        Tone::of(*self)
    }
}

impl From<gds21::GdsLayerSpec> for GdsLayerSpec {
    fn from(other: gds21::GdsLayerSpec) -> Self {
        Self(other.layer, other.xtype)
    }
}

impl From<GdsLayerSpec> for gds21::GdsLayerSpec {
    fn from(spec: GdsLayerSpec) -> Self {
        Self {
            layer: spec.0,
            xtype: spec.1,
        }
    }
}

/// Mask polarity of a layer.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Tone {
    /// Drawn shapes are what remains; the mask is written inverted inside each device area.
    Positive,
    /// Drawn shapes are written as-is.
    Negative,
}

impl Tone {
    /// Even GDS layer numbers are positive tone, odd ones negative.
    pub fn of(spec: GdsLayerSpec) -> Self {
        if spec.0 % 2 == 0 {
            Tone::Positive
        } else {
            Tone::Negative
        }
    }
}

/// A named layer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub name: ArcStr,
    pub spec: GdsLayerSpec,
    pub description: ArcStr,
}

#[derive(Deserialize)]
struct CsvLayerRecord {
    name: String,
    layer: i16,
    datatype: i16,
    #[serde(default)]
    description: String,
}

/// An ordered set of named layers.
///
/// Iteration follows insertion order, which chip generators rely on
/// when laying out per-layer test structures.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct LayerSet {
    layers: Vec<LayerInfo>,
    names: HashMap<ArcStr, usize>,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four layers of the standard bottom-gate process.
    pub fn standard() -> Self {
        let mut layers = Self::new();
        layers.add(GATE, GdsLayerSpec(1, 0), "bottom gate metal");
        layers.add(VIA, GdsLayerSpec(2, 0), "gate dielectric opening");
        layers.add(SOURCEDRAIN, GdsLayerSpec(3, 0), "source/drain metal");
        layers.add(MESA, GdsLayerSpec(4, 0), "semiconductor mesa");
        layers
    }

    /// The three layers of the back-gate process.
    pub fn back_gate() -> Self {
        let mut layers = Self::new();
        layers.add(W1, GdsLayerSpec(1, 0), "gate metal");
        layers.add(W2, GdsLayerSpec(3, 0), "source/drain metal");
        layers.add(MESA, GdsLayerSpec(5, 0), "semiconductor mesa");
        layers
    }

    /// Adds a layer, replacing any existing layer with the same name.
    pub fn add(
        &mut self,
        name: impl Into<ArcStr>,
        spec: GdsLayerSpec,
        description: impl Into<ArcStr>,
    ) {
        let name = name.into();
        let info = LayerInfo {
            name: name.clone(),
            spec,
            description: description.into(),
        };
        if let Some(&idx) = self.names.get(&name) {
            self.layers[idx] = info;
        } else {
            self.names.insert(name, self.layers.len());
            self.layers.push(info);
        }
    }

    /// Parses a layer set from CSV text with columns `name,layer,datatype,description`.
    pub fn from_csv(csv: &str) -> std::result::Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(csv.as_bytes());
        let mut layers = Self::new();
        for record in reader.deserialize() {
            let record: CsvLayerRecord = record?;
            layers.add(
                record.name,
                GdsLayerSpec(record.layer, record.datatype),
                record.description,
            );
        }
        Ok(layers)
    }

    pub fn from_csv_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = read_to_string(path)?;
        with_err_context(Self::from_csv(&data), || {
            ErrorContext::ParseFile(path.to_path_buf())
        })
    }

    /// Looks up the GDS spec of the layer named `name`.
    pub fn get(&self, name: &str) -> Result<GdsLayerSpec> {
        Ok(self.info(name)?.spec)
    }

    pub fn info(&self, name: &str) -> Result<&LayerInfo> {
        self.names
            .get(name)
            .map(|&idx| &self.layers[idx])
            .ok_or_else(|| ErrorSource::LayerNotFound(name.to_string()).into())
    }

    /// Returns the position of the layer named `name` in insertion order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Returns the name of the layer drawn on `spec`, if any.
    pub fn name_of(&self, spec: GdsLayerSpec) -> Option<&ArcStr> {
        self.layers
            .iter()
            .find(|info| info.spec == spec)
            .map(|info| &info.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerInfo> {
        self.layers.iter()
    }

    pub fn specs(&self) -> Vec<GdsLayerSpec> {
        self.layers.iter().map(|info| info.spec).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layers_in_order() {
        let layers = LayerSet::standard();
        let names: Vec<_> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec![GATE, VIA, SOURCEDRAIN, MESA]);
        assert_eq!(layers.get(SOURCEDRAIN).unwrap(), GdsLayerSpec(3, 0));
        assert_eq!(layers.index_of(MESA), Some(3));
        assert!(layers.get("metal5").is_err());
    }

    #[test]
    fn tone_follows_layer_parity() {
        assert_eq!(GdsLayerSpec(1, 0).tone(), Tone::Negative);
        assert_eq!(GdsLayerSpec(2, 0).tone(), Tone::Positive);
        assert_eq!(LayerSet::back_gate().get(MESA).unwrap().tone(), Tone::Negative);
    }

    #[test]
    fn parses_csv() {
        let csv = "name,layer,datatype,description\n\
                   gate, 1, 0, bottom gate\n\
                   via,2,0,\n\
                   gate,11,0,overridden\n";
        let layers = LayerSet::from_csv(csv).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers.get(GATE).unwrap(), GdsLayerSpec(11, 0));
        assert_eq!(layers.index_of(GATE), Some(0));
        assert_eq!(layers.name_of(GdsLayerSpec(2, 0)).map(|n| n.as_str()), Some(VIA));
    }
}

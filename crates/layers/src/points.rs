use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use foundation::math::{LonLat, Mercator, lon_lat_to_mercator, resolution_for_zoom};
use streaming::PointRecord;

use crate::layer::{Layer, LayerId};
use crate::symbology::{PointStyle, parse_hex_color};

/// Renderable form of one [`PointRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub id: u64,
    pub lon_lat: LonLat,
    /// Projected position in EPSG:3857 meters.
    pub position: Mercator,
    pub color: Option<[f32; 4]>,
}

impl PointFeature {
    pub fn from_record(rec: &PointRecord) -> Self {
        let lon_lat = rec.lon_lat();
        Self {
            id: rec.id,
            lon_lat,
            position: lon_lat_to_mercator(lon_lat),
            color: rec.color.as_deref().and_then(parse_hex_color),
        }
    }
}

/// Immutable, shareable set of features.
///
/// Cloning is cheap; a layer swaps whole batches, never edits one in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureBatch {
    features: Arc<[PointFeature]>,
}

impl FeatureBatch {
    pub fn from_records(records: &[PointRecord]) -> Self {
        records.iter().map(PointFeature::from_record).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointFeature> {
        self.features.iter()
    }

    pub fn get(&self, index: usize) -> Option<&PointFeature> {
        self.features.get(index)
    }

    pub fn ptr_eq(&self, other: &FeatureBatch) -> bool {
        Arc::ptr_eq(&self.features, &other.features)
    }
}

impl FromIterator<PointFeature> for FeatureBatch {
    fn from_iter<T: IntoIterator<Item = PointFeature>>(iter: T) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

/// Anything that accepts a complete replacement of its point content.
pub trait FeatureSink {
    fn replace_features(&mut self, batch: FeatureBatch);
}

/// GPU instance record for one point, relative to a camera origin.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PointInstance {
    pub offset: [f32; 2],
    pub radius_px: f32,
    pub color: [f32; 4],
}

/// Overlay layer drawing every feature of the current batch as a circle.
#[derive(Debug, Clone)]
pub struct PointLayer {
    id: LayerId,
    style: PointStyle,
    content: FeatureBatch,
    generation: u64,
    hovered: Option<u64>,
}

impl PointLayer {
    pub fn new(id: u64, style: PointStyle) -> Self {
        Self {
            id: LayerId(id),
            style,
            content: FeatureBatch::default(),
            generation: 0,
            hovered: None,
        }
    }

    pub fn style(&self) -> &PointStyle {
        &self.style
    }

    /// Snapshot of the visible content.
    pub fn features(&self) -> FeatureBatch {
        self.content.clone()
    }

    /// Number of replacements applied so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_hovered(&mut self, id: Option<u64>) {
        self.hovered = id;
    }

    pub fn hovered(&self) -> Option<u64> {
        self.hovered
    }

    /// Build instance data for the current content.
    ///
    /// Offsets are computed in f64 against `origin` and only then narrowed, so
    /// points stay stable at street zoom far from the projection origin. The
    /// style's pixel displacement is converted to meters at `zoom`.
    pub fn instances(&self, zoom: f64, origin: Mercator) -> Vec<PointInstance> {
        let radius_px = self.style.radius_at(zoom);
        let res = resolution_for_zoom(zoom);
        let dx = origin.x - self.style.displacement[0] as f64 * res;
        let dy = origin.y - self.style.displacement[1] as f64 * res;
        self.content
            .iter()
            .map(|f| PointInstance {
                offset: [(f.position.x - dx) as f32, (f.position.y - dy) as f32],
                radius_px,
                color: self.style.fill_for(self.hovered == Some(f.id), f.color),
            })
            .collect()
    }
}

impl FeatureSink for PointLayer {
    fn replace_features(&mut self, batch: FeatureBatch) {
        self.content = batch;
        self.generation += 1;
        if let Some(id) = self.hovered {
            if !self.content.iter().any(|f| f.id == id) {
                self.hovered = None;
            }
        }
    }
}

impl Layer for PointLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn visible(&self) -> bool {
        self.style.opacity > 0.0
    }
}

// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed feature model and GeoJSON ingestion.
//!
//! Features are parsed once, when the dataset is fetched. Loosely typed
//! properties are normalized here so the filter and relationship layers
//! never look at raw JSON: timestamps become `DateTime<Utc>`, priorities
//! become [`Priority`], and every cross-reference field becomes an ordered
//! list of identifiers.

mod crossref;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use geojson::{GeoJson, JsonObject};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Property keys probed, in order, for a feature's timestamp.
const TIMESTAMP_KEYS: [&str; 3] = ["timestamp", "date_created", "acquisition_date"];

/// Property keys probed, in order, for a display name.
const NAME_KEYS: [&str; 4] = ["name", "title", "target_name", "layer_name"];

/// Errors that can occur while ingesting a dataset.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("invalid GeoJSON: {0}")]
    InvalidGeoJson(#[from] geojson::Error),

    #[error("expected a FeatureCollection, found {0}")]
    NotACollection(&'static str),
}

/// Discriminant carried in each feature's `type` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    /// Request for information.
    Rfi,
    /// Intelligence report.
    Report,
    /// Strategic target. Targets carry no timestamp.
    Target,
    /// Area boundary / imagery footprint.
    Layer,
}

impl FeatureKind {
    /// Parse the `type` property value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "RFI" | "Rfi" | "rfi" => Some(Self::Rfi),
            "Report" | "report" => Some(Self::Report),
            "Target" | "target" => Some(Self::Target),
            "Layer" | "layer" => Some(Self::Layer),
            _ => None,
        }
    }

    /// The canonical property value, as written in the dataset.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rfi => "RFI",
            Self::Report => "Report",
            Self::Target => "Target",
            Self::Layer => "Layer",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RFI priority tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("high") {
            Some(Self::High)
        } else if value.eq_ignore_ascii_case("medium") {
            Some(Self::Medium)
        } else if value.eq_ignore_ascii_case("low") {
            Some(Self::Low)
        } else {
            None
        }
    }
}

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lng: f64,
    pub lat: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [lng, lat, ..] if lng.is_finite() && lat.is_finite() => Some(Self::new(*lng, *lat)),
            _ => None,
        }
    }

    fn to_position(self) -> Vec<f64> {
        vec![self.lng, self.lat]
    }
}

/// Geometry category used by layer predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    Polygon,
}

impl GeometryKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::Polygon => "Polygon",
        }
    }
}

/// Supported feature geometries.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coordinate),
    /// Outer ring first, then holes.
    Polygon(Vec<Vec<Coordinate>>),
}

impl Geometry {
    #[must_use]
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::Polygon(_) => GeometryKind::Polygon,
        }
    }

    /// Representative point: the point itself, or the center of the outer
    /// ring's bounding box.
    #[must_use]
    pub fn anchor(&self) -> Option<Coordinate> {
        match self {
            Self::Point(c) => Some(*c),
            Self::Polygon(rings) => {
                let outer = rings.first().filter(|ring| !ring.is_empty())?;
                let (mut min_lng, mut max_lng) = (f64::INFINITY, f64::NEG_INFINITY);
                let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
                for c in outer {
                    min_lng = min_lng.min(c.lng);
                    max_lng = max_lng.max(c.lng);
                    min_lat = min_lat.min(c.lat);
                    max_lat = max_lat.max(c.lat);
                }
                Some(Coordinate::new(
                    (min_lng + max_lng) / 2.0,
                    (min_lat + max_lat) / 2.0,
                ))
            }
        }
    }

    fn from_geojson(geometry: &geojson::Geometry) -> Option<Self> {
        match &geometry.value {
            geojson::Value::Point(position) => Coordinate::from_position(position).map(Self::Point),
            geojson::Value::Polygon(rings) => {
                let rings: Option<Vec<Vec<Coordinate>>> = rings
                    .iter()
                    .map(|ring| ring.iter().map(|p| Coordinate::from_position(p)).collect())
                    .collect();
                rings.map(Self::Polygon)
            }
            _ => None,
        }
    }

    fn to_geojson(&self) -> geojson::Geometry {
        let value = match self {
            Self::Point(c) => geojson::Value::Point(c.to_position()),
            Self::Polygon(rings) => geojson::Value::Polygon(
                rings
                    .iter()
                    .map(|ring| ring.iter().map(|c| c.to_position()).collect())
                    .collect(),
            ),
        };
        geojson::Geometry::new(value)
    }
}

/// Normalized cross-reference lists.
///
/// Which lists are meaningful depends on the feature kind; see
/// [`crate::relations::related_ids`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossReferences {
    pub assigned_targets: Vec<String>,
    pub related_targets: Vec<String>,
    pub related_reports: Vec<String>,
    pub related_rfis: Vec<String>,
}

/// A single dataset record.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Identifier (the `id` property, falling back to the GeoJSON id).
    pub id: String,
    pub kind: FeatureKind,
    pub geometry: Geometry,
    pub name: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Report source tag ("System", "Legacy", ...).
    pub source: Option<String>,
    pub priority: Option<Priority>,
    pub references: CrossReferences,
    /// Raw properties, passed through to the renderer and detail cards.
    pub properties: JsonObject,
}

impl Feature {
    /// Display name, falling back to "<type> <id>".
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.kind, self.id))
    }

    #[must_use]
    pub fn anchor(&self) -> Option<Coordinate> {
        self.geometry.anchor()
    }

    fn from_geojson(feature: &geojson::Feature, index: usize) -> Option<Self> {
        let properties = feature.properties.clone().unwrap_or_default();

        let Some(kind) = properties
            .get("type")
            .and_then(Value::as_str)
            .and_then(FeatureKind::parse)
        else {
            debug!("Skipping feature {} without a known type", index);
            return None;
        };

        let Some(geometry) = feature.geometry.as_ref().and_then(Geometry::from_geojson) else {
            debug!("Skipping {} feature {} with unsupported geometry", kind, index);
            return None;
        };

        let id = properties
            .get("id")
            .and_then(value_as_id)
            .or_else(|| feature.id.as_ref().map(id_to_string))
            .unwrap_or_else(|| format!("feature-{index}"));

        let name = NAME_KEYS
            .iter()
            .find_map(|key| properties.get(*key).and_then(Value::as_str))
            .map(str::to_string);

        let timestamp = TIMESTAMP_KEYS
            .iter()
            .find_map(|key| properties.get(*key).and_then(Value::as_str).and_then(parse_timestamp));

        let source = properties
            .get("source")
            .and_then(Value::as_str)
            .map(str::to_string);

        let priority = properties
            .get("priority")
            .and_then(Value::as_str)
            .and_then(Priority::parse);

        let references = CrossReferences {
            assigned_targets: crossref::normalize(properties.get("assigned_targets"), "assigned_targets", &id),
            related_targets: crossref::normalize(properties.get("related_targets"), "related_targets", &id),
            related_reports: crossref::normalize(properties.get("related_reports"), "related_reports", &id),
            related_rfis: crossref::normalize(properties.get("related_rfis"), "related_rfis", &id),
        };

        Some(Self {
            id,
            kind,
            geometry,
            name,
            timestamp,
            source,
            priority,
            references,
            properties,
        })
    }

    fn to_geojson(&self) -> geojson::Feature {
        let mut properties = self.properties.clone();
        properties.insert("id".to_string(), Value::String(self.id.clone()));
        properties.insert("type".to_string(), Value::String(self.kind.as_str().to_string()));

        geojson::Feature {
            bbox: None,
            geometry: Some(self.geometry.to_geojson()),
            id: Some(geojson::feature::Id::String(self.id.clone())),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Immutable, cheaply clonable collection of features.
///
/// Features are shared behind `Arc`, so derived collections reuse the base
/// records while still being distinct collection objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    features: Vec<Arc<Feature>>,
}

impl FeatureCollection {
    #[must_use]
    pub fn new(features: Vec<Arc<Feature>>) -> Self {
        Self { features }
    }

    /// Parse a GeoJSON document. Records without a known `type` or with an
    /// unsupported geometry are skipped.
    pub fn from_geojson_str(text: &str) -> Result<Self, FeatureError> {
        let geojson: GeoJson = text.parse()?;
        Self::from_geojson(&geojson)
    }

    pub fn from_geojson(geojson: &GeoJson) -> Result<Self, FeatureError> {
        let collection = match geojson {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(_) => return Err(FeatureError::NotACollection("Feature")),
            GeoJson::Geometry(_) => return Err(FeatureError::NotACollection("Geometry")),
        };

        let features: Vec<Arc<Feature>> = collection
            .features
            .iter()
            .enumerate()
            .filter_map(|(index, feature)| Feature::from_geojson(feature, index))
            .map(Arc::new)
            .collect();

        let skipped = collection.features.len() - features.len();
        if skipped > 0 {
            warn!("Skipped {} of {} dataset records", skipped, collection.features.len());
        }

        Ok(Self { features })
    }

    /// Renderer-ready GeoJSON for a data source.
    #[must_use]
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        geojson::FeatureCollection {
            bbox: None,
            features: self.features.iter().map(|f| f.to_geojson()).collect(),
            foreign_members: None,
        }
    }

    #[must_use]
    pub fn features(&self) -> &[Arc<Feature>] {
        &self.features
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Feature>> {
        self.features.iter()
    }

    /// Find a feature by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<Feature>> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Find a feature by identifier and kind, as search results do.
    #[must_use]
    pub fn find(&self, id: &str, kind: FeatureKind) -> Option<&Arc<Feature>> {
        self.features.iter().find(|f| f.id == id && f.kind == kind)
    }

    #[must_use]
    pub fn count_kind(&self, kind: FeatureKind) -> usize {
        self.features.iter().filter(|f| f.kind == kind).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FromIterator<Arc<Feature>> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Arc<Feature>>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn id_to_string(id: &geojson::feature::Id) -> String {
    match id {
        geojson::feature::Id::String(s) => s.clone(),
        geojson::feature::Id::Number(n) => n.to_string(),
    }
}

/// Parse RFC 3339, naive ISO date-times (taken as UTC) and plain dates.
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

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

//! Layer descriptors.
//!
//! Catalog order is draw order: polygons first, points on top.

use geoint_features::{FeatureKind, GeometryKind};

use super::LayerGroup;
use crate::config::HighlightConfig;
use crate::surface::{LayerFilter, LayerKind, LayerSpec, StyleValue};

/// How a layer takes part in selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Not clickable, not highlighted
    Passive,
    /// Clickable point layer, wins over polygons
    Point,
    /// Clickable polygon fill
    Polygon,
    /// Polygon outline, highlighted but not clickable
    Outline,
}

/// Static description of one visual category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerDescriptor {
    pub id: &'static str,
    pub group: LayerGroup,
    pub kind: LayerKind,
    pub filter: LayerFilter,
    pub role: Role,
    /// Icon name for symbol layers
    pub icon: Option<&'static str>,
    pub color: &'static str,
}

pub static CATALOG: [LayerDescriptor; 8] = [
    LayerDescriptor {
        id: "heatmap",
        group: LayerGroup::Heatmap,
        kind: LayerKind::Heatmap,
        filter: LayerFilter::new(None, Some(GeometryKind::Point)),
        role: Role::Passive,
        icon: None,
        color: "#64748b",
    },
    LayerDescriptor {
        id: "rfi-polygons",
        group: LayerGroup::Rfi,
        kind: LayerKind::Fill,
        filter: LayerFilter::new(Some(FeatureKind::Rfi), Some(GeometryKind::Polygon)),
        role: Role::Polygon,
        icon: None,
        color: "#6366f1",
    },
    LayerDescriptor {
        id: "rfi-polygons-outline",
        group: LayerGroup::Rfi,
        kind: LayerKind::Line,
        filter: LayerFilter::new(Some(FeatureKind::Rfi), Some(GeometryKind::Polygon)),
        role: Role::Outline,
        icon: None,
        color: "#818cf8",
    },
    LayerDescriptor {
        id: "boundary-fill",
        group: LayerGroup::Layers,
        kind: LayerKind::Fill,
        filter: LayerFilter::new(Some(FeatureKind::Layer), Some(GeometryKind::Polygon)),
        role: Role::Polygon,
        icon: None,
        color: "#06b6d4",
    },
    LayerDescriptor {
        id: "boundary-outline",
        group: LayerGroup::Layers,
        kind: LayerKind::Line,
        filter: LayerFilter::new(Some(FeatureKind::Layer), Some(GeometryKind::Polygon)),
        role: Role::Outline,
        icon: None,
        color: "#22d3ee",
    },
    LayerDescriptor {
        id: "rfi-points",
        group: LayerGroup::Rfi,
        kind: LayerKind::Symbol,
        filter: LayerFilter::new(Some(FeatureKind::Rfi), Some(GeometryKind::Point)),
        role: Role::Point,
        icon: Some("rfi-icon"),
        color: "#6366f1",
    },
    LayerDescriptor {
        id: "report-points",
        group: LayerGroup::Reports,
        kind: LayerKind::Symbol,
        filter: LayerFilter::new(Some(FeatureKind::Report), Some(GeometryKind::Point)),
        role: Role::Point,
        icon: Some("report-icon"),
        color: "#10b981",
    },
    LayerDescriptor {
        id: "target-points",
        group: LayerGroup::Targets,
        kind: LayerKind::Symbol,
        filter: LayerFilter::new(Some(FeatureKind::Target), Some(GeometryKind::Point)),
        role: Role::Point,
        icon: Some("target-icon"),
        color: "#f59e0b",
    },
];

#[must_use]
pub fn descriptor(id: &str) -> Option<&'static LayerDescriptor> {
    CATALOG.iter().find(|d| d.id == id)
}

/// Whether a property lives in the paint or layout section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertySection {
    Paint,
    Layout,
}

/// One highlight-controlled property.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledProperty {
    pub section: PropertySection,
    pub name: &'static str,
    pub value: StyleValue,
}

impl StyledProperty {
    pub(crate) fn paint(name: &'static str, value: StyleValue) -> Self {
        Self {
            section: PropertySection::Paint,
            name,
            value,
        }
    }

    pub(crate) fn layout(name: &'static str, value: StyleValue) -> Self {
        Self {
            section: PropertySection::Layout,
            name,
            value,
        }
    }
}

impl LayerDescriptor {
    /// Highlight-controlled properties at their construction baseline.
    ///
    /// `drawn_as` differs from `self.kind` when a symbol layer has been
    /// replaced by circles.
    #[must_use]
    pub fn baseline(&self, drawn_as: LayerKind, cfg: &HighlightConfig) -> Vec<StyledProperty> {
        match (self.role, drawn_as) {
            (Role::Point, LayerKind::Symbol) => vec![
                StyledProperty::paint("icon-opacity", StyleValue::Number(cfg.point_opacity)),
                StyledProperty::layout("icon-size", StyleValue::Number(cfg.icon_size)),
            ],
            (Role::Point, LayerKind::Circle) => vec![
                StyledProperty::paint("circle-opacity", StyleValue::Number(cfg.point_opacity)),
                StyledProperty::paint("circle-radius", StyleValue::Number(cfg.circle_radius)),
            ],
            (Role::Polygon, _) => vec![StyledProperty::paint(
                "fill-opacity",
                StyleValue::Number(cfg.fill_opacity),
            )],
            (Role::Outline, _) => vec![StyledProperty::paint(
                "line-color",
                StyleValue::color(self.color),
            )],
            _ => Vec::new(),
        }
    }

    /// Full layer spec. Symbol layers use `icon` as their image.
    #[must_use]
    pub fn spec(
        &self,
        source: &str,
        drawn_as: LayerKind,
        icon: Option<&str>,
        visible: bool,
        cfg: &HighlightConfig,
    ) -> LayerSpec {
        let mut paint: Vec<(&'static str, StyleValue)> = Vec::new();
        let mut layout: Vec<(&'static str, StyleValue)> =
            vec![("visibility", StyleValue::visibility(visible))];

        match drawn_as {
            LayerKind::Heatmap => {
                paint.push(("heatmap-opacity", StyleValue::Number(0.7)));
                paint.push(("heatmap-radius", StyleValue::Number(24.0)));
                paint.push(("heatmap-intensity", StyleValue::Number(1.0)));
            }
            LayerKind::Symbol => {
                if let Some(icon) = icon {
                    layout.push(("icon-image", StyleValue::Keyword(icon.to_string())));
                }
                layout.push(("icon-allow-overlap", StyleValue::Bool(true)));
            }
            LayerKind::Circle => {
                paint.push(("circle-color", StyleValue::color(self.color)));
                paint.push(("circle-stroke-color", StyleValue::color("#ffffff")));
                paint.push(("circle-stroke-width", StyleValue::Number(1.0)));
            }
            LayerKind::Fill => {
                paint.push(("fill-color", StyleValue::color(self.color)));
            }
            LayerKind::Line => {
                paint.push(("line-width", StyleValue::Number(2.0)));
            }
        }

        for property in self.baseline(drawn_as, cfg) {
            match property.section {
                PropertySection::Paint => paint.push((property.name, property.value)),
                PropertySection::Layout => layout.push((property.name, property.value)),
            }
        }

        LayerSpec {
            id: self.id.to_string(),
            kind: drawn_as,
            source: source.to_string(),
            filter: self.filter,
            paint,
            layout,
        }
    }
}

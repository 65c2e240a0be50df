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

//! Typed paint/layout values and layer specifications.
//!
//! Values stay typed inside the engine; renderer bindings turn them into
//! their own expression language with [`StyleValue::to_expression`], which
//! emits the Mapbox GL style-spec JSON form.

use std::collections::BTreeSet;
use std::sync::Arc;

use geoint_features::{FeatureKind, GeometryKind};
use serde_json::{json, Value};

/// A paint or layout property value.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Number(f64),
    Color(String),
    Bool(bool),
    /// Enumerated or named value (`"visible"`, an icon name, ...).
    Keyword(String),
    /// Per-feature choice keyed on the feature `id` property.
    Emphasis {
        ids: Arc<BTreeSet<String>>,
        matched: Box<StyleValue>,
        otherwise: Box<StyleValue>,
    },
}

impl StyleValue {
    #[must_use]
    pub fn color(value: &str) -> Self {
        Self::Color(value.to_string())
    }

    #[must_use]
    pub fn visibility(visible: bool) -> Self {
        Self::Keyword(if visible { "visible" } else { "none" }.to_string())
    }

    #[must_use]
    pub fn emphasis(ids: &Arc<BTreeSet<String>>, matched: StyleValue, otherwise: StyleValue) -> Self {
        Self::Emphasis {
            ids: Arc::clone(ids),
            matched: Box::new(matched),
            otherwise: Box::new(otherwise),
        }
    }

    /// The value a given feature ends up with.
    #[must_use]
    pub fn resolve(&self, feature_id: &str) -> &StyleValue {
        match self {
            Self::Emphasis {
                ids,
                matched,
                otherwise,
            } => {
                if ids.contains(feature_id) {
                    matched.resolve(feature_id)
                } else {
                    otherwise.resolve(feature_id)
                }
            }
            other => other,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Mapbox GL style-spec expression.
    #[must_use]
    pub fn to_expression(&self) -> Value {
        match self {
            Self::Number(n) => json!(n),
            Self::Color(c) | Self::Keyword(c) => json!(c),
            Self::Bool(b) => json!(b),
            Self::Emphasis {
                ids,
                matched,
                otherwise,
            } => {
                let ids: Vec<&String> = ids.iter().collect();
                json!([
                    "case",
                    ["in", ["get", "id"], ["literal", ids]],
                    matched.to_expression(),
                    otherwise.to_expression()
                ])
            }
        }
    }
}

/// Primitive a layer is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Heatmap,
    Symbol,
    Circle,
    Fill,
    Line,
}

impl LayerKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heatmap => "heatmap",
            Self::Symbol => "symbol",
            Self::Circle => "circle",
            Self::Fill => "fill",
            Self::Line => "line",
        }
    }
}

/// Feature predicate on `type` and geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerFilter {
    pub kind: Option<FeatureKind>,
    pub geometry: Option<GeometryKind>,
}

impl LayerFilter {
    #[must_use]
    pub const fn new(kind: Option<FeatureKind>, geometry: Option<GeometryKind>) -> Self {
        Self { kind, geometry }
    }

    #[must_use]
    pub fn to_expression(&self) -> Value {
        let mut clauses = vec![json!("all")];
        if let Some(kind) = self.kind {
            clauses.push(json!(["==", ["get", "type"], kind.as_str()]));
        }
        if let Some(geometry) = self.geometry {
            clauses.push(json!(["==", ["geometry-type"], geometry.as_str()]));
        }
        Value::Array(clauses)
    }
}

/// Everything a renderer needs to add a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    pub kind: LayerKind,
    pub source: String,
    pub filter: LayerFilter,
    pub paint: Vec<(&'static str, StyleValue)>,
    pub layout: Vec<(&'static str, StyleValue)>,
}

impl LayerSpec {
    #[must_use]
    pub fn paint(&self, name: &str) -> Option<&StyleValue> {
        self.paint.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn layout(&self, name: &str) -> Option<&StyleValue> {
        self.layout.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emphasis_resolves_per_feature() {
        let ids = Arc::new(BTreeSet::from(["T1".to_string()]));
        let value = StyleValue::emphasis(&ids, StyleValue::Number(1.0), StyleValue::Number(0.2));
        assert_eq!(value.resolve("T1").as_number(), Some(1.0));
        assert_eq!(value.resolve("T9").as_number(), Some(0.2));
    }

    #[test]
    fn test_emphasis_expression() {
        let ids = Arc::new(BTreeSet::from(["A".to_string(), "B".to_string()]));
        let value = StyleValue::emphasis(&ids, StyleValue::color("#fff"), StyleValue::color("#333"));
        assert_eq!(
            value.to_expression(),
            json!(["case", ["in", ["get", "id"], ["literal", ["A", "B"]]], "#fff", "#333"])
        );
    }

    #[test]
    fn test_filter_expression() {
        let filter = LayerFilter::new(Some(FeatureKind::Rfi), Some(GeometryKind::Polygon));
        assert_eq!(
            filter.to_expression(),
            json!(["all", ["==", ["get", "type"], "RFI"], ["==", ["geometry-type"], "Polygon"]])
        );
        assert_eq!(LayerFilter::new(None, None).to_expression(), json!(["all"]));
    }
}

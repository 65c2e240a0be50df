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

//! Relationship highlighting.
//!
//! Highlighting is a pure projection of [`SelectionState`] onto the
//! highlight-controlled properties of each data layer. With no selection the
//! projection is exactly the construction baseline, so clearing a selection
//! restores every layer.

use std::collections::BTreeSet;
use std::sync::Arc;

use geoint_features::{related_ids, Feature};
use log::debug;

use crate::config::HighlightConfig;
use crate::error::SurfaceError;
use crate::layers::{LayerDescriptor, LayerRegistry, PropertySection, Role, StyledProperty, CATALOG};
use crate::surface::{LayerKind, MapSurface, StyleValue};

/// The selected feature and the identifiers emphasized with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected: Option<String>,
    pub related: Arc<BTreeSet<String>>,
}

impl SelectionState {
    /// Select `feature`; related ids include its own.
    #[must_use]
    pub fn select(feature: &Feature) -> Self {
        Self {
            selected: Some(feature.id.clone()),
            related: Arc::new(related_ids(feature)),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.selected.is_some()
    }
}

/// Highlight-controlled properties of one layer for `selection`.
#[must_use]
pub fn layer_properties(
    layer: &LayerDescriptor,
    drawn_as: LayerKind,
    cfg: &HighlightConfig,
    selection: &SelectionState,
) -> Vec<StyledProperty> {
    if !selection.is_active() {
        return layer.baseline(drawn_as, cfg);
    }

    let ids = &selection.related;
    let pick = |matched: f64, otherwise: f64| {
        StyleValue::emphasis(ids, StyleValue::Number(matched), StyleValue::Number(otherwise))
    };

    match (layer.role, drawn_as) {
        (Role::Point, LayerKind::Symbol) => vec![
            StyledProperty::paint("icon-opacity", pick(cfg.emphasis_opacity, cfg.faded_opacity)),
            StyledProperty::layout("icon-size", pick(cfg.icon_size * cfg.emphasis_scale, cfg.icon_size)),
        ],
        (Role::Point, LayerKind::Circle) => vec![
            StyledProperty::paint("circle-opacity", pick(cfg.emphasis_opacity, cfg.faded_opacity)),
            StyledProperty::paint(
                "circle-radius",
                pick(cfg.circle_radius * cfg.emphasis_scale, cfg.circle_radius),
            ),
        ],
        (Role::Polygon, _) => vec![StyledProperty::paint(
            "fill-opacity",
            pick(cfg.fill_emphasis_opacity, cfg.fill_faded_opacity),
        )],
        (Role::Outline, _) => vec![StyledProperty::paint(
            "line-color",
            StyleValue::emphasis(
                ids,
                StyleValue::color(&cfg.outline_emphasis_color),
                StyleValue::color(&cfg.outline_faded_color),
            ),
        )],
        _ => Vec::new(),
    }
}

/// Push the projection of `selection` onto every installed data layer.
pub fn apply<S: MapSurface + ?Sized>(
    surface: &mut S,
    registry: &LayerRegistry,
    selection: &SelectionState,
) -> Result<(), SurfaceError> {
    for layer in &CATALOG {
        if !surface.has_layer(layer.id) {
            continue;
        }
        let properties = layer_properties(layer, registry.drawn_as(layer), registry.highlight(), selection);
        for property in properties {
            match property.section {
                PropertySection::Paint => {
                    surface.set_paint_property(layer.id, property.name, &property.value)?;
                }
                PropertySection::Layout => {
                    surface.set_layout_property(layer.id, property.name, &property.value)?;
                }
            }
        }
    }

    match &selection.selected {
        Some(id) => debug!("Highlighted {} with {} related features", id, selection.related.len()),
        None => debug!("Highlight cleared"),
    }
    Ok(())
}

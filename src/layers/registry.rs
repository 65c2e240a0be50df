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

//! Runtime registry of what has been installed on the current surface.
//!
//! A *generation* is one surface instance. Style swaps keep the generation
//! (listeners survive them) but discard sources, layers and images, so the
//! registry forgets those and re-adds them on the next [`LayerRegistry::ensure_layers`].
//! A rebuilt surface starts a new generation with empty state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use geoint_features::FeatureCollection;
use log::{debug, info, warn};

use super::catalog::{descriptor, LayerDescriptor, Role, CATALOG};
use super::{LayerGroup, LayerVisibility};
use crate::config::{EngineConfig, HighlightConfig, IconConfig};
use crate::error::SurfaceError;
use crate::surface::{
    IconImage, LayerKind, ListenerKind, MapSurface, RenderedFeature, ScreenPoint, StyleValue,
};

/// Per-generation bookkeeping.
#[derive(Debug, Default)]
pub struct LayerRuntimeState {
    pub generation: u64,
    pub data_loaded: bool,
    /// Icon names registered on the current style
    pub icons_loaded: HashSet<String>,
    pub click_handlers_attached: bool,
    pub last_installed: Option<Arc<FeatureCollection>>,
    /// Decoded images, reused when a style swap drops them from the renderer
    images: HashMap<String, IconImage>,
    /// Icons that failed to load on the current style
    failed_icons: HashSet<String>,
    /// Symbol layers redrawn as circles
    degraded: HashSet<&'static str>,
}

impl LayerRuntimeState {
    #[must_use]
    pub fn is_degraded(&self, layer_id: &str) -> bool {
        self.degraded.contains(layer_id)
    }
}

/// Result of resolving a map click against the interactive layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    Feature(RenderedFeature),
    Empty,
}

/// Installs the dataset source, data layers, icons and listeners.
#[derive(Debug)]
pub struct LayerRegistry {
    source_id: String,
    icons: Vec<IconConfig>,
    fallback_icon: String,
    highlight: HighlightConfig,
    state: LayerRuntimeState,
}

impl LayerRegistry {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            source_id: config.source_id.clone(),
            icons: config.icons.clone(),
            fallback_icon: config.fallback_icon.clone(),
            highlight: config.highlight.clone(),
            state: LayerRuntimeState::default(),
        }
    }

    pub fn state(&self) -> &LayerRuntimeState {
        &self.state
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn highlight(&self) -> &HighlightConfig {
        &self.highlight
    }

    /// Start a new generation after the surface was destroyed and recreated.
    pub fn reset_for_new_surface(&mut self) {
        let generation = self.state.generation + 1;
        self.state = LayerRuntimeState {
            generation,
            ..LayerRuntimeState::default()
        };
        debug!("Layer registry reset for surface generation {}", generation);
    }

    /// Forget renderer objects a style swap discards. Listeners survive.
    /// Icons that failed on the old style get another try.
    pub fn style_discarded(&mut self) {
        self.state.data_loaded = false;
        self.state.icons_loaded.clear();
        self.state.failed_icons.clear();
    }

    /// Primitive a descriptor is currently drawn with.
    #[must_use]
    pub fn drawn_as(&self, descriptor: &LayerDescriptor) -> LayerKind {
        if self.state.is_degraded(descriptor.id) {
            LayerKind::Circle
        } else {
            descriptor.kind
        }
    }

    /// Install `data` as the dataset source, replacing any previous contents.
    pub fn install_data<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        data: &Arc<FeatureCollection>,
    ) -> Result<(), SurfaceError> {
        let unchanged = self
            .state
            .last_installed
            .as_ref()
            .is_some_and(|last| Arc::ptr_eq(last, data));
        if self.state.data_loaded && unchanged && surface.has_source(&self.source_id) {
            debug!("Dataset already installed on '{}'", self.source_id);
            return Ok(());
        }

        if surface.has_source(&self.source_id) {
            surface.set_source_data(&self.source_id, data)?;
        } else {
            surface.add_source(&self.source_id, data)?;
        }

        debug!("Installed {} features on '{}'", data.len(), self.source_id);
        self.state.data_loaded = true;
        self.state.last_installed = Some(Arc::clone(data));
        Ok(())
    }

    /// Add every missing data layer, then attach listeners once.
    ///
    /// Layers already present are left untouched, so calling this twice on
    /// the same generation is a no-op the second time.
    pub async fn ensure_layers<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        visibility: &LayerVisibility,
    ) -> Result<(), SurfaceError> {
        if !surface.has_source(&self.source_id) {
            return Err(SurfaceError::MissingSource(self.source_id.clone()));
        }

        for layer in &CATALOG {
            if surface.has_layer(layer.id) {
                continue;
            }

            let drawn_as = self.drawn_as(layer);
            let icon = match (drawn_as, layer.icon) {
                (LayerKind::Symbol, Some(name)) => Some(self.ensure_icon(surface, name).await),
                _ => None,
            };

            let visible = visibility.is_visible(layer.group);
            let spec = layer.spec(&self.source_id, drawn_as, icon.as_deref(), visible, &self.highlight);
            match surface.add_layer(&spec) {
                Ok(()) => {}
                Err(e) if drawn_as == LayerKind::Symbol => {
                    warn!("Failed to add symbol layer {}, using circles: {}", layer.id, e);
                    self.state.degraded.insert(layer.id);
                    let fallback =
                        layer.spec(&self.source_id, LayerKind::Circle, None, visible, &self.highlight);
                    surface.add_layer(&fallback)?;
                }
                Err(e) => return Err(e),
            }
        }

        if !self.state.click_handlers_attached {
            let interactive = interactive_layer_ids();
            surface.on(ListenerKind::Click, &interactive)?;
            surface.on(ListenerKind::MouseMove, &[])?;
            surface.on(ListenerKind::MouseLeave, &[])?;
            surface.on(ListenerKind::Error, &[])?;
            self.state.click_handlers_attached = true;
            info!(
                "Attached map listeners for generation {} ({} interactive layers)",
                self.state.generation,
                interactive.len()
            );
        }

        Ok(())
    }

    /// Make `name` available on the surface and return the icon to draw with.
    ///
    /// Falls back to the configured generic icon when loading fails.
    async fn ensure_icon<S: MapSurface + ?Sized>(&mut self, surface: &mut S, name: &str) -> String {
        if surface.has_image(name) {
            self.state.icons_loaded.insert(name.to_string());
            return name.to_string();
        }
        if self.state.failed_icons.contains(name) {
            return self.fallback_icon.clone();
        }

        let image = if let Some(image) = self.state.images.get(name) {
            image.clone()
        } else {
            let Some(url) = self.icons.iter().find(|i| i.name == name).map(|i| i.url.clone()) else {
                warn!("No icon configured for {}, using {}", name, self.fallback_icon);
                self.state.failed_icons.insert(name.to_string());
                return self.fallback_icon.clone();
            };
            match surface.load_image(&url).await {
                Ok(image) => image,
                Err(e) => {
                    warn!("Failed to load icon {}: {}", name, e);
                    self.state.failed_icons.insert(name.to_string());
                    return self.fallback_icon.clone();
                }
            }
        };

        // The load may have raced another install of the same icon.
        if !surface.has_image(name) {
            if let Err(e) = surface.add_image(name, &image) {
                warn!("Failed to register icon {}: {}", name, e);
                self.state.failed_icons.insert(name.to_string());
                return self.fallback_icon.clone();
            }
        }

        self.state.images.insert(name.to_string(), image);
        self.state.icons_loaded.insert(name.to_string());
        name.to_string()
    }

    /// Toggle the `visibility` layout property of every layer in `group`.
    pub fn set_group_visibility<S: MapSurface + ?Sized>(
        &self,
        surface: &mut S,
        group: LayerGroup,
        visible: bool,
    ) -> Result<(), SurfaceError> {
        let value = StyleValue::visibility(visible);
        for layer in CATALOG.iter().filter(|d| d.group == group) {
            if surface.has_layer(layer.id) {
                surface.set_layout_property(layer.id, "visibility", &value)?;
            }
        }
        Ok(())
    }

    /// Replace a symbol layer with circles carrying the same filter and
    /// visibility. Returns whether anything was replaced.
    pub fn degrade_symbol_layer<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        layer_id: &str,
        visibility: &LayerVisibility,
    ) -> Result<bool, SurfaceError> {
        let Some(layer) = descriptor(layer_id) else {
            return Ok(false);
        };
        if layer.kind != LayerKind::Symbol || self.state.is_degraded(layer.id) {
            return Ok(false);
        }

        warn!("Symbol placement failed on {}, switching to circles", layer.id);
        self.state.degraded.insert(layer.id);
        if surface.has_layer(layer.id) {
            surface.remove_layer(layer.id)?;
        }
        let spec = layer.spec(
            &self.source_id,
            LayerKind::Circle,
            None,
            visibility.is_visible(layer.group),
            &self.highlight,
        );
        surface.add_layer(&spec)?;
        Ok(true)
    }

    /// Resolve a click: point layers win over polygons, topmost first.
    pub fn dispatch_click<S: MapSurface + ?Sized>(&self, surface: &S, point: ScreenPoint) -> ClickTarget {
        let hits = surface.query_rendered_features(point, &interactive_layer_ids());
        let role_of = |hit: &RenderedFeature| descriptor(&hit.layer_id).map(|d| d.role);

        hits.iter()
            .find(|hit| role_of(hit) == Some(Role::Point))
            .or_else(|| hits.iter().find(|hit| role_of(hit) == Some(Role::Polygon)))
            .map_or(ClickTarget::Empty, |hit| ClickTarget::Feature(hit.clone()))
    }
}

/// Layers a click is resolved against.
#[must_use]
pub fn interactive_layer_ids() -> Vec<String> {
    CATALOG
        .iter()
        .filter(|d| matches!(d.role, Role::Point | Role::Polygon))
        .map(|d| d.id.to_string())
        .collect()
}

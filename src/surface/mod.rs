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

//! Rendering surface boundary.
//!
//! The map renderer is an external collaborator. This module defines the
//! slice of its API the engine consumes ([`MapSurface`]) and how new
//! instances are constructed ([`SurfaceFactory`]). A binding for a concrete
//! renderer implements both traits; the engine never assumes more than what
//! is declared here.
//!
//! Renderer callbacks are delivered back to the engine as [`SurfaceEvent`]
//! values through [`crate::MapEngine::handle_event`]. Registering a listener
//! with [`MapSurface::on`] is what makes the renderer produce them, so a
//! listener registered twice produces every event twice.

pub mod style;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use geoint_features::{Coordinate, FeatureCollection};
use serde::{Deserialize, Serialize};

use crate::error::SurfaceError;
use crate::markers::{MarkerSpec, MarkerStyle};

pub use style::{LayerFilter, LayerKind, LayerSpec, StyleValue};

/// Camera projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    Flat,
    Globe,
}

impl ProjectionMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Flat => Self::Globe,
            Self::Globe => Self::Flat,
        }
    }
}

impl fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Globe => f.write_str("globe"),
        }
    }
}

/// Camera position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub center: Coordinate,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

impl CameraState {
    #[must_use]
    pub const fn new(center: Coordinate, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            pitch: 0.0,
            bearing: 0.0,
        }
    }
}

/// Camera animation request. Unset fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMove {
    pub center: Option<Coordinate>,
    pub zoom: Option<f64>,
    pub duration: Duration,
}

/// Construction options for a new surface instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceOptions {
    pub style_url: String,
    pub camera: CameraState,
    pub projection: ProjectionMode,
}

/// Fog / atmosphere parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atmosphere {
    pub color: String,
    pub high_color: String,
    pub horizon_blend: f64,
    pub space_color: String,
    pub star_intensity: f64,
}

/// Screen-space point in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A feature hit returned by [`MapSurface::query_rendered_features`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFeature {
    pub layer_id: String,
    pub feature_id: String,
}

/// Decoded raster image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconImage {
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels.
    pub pixels: Arc<[u8]>,
}

/// Event subscriptions the engine registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Click,
    MouseMove,
    MouseLeave,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

/// Renderer callbacks delivered to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Click { point: ScreenPoint },
    MouseMove { coordinate: Coordinate },
    MouseLeave,
    MarkerClick { marker_id: String },
    /// Internal renderer error while placing symbols on a layer.
    SymbolPlacementFailed { layer_id: String },
    Error { message: String },
}

/// The renderer API consumed by the engine.
#[async_trait]
pub trait MapSurface: Send {
    fn has_source(&self, id: &str) -> bool;

    fn add_source(&mut self, id: &str, data: &FeatureCollection) -> Result<(), SurfaceError>;

    /// Replace the source contents wholesale.
    fn set_source_data(&mut self, id: &str, data: &FeatureCollection) -> Result<(), SurfaceError>;

    fn has_layer(&self, id: &str) -> bool;

    fn add_layer(&mut self, layer: &LayerSpec) -> Result<(), SurfaceError>;

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError>;

    fn set_paint_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: &StyleValue,
    ) -> Result<(), SurfaceError>;

    fn set_layout_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: &StyleValue,
    ) -> Result<(), SurfaceError>;

    fn has_image(&self, name: &str) -> bool;

    /// Fetch and decode an image.
    async fn load_image(&mut self, url: &str) -> Result<IconImage, SurfaceError>;

    fn add_image(&mut self, name: &str, image: &IconImage) -> Result<(), SurfaceError>;

    /// Subscribe to an event. `layers` scopes click listeners.
    fn on(&mut self, kind: ListenerKind, layers: &[String]) -> Result<ListenerId, SurfaceError>;

    /// Features under `point` on the given layers, topmost first.
    fn query_rendered_features(&self, point: ScreenPoint, layers: &[String]) -> Vec<RenderedFeature>;

    fn camera(&self) -> CameraState;

    fn ease_to(&mut self, target: &CameraMove);

    fn fly_to(&mut self, target: &CameraMove);

    fn set_fog(&mut self, atmosphere: Option<&Atmosphere>);

    fn projection(&self) -> ProjectionMode;

    fn set_projection(&mut self, mode: ProjectionMode) -> Result<(), SurfaceError>;

    /// Begin a style swap. Sources, layers and images are discarded by the
    /// renderer; listeners survive.
    fn set_style(&mut self, style_url: &str) -> Result<(), SurfaceError>;

    /// Resolves once style data is ready after construction or [`Self::set_style`].
    async fn style_ready(&mut self) -> Result<(), SurfaceError>;

    fn add_marker(&mut self, spec: &MarkerSpec) -> Result<MarkerHandle, SurfaceError>;

    fn update_marker(&mut self, handle: MarkerHandle, style: &MarkerStyle) -> Result<(), SurfaceError>;

    fn remove_marker(&mut self, handle: MarkerHandle);

    /// Remove navigation and other controls.
    fn remove_controls(&mut self);

    /// Destroy the instance and force release of its graphics context.
    fn release(&mut self);
}

/// Constructs surface instances.
#[async_trait]
pub trait SurfaceFactory: Send + Sync {
    type Surface: MapSurface;

    /// Create a surface. The returned instance may still be loading; callers
    /// wait on [`MapSurface::style_ready`].
    async fn create(&self, options: &SurfaceOptions) -> Result<Self::Surface, SurfaceError>;
}

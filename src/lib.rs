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

//! Map layer orchestration and relationship highlighting for the
//! intelligence globe dashboard.
//!
//! The engine sits between a web-map renderer and the dashboard UI:
//!
//! - **Dataset**: the GeoJSON feature collection, fetched once and cached
//! - **Layers**: the data layers drawn from the filtered dataset, installed
//!   idempotently per surface generation
//! - **Style switching**: basemap theme changes that put the data layers back
//! - **Projection**: flat/globe transitions, in place or by rebuilding the
//!   surface
//! - **Highlighting**: emphasis of a selected feature and the features it
//!   references
//! - **Markers**: fixed-asset overlays with their own selection
//!
//! The renderer is reached only through [`surface::MapSurface`] and
//! [`surface::SurfaceFactory`]; feature parsing, filtering and relations live
//! in the renderer-independent `geoint-features` crate.

pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod highlight;
pub mod layers;
pub mod markers;
pub mod pointer;
pub mod projection;
pub mod style_switch;
pub mod surface;

#[cfg(test)]
mod testing;

pub use config::{EngineConfig, Theme};
pub use engine::{EngineStatus, MapEngine};
pub use error::{EngineError, SurfaceError};
pub use highlight::SelectionState;
pub use layers::{LayerGroup, LayerVisibility};
pub use markers::{AssetStatus, MarkerRecord};
pub use pointer::{format_coordinate, CoordinateFormat};
pub use style_switch::SwitchOutcome;
pub use surface::{MapSurface, ProjectionMode, SurfaceEvent, SurfaceFactory};

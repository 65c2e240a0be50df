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

//! Engine configuration.
//!
//! Loaded from TOML through `confy`. Every field has a serde default, so a
//! partial or missing file yields a working configuration. The engine only
//! reads configuration; session state is never written back.

use std::time::Duration;

use geoint_features::Coordinate;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::layers::LayerVisibility;
use crate::surface::{Atmosphere, CameraState, ProjectionMode};

/// Default dataset location
pub const DEFAULT_DATASET: &str = "data/globe-features.geojson";

/// Default map center (Abu Dhabi), longitude first
pub const DEFAULT_CENTER: (f64, f64) = (54.3773, 24.4539);

/// A named basemap style.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Stable identifier used by the UI
    pub id: String,

    /// User-friendly display name
    pub name: String,

    /// Renderer style URL
    pub style_url: String,
}

impl Theme {
    pub fn new(id: &str, name: &str, style_url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            style_url: style_url.to_string(),
        }
    }
}

/// A raster icon used by a symbol layer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IconConfig {
    /// Image name registered on the surface
    pub name: String,

    /// Where the image is loaded from
    pub url: String,
}

/// Baseline and emphasis constants for data layers.
///
/// The baseline values are what layers are built with and what a cleared
/// selection returns to.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HighlightConfig {
    pub point_opacity: f64,
    pub icon_size: f64,
    pub circle_radius: f64,
    pub emphasis_opacity: f64,
    pub faded_opacity: f64,
    /// Size multiplier for matching icons and circles
    pub emphasis_scale: f64,
    pub fill_opacity: f64,
    pub fill_emphasis_opacity: f64,
    pub fill_faded_opacity: f64,
    pub outline_emphasis_color: String,
    pub outline_faded_color: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            point_opacity: 0.9,
            icon_size: 0.8,
            circle_radius: 6.0,
            emphasis_opacity: 1.0,
            faded_opacity: 0.2,
            emphasis_scale: 1.5,
            fill_opacity: 0.25,
            fill_emphasis_opacity: 0.6,
            fill_faded_opacity: 0.06,
            outline_emphasis_color: "#ffffff".to_string(),
            outline_faded_color: "#374151".to_string(),
        }
    }
}

/// Projection transition tuning.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Zoom levels removed when entering globe, added when entering flat
    pub zoom_offset: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub ease_duration_ms: u64,
    /// Fraction of the ease after which the projection is switched (0.0 - 1.0)
    pub switch_fraction: f64,
    pub globe_atmosphere: Atmosphere,
    /// Flat maps draw without fog when unset
    pub flat_atmosphere: Option<Atmosphere>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            zoom_offset: 1.5,
            min_zoom: 1.5,
            max_zoom: 16.0,
            ease_duration_ms: 1200,
            switch_fraction: 0.5,
            globe_atmosphere: Atmosphere {
                color: "rgb(186, 210, 235)".to_string(),
                high_color: "rgb(36, 92, 223)".to_string(),
                horizon_blend: 0.02,
                space_color: "rgb(11, 11, 25)".to_string(),
                star_intensity: 0.6,
            },
            flat_atmosphere: None,
        }
    }
}

/// Engine configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EngineConfig {
    /// Configuration schema version
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Dataset path or http(s) URL
    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// Renderer source id the derived dataset is installed under
    #[serde(default = "default_source_id")]
    pub source_id: String,

    /// Available basemap themes
    #[serde(default = "default_themes")]
    pub themes: Vec<Theme>,

    /// Theme used at startup
    #[serde(default = "default_initial_theme")]
    pub initial_theme: String,

    /// Initial center as (longitude, latitude)
    #[serde(default = "default_center")]
    pub center: (f64, f64),

    /// Initial zoom level
    #[serde(default = "default_zoom")]
    pub zoom: f64,

    /// Zoom eased to once the map has loaded
    #[serde(default = "default_intro_zoom")]
    pub intro_zoom: f64,

    #[serde(default = "default_intro_duration_ms")]
    pub intro_duration_ms: u64,

    /// Initial projection
    #[serde(default = "default_projection")]
    pub projection: ProjectionMode,

    /// Upper bound on waiting for style data after a theme change
    #[serde(default = "default_style_timeout_ms")]
    pub style_timeout_ms: u64,

    /// Delay before the single retry of a failed layer reinstall
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Raster icons for symbol layers
    #[serde(default = "default_icons")]
    pub icons: Vec<IconConfig>,

    /// Icon name substituted when an icon fails to load
    #[serde(default = "default_fallback_icon")]
    pub fallback_icon: String,

    /// Initial layer group visibility
    #[serde(default)]
    pub layer_visibility: LayerVisibility,

    #[serde(default)]
    pub highlight: HighlightConfig,

    #[serde(default)]
    pub projection_transition: ProjectionConfig,

    /// Zoom used when flying to a marker
    #[serde(default = "default_marker_zoom")]
    pub marker_zoom: f64,

    /// Duration of fly-to animations
    #[serde(default = "default_fly_duration_ms")]
    pub fly_duration_ms: u64,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_dataset() -> String {
    DEFAULT_DATASET.to_string()
}

fn default_source_id() -> String {
    "intel-features".to_string()
}

fn default_themes() -> Vec<Theme> {
    vec![
        Theme::new("dark", "Dark", "mapbox://styles/mapbox/dark-v11"),
        Theme::new("light", "Light", "mapbox://styles/mapbox/light-v11"),
        Theme::new("streets", "Streets", "mapbox://styles/mapbox/streets-v12"),
        Theme::new(
            "satellite",
            "Satellite",
            "mapbox://styles/mapbox/satellite-streets-v12",
        ),
    ]
}

fn default_initial_theme() -> String {
    "satellite".to_string()
}

fn default_center() -> (f64, f64) {
    DEFAULT_CENTER
}

fn default_zoom() -> f64 {
    8.0
}

fn default_intro_zoom() -> f64 {
    11.0
}

fn default_intro_duration_ms() -> u64 {
    2000
}

fn default_projection() -> ProjectionMode {
    ProjectionMode::Globe
}

fn default_style_timeout_ms() -> u64 {
    10_000
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_icons() -> Vec<IconConfig> {
    ["rfi", "report", "target"]
        .iter()
        .map(|kind| IconConfig {
            name: format!("{kind}-icon"),
            url: format!("/icons/{kind}.png"),
        })
        .collect()
}

fn default_fallback_icon() -> String {
    "marker".to_string()
}

fn default_marker_zoom() -> f64 {
    13.0
}

fn default_fly_duration_ms() -> u64 {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            dataset: default_dataset(),
            source_id: default_source_id(),
            themes: default_themes(),
            initial_theme: default_initial_theme(),
            center: default_center(),
            zoom: default_zoom(),
            intro_zoom: default_intro_zoom(),
            intro_duration_ms: default_intro_duration_ms(),
            projection: default_projection(),
            style_timeout_ms: default_style_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            icons: default_icons(),
            fallback_icon: default_fallback_icon(),
            layer_visibility: LayerVisibility::default(),
            highlight: HighlightConfig::default(),
            projection_transition: ProjectionConfig::default(),
            marker_zoom: default_marker_zoom(),
            fly_duration_ms: default_fly_duration_ms(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self, EngineError> {
        Ok(confy::load("geoint-engine", "config")?)
    }

    /// Get the config file path for display to user
    pub fn config_path() -> Result<std::path::PathBuf, EngineError> {
        Ok(confy::get_configuration_file_path("geoint-engine", "config")?)
    }

    /// Get a theme by ID
    pub fn theme(&self, id: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.id == id)
    }

    /// Startup theme, falling back to the first configured one
    pub fn initial_theme(&self) -> Option<&Theme> {
        self.theme(&self.initial_theme).or_else(|| self.themes.first())
    }

    pub fn initial_camera(&self) -> CameraState {
        CameraState::new(Coordinate::new(self.center.0, self.center.1), self.zoom)
    }

    pub fn style_timeout(&self) -> Duration {
        Duration::from_millis(self.style_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn intro_duration(&self) -> Duration {
        Duration::from_millis(self.intro_duration_ms)
    }

    pub fn fly_duration(&self) -> Duration {
        Duration::from_millis(self.fly_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"dataset": "https://example.test/f.geojson", "zoom": 5.0}"#).unwrap();
        assert_eq!(config.dataset, "https://example.test/f.geojson");
        assert!((config.zoom - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.style_timeout(), Duration::from_secs(10));
        assert_eq!(config.icons.len(), 3);
        assert!(!config.layer_visibility.heatmap);
    }

    #[test]
    fn test_initial_theme_falls_back_to_first() {
        let mut config = EngineConfig::default();
        assert_eq!(config.initial_theme().unwrap().id, "satellite");
        config.initial_theme = "missing".to_string();
        assert_eq!(config.initial_theme().unwrap().id, "dark");
    }
}

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

//! Data layer catalog and runtime registry.
//!
//! This module provides the fixed set of layer descriptors drawn from the
//! dataset source, the visibility groups the UI toggles, and the registry
//! that installs them idempotently on a surface generation.

pub mod catalog;
pub mod registry;

pub use catalog::{LayerDescriptor, PropertySection, Role, StyledProperty, CATALOG};
pub use registry::{ClickTarget, LayerRegistry, LayerRuntimeState};

use serde::{Deserialize, Serialize};

/// Visibility group a descriptor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerGroup {
    Heatmap,
    Rfi,
    Reports,
    Targets,
    /// Area boundaries
    Layers,
}

/// Per-group visibility toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerVisibility {
    pub heatmap: bool,
    pub rfi: bool,
    pub reports: bool,
    pub targets: bool,
    pub layers: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            heatmap: false,
            rfi: true,
            reports: true,
            targets: true,
            layers: true,
        }
    }
}

impl LayerVisibility {
    #[must_use]
    pub fn is_visible(&self, group: LayerGroup) -> bool {
        match group {
            LayerGroup::Heatmap => self.heatmap,
            LayerGroup::Rfi => self.rfi,
            LayerGroup::Reports => self.reports,
            LayerGroup::Targets => self.targets,
            LayerGroup::Layers => self.layers,
        }
    }

    pub fn set(&mut self, group: LayerGroup, visible: bool) {
        let slot = match group {
            LayerGroup::Heatmap => &mut self.heatmap,
            LayerGroup::Rfi => &mut self.rfi,
            LayerGroup::Reports => &mut self.reports,
            LayerGroup::Targets => &mut self.targets,
            LayerGroup::Layers => &mut self.layers,
        };
        *slot = visible;
    }
}

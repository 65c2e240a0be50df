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

//! Fixed-asset markers.
//!
//! Markers live outside the data layers: they are DOM-style overlays the
//! renderer positions itself. A new marker list (by `Arc` identity) recreates
//! every marker; a selection change only restyles the markers whose emphasis
//! changed.

use std::sync::Arc;

use geoint_features::Coordinate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::SurfaceError;
use crate::surface::{MapSurface, MarkerHandle};

const ACTIVE_COLOR: &str = "#10b981";
const OFFLINE_COLOR: &str = "#ef4444";
const BORDER_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Active,
    Offline,
}

/// A fixed-point asset shown as a marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    pub status: AssetStatus,
}

/// Pulse ring drawn around active assets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    pub size: f64,
    pub opacity: f64,
}

/// Visual parameters of one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub dot_size: f64,
    pub dot_color: &'static str,
    pub border_width: f64,
    pub border_color: &'static str,
    pub glow: bool,
    pub pulse: Option<Pulse>,
    pub z_index: i32,
}

impl MarkerStyle {
    #[must_use]
    pub fn for_record(status: AssetStatus, selected: bool) -> Self {
        let dot_color = match status {
            AssetStatus::Active => ACTIVE_COLOR,
            AssetStatus::Offline => OFFLINE_COLOR,
        };
        let pulse = (status == AssetStatus::Active).then(|| {
            if selected {
                Pulse {
                    size: 20.0,
                    opacity: 0.6,
                }
            } else {
                Pulse {
                    size: 14.0,
                    opacity: 0.4,
                }
            }
        });

        Self {
            dot_size: if selected { 14.0 } else { 10.0 },
            dot_color,
            border_width: if selected { 3.0 } else { 1.0 },
            border_color: if selected { ACTIVE_COLOR } else { BORDER_COLOR },
            glow: selected,
            pulse,
            z_index: if selected { 1000 } else { 100 },
        }
    }
}

/// Everything the renderer needs to place a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub id: String,
    pub coordinate: Coordinate,
    pub style: MarkerStyle,
}

#[derive(Debug)]
struct Placed {
    id: String,
    status: AssetStatus,
    handle: MarkerHandle,
    selected: bool,
}

/// Owns the markers placed on the current surface.
#[derive(Debug, Default)]
pub struct MarkerManager {
    records: Option<Arc<Vec<MarkerRecord>>>,
    placed: Vec<Placed>,
    attached: bool,
}

impl MarkerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the surface in line with `records` and `selected`.
    pub fn sync<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        records: &Arc<Vec<MarkerRecord>>,
        selected: Option<&str>,
    ) -> Result<(), SurfaceError> {
        let same_list = self
            .records
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, records));

        if self.attached && same_list {
            return self.restyle(surface, selected);
        }

        self.detach(surface);
        for record in records.iter() {
            let is_selected = selected == Some(record.id.as_str());
            let spec = MarkerSpec {
                id: record.id.clone(),
                coordinate: record.coordinate,
                style: MarkerStyle::for_record(record.status, is_selected),
            };
            let handle = surface.add_marker(&spec)?;
            self.placed.push(Placed {
                id: record.id.clone(),
                status: record.status,
                handle,
                selected: is_selected,
            });
        }
        debug!("Created {} markers", self.placed.len());
        self.records = Some(Arc::clone(records));
        self.attached = true;
        Ok(())
    }

    fn restyle<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        selected: Option<&str>,
    ) -> Result<(), SurfaceError> {
        for marker in &mut self.placed {
            let is_selected = selected == Some(marker.id.as_str());
            if marker.selected != is_selected {
                surface.update_marker(marker.handle, &MarkerStyle::for_record(marker.status, is_selected))?;
                marker.selected = is_selected;
            }
        }
        Ok(())
    }

    /// Remove every marker from the surface. The record list is kept so the
    /// next [`Self::sync`] recreates them.
    pub fn detach<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        for marker in self.placed.drain(..) {
            surface.remove_marker(marker.handle);
        }
        self.attached = false;
    }

    /// Drop handles belonging to a surface that no longer exists.
    pub fn forget(&mut self) {
        self.placed.clear();
        self.attached = false;
    }
}

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

//! Flat / globe projection transitions.
//!
//! Entering the globe is done in place: atmosphere first, then a camera ease
//! with the projection flipped partway through. Leaving the globe rebuilds the
//! surface, since renderers keep globe-only GPU state alive otherwise.

use std::time::Duration;

use log::{debug, info, warn};

use crate::config::ProjectionConfig;
use crate::error::SurfaceError;
use crate::markers::MarkerManager;
use crate::surface::{Atmosphere, CameraMove, MapSurface, ProjectionMode};

/// How a projection change is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStrategy {
    Unchanged,
    Smooth,
    Rebuild,
}

#[must_use]
pub fn strategy(from: ProjectionMode, to: ProjectionMode) -> TransitionStrategy {
    match (from, to) {
        (a, b) if a == b => TransitionStrategy::Unchanged,
        (ProjectionMode::Globe, ProjectionMode::Flat) => TransitionStrategy::Rebuild,
        _ => TransitionStrategy::Smooth,
    }
}

/// Zoom to ease to when entering `to`: compressed for the globe, expanded
/// for flat maps, clamped to the configured bounds.
#[must_use]
pub fn transition_zoom(zoom: f64, to: ProjectionMode, cfg: &ProjectionConfig) -> f64 {
    let target = match to {
        ProjectionMode::Globe => zoom - cfg.zoom_offset,
        ProjectionMode::Flat => zoom + cfg.zoom_offset,
    };
    target.clamp(cfg.min_zoom, cfg.max_zoom)
}

/// Atmosphere drawn in `mode`.
#[must_use]
pub fn atmosphere(mode: ProjectionMode, cfg: &ProjectionConfig) -> Option<&Atmosphere> {
    match mode {
        ProjectionMode::Globe => Some(&cfg.globe_atmosphere),
        ProjectionMode::Flat => cfg.flat_atmosphere.as_ref(),
    }
}

/// In-place transition. When the renderer refuses the new projection, the
/// previous atmosphere and zoom are put back before the error is returned.
pub async fn smooth<S: MapSurface + ?Sized>(
    surface: &mut S,
    to: ProjectionMode,
    cfg: &ProjectionConfig,
) -> Result<(), SurfaceError> {
    let from = surface.projection();
    let fog = atmosphere(to, cfg);
    surface.set_fog(fog);

    let camera = surface.camera();
    let duration = Duration::from_millis(cfg.ease_duration_ms);
    let zoom = transition_zoom(camera.zoom, to, cfg);
    debug!("Easing from zoom {:.2} to {:.2} for {} projection", camera.zoom, zoom, to);
    surface.ease_to(&CameraMove {
        center: None,
        zoom: Some(zoom),
        duration,
    });

    tokio::time::sleep(duration.mul_f64(cfg.switch_fraction.clamp(0.0, 1.0))).await;
    if let Err(e) = surface.set_projection(to) {
        warn!("Renderer refused {} projection, staying on {}: {}", to, from, e);
        surface.set_fog(atmosphere(from, cfg));
        surface.ease_to(&CameraMove {
            center: None,
            zoom: Some(camera.zoom),
            duration: Duration::ZERO,
        });
        return Err(e);
    }
    // Projection changes reset fog on some renderers.
    surface.set_fog(fog);
    info!("Projection switched to {}", to);
    Ok(())
}

/// Tear a surface down completely: markers, controls, then the graphics
/// context. The surface is consumed so nothing can reach it afterwards.
pub fn teardown<S: MapSurface>(mut surface: S, markers: &mut MarkerManager) {
    markers.detach(&mut surface);
    surface.remove_controls();
    surface.release();
    debug!("Released map surface");
}

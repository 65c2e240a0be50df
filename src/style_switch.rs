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

//! Background re-skin of the surface.
//!
//! A style swap discards sources, layers and images on the renderer. After
//! the new style reports ready, the dataset source and data layers are put
//! back from the registry. Only one style-mutating operation runs at a time;
//! see [`BusyFlag`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use geoint_features::FeatureCollection;
use log::{info, warn};

use crate::error::{EngineError, SurfaceError};
use crate::layers::{LayerRegistry, LayerVisibility};
use crate::surface::MapSurface;

/// Result of a request that may be refused while another one is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Applied,
    /// Requested state was already current
    Unchanged,
    /// Another style-mutating operation was in progress
    Rejected,
}

/// Shared "style operation in progress" flag.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    /// Claim the flag, or `None` if it is already held.
    #[must_use]
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(Arc::clone(&self.0)))
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the busy flag when dropped, whatever way the operation ends.
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Wait for style data, bounded by `limit`.
pub async fn wait_ready<S: MapSurface + ?Sized>(surface: &mut S, limit: Duration) -> Result<(), EngineError> {
    match tokio::time::timeout(limit, surface.style_ready()).await {
        Ok(result) => result.map_err(EngineError::StyleSwitch),
        Err(_elapsed) => Err(EngineError::StyleTimeout(limit)),
    }
}

/// Install `data` and the data layers. Without data there is nothing to
/// draw layers from, so only the data-less part is done.
pub async fn reinstall<S: MapSurface + ?Sized>(
    surface: &mut S,
    registry: &mut LayerRegistry,
    data: Option<&Arc<FeatureCollection>>,
    visibility: &LayerVisibility,
) -> Result<(), SurfaceError> {
    let Some(data) = data else {
        return Ok(());
    };
    registry.install_data(surface, data)?;
    registry.ensure_layers(surface, visibility).await
}

/// [`reinstall`], retried once after `retry_delay`.
pub async fn reinstall_with_retry<S: MapSurface + ?Sized>(
    surface: &mut S,
    registry: &mut LayerRegistry,
    data: Option<&Arc<FeatureCollection>>,
    visibility: &LayerVisibility,
    retry_delay: Duration,
) -> Result<(), SurfaceError> {
    match reinstall(surface, registry, data, visibility).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("Failed to reinstall layers, retrying in {:?}: {}", retry_delay, e);
            tokio::time::sleep(retry_delay).await;
            reinstall(surface, registry, data, visibility).await
        }
    }
}

/// Timing for [`switch_style`].
#[derive(Debug, Clone, Copy)]
pub struct SwitchTiming {
    pub ready_timeout: Duration,
    pub retry_delay: Duration,
}

/// Swap the basemap style and put the data layers back.
pub async fn switch_style<S: MapSurface + ?Sized>(
    surface: &mut S,
    registry: &mut LayerRegistry,
    style_url: &str,
    data: Option<&Arc<FeatureCollection>>,
    visibility: &LayerVisibility,
    timing: SwitchTiming,
) -> Result<(), EngineError> {
    info!("Switching map style to {}", style_url);
    surface.set_style(style_url).map_err(EngineError::StyleSwitch)?;
    registry.style_discarded();

    wait_ready(surface, timing.ready_timeout).await?;
    reinstall_with_retry(surface, registry, data, visibility, timing.retry_delay)
        .await
        .map_err(EngineError::StyleSwitch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::surface::ListenerKind;
    use crate::testing::{sample_collection, RecordingSurface};

    const DARK: &str = "mapbox://styles/mapbox/dark-v11";

    fn timing() -> SwitchTiming {
        SwitchTiming {
            ready_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_millis(500),
        }
    }

    async fn installed() -> (RecordingSurface, LayerRegistry, Arc<FeatureCollection>) {
        let mut surface = RecordingSurface::new();
        let mut registry = LayerRegistry::new(&EngineConfig::default());
        let data = Arc::new(sample_collection());
        reinstall(&mut surface, &mut registry, Some(&data), &LayerVisibility::default())
            .await
            .unwrap();
        (surface, registry, data)
    }

    #[test]
    fn test_busy_flag_is_exclusive() {
        let flag = BusyFlag::default();
        let guard = flag.try_acquire().unwrap();
        assert!(flag.is_busy());
        assert!(flag.try_acquire().is_none());
        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_restores_layers_with_one_listener() {
        let (mut surface, mut registry, data) = installed().await;
        switch_style(&mut surface, &mut registry, DARK, Some(&data), &LayerVisibility::default(), timing())
            .await
            .unwrap();

        let log = surface.log();
        assert_eq!(log.current_style(), DARK);
        assert_eq!(log.layers.len(), crate::layers::CATALOG.len());
        assert!(log.sources.contains_key(registry.source_id()));
        assert_eq!(log.count_listeners(ListenerKind::Click), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_times_out() {
        let (mut surface, mut registry, data) = installed().await;
        surface.log().never_ready = true;

        let result =
            switch_style(&mut surface, &mut registry, DARK, Some(&data), &LayerVisibility::default(), timing()).await;
        assert!(matches!(result, Err(EngineError::StyleTimeout(d)) if d == Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinstall_retries_once() {
        let (mut surface, mut registry, data) = installed().await;
        surface.set_style(DARK).unwrap();
        registry.style_discarded();
        surface.log().fail_layer_adds = 1;

        reinstall_with_retry(&mut surface, &mut registry, Some(&data), &LayerVisibility::default(), Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(surface.log().layers.len(), crate::layers::CATALOG.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinstall_fails_after_second_attempt() {
        let (mut surface, mut registry, data) = installed().await;
        surface.set_style(DARK).unwrap();
        registry.style_discarded();
        surface.log().fail_layer_adds = 2;

        let started = tokio::time::Instant::now();
        let result = reinstall_with_retry(
            &mut surface,
            &mut registry,
            Some(&data),
            &LayerVisibility::default(),
            Duration::from_millis(500),
        )
        .await;
        assert!(result.is_err());
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_reinstall_without_data_is_a_no_op() {
        let mut surface = RecordingSurface::new();
        let mut registry = LayerRegistry::new(&EngineConfig::default());
        reinstall(&mut surface, &mut registry, None, &LayerVisibility::default())
            .await
            .unwrap();
        assert_eq!(surface.log().layer_adds, 0);
    }
}

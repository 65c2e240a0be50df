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

//! Public engine façade.
//!
//! [`MapEngine`] owns the surface, the dataset cache, the layer registry,
//! selection and markers behind a single async mutex. The UI calls its
//! operations and reads [`EngineStatus`] snapshots through a watch channel.
//! Theme switches and projection changes also claim the busy flag, so a
//! second one requested while the first is running is rejected rather than
//! queued.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use geoint_features::{
    derive, search, Coordinate, Feature, FeatureCollection, FilterCriteria, ReportSubfilters,
    RfiSubfilters, SearchHit, TimeRange,
};
use log::{debug, error, info, warn};
use tokio::sync::{watch, Mutex};

use crate::config::{EngineConfig, Theme};
use crate::dataset::{DatasetCache, DatasetSource};
use crate::error::{EngineError, SurfaceError};
use crate::highlight::{self, SelectionState};
use crate::layers::{ClickTarget, LayerGroup, LayerRegistry, LayerVisibility};
use crate::markers::{MarkerManager, MarkerRecord};
use crate::projection::{self, TransitionStrategy};
use crate::style_switch::{self, BusyFlag, SwitchOutcome, SwitchTiming};
use crate::surface::{
    CameraMove, CameraState, MapSurface, ProjectionMode, SurfaceEvent, SurfaceFactory,
    SurfaceOptions,
};

/// Snapshot of engine state for the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    /// A surface exists and has finished loading
    pub loaded: bool,
    pub error: Option<String>,
    /// Theme currently applied
    pub theme: String,
    /// Theme last requested; differs from `theme` while a switch runs
    pub requested_theme: String,
    pub projection: ProjectionMode,
    pub selected: Option<String>,
    pub related: Arc<BTreeSet<String>>,
    pub selected_marker: Option<String>,
    pub pointer: Option<Coordinate>,
    /// Features in the derived dataset
    pub feature_count: usize,
}

impl EngineStatus {
    fn new(theme: &Theme, projection: ProjectionMode) -> Self {
        Self {
            loaded: false,
            error: None,
            theme: theme.id.clone(),
            requested_theme: theme.id.clone(),
            projection,
            selected: None,
            related: Arc::default(),
            selected_marker: None,
            pointer: None,
            feature_count: 0,
        }
    }

    #[must_use]
    pub fn is_switching_theme(&self) -> bool {
        self.theme != self.requested_theme
    }
}

struct EngineState<S> {
    surface: Option<S>,
    dataset: DatasetCache,
    derived: Option<Arc<FeatureCollection>>,
    criteria: FilterCriteria,
    visibility: LayerVisibility,
    registry: LayerRegistry,
    selection: SelectionState,
    markers: MarkerManager,
    marker_records: Arc<Vec<MarkerRecord>>,
    selected_marker: Option<String>,
    theme: Theme,
    /// Renderer is not on `theme`'s style after a failed rollback
    style_stale: bool,
    projection: ProjectionMode,
    /// Last camera of a successfully constructed surface
    camera: CameraState,
    intro_done: bool,
}

impl<S: MapSurface> EngineState<S> {
    fn refilter(&mut self) {
        self.derived = self
            .dataset
            .base()
            .map(|base| Arc::new(derive(base, &self.criteria)));
    }

    /// Put markers and highlighting back after layers were (re)installed.
    fn reassert(&mut self) -> Result<(), SurfaceError> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };
        self.markers
            .sync(surface, &self.marker_records, self.selected_marker.as_deref())?;
        highlight::apply(surface, &self.registry, &self.selection)
    }

    fn apply_selection(&mut self, selection: SelectionState) -> Result<(), SurfaceError> {
        self.selection = selection;
        match self.surface.as_mut() {
            Some(surface) => highlight::apply(surface, &self.registry, &self.selection),
            None => Ok(()),
        }
    }

    fn feature(&self, id: &str) -> Option<Arc<Feature>> {
        self.dataset.base()?.get(id).cloned()
    }
}

/// Map layer orchestration and relationship highlighting engine.
pub struct MapEngine<F: SurfaceFactory> {
    config: EngineConfig,
    factory: F,
    state: Mutex<EngineState<F::Surface>>,
    busy: BusyFlag,
    status: watch::Sender<EngineStatus>,
}

impl<F: SurfaceFactory> fmt::Debug for MapEngine<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapEngine")
            .field("status", &*self.status.borrow())
            .field("busy", &self.busy.is_busy())
            .finish_non_exhaustive()
    }
}

impl<F: SurfaceFactory> MapEngine<F> {
    pub fn new(config: EngineConfig, factory: F) -> Result<Self, EngineError> {
        let theme = config
            .initial_theme()
            .cloned()
            .ok_or_else(|| EngineError::UnknownTheme(config.initial_theme.clone()))?;
        let (status, _) = watch::channel(EngineStatus::new(&theme, config.projection));

        let state = EngineState {
            surface: None,
            dataset: DatasetCache::new(DatasetSource::parse(&config.dataset)),
            derived: None,
            criteria: FilterCriteria::default(),
            visibility: config.layer_visibility,
            registry: LayerRegistry::new(&config),
            selection: SelectionState::default(),
            markers: MarkerManager::new(),
            marker_records: Arc::default(),
            selected_marker: None,
            theme,
            style_stale: false,
            projection: config.projection,
            camera: config.initial_camera(),
            intro_done: false,
        };

        Ok(Self {
            config,
            factory,
            state: Mutex::new(state),
            busy: BusyFlag::default(),
            status,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn themes(&self) -> &[Theme] {
        &self.config.themes
    }

    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status.subscribe()
    }

    /// Whether a theme switch or projection change is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    fn timing(&self) -> SwitchTiming {
        SwitchTiming {
            ready_timeout: self.config.style_timeout(),
            retry_delay: self.config.retry_delay(),
        }
    }

    fn publish(&self, state: &EngineState<F::Surface>) {
        self.status.send_modify(|status| {
            status.loaded = state.surface.is_some();
            status.theme = state.theme.id.clone();
            status.projection = state.projection;
            status.selected = state.selection.selected.clone();
            status.related = Arc::clone(&state.selection.related);
            status.selected_marker = state.selected_marker.clone();
            status.feature_count = state.derived.as_ref().map_or(0, |d| d.len());
        });
    }

    /// Record a structural failure and hand it back.
    fn fail(&self, err: EngineError) -> EngineError {
        error!("{}", err);
        let message = err.to_string();
        self.status.send_modify(|status| status.error = Some(message));
        err
    }

    /// Create a surface, wait for it, and replay everything onto it.
    /// A surface that fails on the way is released before returning.
    async fn build_surface(
        &self,
        state: &mut EngineState<F::Surface>,
        options: &SurfaceOptions,
    ) -> Result<(), EngineError> {
        let mut surface = self.factory.create(options).await?;
        if let Err(e) = style_switch::wait_ready(&mut surface, self.config.style_timeout()).await {
            surface.release();
            return Err(e);
        }

        state.registry.reset_for_new_surface();
        state.markers.forget();
        surface.set_fog(projection::atmosphere(
            options.projection,
            &self.config.projection_transition,
        ));

        if let Err(e) = style_switch::reinstall_with_retry(
            &mut surface,
            &mut state.registry,
            state.derived.as_ref(),
            &state.visibility,
            self.config.retry_delay(),
        )
        .await
        {
            surface.release();
            return Err(e.into());
        }

        state.surface = Some(surface);
        state.style_stale = false;
        if let Err(e) = state.reassert() {
            if let Some(mut surface) = state.surface.take() {
                surface.release();
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Fetch the dataset and construct the surface.
    ///
    /// Calling this again once the surface exists is a no-op, except that a
    /// dataset which failed to load is fetched again. After a failed
    /// projection rebuild this recreates the surface from the retained theme,
    /// projection and camera.
    ///
    /// A dataset failure does not stop the surface from being built: the
    /// engine stays usable without data layers and the error is returned
    /// after construction.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let mut dataset_error = None;
        if state.dataset.base().is_none() {
            match state.dataset.fetch().await {
                Ok(_) => state.refilter(),
                Err(e) => dataset_error = Some(EngineError::from(e)),
            }
        }

        if state.surface.is_none() {
            info!(
                "Initializing map ({} theme, {} projection)",
                state.theme.name, state.projection
            );
            self.status.send_modify(|status| status.error = None);
            let options = SurfaceOptions {
                style_url: state.theme.style_url.clone(),
                camera: state.camera,
                projection: state.projection,
            };
            if let Err(e) = self.build_surface(state, &options).await {
                self.publish(state);
                return Err(self.fail(e));
            }

            if !state.intro_done {
                if let Some(surface) = state.surface.as_mut() {
                    surface.ease_to(&CameraMove {
                        center: None,
                        zoom: Some(self.config.intro_zoom),
                        duration: self.config.intro_duration(),
                    });
                }
                state.intro_done = true;
            }
        } else if state.derived.is_some() && !state.registry.state().data_loaded {
            let timing = self.timing();
            if let Some(surface) = state.surface.as_mut() {
                style_switch::reinstall_with_retry(
                    surface,
                    &mut state.registry,
                    state.derived.as_ref(),
                    &state.visibility,
                    timing.retry_delay,
                )
                .await
                .map_err(|e| self.fail(e.into()))?;
            }
            state.reassert().map_err(|e| self.fail(e.into()))?;
        }

        self.publish(state);
        match dataset_error {
            Some(e) => Err(self.fail(e)),
            None => Ok(()),
        }
    }

    /// Re-skin the map with the theme named `id`.
    pub async fn change_theme(&self, id: &str) -> Result<SwitchOutcome, EngineError> {
        let Some(_busy) = self.busy.try_acquire() else {
            warn!("Ignoring theme change to {} while another switch is running", id);
            return Ok(SwitchOutcome::Rejected);
        };
        let Some(theme) = self.config.theme(id).cloned() else {
            return Err(self.fail(EngineError::UnknownTheme(id.to_string())));
        };

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if state.theme.id == theme.id && !state.style_stale {
            return Ok(SwitchOutcome::Unchanged);
        }
        let timing = self.timing();
        let Some(surface) = state.surface.as_mut() else {
            return Err(self.fail(EngineError::NoSurface));
        };

        self.status
            .send_modify(|status| status.requested_theme = theme.id.clone());
        state.markers.detach(surface);

        let switched = style_switch::switch_style(
            surface,
            &mut state.registry,
            &theme.style_url,
            state.derived.as_ref(),
            &state.visibility,
            timing,
        )
        .await;

        let result = match switched {
            Ok(()) => {
                info!("Switched to {} theme", theme.name);
                state.theme = theme;
                state.style_stale = false;
                state
                    .reassert()
                    .map(|()| SwitchOutcome::Applied)
                    .map_err(EngineError::StyleSwitch)
            }
            Err(e) => {
                warn!("Switch to {} theme failed, restoring {}: {}", theme.name, state.theme.name, e);
                let restored = style_switch::switch_style(
                    surface,
                    &mut state.registry,
                    &state.theme.style_url,
                    state.derived.as_ref(),
                    &state.visibility,
                    timing,
                )
                .await;
                if let Err(restore_err) = restored {
                    error!("Failed to restore {} theme: {}", state.theme.name, restore_err);
                    state.style_stale = true;
                }
                if let Err(marker_err) = state.reassert() {
                    warn!("Failed to restore markers after failed switch: {}", marker_err);
                }
                Err(e)
            }
        };

        self.status
            .send_modify(|status| status.requested_theme = state.theme.id.clone());
        self.publish(state);
        result.map_err(|e| self.fail(e))
    }

    /// Move to `mode`. Entering the globe is animated in place; leaving it
    /// rebuilds the surface at the current camera.
    pub async fn set_projection(&self, mode: ProjectionMode) -> Result<SwitchOutcome, EngineError> {
        let Some(_busy) = self.busy.try_acquire() else {
            warn!("Ignoring projection change to {} while another switch is running", mode);
            return Ok(SwitchOutcome::Rejected);
        };

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let outcome = match projection::strategy(state.projection, mode) {
            TransitionStrategy::Unchanged => return Ok(SwitchOutcome::Unchanged),
            TransitionStrategy::Smooth => self.smooth_projection(state, mode).await,
            TransitionStrategy::Rebuild => self.rebuild_projection(state, mode).await,
        };
        self.publish(state);
        outcome.map_err(|e| self.fail(e))
    }

    pub async fn toggle_projection(&self) -> Result<SwitchOutcome, EngineError> {
        let current = self.state.lock().await.projection;
        self.set_projection(current.toggled()).await
    }

    async fn smooth_projection(
        &self,
        state: &mut EngineState<F::Surface>,
        mode: ProjectionMode,
    ) -> Result<SwitchOutcome, EngineError> {
        let Some(surface) = state.surface.as_mut() else {
            return Err(EngineError::NoSurface);
        };
        projection::smooth(surface, mode, &self.config.projection_transition).await?;
        state.camera = surface.camera();
        state.projection = mode;
        Ok(SwitchOutcome::Applied)
    }

    async fn rebuild_projection(
        &self,
        state: &mut EngineState<F::Surface>,
        mode: ProjectionMode,
    ) -> Result<SwitchOutcome, EngineError> {
        let Some(old) = state.surface.take() else {
            return Err(EngineError::NoSurface);
        };
        let camera = old.camera();
        state.camera = camera;
        projection::teardown(old, &mut state.markers);

        info!("Rebuilding map for {} projection", mode);
        let options = SurfaceOptions {
            style_url: state.theme.style_url.clone(),
            camera,
            projection: mode,
        };
        match self.build_surface(state, &options).await {
            Ok(()) => {
                state.projection = mode;
                Ok(SwitchOutcome::Applied)
            }
            Err(EngineError::Surface(e) | EngineError::StyleSwitch(e)) => Err(EngineError::Rebuild(e)),
            Err(e) => Err(e),
        }
    }

    async fn update_criteria(&self, update: impl FnOnce(&mut FilterCriteria)) -> Result<(), EngineError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        update(&mut state.criteria);
        state.refilter();

        if state.registry.state().data_loaded {
            if let (Some(surface), Some(data)) = (state.surface.as_mut(), state.derived.as_ref()) {
                state
                    .registry
                    .install_data(surface, data)
                    .map_err(|e| self.fail(e.into()))?;
            }
        }
        debug!(
            "Filter applied, {} features visible",
            state.derived.as_ref().map_or(0, |d| d.len())
        );
        self.publish(state);
        Ok(())
    }

    /// Replace the filter criteria and reinstall the derived dataset.
    pub async fn update_filter(&self, criteria: FilterCriteria) -> Result<(), EngineError> {
        self.update_criteria(|current| *current = criteria).await
    }

    pub async fn set_time_range(&self, range: Option<TimeRange>) -> Result<(), EngineError> {
        self.update_criteria(|current| current.time_range = range).await
    }

    pub async fn set_report_subfilters(&self, reports: ReportSubfilters) -> Result<(), EngineError> {
        self.update_criteria(|current| current.reports = reports).await
    }

    pub async fn set_rfi_subfilters(&self, rfis: RfiSubfilters) -> Result<(), EngineError> {
        self.update_criteria(|current| current.rfis = rfis).await
    }

    pub async fn filter(&self) -> FilterCriteria {
        self.state.lock().await.criteria
    }

    pub async fn set_layer_visibility(&self, group: LayerGroup, visible: bool) -> Result<(), EngineError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.visibility.set(group, visible);
        if let Some(surface) = state.surface.as_mut() {
            state
                .registry
                .set_group_visibility(surface, group, visible)
                .map_err(|e| self.fail(e.into()))?;
        }
        Ok(())
    }

    pub async fn layer_visibility(&self) -> LayerVisibility {
        self.state.lock().await.visibility
    }

    /// Select `feature` and highlight it with its related features.
    pub async fn select_feature(&self, feature: &Feature) -> Result<(), EngineError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let result = state.apply_selection(SelectionState::select(feature));
        self.publish(state);
        result.map_err(|e| self.fail(e.into()))
    }

    /// Select a feature of the base dataset by id, e.g. from search.
    /// Returns `false` when no such feature exists.
    pub async fn select_feature_by_id(&self, id: &str) -> Result<bool, EngineError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let Some(feature) = state.feature(id) else {
            debug!("No feature {} to select", id);
            return Ok(false);
        };
        let result = state.apply_selection(SelectionState::select(&feature));
        self.publish(state);
        result.map(|()| true).map_err(|e| self.fail(e.into()))
    }

    pub async fn clear_selection(&self) -> Result<(), EngineError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let result = state.apply_selection(SelectionState::default());
        self.publish(state);
        result.map_err(|e| self.fail(e.into()))
    }

    pub async fn selection(&self) -> SelectionState {
        self.state.lock().await.selection.clone()
    }

    /// Deliver a renderer callback.
    pub async fn handle_event(&self, event: SurfaceEvent) -> Result<(), EngineError> {
        match event {
            SurfaceEvent::Click { point } => {
                let mut guard = self.state.lock().await;
                let state = &mut *guard;
                let Some(surface) = state.surface.as_ref() else {
                    return Ok(());
                };
                let selection = match state.registry.dispatch_click(surface, point) {
                    ClickTarget::Feature(hit) => match state.feature(&hit.feature_id) {
                        Some(feature) => SelectionState::select(&feature),
                        None => {
                            warn!("Clicked feature {} is not in the dataset", hit.feature_id);
                            SelectionState::default()
                        }
                    },
                    ClickTarget::Empty => SelectionState::default(),
                };
                let result = state.apply_selection(selection);
                self.publish(state);
                result.map_err(|e| self.fail(e.into()))
            }
            SurfaceEvent::MouseMove { coordinate } => {
                self.status
                    .send_modify(|status| status.pointer = Some(coordinate));
                Ok(())
            }
            SurfaceEvent::MouseLeave => {
                self.status.send_modify(|status| status.pointer = None);
                Ok(())
            }
            SurfaceEvent::MarkerClick { marker_id } => self.select_marker(&marker_id).await.map(|_| ()),
            SurfaceEvent::SymbolPlacementFailed { layer_id } => {
                let mut guard = self.state.lock().await;
                let state = &mut *guard;
                let Some(surface) = state.surface.as_mut() else {
                    return Ok(());
                };
                let replaced = state
                    .registry
                    .degrade_symbol_layer(surface, &layer_id, &state.visibility)
                    .map_err(|e| self.fail(e.into()))?;
                if replaced {
                    highlight::apply(surface, &state.registry, &state.selection)
                        .map_err(|e| self.fail(e.into()))?;
                }
                Ok(())
            }
            SurfaceEvent::Error { message } => {
                error!("Map error: {}", message);
                self.status
                    .send_modify(|status| status.error = Some(format!("Map error: {message}")));
                Ok(())
            }
        }
    }

    /// Fly the camera to `center`, optionally changing zoom.
    pub async fn fly_to(&self, center: Coordinate, zoom: Option<f64>) -> Result<(), EngineError> {
        let mut guard = self.state.lock().await;
        let Some(surface) = guard.surface.as_mut() else {
            return Err(EngineError::NoSurface);
        };
        surface.fly_to(&CameraMove {
            center: Some(center),
            zoom,
            duration: self.config.fly_duration(),
        });
        Ok(())
    }

    /// Fly to a marker. Returns `false` for an unknown id.
    pub async fn fly_to_marker(&self, id: &str) -> Result<bool, EngineError> {
        let coordinate = {
            let state = self.state.lock().await;
            state
                .marker_records
                .iter()
                .find(|r| r.id == id)
                .map(|r| r.coordinate)
        };
        match coordinate {
            Some(coordinate) => {
                self.fly_to(coordinate, Some(self.config.marker_zoom)).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the fixed-asset marker list. Markers are recreated when the
    /// list allocation changes.
    pub async fn set_markers(&self, records: Arc<Vec<MarkerRecord>>) -> Result<(), EngineError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.marker_records = records;
        if state
            .selected_marker
            .as_ref()
            .is_some_and(|id| !state.marker_records.iter().any(|r| &r.id == id))
        {
            state.selected_marker = None;
        }
        let result = Self::sync_markers(state);
        self.publish(state);
        result.map_err(|e| self.fail(e.into()))
    }

    /// Emphasize marker `id`. Returns `false` for an unknown id.
    pub async fn select_marker(&self, id: &str) -> Result<bool, EngineError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.marker_records.iter().any(|r| r.id == id) {
            return Ok(false);
        }
        state.selected_marker = Some(id.to_string());
        let result = Self::sync_markers(state);
        self.publish(state);
        result.map(|()| true).map_err(|e| self.fail(e.into()))
    }

    pub async fn deselect_marker(&self) -> Result<(), EngineError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.selected_marker = None;
        let result = Self::sync_markers(state);
        self.publish(state);
        result.map_err(|e| self.fail(e.into()))
    }

    fn sync_markers(state: &mut EngineState<F::Surface>) -> Result<(), SurfaceError> {
        match state.surface.as_mut() {
            Some(surface) => state
                .markers
                .sync(surface, &state.marker_records, state.selected_marker.as_deref()),
            None => Ok(()),
        }
    }

    /// The base dataset, once fetched.
    pub async fn dataset(&self) -> Option<Arc<FeatureCollection>> {
        self.state.lock().await.dataset.base().cloned()
    }

    /// The dataset currently installed on the surface.
    pub async fn derived(&self) -> Option<Arc<FeatureCollection>> {
        self.state.lock().await.derived.clone()
    }

    /// Search the base dataset by name or id.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let state = self.state.lock().await;
        state
            .dataset
            .base()
            .map(|base| search(base, query, limit))
            .unwrap_or_default()
    }
}

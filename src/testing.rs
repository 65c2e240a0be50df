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

//! In-memory renderer for tests.
//!
//! [`RecordingSurface`] is a cloneable handle onto a shared [`SurfaceLog`],
//! so a test can keep inspecting a surface after handing it to the engine.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use geoint_features::{Coordinate, FeatureCollection};

use crate::error::SurfaceError;
use crate::markers::{MarkerSpec, MarkerStyle};
use crate::surface::{
    Atmosphere, CameraMove, CameraState, IconImage, LayerKind, LayerSpec, ListenerId, ListenerKind,
    MapSurface, MarkerHandle, ProjectionMode, RenderedFeature, ScreenPoint, StyleValue,
    SurfaceEvent, SurfaceFactory, SurfaceOptions,
};

const SAMPLE: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "geometry": {"type": "Point", "coordinates": [54.40, 24.45]},
         "properties": {"id": "Q1", "type": "RFI", "title": "Port activity", "priority": "High",
                        "date_created": "2024-03-02T08:00:00Z",
                        "assigned_targets": ["T1", "T2"], "related_reports": ["R5"]}},
        {"type": "Feature",
         "geometry": {"type": "Polygon", "coordinates": [[[54.0, 24.0], [54.2, 24.0], [54.2, 24.2], [54.0, 24.2], [54.0, 24.0]]]},
         "properties": {"id": "Q2", "type": "RFI", "title": "Coastal sweep", "priority": "Low",
                        "date_created": "2024-03-05T08:00:00Z", "assigned_targets": "[\"T2\"]"}},
        {"type": "Feature", "geometry": {"type": "Point", "coordinates": [54.38, 24.47]},
         "properties": {"id": "R5", "type": "Report", "title": "Vessel sighting", "source": "System",
                        "timestamp": "2024-03-03T12:00:00Z", "related_targets": ["T1"], "related_rfis": ["Q1"]}},
        {"type": "Feature", "geometry": {"type": "Point", "coordinates": [54.36, 24.49]},
         "properties": {"id": "R6", "type": "Report", "title": "Archive note", "source": "Legacy",
                        "timestamp": "2023-11-20T12:00:00Z"}},
        {"type": "Feature", "geometry": {"type": "Point", "coordinates": [54.41, 24.43]},
         "properties": {"id": "T1", "type": "Target", "target_name": "Harbor crane",
                        "related_rfis": ["Q1"], "related_reports": ["R5"]}},
        {"type": "Feature", "geometry": {"type": "Point", "coordinates": [54.42, 24.44]},
         "properties": {"id": "T2", "type": "Target", "target_name": "Fuel depot"}},
        {"type": "Feature",
         "geometry": {"type": "Polygon", "coordinates": [[[53.9, 23.9], [54.6, 23.9], [54.6, 24.6], [53.9, 24.6], [53.9, 23.9]]]},
         "properties": {"id": "B1", "type": "Layer", "layer_name": "Area of interest"}}
    ]
}"#;

/// Small dataset covering every feature kind and cross-reference form.
pub fn sample_collection() -> FeatureCollection {
    FeatureCollection::from_geojson_str(SAMPLE).unwrap()
}

pub fn sample_geojson() -> &'static str {
    SAMPLE
}

/// Everything a [`RecordingSurface`] has been asked to do.
#[derive(Debug)]
pub struct SurfaceLog {
    pub styles: Vec<String>,
    pub sources: HashMap<String, FeatureCollection>,
    pub source_writes: usize,
    pub layers: Vec<LayerSpec>,
    pub layer_adds: usize,
    pub paint: HashMap<(String, String), StyleValue>,
    pub layout: HashMap<(String, String), StyleValue>,
    pub images: HashSet<String>,
    pub image_loads: Vec<String>,
    pub image_adds: usize,
    pub failing_images: HashSet<String>,
    /// Image url -> name registered by someone else while the url loads
    pub racing_images: HashMap<String, String>,
    pub listeners: Vec<(ListenerKind, Vec<String>)>,
    pub hits: Vec<RenderedFeature>,
    pub camera: CameraState,
    pub projection: ProjectionMode,
    pub fog: Option<Atmosphere>,
    pub fog_calls: usize,
    pub eases: Vec<CameraMove>,
    pub flights: Vec<CameraMove>,
    pub projection_changes: Vec<ProjectionMode>,
    pub markers: BTreeMap<u64, MarkerSpec>,
    pub markers_created: usize,
    pub marker_updates: usize,
    pub controls_removed: bool,
    pub released: bool,
    pub ready_delay: Option<Duration>,
    pub never_ready: bool,
    pub reject_symbol_layers: bool,
    pub reject_projection: bool,
    /// Upcoming `add_layer` calls that fail regardless of kind
    pub fail_layer_adds: usize,
    next_id: u64,
}

impl SurfaceLog {
    fn new(options: &SurfaceOptions) -> Self {
        Self {
            styles: vec![options.style_url.clone()],
            sources: HashMap::new(),
            source_writes: 0,
            layers: Vec::new(),
            layer_adds: 0,
            paint: HashMap::new(),
            layout: HashMap::new(),
            images: HashSet::new(),
            image_loads: Vec::new(),
            image_adds: 0,
            failing_images: HashSet::new(),
            racing_images: HashMap::new(),
            listeners: Vec::new(),
            hits: Vec::new(),
            camera: options.camera,
            projection: options.projection,
            fog: None,
            fog_calls: 0,
            eases: Vec::new(),
            flights: Vec::new(),
            projection_changes: Vec::new(),
            markers: BTreeMap::new(),
            markers_created: 0,
            marker_updates: 0,
            controls_removed: false,
            released: false,
            ready_delay: None,
            never_ready: false,
            reject_symbol_layers: false,
            reject_projection: false,
            fail_layer_adds: 0,
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn paint_value(&self, layer: &str, name: &str) -> Option<StyleValue> {
        self.paint.get(&(layer.to_string(), name.to_string())).cloned()
    }

    pub fn layout_value(&self, layer: &str, name: &str) -> Option<StyleValue> {
        self.layout.get(&(layer.to_string(), name.to_string())).cloned()
    }

    pub fn count_listeners(&self, kind: ListenerKind) -> usize {
        self.listeners.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn current_style(&self) -> &str {
        self.styles.last().map_or("", String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct RecordingSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::with_options(&SurfaceOptions {
            style_url: "mapbox://styles/mapbox/satellite-streets-v12".to_string(),
            camera: CameraState::new(Coordinate::new(54.3773, 24.4539), 8.0),
            projection: ProjectionMode::Globe,
        })
    }

    pub fn with_options(options: &SurfaceOptions) -> Self {
        Self {
            log: Arc::new(Mutex::new(SurfaceLog::new(options))),
        }
    }

    pub fn log(&self) -> MutexGuard<'_, SurfaceLog> {
        self.log.lock().unwrap()
    }

    /// What the renderer would deliver for a click: one event per listener.
    pub fn click(&self, point: ScreenPoint) -> Vec<SurfaceEvent> {
        let count = self.log().count_listeners(ListenerKind::Click);
        (0..count).map(|_| SurfaceEvent::Click { point }).collect()
    }

    fn record_layer(log: &mut SurfaceLog, layer: &LayerSpec) {
        for (name, value) in &layer.paint {
            log.paint
                .insert((layer.id.clone(), (*name).to_string()), value.clone());
        }
        for (name, value) in &layer.layout {
            log.layout
                .insert((layer.id.clone(), (*name).to_string()), value.clone());
        }
        log.layers.push(layer.clone());
        log.layer_adds += 1;
    }
}

#[async_trait]
impl MapSurface for RecordingSurface {
    fn has_source(&self, id: &str) -> bool {
        self.log().sources.contains_key(id)
    }

    fn add_source(&mut self, id: &str, data: &FeatureCollection) -> Result<(), SurfaceError> {
        let mut log = self.log();
        if log.sources.contains_key(id) {
            return Err(SurfaceError::Rejected {
                operation: "add_source",
                message: format!("source {id} already exists"),
            });
        }
        log.sources.insert(id.to_string(), data.clone());
        log.source_writes += 1;
        Ok(())
    }

    fn set_source_data(&mut self, id: &str, data: &FeatureCollection) -> Result<(), SurfaceError> {
        let mut log = self.log();
        let Some(source) = log.sources.get_mut(id) else {
            return Err(SurfaceError::MissingSource(id.to_string()));
        };
        *source = data.clone();
        log.source_writes += 1;
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.log().layer(id).is_some()
    }

    fn add_layer(&mut self, layer: &LayerSpec) -> Result<(), SurfaceError> {
        let mut log = self.log();
        if log.layer(&layer.id).is_some() {
            return Err(SurfaceError::Rejected {
                operation: "add_layer",
                message: format!("layer {} already exists", layer.id),
            });
        }
        if !log.sources.contains_key(&layer.source) {
            return Err(SurfaceError::MissingSource(layer.source.clone()));
        }
        if log.fail_layer_adds > 0 {
            log.fail_layer_adds -= 1;
            return Err(SurfaceError::Rejected {
                operation: "add_layer",
                message: "injected failure".to_string(),
            });
        }
        if log.reject_symbol_layers && layer.kind == LayerKind::Symbol {
            return Err(SurfaceError::Rejected {
                operation: "add_layer",
                message: "symbol placement unavailable".to_string(),
            });
        }
        Self::record_layer(&mut log, layer);
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError> {
        let mut log = self.log();
        let Some(index) = log.layers.iter().position(|l| l.id == id) else {
            return Err(SurfaceError::MissingLayer(id.to_string()));
        };
        log.layers.remove(index);
        log.paint.retain(|(layer, _), _| layer != id);
        log.layout.retain(|(layer, _), _| layer != id);
        Ok(())
    }

    fn set_paint_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: &StyleValue,
    ) -> Result<(), SurfaceError> {
        let mut log = self.log();
        if log.layer(layer_id).is_none() {
            return Err(SurfaceError::MissingLayer(layer_id.to_string()));
        }
        log.paint
            .insert((layer_id.to_string(), name.to_string()), value.clone());
        Ok(())
    }

    fn set_layout_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: &StyleValue,
    ) -> Result<(), SurfaceError> {
        let mut log = self.log();
        if log.layer(layer_id).is_none() {
            return Err(SurfaceError::MissingLayer(layer_id.to_string()));
        }
        log.layout
            .insert((layer_id.to_string(), name.to_string()), value.clone());
        Ok(())
    }

    fn has_image(&self, name: &str) -> bool {
        self.log().images.contains(name)
    }

    async fn load_image(&mut self, url: &str) -> Result<IconImage, SurfaceError> {
        let failing = {
            let mut log = self.log();
            log.image_loads.push(url.to_string());
            log.failing_images.contains(url)
        };
        tokio::task::yield_now().await;
        {
            let mut log = self.log();
            if let Some(name) = log.racing_images.remove(url) {
                log.images.insert(name);
            }
        }
        if failing {
            return Err(SurfaceError::ImageLoad {
                url: url.to_string(),
                message: "404 Not Found".to_string(),
            });
        }
        Ok(IconImage {
            width: 1,
            height: 1,
            pixels: Arc::from(vec![255_u8; 4]),
        })
    }

    fn add_image(&mut self, name: &str, _image: &IconImage) -> Result<(), SurfaceError> {
        let mut log = self.log();
        log.image_adds += 1;
        if !log.images.insert(name.to_string()) {
            return Err(SurfaceError::Rejected {
                operation: "add_image",
                message: format!("image {name} already exists"),
            });
        }
        Ok(())
    }

    fn on(&mut self, kind: ListenerKind, layers: &[String]) -> Result<ListenerId, SurfaceError> {
        let mut log = self.log();
        log.listeners.push((kind, layers.to_vec()));
        Ok(ListenerId(log.next_id()))
    }

    fn query_rendered_features(&self, _point: ScreenPoint, layers: &[String]) -> Vec<RenderedFeature> {
        let log = self.log();
        log.hits
            .iter()
            .filter(|hit| layers.contains(&hit.layer_id) && log.layer(&hit.layer_id).is_some())
            .cloned()
            .collect()
    }

    fn camera(&self) -> CameraState {
        self.log().camera
    }

    fn ease_to(&mut self, target: &CameraMove) {
        let mut log = self.log();
        if let Some(center) = target.center {
            log.camera.center = center;
        }
        if let Some(zoom) = target.zoom {
            log.camera.zoom = zoom;
        }
        log.eases.push(*target);
    }

    fn fly_to(&mut self, target: &CameraMove) {
        let mut log = self.log();
        if let Some(center) = target.center {
            log.camera.center = center;
        }
        if let Some(zoom) = target.zoom {
            log.camera.zoom = zoom;
        }
        log.flights.push(*target);
    }

    fn set_fog(&mut self, atmosphere: Option<&Atmosphere>) {
        let mut log = self.log();
        log.fog = atmosphere.cloned();
        log.fog_calls += 1;
    }

    fn projection(&self) -> ProjectionMode {
        self.log().projection
    }

    fn set_projection(&mut self, mode: ProjectionMode) -> Result<(), SurfaceError> {
        let mut log = self.log();
        if log.reject_projection {
            return Err(SurfaceError::Rejected {
                operation: "set_projection",
                message: format!("{mode} projection unsupported"),
            });
        }
        log.projection = mode;
        log.projection_changes.push(mode);
        Ok(())
    }

    fn set_style(&mut self, style_url: &str) -> Result<(), SurfaceError> {
        let mut log = self.log();
        log.styles.push(style_url.to_string());
        log.sources.clear();
        log.layers.clear();
        log.paint.clear();
        log.layout.clear();
        log.images.clear();
        Ok(())
    }

    async fn style_ready(&mut self) -> Result<(), SurfaceError> {
        let (never, delay) = {
            let log = self.log();
            (log.never_ready, log.ready_delay)
        };
        if never {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    fn add_marker(&mut self, spec: &MarkerSpec) -> Result<MarkerHandle, SurfaceError> {
        let mut log = self.log();
        let id = log.next_id();
        log.markers.insert(id, spec.clone());
        log.markers_created += 1;
        Ok(MarkerHandle(id))
    }

    fn update_marker(&mut self, handle: MarkerHandle, style: &MarkerStyle) -> Result<(), SurfaceError> {
        let mut log = self.log();
        let Some(marker) = log.markers.get_mut(&handle.0) else {
            return Err(SurfaceError::Rejected {
                operation: "update_marker",
                message: format!("unknown marker {}", handle.0),
            });
        };
        marker.style = style.clone();
        log.marker_updates += 1;
        Ok(())
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        self.log().markers.remove(&handle.0);
    }

    fn remove_controls(&mut self) {
        self.log().controls_removed = true;
    }

    fn release(&mut self) {
        let mut log = self.log();
        log.released = true;
        log.sources.clear();
        log.layers.clear();
        log.markers.clear();
    }
}

/// Factory handing out [`RecordingSurface`]s and keeping a handle to each.
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    created: Arc<Mutex<Vec<RecordingSurface>>>,
    fail_next: Arc<AtomicBool>,
    never_ready_next: Arc<AtomicBool>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> Vec<RecordingSurface> {
        self.created.lock().unwrap().clone()
    }

    pub fn latest(&self) -> RecordingSurface {
        self.created().last().cloned().unwrap()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn never_ready_next(&self) {
        self.never_ready_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SurfaceFactory for RecordingFactory {
    type Surface = RecordingSurface;

    async fn create(&self, options: &SurfaceOptions) -> Result<RecordingSurface, SurfaceError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SurfaceError::Construction("WebGL context lost".to_string()));
        }
        let surface = RecordingSurface::with_options(options);
        {
            let mut log = surface.log();
            log.never_ready = self.never_ready_next.swap(false, Ordering::SeqCst);
        }
        self.created.lock().unwrap().push(surface.clone());
        Ok(surface)
    }
}

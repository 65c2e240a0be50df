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

//! Feature model for the intelligence map dashboard.
//!
//! This library turns a GeoJSON `FeatureCollection` of RFIs, reports, targets
//! and boundary layers into a strongly typed collection, and provides the
//! renderer-independent pieces that operate on it:
//!
//! - **Model layer**: ingestion and normalization of loosely typed properties
//!   (cross references arrive as JSON arrays or as arrays serialized to text)
//! - **Filter layer**: the pure pipeline deriving a renderer-ready collection
//!   from the base collection and the current filter criteria
//! - **Relations layer**: one-hop relationship extraction for highlighting
//! - **Search layer**: name/id lookup used by search boxes and fly-to
//!
//! # Quick Start
//!
//! ```
//! use geoint_features::{derive, FeatureCollection, FilterCriteria};
//!
//! let json = r#"{
//!   "type": "FeatureCollection",
//!   "features": [
//!     {"type": "Feature",
//!      "geometry": {"type": "Point", "coordinates": [54.37, 24.45]},
//!      "properties": {"id": "R1", "type": "Report", "source": "Legacy"}},
//!     {"type": "Feature",
//!      "geometry": {"type": "Point", "coordinates": [54.38, 24.46]},
//!      "properties": {"id": "T1", "type": "Target"}}
//!   ]
//! }"#;
//!
//! let base = FeatureCollection::from_geojson_str(json).unwrap();
//! let mut criteria = FilterCriteria::default();
//! criteria.reports.legacy = false;
//!
//! let derived = derive(&base, &criteria);
//! assert_eq!(derived.len(), 1);
//! assert!(derived.get("T1").is_some());
//! ```

pub mod filter;
pub mod model;
pub mod relations;
pub mod search;

/// Re-exported for building [`TimeRange`] values.
pub use chrono;
pub use filter::{derive, FilterCriteria, ReportSubfilters, RfiSubfilters, TimeRange};
pub use model::{
    Coordinate, CrossReferences, Feature, FeatureCollection, FeatureError, FeatureKind, Geometry,
    GeometryKind, Priority,
};
pub use relations::related_ids;
pub use search::{search, SearchHit};

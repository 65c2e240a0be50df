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

//! Filtering pipeline.
//!
//! [`derive`] is pure: it never touches the base collection and always
//! returns a new collection object. Rules are applied in order:
//!
//! 1. time range (Targets and undated features always pass)
//! 2. report source subfilters
//! 3. RFI priority subfilters

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Feature, FeatureCollection, FeatureKind, Priority};

/// Inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range; bounds given in the wrong order are swapped.
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Report source toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSubfilters {
    pub system: bool,
    pub legacy: bool,
}

impl Default for ReportSubfilters {
    fn default() -> Self {
        Self {
            system: true,
            legacy: true,
        }
    }
}

/// RFI priority toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfiSubfilters {
    pub high: bool,
    pub medium: bool,
    pub low: bool,
}

impl Default for RfiSubfilters {
    fn default() -> Self {
        Self {
            high: true,
            medium: true,
            low: true,
        }
    }
}

impl RfiSubfilters {
    fn allows(self, priority: Priority) -> bool {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }
}

/// Filter state owned by the UI; the pipeline only reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub time_range: Option<TimeRange>,
    pub reports: ReportSubfilters,
    pub rfis: RfiSubfilters,
}

/// Apply `criteria` to `base`, producing a fresh collection.
#[must_use]
pub fn derive(base: &FeatureCollection, criteria: &FilterCriteria) -> FeatureCollection {
    base.iter()
        .filter(|feature| keep(feature, criteria))
        .map(Arc::clone)
        .collect()
}

fn keep(feature: &Feature, criteria: &FilterCriteria) -> bool {
    if let (Some(range), Some(ts)) = (criteria.time_range, feature.timestamp) {
        if feature.kind != FeatureKind::Target && !range.contains(ts) {
            return false;
        }
    }

    match feature.kind {
        FeatureKind::Report => match feature.source.as_deref() {
            Some(source) if source.eq_ignore_ascii_case("system") => criteria.reports.system,
            Some(source) if source.eq_ignore_ascii_case("legacy") => criteria.reports.legacy,
            _ => true,
        },
        FeatureKind::Rfi => feature
            .priority
            .map_or(true, |priority| criteria.rfis.allows(priority)),
        FeatureKind::Target | FeatureKind::Layer => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, CrossReferences, Geometry};
    use chrono::TimeZone;
    use geojson::JsonObject;

    fn feature(id: &str, kind: FeatureKind) -> Feature {
        Feature {
            id: id.to_string(),
            kind,
            geometry: Geometry::Point(Coordinate::new(54.37, 24.45)),
            name: None,
            timestamp: None,
            source: None,
            priority: None,
            references: CrossReferences::default(),
            properties: JsonObject::new(),
        }
    }

    fn at(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).unwrap()
    }

    fn report(id: &str, source: &str) -> Feature {
        Feature {
            source: Some(source.to_string()),
            ..feature(id, FeatureKind::Report)
        }
    }

    fn collection(features: Vec<Feature>) -> FeatureCollection {
        features.into_iter().map(Arc::new).collect()
    }

    #[test]
    fn test_report_source_scenario() {
        // 10 features: 3 System reports, 2 Legacy reports, 5 others
        let base = collection(vec![
            report("S1", "System"),
            report("S2", "System"),
            report("S3", "System"),
            report("L1", "Legacy"),
            report("L2", "Legacy"),
            feature("Q1", FeatureKind::Rfi),
            feature("Q2", FeatureKind::Rfi),
            feature("T1", FeatureKind::Target),
            feature("T2", FeatureKind::Target),
            feature("B1", FeatureKind::Layer),
        ]);

        let criteria = FilterCriteria {
            reports: ReportSubfilters {
                system: false,
                legacy: true,
            },
            ..Default::default()
        };

        let derived = derive(&base, &criteria);
        assert_eq!(derived.count_kind(FeatureKind::Report), 2);
        assert!(derived.get("L1").is_some());
        assert!(derived.get("L2").is_some());
        assert_eq!(derived.len(), 7);
        // base untouched
        assert_eq!(base.len(), 10);
    }

    #[test]
    fn test_legacy_absent_iff_flag_off() {
        let base = collection(vec![report("L1", "Legacy"), report("S1", "System")]);
        for legacy in [true, false] {
            let criteria = FilterCriteria {
                reports: ReportSubfilters {
                    system: true,
                    legacy,
                },
                ..Default::default()
            };
            assert_eq!(derive(&base, &criteria).get("L1").is_some(), legacy);
        }
    }

    #[test]
    fn test_targets_exempt_from_time_range() {
        let old_target = Feature {
            timestamp: Some(at(2001)),
            ..feature("T1", FeatureKind::Target)
        };
        let old_rfi = Feature {
            timestamp: Some(at(2001)),
            ..feature("Q1", FeatureKind::Rfi)
        };
        let new_rfi = Feature {
            timestamp: Some(at(2024)),
            ..feature("Q2", FeatureKind::Rfi)
        };
        let undated = feature("B1", FeatureKind::Layer);
        let base = collection(vec![old_target, old_rfi, new_rfi, undated]);

        let criteria = FilterCriteria {
            time_range: Some(TimeRange::new(at(2020), at(2025))),
            ..Default::default()
        };
        let derived = derive(&base, &criteria);

        assert!(derived.get("T1").is_some());
        assert!(derived.get("Q1").is_none());
        assert!(derived.get("Q2").is_some());
        assert!(derived.get("B1").is_some());
    }

    #[test]
    fn test_time_range_bounds_are_inclusive() {
        let range = TimeRange::new(at(2025), at(2020));
        assert_eq!(range.start, at(2020));
        assert!(range.contains(at(2020)));
        assert!(range.contains(at(2025)));
        assert!(!range.contains(at(2026)));
    }

    #[test]
    fn test_rfi_priority_subfilters() {
        let with_priority = |id: &str, priority| Feature {
            priority: Some(priority),
            ..feature(id, FeatureKind::Rfi)
        };
        let base = collection(vec![
            with_priority("H", Priority::High),
            with_priority("M", Priority::Medium),
            with_priority("L", Priority::Low),
            feature("U", FeatureKind::Rfi),
            report("R", "System"),
        ]);

        let criteria = FilterCriteria {
            rfis: RfiSubfilters {
                high: true,
                medium: false,
                low: false,
            },
            ..Default::default()
        };
        let derived = derive(&base, &criteria);

        assert!(derived.get("H").is_some());
        assert!(derived.get("M").is_none());
        assert!(derived.get("L").is_none());
        // untagged RFIs and non-RFI features are unaffected
        assert!(derived.get("U").is_some());
        assert!(derived.get("R").is_some());
    }
}

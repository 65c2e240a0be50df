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

//! Dataset search for search boxes and fly-to.

use crate::model::{Coordinate, FeatureCollection, FeatureKind};

/// A search result the UI can fly to and select.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub kind: FeatureKind,
    pub name: String,
    pub anchor: Coordinate,
}

/// Case-insensitive match on display name or identifier, in dataset order.
#[must_use]
pub fn search(collection: &FeatureCollection, query: &str, limit: usize) -> Vec<SearchHit> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    collection
        .iter()
        .filter_map(|feature| {
            let name = feature.display_name();
            let matches = name.to_lowercase().contains(&query)
                || feature.id.to_lowercase().contains(&query);
            if !matches {
                return None;
            }
            feature.anchor().map(|anchor| SearchHit {
                id: feature.id.clone(),
                kind: feature.kind,
                name,
                anchor,
            })
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [54.1, 24.1]},
             "properties": {"id": "T1", "type": "Target", "target_name": "Harbor Crane"}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [54.2, 24.2]},
             "properties": {"id": "R5", "type": "Report", "title": "Harbor activity"}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [54.3, 24.3]},
             "properties": {"id": "Q1", "type": "RFI"}}
        ]
    }"#;

    #[test]
    fn test_search_by_name() {
        let data = FeatureCollection::from_geojson_str(DATA).unwrap();
        let hits = search(&data, "HARBOR", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "T1");
        assert_eq!(hits[0].name, "Harbor Crane");
        assert_eq!(hits[1].kind, FeatureKind::Report);
    }

    #[test]
    fn test_search_falls_back_to_id_and_limits() {
        let data = FeatureCollection::from_geojson_str(DATA).unwrap();
        let hits = search(&data, "q1", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "RFI Q1");

        assert_eq!(search(&data, "harbor", 1).len(), 1);
        assert!(search(&data, "  ", 10).is_empty());
    }
}

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

//! Relationship extraction for selection highlighting.
//!
//! Traversal is one hop: the related set is the selected feature plus the
//! identifiers it names directly. References of the referenced features are
//! not followed.

use std::collections::BTreeSet;

use crate::model::{Feature, FeatureKind};

/// Reference lists consulted for each kind.
fn reference_lists(feature: &Feature) -> [&[String]; 2] {
    let refs = &feature.references;
    match feature.kind {
        FeatureKind::Rfi => [
            refs.assigned_targets.as_slice(),
            refs.related_reports.as_slice(),
        ],
        FeatureKind::Report => [refs.related_targets.as_slice(), refs.related_rfis.as_slice()],
        FeatureKind::Target => [refs.related_rfis.as_slice(), refs.related_reports.as_slice()],
        FeatureKind::Layer => [&[], &[]],
    }
}

/// Identifiers to emphasize when `feature` is selected, including its own.
#[must_use]
pub fn related_ids(feature: &Feature) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    ids.insert(feature.id.clone());
    for list in reference_lists(feature) {
        ids.extend(list.iter().cloned());
    }
    ids
}

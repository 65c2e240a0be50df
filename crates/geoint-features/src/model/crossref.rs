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

//! Cross-reference normalization.
//!
//! Reference fields arrive either as a JSON array or as an array serialized
//! into a string (`"[\"T1\",\"T2\"]"`). Both are folded into an ordered,
//! de-duplicated `Vec<String>`. Entries that cannot be read are skipped.

use log::debug;
use serde_json::Value;

pub(crate) fn normalize(value: Option<&Value>, field: &str, feature_id: &str) -> Vec<String> {
    let mut ids = Vec::new();
    match value {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => collect_items(items, field, feature_id, &mut ids),
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return ids;
            }
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Array(items)) => collect_items(&items, field, feature_id, &mut ids),
                Ok(_) | Err(_) => {
                    debug!("Ignoring unreadable {} on {}: {:?}", field, feature_id, text);
                }
            }
        }
        Some(other) => {
            debug!("Ignoring {} on {}: unexpected {}", field, feature_id, other);
        }
    }
    ids
}

fn collect_items(items: &[Value], field: &str, feature_id: &str, ids: &mut Vec<String>) {
    for item in items {
        let id = match item {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            other => {
                debug!("Skipping {} entry on {}: {}", field, feature_id, other);
                continue;
            }
        };
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }
}

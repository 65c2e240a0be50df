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

//! Pointer coordinate readout formatting.

use geoint_features::Coordinate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateFormat {
    /// Decimal degrees
    #[default]
    Dd,
    /// Degrees, minutes, seconds
    Dms,
}

impl CoordinateFormat {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Dd => Self::Dms,
            Self::Dms => Self::Dd,
        }
    }
}

fn to_dms(decimal: f64, is_longitude: bool) -> String {
    let abs = decimal.abs();
    let degrees = abs.floor();
    let minutes = ((abs - degrees) * 60.0).floor();
    let seconds = ((abs - degrees) * 60.0 - minutes) * 60.0;
    let direction = match (is_longitude, decimal >= 0.0) {
        (true, true) => 'E',
        (true, false) => 'W',
        (false, true) => 'N',
        (false, false) => 'S',
    };
    format!("{degrees}°{minutes}'{seconds:.1}\"{direction}")
}

/// Longitude first, as shown in the map readout.
#[must_use]
pub fn format_coordinate(coordinate: Coordinate, format: CoordinateFormat) -> String {
    match format {
        CoordinateFormat::Dd => format!("{:.6}, {:.6}", coordinate.lng, coordinate.lat),
        CoordinateFormat::Dms => format!(
            "{} {}",
            to_dms(coordinate.lng, true),
            to_dms(coordinate.lat, false)
        ),
    }
}

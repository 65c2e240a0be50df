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

//! Error types for the engine and the renderer boundary.

use std::time::Duration;

use thiserror::Error;

use crate::dataset::DatasetError;

/// Failures reported by a [`crate::surface::MapSurface`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("renderer rejected {operation}: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("source '{0}' does not exist")]
    MissingSource(String),

    #[error("layer '{0}' does not exist")]
    MissingLayer(String),

    #[error("failed to load image {url}: {message}")]
    ImageLoad { url: String, message: String },

    #[error("surface construction failed: {0}")]
    Construction(String),

    #[error("surface has been released")]
    Released,
}

/// Structural engine failures surfaced to the UI.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("dataset unavailable: {0}")]
    Dataset(#[from] DatasetError),

    #[error("map style did not become ready within {0:?}")]
    StyleTimeout(Duration),

    #[error("style switch failed: {0}")]
    StyleSwitch(#[source] SurfaceError),

    #[error("projection rebuild failed: {0}")]
    Rebuild(#[source] SurfaceError),

    #[error("renderer error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("map surface is not initialized")]
    NoSurface,

    #[error("unknown theme '{0}'")]
    UnknownTheme(String),

    #[error("configuration error: {0}")]
    Config(#[from] confy::ConfyError),
}

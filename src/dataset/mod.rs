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

//! Dataset cache.
//!
//! The base collection is fetched once per session from a local file or an
//! HTTP URL and then shared read-only behind an `Arc`.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use geoint_features::{FeatureCollection, FeatureError, FeatureKind};
use log::{debug, info};
use thiserror::Error;

/// Errors that can occur while fetching the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid dataset: {0}")]
    Parse(#[from] FeatureError),
}

/// Where the dataset lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Path(PathBuf),
    Url(String),
}

impl DatasetSource {
    /// `http://` and `https://` locations are fetched, anything else is a path.
    #[must_use]
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::Path(PathBuf::from(location))
        }
    }

    async fn read(&self) -> Result<String, DatasetError> {
        match self {
            Self::Path(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|source| DatasetError::Io {
                    path: path.clone(),
                    source,
                }),
            Self::Url(url) => {
                let response = reqwest::get(url).await?;
                if !response.status().is_success() {
                    return Err(DatasetError::Status(response.status()));
                }
                Ok(response.text().await?)
            }
        }
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Holds the base collection once fetched.
#[derive(Debug)]
pub struct DatasetCache {
    source: DatasetSource,
    base: Option<Arc<FeatureCollection>>,
}

impl DatasetCache {
    pub fn new(source: DatasetSource) -> Self {
        Self { source, base: None }
    }

    /// The base collection, if it has been fetched.
    pub fn base(&self) -> Option<&Arc<FeatureCollection>> {
        self.base.as_ref()
    }

    /// Return the cached collection, fetching it on first use.
    ///
    /// A failed fetch leaves the cache empty so a later call can try again.
    pub async fn fetch(&mut self) -> Result<Arc<FeatureCollection>, DatasetError> {
        if let Some(base) = &self.base {
            debug!("Using cached dataset ({} features)", base.len());
            return Ok(Arc::clone(base));
        }

        info!("Loading dataset from {}", self.source);
        let text = self.source.read().await?;
        let collection = Arc::new(FeatureCollection::from_geojson_str(&text)?);
        info!(
            "Loaded {} features ({} RFIs, {} reports, {} targets, {} layers)",
            collection.len(),
            collection.count_kind(FeatureKind::Rfi),
            collection.count_kind(FeatureKind::Report),
            collection.count_kind(FeatureKind::Target),
            collection.count_kind(FeatureKind::Layer)
        );
        self.base = Some(Arc::clone(&collection));
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DATA: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [54.1, 24.1]},
             "properties": {"id": "T1", "type": "Target", "name": "Harbor crane"}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [54.2, 24.2]},
             "properties": {"id": "R1", "type": "Report", "source": "System",
                            "timestamp": "2024-03-01T10:00:00Z"}}
        ]
    }"#;

    #[test]
    fn test_source_parse() {
        assert_eq!(
            DatasetSource::parse("https://example.test/features.geojson"),
            DatasetSource::Url("https://example.test/features.geojson".to_string())
        );
        assert_eq!(
            DatasetSource::parse("data/globe-features.geojson"),
            DatasetSource::Path(PathBuf::from("data/globe-features.geojson"))
        );
    }

    #[tokio::test]
    async fn test_fetch_from_file_is_cached() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(DATA.as_bytes()).unwrap();

        let mut cache = DatasetCache::new(DatasetSource::Path(file.path().to_path_buf()));
        let first = cache.fetch().await.unwrap();
        assert_eq!(first.len(), 2);

        // a second fetch never touches the file again
        std::fs::remove_file(file.path()).unwrap();
        let second = cache.fetch().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let mut cache = DatasetCache::new(DatasetSource::parse("/nonexistent/features.geojson"));
        let result = cache.fetch().await;
        assert!(matches!(result, Err(DatasetError::Io { .. })));
        assert!(cache.base().is_none());
    }

    #[tokio::test]
    async fn test_invalid_geojson_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"type\": \"Point\", \"coordinates\": [1.0, 2.0]}").unwrap();

        let mut cache = DatasetCache::new(DatasetSource::Path(file.path().to_path_buf()));
        assert!(matches!(cache.fetch().await, Err(DatasetError::Parse(_))));
    }
}

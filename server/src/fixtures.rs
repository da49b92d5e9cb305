//! Fixture files describing the resources a test server mocks.
//!
//! A fixture is JSON, either a bare array of resources or an object with a
//! `resources` array:
//!
//! ```json
//! {
//!   "resources": [
//!     {
//!       "path": "/api/users",
//!       "collection": [{ "id": 1, "name": "Alice" }],
//!       "options": { "limitParam": ["limit", "per_page"] }
//!     }
//!   ]
//! }
//! ```

use crate::registry::{Mocks, RegistrationError};
use mockrest_engine::RuleOptions;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One resource declared in a fixture.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceFixture {
    pub path: String,
    pub collection: Value,
    #[serde(default)]
    pub options: RuleOptions,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    List(Vec<ResourceFixture>),
    Wrapped { resources: Vec<ResourceFixture> },
}

/// Problems loading or registering a fixture.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse fixture {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid resource '{resource}' in {}: {source}", path.display())]
    Registration {
        path: PathBuf,
        resource: String,
        source: RegistrationError,
    },
}

/// Parse fixture text.
pub fn parse_fixture(text: &str) -> Result<Vec<ResourceFixture>, serde_json::Error> {
    let file: FixtureFile = serde_json::from_str(text)?;
    Ok(match file {
        FixtureFile::List(resources) | FixtureFile::Wrapped { resources } => resources,
    })
}

/// Read and parse a fixture file.
pub fn load_fixture(path: &Path) -> Result<Vec<ResourceFixture>, FixtureError> {
    let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_fixture(&text).map_err(|source| FixtureError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a fixture file and register its resources. Returns how many were added.
pub fn register_fixture(mocks: &mut Mocks, path: &Path) -> Result<usize, FixtureError> {
    let resources = load_fixture(path)?;
    if resources.is_empty() {
        tracing::warn!(fixture = %path.display(), "Fixture declares no resources");
    }

    let count = resources.len();
    for resource in resources {
        mocks
            .add_resource_value(&resource.path, resource.collection, resource.options)
            .map_err(|source| FixtureError::Registration {
                path: path.to_path_buf(),
                resource: resource.path.clone(),
                source,
            })?;
    }
    Ok(count)
}

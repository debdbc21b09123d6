//! Worker configuration.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::key::resource_url;
use crate::manifest::{ResourceManifest, ShellSet};

/// Names of the three cache generations in the host's cache storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNames {
    /// The live cache requests are served from.
    pub committed: String,
    /// Shell files downloaded during install.
    pub staging: String,
    /// Holds the last committed manifest.
    pub manifest_record: String,
}

impl Default for CacheNames {
    fn default() -> Self {
        Self {
            committed: "app-cache".to_string(),
            staging: "app-temp-cache".to_string(),
            manifest_record: "app-manifest".to_string(),
        }
    }
}

/// Output of the build step: every resource with its fingerprint, plus the
/// shell paths to pre-cache.
///
/// ```json
/// {"resources": {"/": "h0", "index.html": "h0", "main.js": "h1"}, "shell": ["main.js", "index.html"]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub resources: ResourceManifest,
    #[serde(default)]
    pub shell: ShellSet,
}

impl BuildManifest {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Everything one worker generation is built from.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    origin: Url,
    manifest: ResourceManifest,
    shell: ShellSet,
    cache_names: CacheNames,
}

impl WorkerConfig {
    pub fn builder(origin: Url) -> WorkerConfigBuilder {
        WorkerConfigBuilder {
            origin,
            manifest: ResourceManifest::default(),
            shell: ShellSet::default(),
            cache_names: CacheNames::default(),
        }
    }

    pub fn from_build_manifest(origin: Url, build: BuildManifest) -> Result<Self, ConfigError> {
        Self::builder(origin)
            .manifest(build.resources)
            .shell(build.shell)
            .build()
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn manifest(&self) -> &ResourceManifest {
        &self.manifest
    }

    pub fn shell(&self) -> &ShellSet {
        &self.shell
    }

    pub fn cache_names(&self) -> &CacheNames {
        &self.cache_names
    }
}

pub struct WorkerConfigBuilder {
    origin: Url,
    manifest: ResourceManifest,
    shell: ShellSet,
    cache_names: CacheNames,
}

impl WorkerConfigBuilder {
    pub fn manifest(mut self, manifest: ResourceManifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn shell(mut self, shell: ShellSet) -> Self {
        self.shell = shell;
        self
    }

    pub fn cache_names(mut self, cache_names: CacheNames) -> Self {
        self.cache_names = cache_names;
        self
    }

    pub fn build(self) -> Result<WorkerConfig, ConfigError> {
        validate_origin(&self.origin)?;

        for path in self.manifest.paths() {
            resource_url(&self.origin, path).map_err(|source| ConfigError::InvalidPath {
                path: path.to_string(),
                source,
            })?;
        }

        if let Some(path) = self
            .shell
            .paths()
            .iter()
            .find(|p| !self.manifest.contains(p.as_str()))
        {
            return Err(ConfigError::ShellPathNotInManifest { path: path.clone() });
        }

        let names = &self.cache_names;
        if names.committed == names.staging || names.committed == names.manifest_record {
            return Err(ConfigError::DuplicateCacheName {
                name: names.committed.clone(),
            });
        }
        if names.staging == names.manifest_record {
            return Err(ConfigError::DuplicateCacheName {
                name: names.staging.clone(),
            });
        }

        Ok(WorkerConfig {
            origin: self.origin,
            manifest: self.manifest,
            shell: self.shell,
            cache_names: self.cache_names,
        })
    }
}

fn validate_origin(origin: &Url) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidOrigin {
        origin: origin.to_string(),
        reason: reason.to_string(),
    };

    if !matches!(origin.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if !origin.has_host() {
        return Err(invalid("missing host"));
    }
    if origin.path() != "/" && !origin.path().is_empty() {
        return Err(invalid("must not have a path"));
    }
    if origin.query().is_some() || origin.fragment().is_some() {
        return Err(invalid("must not have a query or fragment"));
    }
    Ok(())
}

//! Cached model lookup by name and version.

use crate::error::{ForecastError, Result};
use crate::model::{LinearModel, RevenueModel};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Loads a model the registry has not cached yet.
pub trait ModelLoader: Send + Sync {
    fn load(&self, name: &str, version: Option<&str>) -> Result<Arc<dyn RevenueModel>>;
}

/// Reads [`LinearModel`] JSON files from a directory.
///
/// A versioned lookup tries `<dir>/<name>__<version>.json` first and then
/// falls back to `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct JsonModelLoader {
    base_dir: PathBuf,
}

impl JsonModelLoader {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Candidate paths, most specific first.
    pub fn candidate_paths(&self, name: &str, version: Option<&str>) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(2);
        if let Some(v) = version {
            paths.push(self.base_dir.join(format!("{}__{}.json", name, v)));
        }
        paths.push(self.base_dir.join(format!("{}.json", name)));
        paths
    }
}

impl ModelLoader for JsonModelLoader {
    fn load(&self, name: &str, version: Option<&str>) -> Result<Arc<dyn RevenueModel>> {
        let paths = self.candidate_paths(name, version);
        for path in &paths {
            if path.is_file() {
                let text = std::fs::read_to_string(path)?;
                let model = LinearModel::from_json_str(&text)?;
                debug!(path = %path.display(), features = model.expected_feature_names().len(), "loaded model");
                return Ok(Arc::new(model));
            }
        }
        let tried: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        Err(ForecastError::ModelNotFound(format!(
            "{} (tried: {})",
            name,
            tried.join(", ")
        )))
    }
}

type CacheKey = (String, Option<String>);

/// Process-wide model cache keyed by (name, version).
///
/// Loading happens on first use; [`ModelRegistry::invalidate`] drops
/// entries so the next lookup reloads.
pub struct ModelRegistry {
    loader: Box<dyn ModelLoader>,
    cache: Mutex<HashMap<CacheKey, Arc<dyn RevenueModel>>>,
}

impl ModelRegistry {
    pub fn new(loader: Box<dyn ModelLoader>) -> Self {
        Self {
            loader,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Registry over a directory of JSON model files.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(Box::new(JsonModelLoader::new(dir)))
    }

    /// Registry that only serves models added with [`ModelRegistry::insert`].
    pub fn in_memory() -> Self {
        Self::new(Box::new(NoLoader))
    }

    /// Cached model, loading it on a miss.
    pub fn get(&self, name: &str, version: Option<&str>) -> Result<Arc<dyn RevenueModel>> {
        let key = (name.to_string(), version.map(str::to_string));
        {
            let cache = self.lock()?;
            if let Some(model) = cache.get(&key) {
                return Ok(Arc::clone(model));
            }
        }

        let model = self.loader.load(name, version)?;
        let mut cache = self.lock()?;
        // A concurrent caller may have loaded the same key; keep the first.
        let entry = cache.entry(key).or_insert(model);
        Ok(Arc::clone(entry))
    }

    /// Register a model directly, replacing any cached entry.
    pub fn insert(&self, name: &str, version: Option<&str>, model: Arc<dyn RevenueModel>) -> Result<()> {
        let key = (name.to_string(), version.map(str::to_string));
        self.lock()?.insert(key, model);
        Ok(())
    }

    /// Drop every cached version of `name`, or everything when `None`.
    pub fn invalidate(&self, name: Option<&str>) -> Result<usize> {
        let mut cache = self.lock()?;
        let before = cache.len();
        match name {
            Some(n) => cache.retain(|(k, _), _| k != n),
            None => cache.clear(),
        }
        let removed = before - cache.len();
        debug!(name = ?name, removed = removed, "invalidated model cache");
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<CacheKey, Arc<dyn RevenueModel>>>> {
        self.cache
            .lock()
            .map_err(|_| ForecastError::InternalError("model cache lock poisoned".to_string()))
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("cached", &self.len())
            .finish()
    }
}

struct NoLoader;

impl ModelLoader for NoLoader {
    fn load(&self, name: &str, version: Option<&str>) -> Result<Arc<dyn RevenueModel>> {
        Err(ForecastError::ModelNotFound(match version {
            Some(v) => format!("{}@{} is not registered", name, v),
            None => format!("{} is not registered", name),
        }))
    }
}

use std::{
    collections::{HashMap, hash_map::Entry},
    fs,
    path::{Component, Path, PathBuf},
};

use log::debug;

/// Materialized artifacts keyed by their canonical on disk path.
///
/// A path is loaded at most once per process, entries are never evicted.
#[derive(Debug)]
pub struct ModelCache<A> {
    entries: HashMap<PathBuf, A>,
}

impl<A> Default for ModelCache<A> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<A> ModelCache<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the artifact stored at `path`, loading it on the first request.
    ///
    /// # Args
    /// * `path` - The artifact path, in any relative or absolute form.
    /// * `loader` - Reads the artifact from its canonical path, `None` if it doesn't exist.
    ///
    /// # Returns
    /// The cached artifact, or `None` when the loader found nothing. Neither a `None` nor an
    /// error is cached.
    pub fn get_or_load<E, F>(&mut self, path: &Path, loader: F) -> Result<Option<&A>, E>
    where
        F: FnOnce(&Path) -> Result<Option<A>, E>,
    {
        match self.entries.entry(cache_key(path)) {
            Entry::Occupied(entry) => Ok(Some(entry.into_mut())),
            Entry::Vacant(entry) => {
                let Some(artifact) = loader(entry.key())? else {
                    return Ok(None);
                };

                debug!("loaded model at {}", entry.key().display());
                Ok(Some(entry.insert(artifact)))
            }
        }
    }

    /// Stores a freshly trained artifact, replacing any previous one for the same path.
    pub fn insert(&mut self, path: &Path, artifact: A) {
        self.entries.insert(cache_key(path), artifact);
    }

    pub fn get(&self, path: &Path) -> Option<&A> {
        self.entries.get(&cache_key(path))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(&cache_key(path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves `path` to the key it is cached under.
///
/// Existing paths are canonicalized, missing ones are made absolute and lexically
/// normalized.
pub fn cache_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        std::path::absolute(path)
            .map(|path| normalize(&path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }

    normalized
}

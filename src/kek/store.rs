use lru::LruCache;
use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::archive::{Collection, Kek};
use super::object::KekObject;
use crate::error::{KekError, Result};

/// Lookup of single entity records by squuid
pub trait ObjectSource {
    fn object(&self, squuid: &str) -> Result<Option<Cow<'_, KekObject>>>;
}

impl ObjectSource for Kek {
    fn object(&self, squuid: &str) -> Result<Option<Cow<'_, KekObject>>> {
        Ok(self.get(squuid).map(Cow::Borrowed))
    }
}

/// Read-only view on the cached entity files with an LRU of parsed records
///
/// The server uses this instead of [`Kek`] so that it starts without
/// parsing the whole archive.
pub struct ObjectStore {
    data_dir: PathBuf,
    cache: Mutex<LruCache<String, Arc<KekObject>>>,
}

impl ObjectStore {
    pub fn new(data_dir: impl Into<PathBuf>, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            data_dir: data_dir.into(),
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Where the cached file of `squuid` in `collection` lives.
    pub fn entity_path(&self, collection: Collection, squuid: &str) -> Result<PathBuf> {
        check_squuid(squuid)?;
        Ok(self.data_dir.join(collection.entity_file(squuid)))
    }

    /// Cached file of `squuid`, media first.
    pub fn locate(&self, squuid: &str) -> Result<Option<(Collection, PathBuf)>> {
        for collection in [Collection::Media, Collection::Shareholders] {
            let path = self.entity_path(collection, squuid)?;
            if path.is_file() {
                return Ok(Some((collection, path)));
            }
        }
        Ok(None)
    }

    /// Parsed record of `squuid`; `None` when no cached file exists.
    pub fn get(&self, squuid: &str) -> Result<Option<Arc<KekObject>>> {
        if let Some(object) = self.lock().get(squuid) {
            return Ok(Some(Arc::clone(object)));
        }

        let Some((_, path)) = self.locate(squuid)? else {
            return Ok(None);
        };
        let text = std::fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| KekError::Parse(format!("{}: {}", path.display(), e)))?;
        let object = Arc::new(KekObject::new(value)?);
        log::debug!("loaded {}", path.display());

        self.lock().put(squuid.to_string(), Arc::clone(&object));
        Ok(Some(object))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Arc<KekObject>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ObjectSource for ObjectStore {
    fn object(&self, squuid: &str) -> Result<Option<Cow<'_, KekObject>>> {
        Ok(self
            .get(squuid)?
            .map(|object| Cow::Owned(KekObject::clone(&object))))
    }
}

/// Squuids end up in file paths
pub(crate) fn check_squuid(squuid: &str) -> Result<()> {
    let valid = !squuid.is_empty()
        && squuid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(KekError::InvalidInput(format!("invalid squuid '{}'", squuid)))
    }
}

//! Content-addressed build cache.
//!
//! The cache maps sprite names and tracked file paths to the digest they had
//! when last built. An artifact is fresh only when its output exists and its
//! live digest equals the recorded one; anything unknown is stale.
//!
//! The store is loaded once per run, mutated in memory, and written at most
//! once. A cache without a backing file never writes anything.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::discovery::to_slash;
use crate::error::{MontageError, Result};
use crate::sprite::{sha256_hex, Sprite};

/// Version of the on-disk format. Caches written with any other version
/// are discarded.
pub const CACHE_VERSION: u32 = 2;

/// The persisted cache document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStore {
    pub cache_version: u32,
    #[serde(default)]
    pub sprites: BTreeMap<String, String>,
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self {
            cache_version: CACHE_VERSION,
            sprites: BTreeMap::new(),
            paths: BTreeMap::new(),
        }
    }
}

/// The key space an entry is recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Sprites,
    Paths,
}

/// Something whose freshness the cache can track.
pub trait CacheEntry {
    fn namespace(&self) -> Namespace;

    /// The key this entry is stored under. `base` is the directory holding
    /// the cache file.
    fn cache_key(&self, base: &Path) -> String;

    /// Whether the built artifact is present on disk.
    fn exists(&self) -> bool;

    /// Digest of the entry as it is right now.
    fn live_digest(&self) -> Result<String>;
}

impl CacheEntry for Sprite {
    fn namespace(&self) -> Namespace {
        Namespace::Sprites
    }

    fn cache_key(&self, _base: &Path) -> String {
        self.name().to_string()
    }

    fn exists(&self) -> bool {
        self.save_path().is_file()
    }

    fn live_digest(&self) -> Result<String> {
        self.digest()
    }
}

impl CacheEntry for Path {
    fn namespace(&self) -> Namespace {
        Namespace::Paths
    }

    fn cache_key(&self, base: &Path) -> String {
        relative_key(self, base)
    }

    fn exists(&self) -> bool {
        self.is_file()
    }

    fn live_digest(&self) -> Result<String> {
        let bytes = fs::read(self).map_err(|e| MontageError::Io {
            path: self.to_path_buf(),
            message: format!("Failed to read tracked file: {}", e),
        })?;
        Ok(sha256_hex(bytes))
    }
}

/// The build cache for one run.
#[derive(Debug)]
pub struct Cache {
    path: Option<PathBuf>,
    base: PathBuf,
    store: CacheStore,
}

impl Cache {
    /// A cache with no backing file. Path keys are made relative to `base`.
    pub fn in_memory(base: impl Into<PathBuf>) -> Self {
        Self {
            path: None,
            base: base.into(),
            store: CacheStore::default(),
        }
    }

    /// Load the cache stored at `path`.
    ///
    /// A missing file, an unreadable document, or a document written with a
    /// different `cache_version` all produce an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let store = match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&path, &content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no cache file; starting cold");
                CacheStore::default()
            }
            Err(e) => {
                return Err(MontageError::Io {
                    path,
                    message: format!("Failed to read cache: {}", e),
                })
            }
        };

        Ok(Self {
            path: Some(path),
            base,
            store,
        })
    }

    fn parse(path: &Path, content: &str) -> CacheStore {
        match serde_yaml::from_str::<CacheStore>(content) {
            Ok(store) if store.cache_version == CACHE_VERSION => store,
            Ok(store) => {
                tracing::debug!(
                    found = store.cache_version,
                    expected = CACHE_VERSION,
                    "cache version changed; starting cold"
                );
                CacheStore::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable cache");
                CacheStore::default()
            }
        }
    }

    /// The backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    fn namespace(&self, namespace: Namespace) -> &BTreeMap<String, String> {
        match namespace {
            Namespace::Sprites => &self.store.sprites,
            Namespace::Paths => &self.store.paths,
        }
    }

    fn namespace_mut(&mut self, namespace: Namespace) -> &mut BTreeMap<String, String> {
        match namespace {
            Namespace::Sprites => &mut self.store.sprites,
            Namespace::Paths => &mut self.store.paths,
        }
    }

    /// Whether `entry` is up to date.
    ///
    /// False when the built artifact is missing or nothing is recorded for
    /// it, regardless of its digest.
    pub fn fresh<E: CacheEntry + ?Sized>(&self, entry: &E) -> Result<bool> {
        if !entry.exists() {
            return Ok(false);
        }

        let key = entry.cache_key(&self.base);
        match self.namespace(entry.namespace()).get(&key) {
            Some(stored) => Ok(*stored == entry.live_digest()?),
            None => Ok(false),
        }
    }

    /// The digest recorded for `entry`, if any.
    pub fn recorded<E: CacheEntry + ?Sized>(&self, entry: &E) -> Option<&str> {
        let key = entry.cache_key(&self.base);
        self.namespace(entry.namespace())
            .get(&key)
            .map(String::as_str)
    }

    /// Record the current digest of `entry`.
    pub fn set<E: CacheEntry + ?Sized>(&mut self, entry: &E) -> Result<()> {
        let digest = entry.live_digest()?;
        let key = entry.cache_key(&self.base);
        self.namespace_mut(entry.namespace()).insert(key, digest);
        Ok(())
    }

    /// Forget `entry`.
    pub fn remove<E: CacheEntry + ?Sized>(&mut self, entry: &E) {
        let key = entry.cache_key(&self.base);
        self.namespace_mut(entry.namespace()).remove(&key);
    }

    /// Drop entries which no longer correspond to anything.
    ///
    /// Sprites not named in `live` are removed, as are paths which no longer
    /// exist or which lead outside the cache directory.
    pub fn prune<I, S>(&mut self, live: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let live: std::collections::HashSet<String> =
            live.into_iter().map(|s| s.as_ref().to_string()).collect();

        self.store.sprites.retain(|name, _| live.contains(name));

        let base = &self.base;
        self.store.paths.retain(|key, _| {
            let relative = Path::new(key);
            let escapes = relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            !escapes && base.join(relative).exists()
        });
    }

    /// Persist the store.
    ///
    /// Returns `false` without touching the file system when the cache has no
    /// backing file.
    pub fn write(&self) -> Result<bool> {
        let Some(path) = &self.path else {
            return Ok(false);
        };

        let yaml = serde_yaml::to_string(&self.store).map_err(|e| MontageError::Build {
            message: format!("Failed to serialize cache: {}", e),
            help: None,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| MontageError::write_failed(parent, e))?;
        }
        fs::write(path, yaml).map_err(|e| MontageError::write_failed(path, e))?;

        tracing::debug!(
            path = %path.display(),
            sprites = self.store.sprites.len(),
            paths = self.store.paths.len(),
            "wrote cache"
        );
        Ok(true)
    }
}

/// Express `path` relative to `base`, using `..` where it lies outside.
fn relative_key(path: &Path, base: &Path) -> String {
    let path = normalize(path);
    let base = normalize(base);

    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let shared = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in shared..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[shared..] {
        relative.push(part.as_os_str());
    }

    to_slash(&relative)
}

/// Make `path` absolute and resolve `.` and `..` lexically.
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

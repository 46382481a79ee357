//! Resource cache.
//!
//! Lazily decodes container payloads into typed resources and memoizes them by
//! `(real key, kind)`. Lookups go through the [`Manifest`] first, so a logical
//! alias and its real key share one cached instance.
//!
//! Decoded values are reference counted; repeated lookups hand out the same
//! instance (compare with [`Rc::ptr_eq`]) until [`ResourceCache::clear_cache`]
//! drops everything. Re-decoding after a clear reads from the in-memory
//! container again, never from disk.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::resources::container::Container;
use crate::resources::manifest::Manifest;
use crate::resources::media::{FontHandle, ImageHandle, MediaBackend, SoundHandle};

/// The cache shared by the room registry and the script API.
///
/// Only one thread of control exists; never hold a borrow across a call into
/// Lua.
pub type SharedCache = Rc<RefCell<ResourceCache>>;

/// Kinds of resource the cache knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Sound,
    Font,
    Json,
    Script,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Sound => "sound",
            ResourceKind::Font => "font",
            ResourceKind::Json => "json",
            ResourceKind::Script => "script",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" | "images" => Ok(ResourceKind::Image),
            "sound" | "sounds" => Ok(ResourceKind::Sound),
            "font" | "fonts" => Ok(ResourceKind::Font),
            "json" => Ok(ResourceKind::Json),
            "script" | "scripts" => Ok(ResourceKind::Script),
            _ => Err(ResourceError::UnsupportedKind(s.to_string())),
        }
    }
}

/// A decoded resource. Cloning shares the underlying instance.
#[derive(Debug, Clone)]
pub enum Resource {
    Image(Rc<ImageHandle>),
    Sound(Rc<SoundHandle>),
    /// Raw font bytes; wrap with a point size through [`ResourceCache::get_font`].
    Font(Arc<[u8]>),
    Json(Rc<serde_json::Value>),
    Script(Rc<str>),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Image(_) => ResourceKind::Image,
            Resource::Sound(_) => ResourceKind::Sound,
            Resource::Font(_) => ResourceKind::Font,
            Resource::Json(_) => ResourceKind::Json,
            Resource::Script(_) => ResourceKind::Script,
        }
    }

    /// Whether both values point at the same cached instance.
    pub fn same_instance(&self, other: &Resource) -> bool {
        match (self, other) {
            (Resource::Image(a), Resource::Image(b)) => Rc::ptr_eq(a, b),
            (Resource::Sound(a), Resource::Sound(b)) => Rc::ptr_eq(a, b),
            (Resource::Font(a), Resource::Font(b)) => Arc::ptr_eq(a, b),
            (Resource::Json(a), Resource::Json(b)) => Rc::ptr_eq(a, b),
            (Resource::Script(a), Resource::Script(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Errors surfaced by [`ResourceCache::get`].
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Resource {0} not found")]
    NotFound(String),
    #[error("Unsupported resource type: {0}")]
    UnsupportedKind(String),
    #[error("cannot decode {kind} '{key}': {reason}")]
    Decode {
        key: String,
        kind: ResourceKind,
        reason: String,
    },
}

/// Manifest-indirected, lazily decoding view over a [`Container`].
pub struct ResourceCache {
    container: Container,
    manifest: Manifest,
    backend: Box<dyn MediaBackend>,
    cache: FxHashMap<(String, ResourceKind), Resource>,
}

impl ResourceCache {
    /// Wrap a container, extracting its manifest once.
    pub fn new(container: Container, backend: Box<dyn MediaBackend>) -> Self {
        let manifest = Manifest::from_container(&container);
        Self {
            container,
            manifest,
            backend,
            cache: FxHashMap::default(),
        }
    }

    /// Convenience for building the [`SharedCache`] handle.
    pub fn into_shared(self) -> SharedCache {
        Rc::new(RefCell::new(self))
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Real storage key for a logical key.
    pub fn real_key<'a>(&'a self, key: &'a str) -> &'a str {
        self.manifest.resolve(key)
    }

    /// Fetch a resource, decoding it on first access.
    pub fn get(&mut self, key: &str, kind: ResourceKind) -> Result<Resource, ResourceError> {
        let real_key = self.manifest.resolve(key).to_string();
        if let Some(resource) = self.cache.get(&(real_key.clone(), kind)) {
            return Ok(resource.clone());
        }

        let bytes = self
            .container
            .get(&real_key)
            .ok_or_else(|| ResourceError::NotFound(key.to_string()))?;
        let decode_err = |reason: String| ResourceError::Decode {
            key: real_key.clone(),
            kind,
            reason,
        };

        let resource = match kind {
            ResourceKind::Image => Resource::Image(Rc::new(
                self.backend.decode_image(&real_key, bytes).map_err(decode_err)?,
            )),
            ResourceKind::Sound => Resource::Sound(Rc::new(
                self.backend.decode_sound(&real_key, bytes).map_err(decode_err)?,
            )),
            ResourceKind::Font => Resource::Font(Arc::from(bytes)),
            ResourceKind::Json => {
                let value: serde_json::Value =
                    serde_json::from_slice(bytes).map_err(|e| decode_err(e.to_string()))?;
                Resource::Json(Rc::new(value))
            }
            ResourceKind::Script => {
                let text = std::str::from_utf8(bytes).map_err(|e| decode_err(e.to_string()))?;
                Resource::Script(Rc::from(text))
            }
        };

        debug!("Decoded {} '{}' (requested as '{}')", kind, real_key, key);
        self.cache.insert((real_key, kind), resource.clone());
        Ok(resource)
    }

    /// Fetch a resource by a kind name such as `"images"` or `"json"`.
    pub fn get_by_name(&mut self, key: &str, kind: &str) -> Result<Resource, ResourceError> {
        let kind = kind.parse::<ResourceKind>()?;
        self.get(key, kind)
    }

    pub fn get_image(&mut self, key: &str) -> Result<Rc<ImageHandle>, ResourceError> {
        match self.get(key, ResourceKind::Image)? {
            Resource::Image(image) => Ok(image),
            other => Err(mismatch(key, ResourceKind::Image, &other)),
        }
    }

    pub fn get_sound(&mut self, key: &str) -> Result<Rc<SoundHandle>, ResourceError> {
        match self.get(key, ResourceKind::Sound)? {
            Resource::Sound(sound) => Ok(sound),
            other => Err(mismatch(key, ResourceKind::Sound, &other)),
        }
    }

    /// Wrap the cached font bytes at `point_size`.
    ///
    /// The bytes are decoded once per key; each call returns a fresh wrapper
    /// sharing them.
    pub fn get_font(&mut self, key: &str, point_size: u32) -> Result<FontHandle, ResourceError> {
        match self.get(key, ResourceKind::Font)? {
            Resource::Font(bytes) => Ok(FontHandle::wrap(bytes, point_size)),
            other => Err(mismatch(key, ResourceKind::Font, &other)),
        }
    }

    pub fn get_json(&mut self, key: &str) -> Result<Rc<serde_json::Value>, ResourceError> {
        match self.get(key, ResourceKind::Json)? {
            Resource::Json(value) => Ok(value),
            other => Err(mismatch(key, ResourceKind::Json, &other)),
        }
    }

    pub fn get_script(&mut self, key: &str) -> Result<Rc<str>, ResourceError> {
        match self.get(key, ResourceKind::Script)? {
            Resource::Script(text) => Ok(text),
            other => Err(mismatch(key, ResourceKind::Script, &other)),
        }
    }

    /// Whether `key` (after resolution) is already decoded as `kind`.
    pub fn is_cached(&self, key: &str, kind: ResourceKind) -> bool {
        let real_key = self.manifest.resolve(key);
        self.cache.contains_key(&(real_key.to_string(), kind))
    }

    /// Number of decoded instances currently held.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop every decoded instance.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        info!("Resource cache cleared");
    }
}

// Unreachable while entries are keyed by kind.
fn mismatch(key: &str, expected: ResourceKind, got: &Resource) -> ResourceError {
    ResourceError::Decode {
        key: key.to_string(),
        kind: expected,
        reason: format!("cached as {}", got.kind()),
    }
}

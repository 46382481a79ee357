//! Container store.
//!
//! A container is the single binary package holding every game asset keyed by
//! an opaque string. On disk it is a `bincode` encoding of an ordered
//! `key -> bytes` map. One reserved entry, [`MANIFEST_KEY`], carries the alias
//! table consumed by [`Manifest`](crate::resources::manifest::Manifest).
//!
//! Containers are built offline (see [`ContainerBuilder`] and
//! [`crate::packer`]) and are immutable once loaded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::info;

/// Reserved key holding the serialized logical -> real alias table.
pub const MANIFEST_KEY: &str = "!META-INF/MANIFEST";

/// Errors raised while reading or decoding a container file.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("cannot read container '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("container is corrupt: {0}")]
    Corrupt(#[from] bincode::Error),
}

/// Immutable mapping of raw keys to byte payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    entries: BTreeMap<String, Vec<u8>>,
}

impl Container {
    /// Read and decode a container file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ContainerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let container = Self::from_bytes(&bytes)?;
        info!(
            "Loaded container {} ({} entries)",
            path.display(),
            container.len()
        );
        Ok(container)
    }

    /// Decode a container from its serialized form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContainerError> {
        let entries: BTreeMap<String, Vec<u8>> = bincode::deserialize(bytes)?;
        Ok(Self { entries })
    }

    /// Serialize the container. Output is deterministic for equal contents.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ContainerError> {
        Ok(bincode::serialize(&self.entries)?)
    }

    /// Serialize the container and write it to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ContainerError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(|source| ContainerError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Raw payload stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// All keys in sorted order, the manifest key included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Offline builder used by the packer and by tests.
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    entries: BTreeMap<String, Vec<u8>>,
    aliases: BTreeMap<String, String>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a payload.
    pub fn insert(mut self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(key.into(), bytes.into());
        self
    }

    /// Add a manifest alias from a logical key to a real storage key.
    pub fn manifest_alias(mut self, logical: impl Into<String>, real: impl Into<String>) -> Self {
        self.aliases.insert(logical.into(), real.into());
        self
    }

    /// Store a raw manifest payload as-is, bypassing alias encoding.
    pub fn raw_manifest(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(MANIFEST_KEY.to_string(), bytes.into());
        self
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Finish the container. The manifest entry is written only when at least
    /// one alias was declared.
    pub fn build(mut self) -> Result<Container, ContainerError> {
        if !self.aliases.is_empty() {
            let manifest = bincode::serialize(&self.aliases)?;
            self.entries.insert(MANIFEST_KEY.to_string(), manifest);
        }
        Ok(Container {
            entries: self.entries,
        })
    }
}

/// First file under `root` whose name ends in `.{extension}`.
///
/// A directory's files are checked before its subdirectories, each in name
/// order. Unreadable directories and symlinked directories are skipped.
pub fn find_container_file(root: &Path, extension: &str) -> Option<PathBuf> {
    let suffix = format!(".{}", extension.trim_start_matches('.'));
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root).ok()?.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            dirs.push(entry.path());
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    dirs.sort();

    let matches = |path: &PathBuf| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&suffix))
    };
    files
        .into_iter()
        .find(matches)
        .or_else(|| dirs.iter().find_map(|dir| find_container_file(dir, extension)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_without_aliases_has_no_manifest() {
        let container = ContainerBuilder::new()
            .insert("Images/bg.png", vec![1, 2, 3])
            .build()
            .unwrap();
        assert_eq!(container.len(), 1);
        assert!(!container.contains(MANIFEST_KEY));
        assert_eq!(container.get("Images/bg.png"), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_builder_with_alias_writes_manifest() {
        let container = ContainerBuilder::new()
            .insert("Images/bg2.png", vec![9])
            .manifest_alias("bg", "Images/bg2.png")
            .build()
            .unwrap();
        assert!(container.contains(MANIFEST_KEY));
        let aliases: BTreeMap<String, String> =
            bincode::deserialize(container.get(MANIFEST_KEY).unwrap()).unwrap();
        assert_eq!(aliases.get("bg").map(String::as_str), Some("Images/bg2.png"));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let err = Container::from_bytes(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, ContainerError::Corrupt(_)));
    }

    #[test]
    fn test_keys_are_not_normalised() {
        let container = ContainerBuilder::new()
            .insert("Rooms\\main_room.json", b"{}".to_vec())
            .build()
            .unwrap();
        assert!(container.contains("Rooms\\main_room.json"));
        assert!(!container.contains("Rooms/main_room.json"));
    }

    #[test]
    fn test_find_container_file_prefers_shallow_matches() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("a/deep")).unwrap();
        std::fs::write(tmp.path().join("a/deep/data.win"), b"").unwrap();
        std::fs::write(tmp.path().join("readme.txt"), b"").unwrap();
        assert_eq!(
            find_container_file(tmp.path(), "win"),
            Some(tmp.path().join("a/deep/data.win"))
        );

        std::fs::write(tmp.path().join("z.win"), b"").unwrap();
        assert_eq!(
            find_container_file(tmp.path(), ".win"),
            Some(tmp.path().join("z.win"))
        );
        assert_eq!(find_container_file(tmp.path(), "pak"), None);
    }
}

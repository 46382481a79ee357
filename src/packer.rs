//! Offline container builder.
//!
//! Packs every file under a directory into one container. Keys are the paths
//! relative to that directory, with `/` separators. An optional
//! `manifest.json` at the top of the directory declares aliases:
//!
//! ```json
//! { "Rooms\\main_room.json": "Rooms/main_room.json" }
//! ```
//!
//! The manifest file itself is not packed as an entry.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::resources::container::{Container, ContainerBuilder, ContainerError};

/// Name of the alias file read from the top of the packed directory.
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest.json at '{path}': {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Container(#[from] ContainerError),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PackError + '_ {
    move |source| PackError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Collect `dir` into a builder, ready to [`build`](ContainerBuilder::build).
pub fn pack_directory(dir: &Path) -> Result<ContainerBuilder, PackError> {
    let mut builder = ContainerBuilder::new();
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    for path in files {
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        if relative == Path::new(MANIFEST_FILE) {
            continue;
        }
        let Some(key) = key_for(relative) else {
            warn!("Skipping non UTF-8 path {:?}", path);
            continue;
        };
        let bytes = fs::read(&path).map_err(io_err(&path))?;
        builder = builder.insert(key, bytes);
    }

    let manifest_path = dir.join(MANIFEST_FILE);
    if manifest_path.is_file() {
        let text = fs::read(&manifest_path).map_err(io_err(&manifest_path))?;
        let aliases: BTreeMap<String, String> =
            serde_json::from_slice(&text).map_err(|source| PackError::Manifest {
                path: manifest_path.clone(),
                source,
            })?;
        for (logical, real) in aliases {
            builder = builder.manifest_alias(logical, real);
        }
    }

    Ok(builder)
}

/// Pack `dir` and write the container to `out`.
pub fn pack_to_file(dir: &Path, out: &Path) -> Result<Container, PackError> {
    let builder = pack_directory(dir)?;
    let (entries, aliases) = (builder.entry_count(), builder.alias_count());
    let container = builder.build()?;
    container.save(out)?;
    info!(
        "Packed {} entries and {} aliases from {:?} into {:?}",
        entries, aliases, dir, out
    );
    Ok(container)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), PackError> {
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Container key for a path relative to the packed directory.
fn key_for(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

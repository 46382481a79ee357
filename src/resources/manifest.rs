//! Manifest resolver.
//!
//! Translates logical resource keys into the real storage keys of a
//! [`Container`]. A container without a manifest is a valid, degraded setup:
//! every key then resolves to itself.

use std::collections::BTreeMap;

use log::{debug, error, warn};

use crate::resources::container::{Container, MANIFEST_KEY};

/// Logical -> real key alias table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    aliases: BTreeMap<String, String>,
}

impl Manifest {
    /// Extract the manifest from the reserved container entry.
    ///
    /// Never fails: a missing entry is reported as a warning and an undecodable
    /// one as an error, and both yield an empty manifest.
    pub fn from_container(container: &Container) -> Self {
        let Some(bytes) = container.get(MANIFEST_KEY) else {
            warn!("No MANIFEST found in container, resolving keys as-is");
            return Self::default();
        };
        match bincode::deserialize::<BTreeMap<String, String>>(bytes) {
            Ok(aliases) => {
                debug!("Manifest loaded with {} aliases", aliases.len());
                Self { aliases }
            }
            Err(e) => {
                error!("MANIFEST entry is unreadable, resolving keys as-is: {}", e);
                Self::default()
            }
        }
    }

    /// Build a manifest directly from alias pairs.
    pub fn from_aliases<I, K, V>(aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Real storage key for `logical`, or `logical` itself when unaliased.
    pub fn resolve<'a>(&'a self, logical: &'a str) -> &'a str {
        self.aliases
            .get(logical)
            .map(String::as_str)
            .unwrap_or(logical)
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

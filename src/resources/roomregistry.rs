//! Room registry.
//!
//! Loads rooms from their JSON descriptors and owns the script modules of the
//! single active room. Loading a room always builds fresh modules; whatever
//! the previous room held (modules, their globals, the handler error log) is
//! dropped first.
//!
//! A room descriptor only needs a `scripts` array:
//!
//! ```json
//! { "scripts": ["Scripts\\ExampleBackGroundScript.lua", "Scripts\\ExamplePlaySoundScript.lua"] }
//! ```
//!
//! Declaration order is load order and dispatch order. A script that cannot
//! be fetched or evaluated is logged and left out; the rest of the room still
//! loads.

use log::{error, info, warn};
use mlua::prelude::*;
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::resources::lua_runtime::{
    ControlCmd, HandlerId, LuaRuntime, ScriptLoadError, ScriptModule, module_name_for,
};
use crate::resources::resourcecache::{ResourceError, SharedCache};

/// Decoded room JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoomDescriptor {
    /// Script keys in load order.
    #[serde(default)]
    pub scripts: Vec<String>,
    /// Any other fields of the descriptor.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RoomDescriptor {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

/// Failure to load a room as a whole.
#[derive(Debug, thiserror::Error)]
pub enum RoomLoadError {
    #[error("cannot fetch room descriptor: {0}")]
    Descriptor(#[from] ResourceError),
    #[error("room '{key}' has an invalid descriptor: {source}")]
    InvalidDescriptor {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The room currently receiving events.
#[derive(Debug)]
pub struct ActiveRoom {
    key: String,
    descriptor: RoomDescriptor,
    pub(crate) modules: Vec<ScriptModule>,
    /// Handlers that already had a failure reported in this room's lifetime.
    pub(crate) error_logged: FxHashSet<HandlerId>,
}

impl ActiveRoom {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn descriptor(&self) -> &RoomDescriptor {
        &self.descriptor
    }

    /// Modules in load order.
    pub fn modules(&self) -> &[ScriptModule] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&ScriptModule> {
        self.modules.iter().find(|m| m.name() == name)
    }

    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name().to_string()).collect()
    }

    /// Handlers whose failures have been reported since the room was loaded.
    pub fn reported_failures(&self) -> usize {
        self.error_logged.len()
    }
}

/// Owns the script runtime and the active room.
pub struct RoomRegistry {
    cache: SharedCache,
    runtime: LuaRuntime,
    active: Option<ActiveRoom>,
}

impl RoomRegistry {
    /// Create a registry with its own script runtime bound to `cache`.
    pub fn new(cache: SharedCache) -> LuaResult<Self> {
        let runtime = LuaRuntime::new(cache.clone())?;
        Ok(Self {
            cache,
            runtime,
            active: None,
        })
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn runtime(&self) -> &LuaRuntime {
        &self.runtime
    }

    pub fn active_room(&self) -> Option<&ActiveRoom> {
        self.active.as_ref()
    }

    pub fn current_room_key(&self) -> Option<&str> {
        self.active.as_ref().map(ActiveRoom::key)
    }

    /// Modules of the active room, empty when no room is loaded.
    pub fn current_modules(&self) -> &[ScriptModule] {
        self.active
            .as_ref()
            .map(|room| room.modules.as_slice())
            .unwrap_or(&[])
    }

    /// Split borrow used by the dispatcher.
    pub(crate) fn dispatch_parts(&mut self) -> (&LuaRuntime, Option<&mut ActiveRoom>) {
        (&self.runtime, self.active.as_mut())
    }

    /// Load `room_key` and make it the active room.
    ///
    /// Fails only when the descriptor itself cannot be fetched or decoded; the
    /// previous room then stays active. Individual script failures are logged
    /// and skipped.
    pub fn load_room(&mut self, room_key: &str) -> Result<&ActiveRoom, RoomLoadError> {
        let json = self.cache.borrow_mut().get_json(room_key)?;
        let descriptor =
            RoomDescriptor::from_json(&json).map_err(|source| RoomLoadError::InvalidDescriptor {
                key: room_key.to_string(),
                source,
            })?;

        if let Some(previous) = self.active.take() {
            info!(
                "Leaving room '{}' ({} modules dropped)",
                previous.key,
                previous.modules.len()
            );
        }

        let mut modules = Vec::with_capacity(descriptor.scripts.len());
        for script_key in &descriptor.scripts {
            match self.load_script(script_key) {
                Ok(module) => modules.push(module),
                Err(e) => error!("Error loading script {}: {}", script_key, e),
            }
        }

        if modules.len() < descriptor.scripts.len() {
            warn!(
                "Room '{}' loaded {} of {} scripts",
                room_key,
                modules.len(),
                descriptor.scripts.len()
            );
        } else {
            info!("Room '{}' loaded with {} scripts", room_key, modules.len());
        }

        Ok(self.active.insert(ActiveRoom {
            key: room_key.to_string(),
            descriptor,
            modules,
            error_logged: FxHashSet::default(),
        }))
    }

    fn load_script(&self, script_key: &str) -> Result<ScriptModule, ScriptLoadError> {
        // The cache borrow must end before the script runs: top-level code
        // may fetch resources itself.
        let source = self.cache.borrow_mut().get_script(script_key)?;
        let name = module_name_for(script_key);
        self.runtime.load_module(&name, script_key, &source)
    }

    /// Alias of [`RoomRegistry::load_room`] matching the script-facing name.
    pub fn room_goto(&mut self, room_key: &str) -> Result<&ActiveRoom, RoomLoadError> {
        self.load_room(room_key)
    }

    /// Apply room switches and other session commands queued by scripts.
    ///
    /// Returns `true` when a script asked to quit. A failed room switch is
    /// logged and leaves the current room active.
    pub fn apply_pending_commands(&mut self) -> bool {
        let mut quit = false;
        for cmd in self.runtime.drain_control_commands() {
            match cmd {
                ControlCmd::GotoRoom { room_key } => {
                    if let Err(e) = self.load_room(&room_key) {
                        error!("Cannot switch to room '{}': {}", room_key, e);
                    }
                }
                ControlCmd::Quit => quit = true,
            }
        }
        quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_scripts_and_extra_fields() {
        let value = serde_json::json!({ "scripts": ["a.lua", "b.lua"], "title": "Hall" });
        let descriptor = RoomDescriptor::from_json(&value).unwrap();
        assert_eq!(descriptor.scripts, vec!["a.lua", "b.lua"]);
        assert_eq!(descriptor.extra["title"], "Hall");
    }

    #[test]
    fn test_descriptor_without_scripts_is_empty() {
        let descriptor = RoomDescriptor::from_json(&serde_json::json!({})).unwrap();
        assert!(descriptor.scripts.is_empty());
    }

    #[test]
    fn test_descriptor_rejects_non_string_scripts() {
        let value = serde_json::json!({ "scripts": [1, 2] });
        assert!(RoomDescriptor::from_json(&value).is_err());
    }
}

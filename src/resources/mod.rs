//! Long-lived state, most of it held by the ECS world.
//!
//! Overview
//! - `container` – the packed asset file, keyed by opaque strings
//! - `manifest` – logical -> real key aliases stored inside the container
//! - `media` – image/sound decoding boundary and its raylib backend
//! - `resourcecache` – decoded, memoized resources shared with scripts
//! - `roomregistry` – room descriptors and the active room's script modules
//! - `lua_runtime` – Lua state, the `engine` API and script modules
//! - `gameconfig` – settings read from `config.ini`
//! - `session` – quit flag for the outer loop
//! - `canvas` – retained draw list produced by scripts
//! - `texturestore` – GPU textures for drawn images
//! - `fontstore` – raylib fonts for drawn text, per point size
//! - `audio` – bridge and channels for the background audio thread
pub mod audio;
pub mod canvas;
pub mod container;
pub mod fontstore;
pub mod gameconfig;
pub mod lua_runtime;
pub mod manifest;
pub mod media;
pub mod resourcecache;
pub mod roomregistry;
pub mod session;
pub mod texturestore;

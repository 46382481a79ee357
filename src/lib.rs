//! roompack library.
//!
//! A room-based runtime for games packed into a single container file. This
//! crate exposes the asset pipeline (container, manifest, resource cache),
//! the room registry with its Lua script modules, and the ECS systems that
//! drive them, for use by the binary and by integration tests.

pub mod events;
pub mod packer;
pub mod resources;
pub mod systems;

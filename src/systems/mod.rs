//! Engine systems.
//!
//! Submodules overview
//! - [`input`] – read hardware input into the event queue
//! - [`dispatch`] – route queued events to the active room's handlers
//! - [`lua_commands`] – apply drawing and audio output queued by scripts
//! - [`audio`] – bridge with the audio thread (forward/poll message queues)
//! - [`render`] – draw the canvas using Raylib

pub mod audio;
pub mod dispatch;
pub mod input;
pub mod lua_commands;
pub mod render;

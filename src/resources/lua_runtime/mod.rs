//! Lua scripting runtime.
//!
//! Room scripts are Lua (LuaJIT) chunks. Each script becomes a
//! [`ScriptModule`] with its own environment, and exposes event handlers by
//! registering them through the global `engine` table.
//!
//! # Architecture
//!
//! - [`commands`] - Command enums queued by scripts and drained by systems
//! - [`module`] - Script modules, handler kinds and load errors
//! - [`userdata`] - Image/sound/font/room values handed to scripts
//! - [`runtime`] - Core Lua runtime implementation and `engine` table API
//!
//! # Example
//!
//! ```lua
//! local bg = engine.get_image("Images\\backgrounds\\bg2.png")
//! local sound_played = false
//!
//! engine.on_event(function(event)
//!     engine.draw_image(bg, 0, 0)
//! end, "background_script")
//!
//! engine.on_event_room(function(event, room)
//!     if not sound_played then
//!         engine.get_sound("Sounds\\mus\\test.ogg"):play(true)
//!         sound_played = true
//!     end
//!     if event.type == "key_down" and event.name == "enter" then
//!         room:goto("Rooms\\next_room.json")
//!     end
//! end, "play_sound")
//! ```

mod commands;
mod module;
mod runtime;
mod userdata;

pub use commands::*;
pub use module::{
    HandlerId, HandlerKind, ScriptHandler, ScriptLoadError, ScriptModule, module_name_for,
};
pub use runtime::LuaRuntime;
pub use userdata::{LuaFont, LuaImage, LuaRoom, LuaSound};

//! Input and window events routed to room scripts.
//!
//! The event pump ([`crate::systems::input`]) turns raylib input state into
//! [`GameEvent`]s and pushes them onto the [`EventQueue`] resource. The
//! dispatcher drains the queue once per frame and hands every event to the
//! handlers of the active room as a Lua table:
//!
//! ```lua
//! { type = "key_down", key = 257, name = "enter" }
//! { type = "mouse_motion", x = 120, y = 48 }
//! { type = "quit" }
//! ```

use bevy_ecs::prelude::*;
use mlua::prelude::*;

/// An inbound input/system event.
///
/// Key and mouse button codes are raylib's `KeyboardKey` / `MouseButton`
/// values.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// The window is closing.
    Quit,
    KeyDown { key: i32 },
    KeyUp { key: i32 },
    MouseMotion { x: f32, y: f32 },
    MouseButtonDown { button: i32, x: f32, y: f32 },
    MouseButtonUp { button: i32, x: f32, y: f32 },
    Resized { width: i32, height: i32 },
}

impl GameEvent {
    /// Value of the `type` field seen by scripts.
    pub fn type_name(&self) -> &'static str {
        match self {
            GameEvent::Quit => "quit",
            GameEvent::KeyDown { .. } => "key_down",
            GameEvent::KeyUp { .. } => "key_up",
            GameEvent::MouseMotion { .. } => "mouse_motion",
            GameEvent::MouseButtonDown { .. } => "mouse_button_down",
            GameEvent::MouseButtonUp { .. } => "mouse_button_up",
            GameEvent::Resized { .. } => "resized",
        }
    }

    /// Build the Lua table handed to handlers.
    pub fn to_lua_table(&self, lua: &Lua) -> LuaResult<LuaTable> {
        let table = lua.create_table()?;
        table.set("type", self.type_name())?;
        match self {
            GameEvent::Quit => {}
            GameEvent::KeyDown { key } | GameEvent::KeyUp { key } => {
                table.set("key", *key)?;
                if let Some(name) = key_name(*key) {
                    table.set("name", name)?;
                }
            }
            GameEvent::MouseMotion { x, y } => {
                table.set("x", *x)?;
                table.set("y", *y)?;
            }
            GameEvent::MouseButtonDown { button, x, y }
            | GameEvent::MouseButtonUp { button, x, y } => {
                table.set("button", *button)?;
                table.set("x", *x)?;
                table.set("y", *y)?;
            }
            GameEvent::Resized { width, height } => {
                table.set("width", *width)?;
                table.set("height", *height)?;
            }
        }
        Ok(table)
    }
}

/// Readable name for common raylib key codes.
pub fn key_name(key: i32) -> Option<&'static str> {
    const LETTERS: [&str; 26] = [
        "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
        "s", "t", "u", "v", "w", "x", "y", "z",
    ];
    const DIGITS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
    const FKEYS: [&str; 12] = [
        "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12",
    ];
    match key {
        32 => Some("space"),
        48..=57 => Some(DIGITS[(key - 48) as usize]),
        65..=90 => Some(LETTERS[(key - 65) as usize]),
        256 => Some("escape"),
        257 => Some("enter"),
        258 => Some("tab"),
        259 => Some("backspace"),
        262 => Some("right"),
        263 => Some("left"),
        264 => Some("down"),
        265 => Some("up"),
        290..=301 => Some(FKEYS[(key - 290) as usize]),
        _ => None,
    }
}

/// Events waiting for the next dispatch tick, in arrival order.
#[derive(Resource, Debug, Default)]
pub struct EventQueue {
    events: Vec<GameEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

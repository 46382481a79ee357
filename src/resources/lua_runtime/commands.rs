//! Command enums for Lua-Rust communication.
//!
//! Script code never touches the window, the audio device or the room
//! registry directly. It queues commands, and Rust code drains and applies
//! them after the handler that queued them has returned.

use std::rc::Rc;

use crate::resources::media::{FontHandle, ImageHandle, SoundHandle};

/// Drawing requests queued by scripts.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCmd {
    /// Draw a decoded image at a screen position. `key` is the real key and
    /// names the uploaded texture.
    DrawImage {
        key: String,
        image: Rc<ImageHandle>,
        x: f32,
        y: f32,
    },
    /// Draw text, with raylib's default font when `font` is `None`.
    DrawText {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        font: Option<TextFont>,
    },
    /// Forget everything drawn so far.
    Clear,
}

/// Font picked by a script for [`RenderCmd::DrawText`]. `key` is the real
/// key; together with the point size it names the loaded font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFont {
    pub key: String,
    pub handle: FontHandle,
}

/// Audio requests queued by scripts.
#[derive(Debug, Clone)]
pub enum AudioLuaCmd {
    /// Play a decoded sound, identified by its real key.
    Play {
        key: String,
        sound: Rc<SoundHandle>,
        looped: bool,
    },
    /// Stop every playing sound.
    StopAll,
}

/// Session control requests queued by scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCmd {
    /// Replace the active room once the current event has been dispatched.
    GotoRoom { room_key: String },
    /// End the session.
    Quit,
}

//! Retained draw list.
//!
//! Scripts draw in response to events, not every frame. The canvas keeps the
//! last list they produced and the render system redraws it each frame until
//! a tick queues something new.
//!
//! Image commands share the cache's decoded images, so the canvas is a
//! non-send resource.

use crate::resources::lua_runtime::RenderCmd;

/// Draw list shown by [`render_system`](crate::systems::render::render_system).
#[derive(Debug, Default)]
pub struct Canvas {
    commands: Vec<RenderCmd>,
}

impl Canvas {
    /// Replace the draw list with the commands queued during one tick.
    ///
    /// An empty batch keeps the current list. [`RenderCmd::Clear`] drops
    /// whatever the batch drew before it.
    pub fn apply(&mut self, batch: Vec<RenderCmd>) {
        if batch.is_empty() {
            return;
        }
        self.commands.clear();
        for cmd in batch {
            match cmd {
                RenderCmd::Clear => self.commands.clear(),
                other => self.commands.push(other),
            }
        }
    }

    pub fn commands(&self) -> &[RenderCmd] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

//! Session state shared by the outer loop and the dispatcher.

use bevy_ecs::prelude::*;

/// Whether the session should end after the current frame.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct Session {
    pub quit_requested: bool,
}

//! Audio thread protocol.

use std::sync::Arc;

use bevy_ecs::message::Message;

/// Commands sent *to* the audio thread.
#[derive(Message, Debug, Clone)]
pub enum AudioCmd {
    /// Play an encoded clip. The thread creates the sound on first use and
    /// reuses it for later plays of the same `id`.
    PlayFx {
        id: String,
        file_type: String,
        bytes: Arc<[u8]>,
        looped: bool,
    },
    /// Stop every sound, looped or not.
    StopAll,
    Shutdown,
}

/// Events sent *back* from the audio thread.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum AudioMessage {
    FxLoaded { id: String },
    FxLoadFailed { id: String, error: String },
    FxPlayStarted { id: String, looped: bool },
    FxFinished { id: String },
    StoppedAll,
}

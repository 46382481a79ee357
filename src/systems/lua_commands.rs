//! Applies output queued by scripts during dispatch.
//!
//! - [`RenderCmd`](crate::resources::lua_runtime::RenderCmd) batches replace
//!   the [`Canvas`] draw list.
//! - [`AudioLuaCmd`] values become [`AudioCmd`] messages for the audio thread.

use bevy_ecs::prelude::*;

use crate::events::audio::AudioCmd;
use crate::resources::canvas::Canvas;
use crate::resources::lua_runtime::AudioLuaCmd;
use crate::resources::roomregistry::RoomRegistry;

/// Convert a single audio command from Lua into an audio thread command.
pub fn audio_command_from_lua(cmd: AudioLuaCmd) -> AudioCmd {
    match cmd {
        AudioLuaCmd::Play { key, sound, looped } => AudioCmd::PlayFx {
            id: key,
            file_type: sound.file_type.clone(),
            bytes: sound.bytes.clone(),
            looped,
        },
        AudioLuaCmd::StopAll => AudioCmd::StopAll,
    }
}

/// Drain the runtime's render and audio queues after the dispatch tick.
pub fn apply_script_output_system(
    rooms: NonSend<RoomRegistry>,
    mut canvas: NonSendMut<Canvas>,
    mut audio_cmd_writer: MessageWriter<AudioCmd>,
) {
    let runtime = rooms.runtime();
    canvas.apply(runtime.drain_render_commands());
    for cmd in runtime.drain_audio_commands() {
        audio_cmd_writer.write(audio_command_from_lua(cmd));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::media::SoundHandle;
    use std::rc::Rc;
    use std::sync::Arc;

    #[test]
    fn test_play_carries_encoded_bytes() {
        let sound = Rc::new(SoundHandle {
            file_type: ".ogg".into(),
            bytes: Arc::from(&[1u8, 2, 3][..]),
            frame_count: 10,
            sample_rate: 44100,
            channels: 2,
        });
        let cmd = audio_command_from_lua(AudioLuaCmd::Play {
            key: "Sounds/mus/test.ogg".into(),
            sound: sound.clone(),
            looped: true,
        });
        match cmd {
            AudioCmd::PlayFx {
                id,
                file_type,
                bytes,
                looped,
            } => {
                assert_eq!(id, "Sounds/mus/test.ogg");
                assert_eq!(file_type, ".ogg");
                assert!(Arc::ptr_eq(&bytes, &sound.bytes));
                assert!(looped);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_stop_all() {
        assert!(matches!(
            audio_command_from_lua(AudioLuaCmd::StopAll),
            AudioCmd::StopAll
        ));
    }
}

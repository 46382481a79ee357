//! Bridge between the ECS world and the background audio thread.
//!
//! [`setup_audio`] spawns the thread and inserts [`AudioBridge`] together with
//! the `Messages<AudioCmd>` / `Messages<AudioMessage>` queues. Scripts never
//! talk to the thread directly: their sound requests become `AudioCmd`
//! messages (see [`crate::systems::lua_commands`]) which
//! [`forward_audio_cmds`](crate::systems::audio::forward_audio_cmds) sends
//! through the bridge. [`shutdown_audio`] stops and joins the thread.

use crate::events::audio::{AudioCmd, AudioMessage};
use crate::systems::audio::audio_thread;
use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{error, warn};

/// Channels to the audio thread plus its join handle.
#[derive(Resource)]
pub struct AudioBridge {
    tx_cmd: Sender<AudioCmd>,
    rx_msg: Receiver<AudioMessage>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl AudioBridge {
    /// Queue a command for the audio thread. Dropped silently once the
    /// thread is gone.
    pub fn send(&self, cmd: AudioCmd) {
        let _ = self.tx_cmd.send(cmd);
    }

    /// Replies received since the last call.
    pub fn try_messages(&self) -> impl Iterator<Item = AudioMessage> + '_ {
        self.rx_msg.try_iter()
    }

    /// Whether the audio thread is running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// Spawn the audio thread and register bridge resources.
///
/// When the thread cannot be spawned the bridge is still inserted; commands
/// sent through it are dropped.
pub fn setup_audio(world: &mut World) {
    let (tx_cmd, rx_cmd) = unbounded::<AudioCmd>();
    let (tx_msg, rx_msg) = unbounded::<AudioMessage>();

    let handle = std::thread::Builder::new()
        .name("audio".into())
        .spawn(move || audio_thread(rx_cmd, tx_msg))
        .inspect_err(|e| error!("Cannot start audio thread: {}", e))
        .ok();

    world.insert_resource(AudioBridge {
        tx_cmd,
        rx_msg,
        handle,
    });
    world.insert_resource(Messages::<AudioMessage>::default());
    world.insert_resource(Messages::<AudioCmd>::default());
}

/// Ask the audio thread to shut down and wait for it.
pub fn shutdown_audio(world: &mut World) {
    let Some(mut bridge) = world.remove_resource::<AudioBridge>() else {
        return;
    };
    bridge.send(AudioCmd::Shutdown);
    if let Some(handle) = bridge.handle.take()
        && handle.join().is_err()
    {
        warn!("Audio thread panicked");
    }
}

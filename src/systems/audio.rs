//! Audio system implementation backed by a dedicated thread and Raylib.
//!
//! - [`audio_thread`] runs on its own OS thread, owns the Raylib audio device
//!   and processes [`AudioCmd`] messages, emitting [`AudioMessage`] responses.
//! - [`forward_audio_cmds`] hands ECS `AudioCmd` messages to the thread.
//! - [`poll_audio_messages`] drains the thread's replies into the ECS message
//!   queue, and [`log_audio_messages`] reports them.
//!
//! Sounds arrive as encoded bytes from the resource cache, so the thread
//! never touches the filesystem.

use crate::events::audio::{AudioCmd, AudioMessage};
use crate::resources::audio::AudioBridge;
use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};
use raylib::core::audio::{RaylibAudio, Sound};
use rustc_hash::{FxHashMap, FxHashSet};

/// Drain pending replies from the audio thread into [`Messages<AudioMessage>`].
pub fn poll_audio_messages(bridge: Res<AudioBridge>, mut writer: MessageWriter<AudioMessage>) {
    writer.write_batch(bridge.try_messages());
}

/// Advance the ECS message queue for [`AudioMessage`].
pub fn update_bevy_audio_messages(mut msgs: ResMut<Messages<AudioMessage>>) {
    msgs.update();
}

/// Forward ECS AudioCmd messages to the audio thread via the AudioBridge sender.
pub fn forward_audio_cmds(bridge: Res<AudioBridge>, mut reader: MessageReader<AudioCmd>) {
    for cmd in reader.read() {
        bridge.send(cmd.clone());
    }
}

/// Advance the ECS message queue for AudioCmd so same-frame readers can observe writes.
pub fn update_bevy_audio_cmds(mut msgs: ResMut<Messages<AudioCmd>>) {
    msgs.update();
}

pub fn log_audio_messages(mut reader: MessageReader<AudioMessage>) {
    for msg in reader.read() {
        match msg {
            AudioMessage::FxLoadFailed { id, error } => {
                warn!("Sound '{}' could not be played: {}", id, error)
            }
            other => debug!("[audio] {:?}", other),
        }
    }
}

/// Sounds owned by the audio thread, borrowing the device.
struct FxPlayer<'aud> {
    audio: &'aud RaylibAudio,
    tx_evt: Sender<AudioMessage>,
    sounds: FxHashMap<String, Sound<'aud>>,
    playing: FxHashSet<String>,
    looped: FxHashSet<String>,
}

impl<'aud> FxPlayer<'aud> {
    /// Apply one command. Returns `false` on shutdown.
    fn apply(&mut self, cmd: AudioCmd) -> bool {
        match cmd {
            AudioCmd::PlayFx {
                id,
                file_type,
                bytes,
                looped,
            } => self.play(id, &file_type, &bytes, looped),
            AudioCmd::StopAll => {
                for sound in self.sounds.values() {
                    sound.stop();
                }
                self.playing.clear();
                self.looped.clear();
                let _ = self.tx_evt.send(AudioMessage::StoppedAll);
            }
            AudioCmd::Shutdown => {
                debug!("[audio] shutdown requested");
                return false;
            }
        }
        true
    }

    fn play(&mut self, id: String, file_type: &str, bytes: &[u8], want_loop: bool) {
        if !self.sounds.contains_key(&id) {
            let audio = self.audio;
            let created = audio
                .new_wave_from_memory(file_type, bytes)
                .and_then(|wave| audio.new_sound_from_wave(&wave));
            match created {
                Ok(sound) => {
                    debug!("[audio] fx loaded id='{}'", id);
                    self.sounds.insert(id.clone(), sound);
                    let _ = self.tx_evt.send(AudioMessage::FxLoaded { id: id.clone() });
                }
                Err(e) => {
                    let _ = self.tx_evt.send(AudioMessage::FxLoadFailed {
                        id,
                        error: e.to_string(),
                    });
                    return;
                }
            }
        }
        if let Some(sound) = self.sounds.get(&id) {
            debug!("[audio] fx play id='{}' looped={}", id, want_loop);
            sound.play();
            self.playing.insert(id.clone());
            if want_loop {
                self.looped.insert(id.clone());
            } else {
                self.looped.remove(&id);
            }
            let _ = self.tx_evt.send(AudioMessage::FxPlayStarted {
                id,
                looped: want_loop,
            });
        }
    }

    /// Restart looped sounds that stopped and report the others as finished.
    fn pump(&mut self) {
        let ended: Vec<String> = self
            .playing
            .iter()
            .filter(|id| !self.sounds.get(*id).is_some_and(|s| s.is_playing()))
            .cloned()
            .collect();
        for id in ended {
            match self.sounds.get(&id) {
                Some(sound) if self.looped.contains(&id) => sound.play(),
                _ => {
                    self.playing.remove(&id);
                    let _ = self.tx_evt.send(AudioMessage::FxFinished { id });
                }
            }
        }
    }
}

/// Entry point of the dedicated audio thread.
///
/// Owns the audio device and every `Sound` created from it. Runs until it
/// receives [`AudioCmd::Shutdown`] or the command channel closes. Without an
/// audio device, commands are drained and every play request is answered
/// with [`AudioMessage::FxLoadFailed`].
pub fn audio_thread(rx_cmd: Receiver<AudioCmd>, tx_evt: Sender<AudioMessage>) {
    let audio = match RaylibAudio::init_audio_device() {
        Ok(device) => device,
        Err(e) => {
            error!("Failed to initialize audio device: {}", e);
            for cmd in rx_cmd.iter() {
                match cmd {
                    AudioCmd::PlayFx { id, .. } => {
                        let _ = tx_evt.send(AudioMessage::FxLoadFailed {
                            id,
                            error: "no audio device".to_string(),
                        });
                    }
                    AudioCmd::StopAll => {}
                    AudioCmd::Shutdown => break,
                }
            }
            return;
        }
    };

    info!(
        "[audio] thread starting (id={:?})",
        std::thread::current().id()
    );

    let mut player = FxPlayer {
        audio: &audio,
        tx_evt,
        sounds: FxHashMap::default(),
        playing: FxHashSet::default(),
        looped: FxHashSet::default(),
    };

    'run: loop {
        match rx_cmd.recv_timeout(std::time::Duration::from_millis(10)) {
            Ok(cmd) => {
                if !player.apply(cmd) {
                    break 'run;
                }
                for cmd in rx_cmd.try_iter() {
                    if !player.apply(cmd) {
                        break 'run;
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break 'run,
        }
        player.pump();
    }

    // Sounds drop before `audio`.
    drop(player);
    info!(
        "[audio] thread exiting (id={:?})",
        std::thread::current().id()
    );
}

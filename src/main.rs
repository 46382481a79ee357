//! roompack entry point.
//!
//! Runs a room-based game packed into a single container file:
//! - **raylib** for windowing, drawing and audio
//! - **bevy_ecs** to hold the per-frame state and schedule the systems
//! - **mlua + LuaJIT** for room scripts
//!
//! # Main Loop
//!
//! 1. Pick the container (`--game`, the first container file under the
//!    working directory or a file dialog), open it and build the resource cache
//! 2. Open the window and load the start room
//! 3. Every frame: poll input into events, dispatch them to the active room,
//!    apply what scripts queued (drawing, sounds, room switches) and render
//! 4. ESC or closing the window dispatches a final `quit` event and exits
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --game data.win
//! cargo run --release -- --pack assets/ --out data.win
//! ```

use std::path::{Path, PathBuf};

use bevy_ecs::prelude::*;
use clap::Parser;
use log::{error, info, warn};

use roompack::events::input::EventQueue;
use roompack::packer;
use roompack::resources::audio::{setup_audio, shutdown_audio};
use roompack::resources::canvas::Canvas;
use roompack::resources::container::{Container, find_container_file};
use roompack::resources::fontstore::FontStore;
use roompack::resources::gameconfig::{DEFAULT_CONFIG_PATH, GameConfig};
use roompack::resources::media::RaylibMedia;
use roompack::resources::resourcecache::ResourceCache;
use roompack::resources::roomregistry::RoomRegistry;
use roompack::resources::session::Session;
use roompack::resources::texturestore::TextureStore;
use roompack::systems::audio::{
    forward_audio_cmds, log_audio_messages, poll_audio_messages, update_bevy_audio_cmds,
    update_bevy_audio_messages,
};
use roompack::systems::dispatch::dispatch_events_system;
use roompack::systems::input::poll_input_system;
use roompack::systems::lua_commands::apply_script_output_system;
use roompack::systems::render::render_system;

/// Room-based game runner for packed containers.
#[derive(Parser)]
#[command(version, about = "Runs a room-based game packed into a single container file.")]
struct Cli {
    /// Path to the container file (e.g. data.win). When missing, the working
    /// directory is searched, then a file dialog opens.
    #[arg(long, value_name = "PATH")]
    game: Option<PathBuf>,

    /// Path to the INI configuration file.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Pack a directory into a container and exit.
    #[arg(long, value_name = "DIR")]
    pack: Option<PathBuf>,

    /// Output file for --pack.
    #[arg(long, value_name = "FILE", default_value = "data.win", requires = "pack")]
    out: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Early-exit: build a container and quit (no window/audio needed)
    if let Some(dir) = cli.pack {
        match packer::pack_to_file(&dir, &cli.out) {
            Ok(_) => println!("Container written to {}", cli.out.display()),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let mut config = GameConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        warn!("{}; using defaults", e);
    }

    let Some(game_path) = select_container(cli.game.as_deref(), &config.container_extension)
    else {
        println!("No valid file selected. Exiting.");
        std::process::exit(1);
    };

    let container = match Container::load(&game_path) {
        Ok(container) => container,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Loaded resources: {}",
        container.keys().collect::<Vec<_>>().join(", ")
    );

    let cache = ResourceCache::new(container, Box::new(RaylibMedia::new())).into_shared();
    let mut rooms = match RoomRegistry::new(cache) {
        Ok(rooms) => rooms,
        Err(e) => {
            error!("Failed to create Lua runtime: {}", e);
            std::process::exit(1);
        }
    };

    // --------------- Raylib window ---------------
    let (mut rl, thread) = raylib::init()
        .size(config.window_width as i32, config.window_height as i32)
        .resizable()
        .title(&config.title)
        .build();
    rl.set_target_fps(config.target_fps);
    // ESC is handled by the input pump so scripts still see it
    rl.set_exit_key(None);

    if let Err(e) = rooms.load_room(&config.start_room) {
        error!("Cannot load start room '{}': {}", config.start_room, e);
    }

    // --------------- ECS world + resources ---------------
    let mut world = World::new();
    world.insert_resource(EventQueue::default());
    world.insert_resource(Session::default());
    world.insert_resource(config);
    world.insert_non_send_resource(rooms);
    world.insert_non_send_resource(Canvas::default());
    world.insert_non_send_resource(TextureStore::new());
    world.insert_non_send_resource(FontStore::new());
    world.insert_non_send_resource(rl);
    world.insert_non_send_resource(thread);
    setup_audio(&mut world);

    let mut update = Schedule::default();
    update.add_systems(
        (
            poll_input_system,
            dispatch_events_system,
            apply_script_output_system,
            // audio systems must be together
            update_bevy_audio_cmds,
            forward_audio_cmds,
            poll_audio_messages,
            update_bevy_audio_messages,
            log_audio_messages,
            render_system,
        )
            .chain(),
    );

    if let Err(e) = update.initialize(&mut world) {
        error!("Failed to initialize schedule: {}", e);
        shutdown_audio(&mut world);
        std::process::exit(1);
    }

    // --------------- Main loop ---------------
    while !world.resource::<Session>().quit_requested {
        update.run(&mut world);
    }
    info!("Session ended");
    shutdown_audio(&mut world);
}

/// `requested` when it names an existing file, then the first container
/// found under the working directory, otherwise whatever the user picks in a
/// file dialog.
fn select_container(requested: Option<&Path>, extension: &str) -> Option<PathBuf> {
    if let Some(path) = requested {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        warn!("'{}' is not a file", path.display());
    }
    if let Ok(cwd) = std::env::current_dir()
        && let Some(found) = find_container_file(&cwd, extension)
    {
        info!("Found container {}", found.display());
        return Some(found);
    }
    rfd::FileDialog::new()
        .set_title(format!("Select data.{} file", extension))
        .add_filter("Game Data File", &[extension])
        .pick_file()
        .filter(|path| path.is_file())
}

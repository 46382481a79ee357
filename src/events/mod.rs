//! Event types exchanged across systems.
//!
//! Submodules:
//! - [`audio`] – commands and messages for the background audio thread
//! - [`input`] – input/window events dispatched to room scripts, and the
//!   per-frame [`EventQueue`](input::EventQueue)
pub mod audio;
pub mod input;

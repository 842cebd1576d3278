//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ConfigAction, EffectArgs};
pub use commands::{classify, frame_path, handle_config_action, render, text, write_frame};
pub use enums::CharacterSet;

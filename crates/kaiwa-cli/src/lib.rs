// Library interface for kaiwa-cli
// This allows integration tests to access internal modules

// NOTE: app.rs and commands.rs are also declared in main.rs, so they are
// pulled in by path to avoid "file loaded multiple times" errors.

#[path = "app.rs"]
pub mod app;
#[path = "commands.rs"]
pub mod commands;

pub use commands::{handle_command, CommandResult};

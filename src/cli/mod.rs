pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{AddonsArgs, ChangedArgs, CliArgs, Commands, DepsArgs, VersionsArgs};
pub use output::{OutputFormat, OutputFormatter};

use std::path::PathBuf;

use clap::Parser;

/// Provides component builders.
pub mod builder;
/// Provides getters for the bot's environment variables.
pub mod env;
/// Provides type extension traits.
pub mod extension;
/// Provides component custom identifiers.
pub mod id;

pub use self::id::CustomId;

/// The bot's branding color.
pub const BRANDING: u32 = 0x24_9F_DE;
/// The bot's success color.
pub const SUCCESS: u32 = 0x59_C1_35;
/// The bot's failure color.
pub const FAILURE: u32 = 0xB4_20_2A;

/// Wraps an [`anyhow::Result<T, E>`], providing a defaulted `T` generic type.
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;

/// The bot's command-line arguments.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Parser)]
#[command(author, about, version)]
pub struct Arguments {
    /// Disables logger printing.
    #[arg(short = 'q', long = "quiet")]
    pub log_no_print: bool,
    /// Disables log file writing.
    #[arg(short = 'e', long = "ephemeral")]
    pub log_no_write: bool,
    /// Disables colored logger output.
    #[arg(long = "no-color")]
    pub log_no_color: bool,

    /// The directory to store log files within.
    #[arg(long = "log-directory", default_value = "log")]
    pub log_write_dir: PathBuf,
    /// The directory that contains the bot's data files.
    #[arg(short = 'd', long = "data-directory", default_value = "data")]
    pub data_file_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_defaults() {
        let arguments = Arguments::parse_from(["autorole"]);

        assert!(!arguments.log_no_print);
        assert!(!arguments.log_no_write);
        assert_eq!(arguments.log_write_dir, PathBuf::from("log"));
        assert_eq!(arguments.data_file_dir, PathBuf::from("data"));
    }

    #[test]
    fn argument_flags() {
        let arguments = Arguments::parse_from(["autorole", "-q", "-e", "--no-color", "-d", "state"]);

        assert!(arguments.log_no_print);
        assert!(arguments.log_no_write);
        assert!(arguments.log_no_color);
        assert_eq!(arguments.data_file_dir, PathBuf::from("state"));
    }
}

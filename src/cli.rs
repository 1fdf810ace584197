use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config/config.toml")]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Run a single unit of work and exit instead of starting the service
    #[arg(long, value_enum)]
    pub once: Option<OnceCommand>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnceCommand {
    Ingest,
    Dispatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_once() {
        let cli = Cli::parse_from(["crypto-rates-bot", "--once", "dispatch", "-c", "local.toml"]);
        assert_eq!(cli.once, Some(OnceCommand::Dispatch));
        assert_eq!(cli.config, PathBuf::from("local.toml"));
        assert!(!cli.debug);
    }
}

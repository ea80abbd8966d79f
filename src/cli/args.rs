use std::path::PathBuf;

use clap::Parser;

use crate::{Config, Result};

/// Startup options. They configure the interactive loop; every operation on
/// notes happens inside it.
#[derive(Parser, Debug)]
#[clap(
    version,
    about = "The Scrolls of Skelos: a local archive of text notes and screen captures"
)]
pub struct Cli {
    /// Directory holding scrolls.json and the screenshots folder
    #[clap(long, env = "SCROLLS_DIR", value_parser)]
    pub data_dir: Option<PathBuf>,

    /// Screenshot command to use instead of auto-detection; `{path}` marks the target file
    #[clap(long, env = "SCROLLS_CAPTURE")]
    pub capture_cmd: Option<String>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolves the archive layout, defaulting to the home directory
    pub fn config(&self) -> Result<Config> {
        let config = match &self.data_dir {
            Some(dir) => Config::from_data_dir(dir),
            None => Config::from_home()?,
        };
        Ok(config.with_capture_command(self.capture_cmd.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_overrides() {
        let cli = Cli::parse_from([
            "scrolls",
            "--data-dir",
            "/tmp/archive",
            "--capture-cmd",
            "grim {path}",
            "-v",
        ]);
        assert!(cli.verbose);

        let config = cli.config().unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/archive"));
        assert_eq!(config.capture_command.as_deref(), Some("grim {path}"));
    }

    #[test]
    fn test_rejects_positional_arguments() {
        assert!(Cli::try_parse_from(["scrolls", "list"]).is_err());
    }
}

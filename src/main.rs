use std::{io, process::ExitCode};

use clap::Parser;
use log::{error, info, warn};

use scrolls::{App, Cli, ExternalCapture, NoteStore, Result, ScreenshotTool, SystemOpener};

pub fn initialize_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config()?;
    let store = NoteStore::open(config.clone())?;

    let capture = ExternalCapture::from_config(&config).unwrap_or_else(|e| {
        warn!("Ignoring capture command: {}", e);
        ExternalCapture::new(ScreenshotTool::detect())
    });

    let stdin = io::stdin();
    let mut app = App::new(
        store,
        Box::new(capture),
        Box::new(SystemOpener),
        stdin.lock(),
        io::stdout(),
    );
    app.run()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);
    info!("Application starting up");

    match run(cli) {
        Ok(()) => {
            info!("Application shutting down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fatal: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

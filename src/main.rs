use aniso_ascii::cli::{self, Args, Command};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // Logs go to stderr so `text` output stays clean.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();

    let args = Args::parse();
    let config_path = args.config.as_deref();

    let result = match args.command {
        Command::Render {
            asset,
            output,
            frames,
            fps,
            effect,
        } => cli::render(config_path, asset, &output, frames, fps, &effect),
        Command::Text {
            asset,
            frames,
            follow,
            fps,
            effect,
        } => cli::text(config_path, asset, frames, follow, fps, &effect),
        Command::Classify { assets } => {
            cli::classify(&assets);
            Ok(())
        }
        Command::Config { action } => cli::handle_config_action(action, config_path),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

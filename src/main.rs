use clap::Parser;
use tracing_subscriber::EnvFilter;

use android_screen_control::cli::commands::{render_response, run_command};
use android_screen_control::cli::config::{Cli, load_config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Resolve settings: CLI > config file > defaults
    let config = load_config(cli.config.as_deref()).with_overrides(&cli);

    let response = run_command(&cli.command, &config);
    println!("{}", render_response(&response));

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Logs go to stderr; stdout carries the JSON result.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

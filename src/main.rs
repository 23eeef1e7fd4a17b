use bevy::app::App;
use bevy::log::{Level, LogPlugin};
use clap::Parser;
use emtracks::cli::{self, Args};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_species {
        cli::handle_list_species();
        return ExitCode::SUCCESS;
    }

    if args.list_integrators {
        cli::handle_list_integrators();
        return ExitCode::SUCCESS;
    }

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    App::new().add_plugins(LogPlugin {
        level,
        ..Default::default()
    });

    let result = cli::load_and_apply_config(&args).and_then(|config| cli::run(&args, &config));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

use addonscan::cli::commands::{CliArgs, Commands};
use addonscan::cli::handlers::{handle_addons, handle_changed, handle_deps, handle_versions};
use addonscan::util::logging::{init_logging, parse_level, LoggingConfig};
use addonscan::{ScanConfig, VERSION};

use clap::Parser;
use std::env;
use tracing::{debug, error, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("addonscan v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let exit_code = match &args.command {
        Commands::Addons(addons_args) => handle_addons(addons_args, &config),
        Commands::Deps(deps_args) => handle_deps(deps_args, &config),
        Commands::Changed(changed_args) => handle_changed(changed_args, &config),
        Commands::Versions(versions_args) => handle_versions(versions_args, &config),
    };

    std::process::exit(exit_code);
}

fn load_config() -> Result<ScanConfig, addonscan::ConfigError> {
    let config = ScanConfig::from_env()?;
    config.validate()?;
    debug!("{}", config);
    Ok(config)
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("ADDONSCAN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    };

    let use_json = env::var("ADDONSCAN_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}

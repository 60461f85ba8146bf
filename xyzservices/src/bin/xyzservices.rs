use std::env;
use std::io::{Write as _, stdout};

use clap::Parser;
use log::log_enabled;
use tracing::{error, info};
use xyzservices::XyzResult;
use xyzservices::commands;
use xyzservices::config::args::{Args, Commands};
use xyzservices::config::env::OsEnv;
use xyzservices::config::file::{Config, read_config};
use xyzservices::logging::{LOG_FORMAT_ENV_VAR, ensure_core_log_level_matches, init_tracing};
#[cfg(feature = "qms")]
use xyzservices_core::qms::QmsClient;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg_attr(not(feature = "qms"), allow(clippy::unused_async))]
async fn start(args: Args) -> XyzResult<()> {
    info!("Starting xyzservices v{VERSION}");

    let env = OsEnv::default();
    let mut config = if let Some(ref cfg_filename) = args.config {
        info!("Using {}", cfg_filename.display());
        read_config(cfg_filename, &env)?
    } else {
        Config::default()
    };
    args.merge_into_config(&mut config);
    config.finalize();

    let mut out = stdout().lock();
    match args.command {
        Commands::List(list) => {
            let providers = config.load_providers(&env)?;
            commands::list(&providers, &list, &config, &mut out)?;
        }
        Commands::Show { name, format } => {
            let providers = config.load_providers(&env)?;
            commands::show(&providers, &name, format, &mut out)?;
        }
        Commands::Url(url) => {
            let providers = config.load_providers(&env)?;
            commands::url(&providers, &url, &config, &mut out)?;
        }
        #[cfg(feature = "qms")]
        Commands::Qms { name, format } => {
            commands::qms(&QmsClient::new(), &name, format, &mut out).await?;
        }
    }
    out.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let filter = ensure_core_log_level_matches(env::var("RUST_LOG").ok(), "xyzservices=");
    init_tracing(&filter, env::var(LOG_FORMAT_ENV_VAR).ok());

    let args = Args::parse();
    if let Err(e) = start(args).await {
        // Ensure the message is printed, even if the logging is disabled
        if log_enabled!(log::Level::Error) {
            error!("{e}");
        } else {
            eprintln!("{e}");
        }
        std::process::exit(1);
    }
}

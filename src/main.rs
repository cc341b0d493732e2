use clap::{Arg, ArgAction, Command};
use std::env;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use claw_webapp::assets::{dist_assets, AssetSource, DirAssets};
use claw_webapp::config::ConfigLoader;
use claw_webapp::logger::Logger;
use claw_webapp::network::NetworkUtils;
use claw_webapp::shutdown::ShutdownSignals;
use claw_webapp::{ServerStatus, WebModule};

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let matches = Command::new("claw-webapp")
        .version(PKG_VERSION)
        .about("Serves the claw game web app with robot identity cookies")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file (defaults to webapp.json or config.json)"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_parser(clap::value_parser!(u16))
                .help("Port to listen on, overrides the port attribute"),
        )
        .arg(
            Arg::new("directory")
                .short('d')
                .long("dir")
                .value_name("DIR")
                .help("Serve the web app from this directory instead of the bundled build"),
        )
        .arg(
            Arg::new("debug")
                .short('v')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging, including the access log"),
        )
        .arg(
            Arg::new("no-timestamps")
                .short('T')
                .long("no-timestamps")
                .action(ArgAction::SetTrue)
                .help("Disable timestamps in log messages"),
        )
        .get_matches();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let logger = Logger::new()
        .with_timestamps(!matches.get_flag("no-timestamps"))
        .with_debug(matches.get_flag("debug"))
        .with_scope("webapp");
    logger.startup_info(PKG_NAME, PKG_VERSION);

    let config_dir = env::current_dir()?;
    let custom_config = matches.get_one::<String>("config").map(|s| s.as_str());
    let configuration = match ConfigLoader::new(config_dir).load_configuration(custom_config) {
        Ok(config) => config,
        Err(e) => {
            logger.error(&format!("Configuration error: {}", e));
            exit(1);
        }
    };

    let assets: Arc<dyn AssetSource> = match matches.get_one::<String>("directory") {
        Some(dir) => match DirAssets::new(PathBuf::from(dir)) {
            Ok(assets) => Arc::new(assets),
            Err(e) => {
                logger.error(&format!("Unknown path: {}: {}", dir, e));
                exit(1);
            }
        },
        None => Arc::new(dist_assets()),
    };

    let port = matches
        .get_one::<u16>("port")
        .copied()
        .unwrap_or_else(|| configuration.service.port());

    let module = match WebModule::new_and_start(
        configuration.service,
        assets,
        logger.clone(),
        &configuration.identity_cookies,
        port,
    ) {
        Ok(module) => module,
        Err(e) => {
            logger.error(&e.to_string());
            exit(1);
        }
    };

    if let Some(bound) = module.local_addr() {
        let addresses = NetworkUtils::create_server_addresses(bound);
        logger.server_info(
            &module.name().to_string(),
            &addresses.local,
            addresses.network.as_deref(),
        );
    }

    let signals = match ShutdownSignals::new(logger.clone()) {
        Ok(signals) => signals,
        Err(e) => {
            logger.error(&format!("Failed to setup signal handling: {}", e));
            module.close().await;
            exit(1);
        }
    };

    // Either a signal or the accept loop ending on its own stops us.
    let mut status = module.status();
    tokio::select! {
        _ = signals.recv() => {}
        result = status.wait_for(|s| !matches!(s, ServerStatus::Listening(_))) => {
            if let Ok(state) = result {
                logger.warn(&format!("web server {}", *state));
            }
        }
    }

    module.close().await;
    Ok(())
}

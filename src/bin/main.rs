//! fleet-dns binary entry point.

use clap::Parser;
use fleet_dns::{telemetry, Config, DnsServer};
use std::path::PathBuf;
use tracing::{error, info};
use tripwire::Tripwire;

/// DNS load balancer over a self-describing node fleet.
#[derive(Parser, Debug)]
#[command(name = "fleet-dns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(short, long, default_value = "fleet-dns.toml")]
    config: PathBuf,

    /// Override the log filter from the configuration file.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let mut config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()))
        .add_source(
            config::Environment::with_prefix("FLEET_DNS")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("peers.seeds")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    if let Some(level) = args.log_level {
        config.telemetry.log_level = level;
    }

    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    // No seeds is the one condition that aborts instead of degrading
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    info!(
        config_file = %args.config.display(),
        listen_addr = %config.dns.listen_addr,
        service_name = %config.dns.service_name,
        seeds = ?config.peers.seeds,
        peer_port = config.peers.port,
        "Starting fleet-dns"
    );

    // Setup graceful shutdown
    let (tripwire, tripwire_worker) = Tripwire::new_signals();
    tokio::spawn(tripwire_worker);

    let result = match DnsServer::new(config.dns, config.peers) {
        Ok(server) => server.run(tripwire).await,
        Err(e) => Err(e),
    };

    telemetry::shutdown();

    if let Err(e) = result {
        error!("DNS server error: {}", e);
        return Err(e.into());
    }

    info!("fleet-dns shutdown complete");
    Ok(())
}

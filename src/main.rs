use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use vehicle_data_producer::{
    LoopbackTransport, ProducerConfig, ShutdownReason, TransportMode, VehicleDataProducer,
};

#[derive(Parser, Debug)]
#[command(name = "vehicle-data-producer")]
#[command(about = "Synthetic vehicle data producer for a pub/sub service")]
#[command(version)]
#[command(long_about = "Periodically offers and withdraws a single vehicle data service \
and, while the service is offered, notifies subscribers with an incrementing \
gear/type/value/speed sample.")]
struct Args {
    /// Use reliable (tcp) delivery
    #[arg(long, conflicts_with = "udp")]
    tcp: bool,

    /// Use unreliable (udp) delivery, the default
    #[arg(long)]
    udp: bool,

    /// Notification interval in milliseconds
    #[arg(long, value_name = "MILLISECONDS")]
    cycle: Option<u64>,

    /// Path to configuration file
    #[arg(short, long, default_value = "producer.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose trace level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the producer")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("# Vehicle data producer configuration");
        println!("{}", ProducerConfig::default().to_toml()?);
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting vehicle data producer v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match ProducerConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    apply_overrides(&mut config, &args);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    info!(
        "Transport mode: {}, notification interval: {:?}",
        config.transport.mode,
        config.notifier.interval()
    );

    let transport = Arc::new(LoopbackTransport::new(
        config.transport.application_name.clone(),
    ));
    let producer = VehicleDataProducer::new(config, transport).await?;

    if let Err(e) = producer.init().await {
        error!("Failed to initialize producer: {}", e);
        producer
            .shutdown(ShutdownReason::Error(e.to_string()))
            .await?;
        std::process::exit(1);
    }

    producer.start().await?;

    let exit_code = producer.run().await.map_err(|e| {
        error!("Producer error during execution: {}", e);
        e
    })?;

    info!("Vehicle data producer exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

/// Command-line flags take precedence over file and environment settings
fn apply_overrides(config: &mut ProducerConfig, args: &Args) {
    if args.tcp {
        config.transport.mode = TransportMode::Reliable;
    } else if args.udp {
        config.transport.mode = TransportMode::Unreliable;
    }

    if let Some(cycle) = args.cycle {
        config.notifier.interval_ms = cycle;
    }
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.verbose {
        "trace"
    } else if args.debug {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vehicle_data_producer={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("pretty") => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some("compact") | None => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_config_values() {
        let args = Args::parse_from(["vehicle-data-producer"]);
        let mut config = ProducerConfig::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config, ProducerConfig::default());
    }

    #[test]
    fn test_tcp_and_cycle_override_config() {
        let args = Args::parse_from(["vehicle-data-producer", "--tcp", "--cycle", "1000"]);
        let mut config = ProducerConfig::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.transport.mode, TransportMode::Reliable);
        assert_eq!(config.notifier.interval_ms, 1000);
    }

    #[test]
    fn test_udp_overrides_file_setting() {
        let args = Args::parse_from(["vehicle-data-producer", "--udp"]);
        let mut config = ProducerConfig::default();
        config.transport.mode = TransportMode::Reliable;
        apply_overrides(&mut config, &args);

        assert_eq!(config.transport.mode, TransportMode::Unreliable);
    }

    #[test]
    fn test_tcp_conflicts_with_udp() {
        let result = Args::try_parse_from(["vehicle-data-producer", "--tcp", "--udp"]);
        assert!(result.is_err());
    }
}

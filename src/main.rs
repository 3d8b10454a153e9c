use clap::{Parser, Subcommand};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{error, info, warn};
use venue_arbitrage::{
    config::{ArbitrageConfig, ModePreference},
    connectors::{live_trading_enabled, VenueSet},
    reporting::{ConsoleReporter, FanoutReporter, ReportSink, TracingReporter},
    strategy::ArbitrageEngine,
    utils::{logger, metrics},
    Result,
};

#[derive(Parser)]
#[command(name = "arbitrage")]
#[command(about = "Multi-venue spot arbitrage bot")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/arbitrage.toml")]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log file path
    #[arg(long, default_value = "logs/arbitrage.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll venues and trade until interrupted
    Run {
        /// Force simulated venues even when credentials are configured
        #[arg(long)]
        simulate: bool,

        /// Stop after this many cycles
        #[arg(long)]
        max_cycles: Option<u64>,
    },
    /// Validate configuration
    Validate,
    /// Show configuration summary and the mode a run would use
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    logger::init(&cli.log_level, &cli.log_file)?;

    info!("Starting {} v{}", venue_arbitrage::APP_NAME, venue_arbitrage::VERSION);

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Run { simulate, max_cycles } => run(config, simulate, max_cycles).await,
        Commands::Validate => validate_config(config),
        Commands::Status => show_status(config).await,
    }
}

fn load_config(path: &Path) -> Result<ArbitrageConfig> {
    if path.exists() {
        let config = ArbitrageConfig::from_file(path)?;
        info!("Configuration loaded from: {}", path.display());
        Ok(config)
    } else {
        warn!("Configuration file {} not found, using built-in defaults", path.display());
        Ok(ArbitrageConfig::default())
    }
}

async fn run(mut config: ArbitrageConfig, simulate: bool, max_cycles: Option<u64>) -> Result<()> {
    if simulate {
        config.execution.mode = ModePreference::Simulated;
    }
    if max_cycles.is_some() {
        config.execution.max_cycles = max_cycles;
    }
    config.validate()?;

    if config.monitoring.enable_metrics {
        metrics::init_metrics(&config.monitoring.metrics_listen_addr)?;
    }

    let venues = VenueSet::build(&config)?;
    info!(mode = %venues.mode(), venues = ?venues.venues(), "Venues ready");

    let mut sinks: Vec<Arc<dyn ReportSink>> = vec![Arc::new(TracingReporter)];
    if config.monitoring.status_table {
        sinks.push(Arc::new(ConsoleReporter::new(config.instruments(), venues.venues(), config.poll_interval())));
    }

    let engine = match ArbitrageEngine::new(config, venues, Arc::new(FanoutReporter::new(sinks))) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to create engine: {}", e);
            return Err(e);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let summary = engine.run(shutdown).await?;
    info!(
        "Run finished: {} cycles, {} trades, total profit {:.4}",
        summary.cycles, summary.portfolio.trades_executed, summary.portfolio.total_profit
    );

    Ok(())
}

fn validate_config(config: ArbitrageConfig) -> Result<()> {
    info!("Validating configuration...");

    match config.validate() {
        Ok(_) => {
            info!("Configuration is valid");
            println!("Configuration validation passed!");
            Ok(())
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            Err(e)
        }
    }
}

async fn show_status(config: ArbitrageConfig) -> Result<()> {
    config.validate()?;

    println!("System Status:");
    println!("  Version:      {}", venue_arbitrage::VERSION);
    println!("  Live trading: {}", if live_trading_enabled() { "enabled" } else { "disabled in this build" });
    println!("  Mode setting: {:?}", config.execution.mode);
    println!("  Instruments:  {}", config.strategy.instruments.join(", "));
    println!(
        "  Trade size:   {} | fee {}% | threshold {}%",
        config.strategy.trade_size,
        config.strategy.fee_rate * 100.0,
        config.strategy.threshold * 100.0
    );
    println!("  Venues:");
    for venue in &config.venues {
        println!(
            "    {:<12} {:<8} credentials: {}",
            venue.name,
            venue.exchange,
            if venue.has_credentials() { "yes" } else { "no" }
        );
    }

    let venues = VenueSet::build(&config)?;
    println!("  Selected mode: {} ({} venues)", venues.mode(), venues.len());
    venues.close_all().await;

    Ok(())
}

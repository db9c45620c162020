use anyhow::Result;
use clap::{Parser, Subcommand};
use lidar::{
    checker::default_checker,
    config::Config,
    logging,
    memory::MemoryWorkSource,
    notify::NotificationBus,
    runner::{CheckRunner, Runner, ScanRunner},
    scanner::ResourceScanner,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "lidar")]
#[command(
    author,
    version,
    about = "Keep resource versions fresh by scanning and checking on an interval"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scanner and checker until interrupted
    Run {
        /// Seconds between scan passes
        #[arg(long)]
        scan_interval: Option<u64>,

        /// Seconds between check passes
        #[arg(long)]
        check_interval: Option<u64>,

        /// Minimum seconds between checks of the same resource
        #[arg(long)]
        check_every: Option<u64>,

        /// Fleet file listing the resources to keep fresh
        #[arg(short, long)]
        fleet: Option<PathBuf>,
    },

    /// Show the effective configuration, or create the config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Run {
            scan_interval,
            check_interval,
            check_every,
            fleet,
        } => {
            if let Some(secs) = scan_interval {
                config.scan_interval_secs = secs;
            }
            if let Some(secs) = check_interval {
                config.check_interval_secs = secs;
            }
            if let Some(secs) = check_every {
                config.check_every_secs = secs;
            }
            if fleet.is_some() {
                config.fleet = fleet;
            }

            run_scheduler(config).await
        }
        Commands::Config { init, path } => handle_config(&config, init, path),
    }
}

async fn run_scheduler(config: Config) -> Result<()> {
    config.validate()?;
    logging::init(&config.log_level)?;

    let source = Arc::new(match &config.fleet {
        Some(path) => MemoryWorkSource::load_fleet(path)?,
        None => MemoryWorkSource::new(),
    });
    let bus = Arc::new(NotificationBus::new());

    let scanner = ResourceScanner::new(source.clone(), config.check_every()).with_notifications(bus.clone());
    let runner = Runner::new(
        ScanRunner::new(config.scan_interval(), Arc::new(scanner)),
        CheckRunner::new(config.check_interval(), Arc::new(default_checker()), source, bus.clone()),
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, shutting down");
                signal.cancel();
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for interrupt"),
        }
    });

    runner.run(shutdown).await?;
    bus.close();
    Ok(())
}

fn handle_config(config: &Config, init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
        } else {
            Config::default().save()?;
            println!("Created config file at: {}", config_path.display());
        }
        return Ok(());
    }

    if config_path.exists() {
        println!("# Loaded from {}", config_path.display());
    } else {
        println!("# No config file at {}, showing defaults", config_path.display());
        println!("# Run 'lidar config --init' to create one.");
    }
    if let Err(e) = config.validate() {
        println!("# Invalid: {e}");
    }
    print!("{}", config.to_toml()?);

    Ok(())
}

//! # Stage Contract Validator
//!
//! Command-line tool for checking the stage contract file and pipeline
//! configuration before starting the pipeline. Runs the same integrity checks
//! as startup and exits non-zero when they fail.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use venture_pipeline::config::ConfigManager;
use venture_pipeline::contracts::{ContractFile, StageContractRegistry};

#[derive(Parser)]
#[command(name = "contract-validator")]
#[command(about = "Validate venture pipeline stage contracts and configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Stage contract file (default: contracts.path from configuration)
    #[arg(short, long)]
    contracts: Option<PathBuf>,

    /// Environment to load configuration for
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory path (default: config)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format (table, json)
    #[arg(long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the startup integrity checks and print a per-stage summary
    Check,

    /// Show the contract for one stage
    Stage {
        /// Stage number (1-25)
        number: u32,
    },

    /// Validate the pipeline configuration for the environment
    Config,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::Check) | None => check_contracts(&cli),
        Some(Commands::Stage { number }) => show_stage(&cli, *number),
        Some(Commands::Config) => validate_config(&cli),
    };

    match result {
        Ok(()) => {
            info!("Validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            eprintln!("❌ {e}");
            process::exit(1);
        }
    }
}

fn load_manager(cli: &Cli) -> Result<std::sync::Arc<ConfigManager>, Box<dyn std::error::Error>> {
    Ok(ConfigManager::load_from_directory_with_env(
        cli.config_dir.clone(),
        &cli.environment,
    )?)
}

fn contracts_path(cli: &Cli) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match &cli.contracts {
        Some(path) => Ok(path.clone()),
        None => Ok(load_manager(cli)?.config().contracts.path.clone()),
    }
}

fn check_contracts(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let path = contracts_path(cli)?;
    println!("🔧 Validating stage contracts: {}", path.display());

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let file: ContractFile = serde_yaml::from_str(&contents)
        .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;

    let errors = StageContractRegistry::integrity_report(&file.stages);
    if !errors.is_empty() {
        println!("❌ {} integrity error(s):", errors.len());
        for error in &errors {
            println!("   - {error}");
        }
        return Err(format!("{} integrity error(s) in {}", errors.len(), path.display()).into());
    }

    let registry = StageContractRegistry::from_definitions(file.version, file.stages)?;

    if cli.format == "json" {
        println!("{}", serde_json::to_string_pretty(registry.contracts())?);
        return Ok(());
    }

    println!("✅ Contract version {} covers {} stages", registry.version(), registry.len());
    println!();
    println!("{:>5}  {:<40} {:>8} {:>8}", "STAGE", "NAME", "CONSUMES", "PRODUCES");
    for contract in registry.contracts() {
        println!(
            "{:>5}  {:<40} {:>8} {:>8}",
            contract.stage_number,
            contract.name,
            contract.consumes.len(),
            contract.produces.len()
        );
    }
    Ok(())
}

fn show_stage(cli: &Cli, number: u32) -> Result<(), Box<dyn std::error::Error>> {
    let registry = StageContractRegistry::load(&contracts_path(cli)?)?;
    let contract = registry
        .get(number)
        .ok_or_else(|| format!("no contract for stage {number}"))?;

    if cli.format == "json" {
        println!("{}", serde_json::to_string_pretty(contract)?);
        return Ok(());
    }

    println!("Stage {}: {}", contract.stage_number, contract.name);
    println!("  consumes:");
    for consumed in &contract.consumes {
        println!(
            "    - stage {} {} ({}{})",
            consumed.stage,
            consumed.field,
            consumed.field_type,
            if consumed.required { "" } else { ", optional" }
        );
    }
    println!("  produces:");
    for (field, produced) in &contract.produces {
        println!("    - {field} ({})", produced.field_type);
    }
    Ok(())
}

fn validate_config(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔧 Validating pipeline configuration");
    println!("Environment: {}", cli.environment);

    let manager = load_manager(cli)?;
    let config = manager.config();
    println!("✅ Configuration loaded from {}", manager.config_directory().display());

    if cli.format == "json" {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("  scheduler.poll_interval_seconds: {}", config.scheduler.poll_interval_seconds);
    println!("  scheduler.dispatch_batch_size:   {}", config.scheduler.dispatch_batch_size);
    println!("  orchestrator.max_concurrent:     {}", config.orchestrator.max_concurrent);
    println!("  router.handler_timeout_ms:       {}", config.router.handler_timeout_ms);
    println!("  circuit_breaker.failure_threshold: {}", config.circuit_breaker.failure_threshold);
    println!("  circuit_breaker.cooldown_seconds:  {}", config.circuit_breaker.cooldown_seconds);
    println!("  contracts.path:                  {}", config.contracts.path.display());
    Ok(())
}

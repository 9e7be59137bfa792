//! ffcapm CLI binary.
//!
//! Runs the CAPM and FF3 studies and writes their timestamped result files.

use clap::{Parser, Subcommand};
use ffcapm::{
    CapmStudy, Ff3Study, StudyConfig,
    data::{CapmDataset, Ff3Dataset},
    output::{ExportFormat, now},
};
use std::{path::PathBuf, process};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ffcapm")]
#[command(about = "CAPM and Fama-French three-factor study of SH/SZ real-estate stocks", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file (defaults read data_CAPM.xlsx and data_FF3.xlsx)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for result files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Output format (csv, json or pretty-json)
    #[arg(long, global = true)]
    format: Option<ExportFormat>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-stock and sector-portfolio CAPM regressions
    Capm,

    /// Size/value bucket regressions on market, SMB and HML
    Ff3,

    /// Run CAPM, then FF3
    All,

    /// Print the effective configuration as JSON
    Config,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => StudyConfig::load(path)?,
        None => StudyConfig::default(),
    };
    if let Some(dir) = cli.output_dir {
        config.output.dir = dir;
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }

    match cli.command {
        Commands::Capm => run_capm(&config)?,
        Commands::Ff3 => run_ff3(&config)?,
        Commands::All => {
            run_capm(&config)?;
            run_ff3(&config)?;
        }
        Commands::Config => println!("{}", serde_json::to_string_pretty(&config)?),
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn banner(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", title);
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

fn ensure_dir(config: &StudyConfig) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.output.dir)?;
    Ok(())
}

fn run_capm(config: &StudyConfig) -> Result<(), Box<dyn std::error::Error>> {
    banner("CAPM: SH/SZ REAL ESTATE");

    let dataset = CapmDataset::load(&config.capm.layout)?;
    println!(
        "Loaded {} stocks over {} weeks from {}",
        dataset.prices.instruments().len(),
        dataset.prices.len(),
        config.capm.layout.sheet.label()
    );

    let study = CapmStudy::new(&dataset, config.capm.study.clone())?;
    let results = study.run()?;

    println!("\nSingle-stock regressions:");
    println!("{:<8} {:>7} {:>10} {:>10} {:>12}", "Scope", "Stocks", "Mean β", "Mean R²", "p < 0.05");
    println!("{}", "-".repeat(51));
    for table in &results.stocks {
        let n = table.len().max(1) as f64;
        let mean_beta = table.rows.iter().map(|r| r.beta).sum::<f64>() / n;
        let mean_r2 = table.rows.iter().map(|r| r.rsquared).sum::<f64>() / n;
        let significant = table.rows.iter().filter(|r| r.pvalue < 0.05).count();
        println!(
            "{:<8} {:>7} {:>10.4} {:>10.4} {:>12}",
            table.scope,
            table.len(),
            mean_beta,
            mean_r2,
            significant
        );
    }

    for summary in &results.portfolios {
        print!("{}", summary.to_ascii_table());
    }

    ensure_dir(config)?;
    let outputs = results.write(&config.output.dir, config.output.format, now())?;
    println!("\nWrote {}", outputs.stocks.display());
    println!("Wrote {}", outputs.portfolios.display());
    Ok(())
}

fn run_ff3(config: &StudyConfig) -> Result<(), Box<dyn std::error::Error>> {
    banner("FAMA-FRENCH 3-FACTOR: SH/SZ REAL ESTATE");

    let dataset = Ff3Dataset::load(&config.ff3.layout)?;
    println!(
        "Loaded {} stocks over {} weeks from {}",
        dataset.prices.instruments().len(),
        dataset.prices.len(),
        config.ff3.layout.prices.label()
    );

    let study = Ff3Study::new(&dataset, config.ff3.study.clone())?;
    for (year, weeks) in study.calendar().iter() {
        println!("  {}: weeks {}..{}", year, weeks.start, weeks.end);
    }
    let results = study.run()?;

    println!(
        "\n{:<18} {:>9} {:>9} {:>9} {:>9} {:>8}",
        "Portfolio", "alpha", "MKT", "SMB", "HML", "R²"
    );
    println!("{}", "-".repeat(67));
    for summary in &results.summaries {
        let coef = |name: &str| summary.coefficient(name).map_or(f64::NAN, |c| c.coef);
        println!(
            "{:<18} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>8.3}",
            summary.title,
            coef("const"),
            coef("MKT"),
            coef("SMB"),
            coef("HML"),
            summary.rsquared
        );
    }

    ensure_dir(config)?;
    let outputs = results.write(&config.output.dir, config.output.format, now())?;
    println!("\nWrote {}", outputs.results.display());
    println!("Wrote {}", outputs.holdings.display());
    println!("Wrote {}", outputs.factors.display());
    Ok(())
}

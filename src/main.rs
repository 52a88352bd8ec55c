use clap::Parser;
use simple_ga::config::Config;
use simple_ga::evolution::bisection::BisectionSearch;
use simple_ga::evolution::run_standard;
use simple_ga::report::{ConsoleReporter, FinalReport, ReportExport};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "simple-ga",
    about = "Simple genetic algorithm with bisection search over population size",
    version
)]
struct Cli {
    /// Settings file, TOML or `key value` lines. Created with defaults when missing.
    #[arg(default_value = "config.toml")]
    settings: PathBuf,
    /// Limited debug output: population dumps and best/worst genomes per generation
    #[arg(short = 'g')]
    limited_debug: bool,
    /// Full debug output: selection, crossover and mutation detail
    #[arg(short = 'G')]
    full_debug: bool,
    /// Also write the final report as JSON to this path
    #[arg(long = "report-json")]
    report_json: Option<PathBuf>,
}

/// Loads the settings file, creating the default one first when it does not exist yet.
fn load_config(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        log::info!(
            "Settings file '{}' not found, writing defaults",
            path.display()
        );
        Config::write_default(path)
            .map_err(|e| format!("Failed to write default configuration: {}", e))?;
    }
    let config =
        Config::load(path).map_err(|e| format!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {}", e))?;
    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.full_debug {
        "trace"
    } else if cli.limited_debug {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::info!("Booting simple-ga...");

    // 1. Load and Validate Configuration
    let config = match load_config(&cli.settings) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    };
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => log::warn!("Could not render configuration: {}", e),
    }
    log::info!("Configuration loaded and validated.");

    // 2. Run
    let start = Instant::now();
    let mut reporter = ConsoleReporter;
    let result = if config.bisection.enabled {
        log::info!("--- Starting Bisection Search ---");
        BisectionSearch::new(&config)
            .run(&mut reporter)
            .map(FinalReport::Bisection)
    } else {
        log::info!("--- Starting Evolution ---");
        run_standard(&config, &mut reporter).map(FinalReport::from)
    };
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            log::error!("Evolution failed: {}", e);
            process::exit(1);
        }
    };
    println!("Execution time: {:.3}s", start.elapsed().as_secs_f64());

    // 3. Export
    if let Some(path) = cli.report_json {
        if let Err(e) = ReportExport::new(config, report).write(&path) {
            log::error!("{}", e);
            process::exit(1);
        }
        log::info!("Report written to '{}'", path.display());
    }
}

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, Command};
use log::{error, info, warn};

use spectral_features::batch::{collect_inputs, process_paths, select_batch};
use spectral_features::output::write_table;
use spectral_features::{ExtractorConfig, FeatureExtractor};

const DEFAULT_OUTPUT: &str = "features.csv";
const DEFAULT_BATCH_SIZE: &str = "100";

fn main() -> Result<()> {
    let matches = Command::new("spectral-features")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract continuum, line and smoothing features from stellar spectra")
        .arg(
            Arg::new("inputs")
                .value_name("PATH")
                .help("Spectrum files or directories holding them")
                .num_args(1..)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (JSON)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output table (.csv or .parquet)")
                .default_value(DEFAULT_OUTPUT)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("batch-index")
                .long("batch-index")
                .value_name("N")
                .help("Process only the N-th chunk of the sorted inputs")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("batch-size")
                .long("batch-size")
                .value_name("SIZE")
                .help("Chunk size used with --batch-index")
                .default_value(DEFAULT_BATCH_SIZE)
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .value_name("N")
                .help("Worker threads")
                .default_value("1")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("OUTPUT")
                .help("Write the default config and exit")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Do not print the summary")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    init_logging(log_level);

    if let Some(output_path) = matches.get_one::<PathBuf>("generate-config") {
        ExtractorConfig::default()
            .save_to_file(output_path)
            .with_context(|| format!("writing {}", output_path.display()))?;
        info!("Generated default config at: {}", output_path.display());
        return Ok(());
    }

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            info!("Loading config from: {}", path.display());
            ExtractorConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?
        }
        None => ExtractorConfig::default(),
    };
    let extractor = FeatureExtractor::from_config(&config).context("invalid configuration")?;

    let inputs: Vec<PathBuf> = matches
        .get_many::<PathBuf>("inputs")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    if inputs.is_empty() {
        bail!("no input spectra given");
    }

    let mut paths = collect_inputs(&inputs)?;
    paths.sort();

    let paths = match matches.get_one::<usize>("batch-index") {
        Some(&index) => {
            let size = matches
                .get_one::<usize>("batch-size")
                .copied()
                .unwrap_or(100);
            if size == 0 {
                bail!("--batch-size must be positive");
            }
            let chunk = select_batch(&paths, index, size).to_vec();
            info!(
                "batch {index}: {} of {} spectra (size {size})",
                chunk.len(),
                paths.len()
            );
            chunk
        }
        None => paths,
    };
    if paths.is_empty() {
        warn!("nothing to process");
    }

    let jobs = matches.get_one::<usize>("jobs").copied().unwrap_or(1);
    let report = process_paths(&paths, &extractor, jobs)?;

    let output = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    write_table(&report.table, &output)?;

    for failure in &report.failures {
        error!("{}: {}", failure.path.display(), failure.error);
    }

    if !matches.get_flag("quiet") {
        print_summary(&output, paths.len(), report.table.len(), report.failures.len(), report.warning_count());
    }
    Ok(())
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_summary(output: &Path, total: usize, ok: usize, failed: usize, warnings: usize) {
    println!("Processed {total} spectra");
    println!("  rows written : {ok}");
    println!("  failures     : {failed}");
    println!("  warnings     : {warnings}");
    println!("  output       : {}", output.display());
}

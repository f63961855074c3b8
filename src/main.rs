use byte_unit::Byte;
use clap::Parser;
use colored::*;
use env_logger::{Builder, Env, Target};
use kwscan::cli::Cli;
use kwscan::error::{Result, ScanError};
use kwscan::progress::ProgressObserver;
use kwscan::scheduler::{CancelToken, NullObserver, ScanObserver};
use kwscan::{Capabilities, Config, KeywordSet, ResultSink, Scanner};
use log::{info, warn};
use std::fs;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli)?;

    if cli.init_config {
        let path = Path::new("kwscan.toml");
        Config::write_default(path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);

    let capabilities = Capabilities::detect(config.search_images);
    let keywords = KeywordSet::load(&config.keywords_file)?;
    let request = config.to_request(capabilities)?;

    info!("roots: {:?}", request.roots);
    info!(
        "patterns: {:?}",
        config.patterns.iter().collect::<Vec<_>>()
    );
    info!("keywords: {} terms from {}", keywords.len(), config.keywords_file.display());
    info!("workers: {}", request.workers);
    let limit = Byte::from_u64(request.max_file_size).get_appropriate_unit(byte_unit::UnitType::Binary);
    info!("max file size: {:.2} {}", limit.get_value(), limit.get_unit());
    info!(
        "image OCR: {}",
        if request.capabilities.ocr { "enabled" } else { "disabled" }
    );
    if let Some(output) = &config.output_file {
        info!("results file: {}", output.display());
    }

    let sink = match &config.output_file {
        Some(path) => ResultSink::open(path)?,
        None => ResultSink::new(),
    };

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            warn!("cancellation requested, finishing in-flight files");
            cancel.cancel();
        })
        .map_err(|e| ScanError::Config(format!("failed to install signal handler: {e}")))?;
    }

    let progress = if cli.no_progress {
        None
    } else {
        Some(ProgressObserver::new())
    };
    let null_observer = NullObserver;
    let observer: &dyn ScanObserver = match &progress {
        Some(progress) => progress,
        None => &null_observer,
    };

    let scanner = Scanner::new(request, keywords);
    let outcome = scanner.run(&sink, observer, &cancel)?;
    sink.finish();
    if let Some(progress) = &progress {
        progress.finish(&outcome);
    }

    println!("\n{}", "Summary:".green().bold());
    if outcome.cancelled {
        println!("{}", "Scan cancelled before completion".yellow());
    }
    println!("{}: {}", "Files seen".cyan(), outcome.files_seen);
    println!("{}: {}", "Files processed".cyan(), outcome.processed);
    let scanned = Byte::from_u64(outcome.bytes_processed)
        .get_appropriate_unit(byte_unit::UnitType::Binary);
    println!(
        "{}: {:.2} {}",
        "Data scanned".cyan(),
        scanned.get_value(),
        scanned.get_unit()
    );
    println!("{}: {}", "Skipped (too large)".cyan(), outcome.filtered_size);
    println!(
        "{}: {}",
        "Skipped (no pattern match)".cyan(),
        outcome.filtered_pattern
    );
    println!(
        "{}: {}",
        "Skipped (capability unavailable)".cyan(),
        outcome.skipped_capability
    );
    println!("{}: {}", "Timeouts".cyan(), outcome.timeouts);
    println!("{}: {}", "Errors".cyan(), outcome.errors.len());
    println!(
        "{}: {:.2}s",
        "Elapsed".cyan(),
        outcome.elapsed.as_secs_f64()
    );

    if outcome.matches.is_empty() {
        println!("\n{}", "No matches found".yellow());
    } else {
        println!(
            "\n{} {} {}",
            "Found matches in".green(),
            outcome.matched_files(),
            "files:".green()
        );
        for (path, keywords) in &outcome.matches {
            let joined = keywords.iter().cloned().collect::<Vec<_>>().join(", ");
            println!("  {path}: {joined}");
        }
        if let Some(output) = &config.output_file {
            println!(
                "\n{} {}",
                "Results also saved to".green(),
                output.display()
            );
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if !cli.roots.is_empty() {
        config.roots = cli.roots.clone();
    }
    if let Some(keywords) = &cli.keywords {
        config.keywords_file = keywords.clone();
    }
    if let Some(patterns) = &cli.patterns {
        config.patterns = patterns.clone();
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(output) = &cli.output {
        config.output_file = Some(output.clone());
    }
    if let Some(max_size) = cli.max_size {
        config.max_file_size_mb = max_size;
    }
    if let Some(timeout) = cli.timeout {
        config.per_file_timeout_secs = timeout;
    }
    if cli.search_images {
        config.search_images = true;
    }
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });

    if let Some(log_path) = &cli.log {
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let log_file = fs::File::create(log_path)?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| ScanError::Config(e.to_string()))?;
    Ok(())
}

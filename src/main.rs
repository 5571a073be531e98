use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sbom_age_check::analyzer::{Engine, EngineSettings, Overlay, ReportOptions, Summary, write_report};
use sbom_age_check::config::{CheckConfig, DEFAULT_MAX_WORKERS, FileConfig, default_cache_path};
use sbom_age_check::ignore::IgnoreRules;
use sbom_age_check::sbom;
use sbom_age_check::version::cache::Cache;
use sbom_age_check::version::coordinator::Coordinator;
use sbom_age_check::version::registries::create_default_registries;

#[derive(Parser)]
#[command(name = "sbom-age-check")]
#[command(version, about = "Flags SBOM components whose pinned release is older than a threshold")]
struct Cli {
    /// CycloneDX JSON SBOM to analyze
    #[arg(long)]
    sbom: PathBuf,

    /// Maximum accepted age of a pinned release, in days
    #[arg(long = "age")]
    age_days: u32,

    /// Look up the latest release of every alarming component
    #[arg(long)]
    check_updates: bool,

    /// Number of concurrent registry lookups
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: usize,

    /// Lookup cache file
    #[arg(long, conflicts_with = "no_cache")]
    cache_file: Option<PathBuf>,

    /// Keep the cache in memory for this run only
    #[arg(long)]
    no_cache: bool,

    /// YAML list of purls or purl regexes to suppress
    #[arg(long)]
    ignore_file: Option<PathBuf>,

    /// List suppressed alarms in a separate section
    #[arg(long)]
    show_ignored: bool,

    /// List components that could not be classified
    #[arg(long)]
    show_unresolved: bool,

    /// Only evaluate dependencies declared in these manifests (repeatable)
    #[arg(long = "manifest")]
    manifests: Vec<PathBuf>,

    /// YAML configuration file for registries and HTTP settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn check_config(&self) -> anyhow::Result<CheckConfig> {
        let file_config = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let cache_path = if self.no_cache {
            None
        } else {
            Some(self.cache_file.clone().unwrap_or_else(default_cache_path))
        };

        let config = CheckConfig {
            threshold_days: self.age_days,
            check_updates: self.check_updates,
            max_workers: self.max_workers,
            cache_path,
            show_ignored: self.show_ignored,
            show_unresolved: self.show_unresolved,
            http: file_config.http,
            registries: file_config.registries,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(writer),
        )
        .init();

    match run(&cli) {
        Ok(summary) if summary.alarms > 0 => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<Summary> {
    let config = cli.check_config()?;

    let mut components = sbom::load(&cli.sbom)?;
    if components.is_empty() {
        eprintln!("No components found in the SBOM.");
        return Ok(Summary::default());
    }

    if let Some(overlay) = Overlay::from_manifests(&cli.manifests) {
        components = overlay.filter(components);
        info!("{} components remain after the manifest overlay", components.len());
    }

    let ignore_rules = cli
        .ignore_file
        .as_deref()
        .map(IgnoreRules::load_or_empty)
        .unwrap_or_default();

    let cache = match &config.cache_path {
        Some(path) => Cache::open(path),
        None => Cache::in_memory(),
    }
    .context("Failed to initialize lookup cache")?;
    let cache = Arc::new(cache);

    let findings = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            let registries = create_default_registries(&config.registries, &config.http);
            let coordinator =
                Coordinator::new(Arc::new(registries), cache.clone(), config.max_workers);
            let engine = Engine::new(
                coordinator,
                ignore_rules,
                EngineSettings {
                    threshold_days: config.threshold_days,
                    check_updates: config.check_updates,
                },
            );
            engine.evaluate_all(&components, Utc::now()).await
        });

    let _ = cache
        .flush()
        .inspect_err(|e| warn!("Failed to flush lookup cache: {}", e));

    let mut stdout = std::io::stdout().lock();
    let summary = write_report(
        &mut stdout,
        &findings,
        ReportOptions {
            threshold_days: config.threshold_days,
            show_ignored: config.show_ignored,
            show_unresolved: config.show_unresolved,
        },
    )?;
    stdout.flush()?;

    eprintln!("{}", summary.closing_line(config.threshold_days));
    Ok(summary)
}

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use email_batcher::archive::{write_day_files, write_file_atomic};
use email_batcher::ingest::{ColumnSelection, DetectionStrategy, EmptyCellPolicy};
use email_batcher::{process_emails, AppConfig, AppError, BlendMode, ProcessEmailsRequest, UploadedFile};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum Mode {
    /// Sample each file to its percentage, merge, then slice by day.
    Blend,
    /// Split every day between the two files by percentage.
    RatioSplit,
}

impl From<Mode> for BlendMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Blend => BlendMode::Pool,
            Mode::RatioSplit => BlendMode::Ratio,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum Detect {
    /// Values shaped like email addresses.
    Shape,
    /// Well-known header names.
    Header,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq)]
enum OutputFormat {
    /// A single zip archive.
    #[default]
    Zip,
    /// One CSV file per day in a directory.
    Dir,
}

#[derive(Parser, Debug)]
#[command(
    name = "email-batcher",
    version,
    about = "Split CSV email lists into per-day batches"
)]
struct Cli {
    /// One or two CSV files; the first is the primary source.
    #[arg(required = true, num_args = 1..=2)]
    files: Vec<PathBuf>,

    /// File with one daily count per line.
    #[arg(long, conflicts_with = "plan_text")]
    plan: Option<PathBuf>,

    /// Daily counts given inline, separated by commas or newlines.
    #[arg(long, value_name = "COUNTS")]
    plan_text: Option<String>,

    /// Percentage for each file (repeat for the second file).
    #[arg(long = "percent", action = ArgAction::Append, value_name = "PCT")]
    percentages: Vec<String>,

    /// Exclude addresses containing any of these (comma separated).
    #[arg(long)]
    keywords: Option<String>,

    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Take this 1-based column instead of detecting the email column.
    #[arg(long, value_name = "N")]
    fixed_column: Option<usize>,

    #[arg(long, value_enum)]
    detect: Option<Detect>,

    /// Drop rows with a blank email instead of keeping them as empty lines.
    #[arg(long)]
    drop_empty: bool,

    /// Remove repeated addresses.
    #[arg(long)]
    dedupe: bool,

    /// Ignore percentages when merging files in blend mode.
    #[arg(long)]
    no_sampling: bool,

    /// Fail when a day cannot be filled.
    #[arg(long)]
    strict: bool,

    /// RNG seed for reproducible sampling.
    #[arg(long, env = "EMAIL_BATCHER_SEED")]
    seed: Option<u64>,

    /// Base name for output files.
    #[arg(long)]
    base_name: Option<String>,

    /// Output path: the zip file, or the directory with `--format dir`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Zip)]
    format: OutputFormat,

    /// Print the allocation summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// TOML configuration file.
    #[arg(long, env = "EMAIL_BATCHER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn build_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let engine = &mut config.engine;
    if let Some(mode) = cli.mode {
        engine.blend_mode = mode.into();
    }
    if let Some(n) = cli.fixed_column {
        if n == 0 {
            bail!("--fixed-column is 1-based");
        }
        engine.column_selection = ColumnSelection::Fixed { index: n - 1 };
    }
    if let Some(detect) = cli.detect {
        engine.detection_strategy = match detect {
            Detect::Shape => DetectionStrategy::EmailShape,
            Detect::Header => DetectionStrategy::HeaderName,
        };
    }
    if cli.drop_empty {
        engine.empty_cells = EmptyCellPolicy::Drop;
    }
    if cli.dedupe {
        engine.deduplicate = true;
    }
    if cli.no_sampling {
        engine.enable_sampling = false;
    }
    if cli.strict {
        engine.strict = true;
    }
    if cli.seed.is_some() {
        engine.seed = cli.seed;
    }
    if let Some(base) = &cli.base_name {
        config.archive_base_name = base.clone();
    }

    Ok(config)
}

async fn read_plan(cli: &Cli) -> Result<String> {
    match (&cli.plan, &cli.plan_text) {
        (Some(path), _) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading plan {}", path.display())),
        (None, Some(text)) => Ok(text.replace(',', "\n")),
        (None, None) => bail!("either --plan or --plan-text is required"),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let daily_plan = read_plan(&cli).await?;

    let mut files = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        files.push(UploadedFile {
            name: path.display().to_string(),
            data,
        });
    }

    let request = ProcessEmailsRequest {
        files,
        daily_plan,
        percentages: cli.percentages.clone(),
        keywords: cli.keywords.clone(),
        mode: None,
    };

    let response = process_emails(request, &config).await?;

    let written = match cli.format {
        OutputFormat::Zip => {
            let path = cli
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(&response.download_name));
            vec![write_file_atomic(&path, &response.archive)?]
        }
        OutputFormat::Dir => {
            let dir = cli
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.archive_base_name));
            write_day_files(&dir, &config.archive_base_name, &response.batches)?
        }
    };

    for day in &response.days {
        info!(
            "day {:>3}: {:>6} / {:<6} {}",
            day.day, day.delivered, day.requested, day.entry
        );
    }
    info!(
        "Wrote {} file(s); delivered {} of {} requested",
        written.len(),
        response.summary.delivered,
        response.summary.requested
    );

    if cli.json {
        let report = serde_json::json!({
            "request_id": response.request_id,
            "outputs": written,
            "days": response.days,
            "summary": response.summary,
            "sources": response.sources,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<AppError>() {
                Some(app) => {
                    let presentation = app.to_presentation();
                    eprintln!("error: {}: {}", presentation.title, presentation.message);
                    if let Some(action) = presentation.action {
                        eprintln!("hint: {}", action);
                    }
                }
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

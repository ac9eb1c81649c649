//! CLI entry point for cost-model training and scoring.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cost_learning::{MaxFeatures, ModelArtifact, Pipeline, Scorer, TrainingConfig};
use cost_processing::{
    BlobSource, DataCleaner, DataProfiler, ProcessingConfig, read_csv_file, read_csv_str,
    write_csv_file,
};
use dotenv::dotenv;
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// CLI-compatible feature sampling rule
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMaxFeatures {
    /// Every feature at every split
    All,
    /// Square root of the feature count
    Sqrt,
    /// Base-2 logarithm of the feature count
    Log2,
}

impl From<CliMaxFeatures> for MaxFeatures {
    fn from(cli: CliMaxFeatures) -> Self {
        match cli {
            CliMaxFeatures::All => MaxFeatures::All,
            CliMaxFeatures::Sqrt => MaxFeatures::Sqrt,
            CliMaxFeatures::Log2 => MaxFeatures::Log2,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Cost prediction: explore, train, score and inspect models",
    long_about = "Trains a random forest that predicts cost from a cost-analysis export.\n\n\
                  ENVIRONMENT VARIABLES (for --blob):\n  \
                  BLOB_URL                 Full blob URL, including any SAS token\n  \
                  STORAGE_ACCOUNT          Storage account name\n  \
                  CONTAINER_NAME           Container name\n  \
                  BLOB_NAME                Blob name (default: cost-analysis.csv)\n  \
                  AZURE_STORAGE_SAS_TOKEN  SAS token\n\n\
                  EXAMPLES:\n  \
                  cost-model explore -i cost-analysis.csv\n  \
                  cost-model train -i cost-analysis.csv -o outputs/\n  \
                  cost-model score -m outputs/cost-prediction-model.json --features 12,2024,3,1,0,1,0,1,0\n  \
                  cost-model inspect outputs/"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print machine-readable JSON to stdout and disable logging
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Profile a dataset: distributions, correlations and target buckets
    Explore(ExploreArgs),
    /// Clean, encode, train and evaluate, then save the model
    Train(TrainArgs),
    /// Predict with a saved model
    Score(ScoreArgs),
    /// Show metadata of a model file or every model in a directory
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Path to the CSV export
    #[arg(short, long, conflicts_with = "blob")]
    input: Option<PathBuf>,

    /// Download the CSV export from blob storage (see environment variables)
    #[arg(long)]
    blob: bool,

    /// Column holding the usage date
    #[arg(long, default_value = "UsageDate")]
    date_column: String,

    /// Column to predict
    #[arg(short, long, default_value = "Cost")]
    target: String,
}

#[derive(Args, Debug)]
struct ExploreArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Where to write the profile
    #[arg(short, long, default_value = "./outputs/profile.json")]
    output: PathBuf,

    /// Number of histogram bins
    #[arg(long, default_value = "10")]
    bins: usize,
}

#[derive(Args, Debug)]
struct TrainArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output directory for the model
    #[arg(short, long, default_value = "./outputs")]
    output: PathBuf,

    /// Model name; the file is saved as <name>.json
    #[arg(long, default_value = "cost-prediction-model")]
    model_name: String,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value = "0.2")]
    test_size: f64,

    /// Seed for the split and the forest
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Number of trees
    #[arg(long, default_value = "100")]
    n_estimators: usize,

    /// Maximum tree depth (unlimited when omitted)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples in a leaf
    #[arg(long, default_value = "1")]
    min_samples_leaf: usize,

    /// Features considered at each split
    #[arg(long, value_enum, default_value = "all")]
    max_features: CliMaxFeatures,

    /// Keep exact duplicate rows
    #[arg(long)]
    keep_duplicates: bool,

    /// Keep rows with a missing value (such as an unparseable date) and
    /// fail at training instead of dropping them
    #[arg(long)]
    keep_incomplete: bool,

    /// Also write the encoded dataset (features then target) as CSV
    #[arg(long)]
    encoded_csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Path to a saved model
    #[arg(short, long)]
    model: PathBuf,

    /// Comma-separated encoded feature vector
    #[arg(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        group = "source",
        num_args = 1..
    )]
    features: Option<Vec<f64>>,

    /// Raw record as a JSON object
    #[arg(long, group = "source")]
    record: Option<String>,

    /// File holding a scoring request body: {"input": [...]}
    #[arg(long, group = "source")]
    request: Option<PathBuf>,

    /// Raw CSV export to score row by row
    #[arg(long, group = "source")]
    csv: Option<PathBuf>,

    /// Output CSV for --csv (defaults to stdout preview)
    #[arg(short, long, requires = "csv")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// A model file, or a directory of model files
    path: PathBuf,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.quiet, cli.json);

    // Load environment variables from .env file
    dotenv().ok();

    match &cli.command {
        Command::Explore(args) => run_explore(&cli, args),
        Command::Train(args) => run_train(&cli, args),
        Command::Score(args) => run_score(&cli, args),
        Command::Inspect(args) => run_inspect(&cli, args),
    }
}

fn load_dataset(input: &InputArgs) -> Result<DataFrame> {
    let df = if input.blob {
        let source = BlobSource::from_env()?;
        info!("Downloading {}", source.blob_name());
        read_csv_str(&source.fetch_text()?)?
    } else {
        let path = input
            .input
            .as_ref()
            .ok_or_else(|| anyhow!("Either --input or --blob is required"))?;
        if !path.exists() {
            bail!("Input file not found: {}", path.display());
        }
        info!("Loading dataset from: {}", path.display());
        read_csv_file(path)?
    };
    info!("Dataset loaded successfully: {:?}", df.shape());
    Ok(df)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
        info!("Created output directory: {}", parent.display());
    }
    Ok(())
}

fn run_explore(cli: &Cli, args: &ExploreArgs) -> Result<()> {
    let config = ProcessingConfig::builder()
        .date_column(&args.input.date_column)
        .target_column(&args.input.target)
        .histogram_bins(args.bins)
        .build()?;

    let raw = load_dataset(&args.input)?;
    let (cleaned, cleaning) = DataCleaner::new(config.clone()).clean(raw)?;
    let profile = DataProfiler::new(config).profile(&cleaned)?;

    ensure_parent_dir(&args.output)?;
    profile.write_to_file(&args.output)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(60));
    println!("DATASET PROFILE");
    println!("{}", "=".repeat(60));
    println!("  Rows: {} ({} duplicates removed)", profile.row_count, cleaning.duplicates_removed);
    println!("  Columns: {}", profile.column_count);
    if let Some(target) = &profile.target
        && let (Some(mean), Some(min), Some(max)) = (target.mean, target.min, target.max)
    {
        println!(
            "  {}: mean {:.4}, min {:.4}, max {:.4}",
            profile.target_column, mean, min, max
        );
    }
    for column in &profile.numeric_columns {
        if let Some(r) = profile.correlation.get(&column.name, &profile.target_column) {
            println!("  corr({}, {}) = {:.3}", column.name, profile.target_column, r);
        }
    }
    for column in &profile.categorical_columns {
        println!("  {}: {} categories", column.name, column.distinct);
    }
    println!("\nProfile written to {}", args.output.display());
    Ok(())
}

fn run_train(cli: &Cli, args: &TrainArgs) -> Result<()> {
    let processing = ProcessingConfig::builder()
        .date_column(&args.input.date_column)
        .target_column(&args.input.target)
        .remove_duplicates(!args.keep_duplicates)
        .drop_incomplete_rows(!args.keep_incomplete)
        .build()?;

    let mut training = TrainingConfig::builder()
        .test_size(args.test_size)
        .random_seed(args.seed)
        .n_estimators(args.n_estimators)
        .min_samples_leaf(args.min_samples_leaf)
        .max_features(args.max_features.into())
        .model_name(&args.model_name);
    if let Some(depth) = args.max_depth {
        training = training.max_depth(depth);
    }
    let training = training.build()?;

    let raw = load_dataset(&args.input)?;

    let mut builder = Pipeline::builder()
        .processing_config(processing)
        .training_config(training);
    if !cli.quiet && !cli.json {
        builder = builder.on_progress(|update| {
            if update.trees_completed.is_some() {
                tracing::debug!("[{:.0}%] {}", update.progress * 100.0, update.message);
            } else {
                info!(
                    "[{:.0}%] {}: {}",
                    update.progress * 100.0,
                    update.stage.display_name(),
                    update.message
                );
            }
        });
    }
    let output = builder.build()?.train(raw)?;

    if !args.output.exists() {
        std::fs::create_dir_all(&args.output)?;
        info!("Created output directory: {}", args.output.display());
    }
    let model_path = args.output.join(format!("{}.json", args.model_name));
    output.artifact.save(&model_path)?;

    if let Some(path) = &args.encoded_csv {
        ensure_parent_dir(path)?;
        let mut encoded = output.dataset.to_dataframe()?;
        write_csv_file(&mut encoded, path)?;
        info!("Encoded dataset written to {}", path.display());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output.artifact.info())?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(60));
    println!("MODEL EVALUATION");
    println!("{}", "=".repeat(60));
    println!("{}", output.artifact.metrics);
    println!(
        "\nTrained on {} rows, evaluated on {} rows, {} features",
        output.artifact.train_rows,
        output.artifact.test_rows,
        output.artifact.n_features()
    );
    if output.cleaning.date_parse_failure_count() > 0 {
        println!(
            "{} rows had unparseable dates",
            output.cleaning.date_parse_failure_count()
        );
    }
    if output.dataset.rows_dropped > 0 {
        println!(
            "{} incomplete rows were dropped before training",
            output.dataset.rows_dropped
        );
    }
    println!("\nTop features:");
    for (name, importance) in output.artifact.feature_importance.iter().take(5) {
        println!("  {:<30} {:.4}", name, importance);
    }
    println!("\nModel saved as {}", model_path.display());
    Ok(())
}

fn run_score(cli: &Cli, args: &ScoreArgs) -> Result<()> {
    let scorer = Scorer::load(&args.model)?;

    if let Some(path) = &args.request {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path.display()))?;
        println!("{}", scorer.score_request(&body));
        return Ok(());
    }

    if let Some(path) = &args.csv {
        let mut processing = scorer.artifact().processing.clone();
        processing.remove_duplicates = false;
        let raw = read_csv_file(path)?;
        let (cleaned, _) = DataCleaner::new(processing).clean(raw)?;
        let mut scored = scorer.predict_frame(&cleaned)?;
        match &args.output {
            Some(out) => {
                ensure_parent_dir(out)?;
                write_csv_file(&mut scored, out)?;
                println!("Scored {} rows into {}", scored.height(), out.display());
            }
            None => println!("{}", scored),
        }
        return Ok(());
    }

    let prediction = if let Some(features) = &args.features {
        scorer.predict(features)?
    } else if let Some(record) = &args.record {
        let record: serde_json::Value =
            serde_json::from_str(record).context("--record must be a JSON object")?;
        scorer.predict_record(&record)?
    } else {
        bail!("One of --features, --record, --request or --csv is required");
    };

    if cli.json {
        println!("{}", serde_json::json!({ "prediction": [prediction] }));
    } else {
        println!("Predicted {}: {:.4}", scorer.artifact().schema.target_column(), prediction);
    }
    Ok(())
}

fn run_inspect(cli: &Cli, args: &InspectArgs) -> Result<()> {
    let paths: Vec<PathBuf> = if args.path.is_dir() {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&args.path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        paths
    } else {
        vec![args.path.clone()]
    };

    let mut infos = Vec::with_capacity(paths.len());
    for path in &paths {
        match ModelArtifact::load(path) {
            Ok(artifact) => infos.push((path, artifact.info())),
            Err(e) if args.path.is_dir() => warn!("Skipping {}: {}", path.display(), e),
            Err(e) => return Err(e.into()),
        }
    }

    if cli.json {
        let list: Vec<_> = infos.iter().map(|(_, info)| info).collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    if infos.is_empty() {
        println!("No models found in {}", args.path.display());
        return Ok(());
    }

    for (path, info) in &infos {
        println!("{}", path.display());
        println!("  Name:        {}", info.name);
        println!("  Description: {}", info.description);
        let tags: Vec<String> = info.tags.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        println!("  Tags:        {}", tags.join(", "));
        println!("  Trained at:  {}", info.trained_at.to_rfc3339());
        println!("  Target:      {}", info.target_column);
        println!("  Features:    {}", info.n_features);
        println!("  Trees:       {}", info.n_trees);
        println!("  Rows:        {} train / {} test", info.train_rows, info.test_rows);
        println!(
            "  Metrics:     MAE {:.4}, RMSE {:.4}, R2 {:.4}",
            info.metrics.mae, info.metrics.rmse, info.metrics.r2
        );
    }
    Ok(())
}

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use log::info;

use heat_xai::error::util::safe_read_to_string;
use heat_xai::report::{RunReport, create_output_dir, write_report};
use heat_xai::table::{assess_quality, descriptive_statistics};
use heat_xai::{
    AnalysisConfig, AnalysisOverrides, ConfigRegistry, DatasetConfig, FeatureOptions,
    PathwayAnalyzer, PredictorOptions, compare_pathways, engineer_features, load_dataset,
    load_table_async,
};

#[derive(Parser)]
#[command(name = "heat-xai", version, about = "Pathway-level heat-health analysis")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full analysis and write a report
    Run(RunArgs),
    /// Print the safe predictor list for a pathway
    Predictors(PredictorArgs),
    /// Print the effective pathway registry as YAML
    ShowConfig {
        #[arg(long)]
        registry: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Feature table (.csv or .parquet)
    #[arg(long, conflicts_with = "dataset", required_unless_present = "dataset")]
    data: Option<PathBuf>,

    /// Dataset descriptor name, resolved in --datasets-dir
    #[arg(long)]
    dataset: Option<String>,

    #[arg(long, default_value = "config/datasets", env = "HEAT_XAI_DATASETS_DIR")]
    datasets_dir: PathBuf,

    /// Pathway registry YAML; the built-in heat-health registry otherwise
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Analysis parameter overrides YAML
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Pathways to analyze; every registered pathway by default
    #[arg(long, value_delimiter = ',')]
    pathways: Vec<String>,

    /// Column used to order rows for lag features
    #[arg(long)]
    date_column: Option<String>,

    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    #[arg(long, default_value = "heat_analysis")]
    analysis_name: String,

    #[arg(long)]
    no_temporal: bool,

    /// Offer lag/rolling climate columns to the models as predictors
    #[arg(long, conflicts_with = "no_temporal")]
    temporal_predictors: bool,

    #[arg(long)]
    no_interactions: bool,

    #[arg(long)]
    no_explain: bool,

    /// Analyze pathways in parallel
    #[arg(long)]
    parallel: bool,

    /// Also write the engineered feature table as Parquet
    #[arg(long)]
    save_features: bool,
}

#[derive(Args)]
struct PredictorArgs {
    pathway: String,

    #[arg(long)]
    registry: Option<PathBuf>,

    #[arg(long)]
    no_climate: bool,

    #[arg(long)]
    no_demographics: bool,

    #[arg(long)]
    no_other_health: bool,
}

fn load_registry(path: Option<&Path>) -> anyhow::Result<ConfigRegistry> {
    match path {
        Some(path) => ConfigRegistry::from_path(path)
            .with_context(|| format!("loading pathway registry from {}", path.display())),
        None => Ok(ConfigRegistry::heat_health_defaults()),
    }
}

fn load_config(args: &RunArgs) -> anyhow::Result<AnalysisConfig> {
    let mut overrides = match &args.overrides {
        Some(path) => {
            let yaml = safe_read_to_string(path, "analysis overrides")?;
            AnalysisOverrides::from_yaml_str(&yaml)
                .with_context(|| format!("parsing overrides in {}", path.display()))?
        }
        None => AnalysisOverrides::default(),
    };
    if args.parallel {
        overrides.parallel_pathways = Some(true);
    }
    if args.temporal_predictors {
        overrides.temporal_predictors = Some(true);
    }
    AnalysisConfig::default()
        .with_overrides(overrides)
        .context("validating analysis parameters")
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let start = Instant::now();
    let registry = Arc::new(load_registry(args.registry.as_deref())?);
    let config = load_config(&args)?;
    info!("Analysis parameters: {config}");

    let (table, date_column) = match (&args.data, &args.dataset) {
        (Some(path), _) => {
            let table = load_table_async(path)
                .await
                .with_context(|| format!("loading {}", path.display()))?;
            (table, args.date_column.clone())
        }
        (None, Some(name)) => {
            let dataset = DatasetConfig::load(&args.datasets_dir, name)
                .with_context(|| format!("loading dataset descriptor '{name}'"))?;
            let table = load_dataset(&dataset, Path::new("."))
                .with_context(|| format!("loading dataset '{}'", dataset.name))?;
            (table, args.date_column.clone().or(Some(dataset.date_column)))
        }
        (None, None) => bail!("either --data or --dataset is required"),
    };

    let pathways = if args.pathways.is_empty() {
        registry.pathway_names().map(String::from).collect()
    } else {
        args.pathways.clone()
    };

    let options = FeatureOptions {
        temporal: !args.no_temporal,
        interactions: !args.no_interactions,
        date_column,
    };
    let (features, feature_report) = engineer_features(&table, &registry, &config, &options)?;
    let descriptive = descriptive_statistics(&features)?;
    let quality = assess_quality(&features, &registry)?;

    let analyzer = PathwayAnalyzer::new(Arc::clone(&registry), config.clone())
        .with_explanations(!args.no_explain)
        .with_progress(true);
    let results = analyzer.run(&features, &pathways)?;
    let comparison = compare_pathways(&results);

    let output_dir = create_output_dir(&args.output_dir, &args.analysis_name)?;
    let written = write_report(
        &output_dir,
        &RunReport {
            analysis_name: &args.analysis_name,
            registry: &registry,
            config: &config,
            results: &results,
            comparison: &comparison,
            features: &feature_report,
            descriptive: &descriptive,
            quality: &quality,
            engineered: args.save_features.then_some(&features),
        },
    )
    .with_context(|| format!("writing report to {}", output_dir.display()))?;

    info!(
        "Completed {} of {} pathways in {:?}; {} artifacts in {}",
        results.n_completed(),
        pathways.len(),
        start.elapsed(),
        written.len(),
        output_dir.display()
    );
    Ok(())
}

fn predictors(args: &PredictorArgs) -> anyhow::Result<()> {
    let registry = load_registry(args.registry.as_deref())?;
    let options = PredictorOptions {
        include_climate: !args.no_climate,
        include_demographics: !args.no_demographics,
        include_other_health: !args.no_other_health,
    };
    for name in registry.pathway_predictors(&args.pathway, options)? {
        println!("{name}");
    }
    for name in registry.interaction_features(&args.pathway)? {
        println!("{name}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Predictors(args) => predictors(&args),
        Command::ShowConfig { registry } => {
            let registry = load_registry(registry.as_deref())?;
            print!("{}", registry.to_yaml_string()?);
            Ok(())
        }
    }
}

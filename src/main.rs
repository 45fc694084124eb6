use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use ncdx_core::{
    serializer, Aggregation, AnalysisOptions, CompressionCache, CompressorKind, Direction,
    DistanceMatrix, NcdConfig, NcdEngine, ParetoAnalysis,
};
use ncdx_graph::{Dendrogram, EdgePolicy, SimilarityGraph};
use ncdx_storage::{export_matrix_csv, export_ranked_table, MatrixSnapshot, SnapshotManager, Table};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Largest matrix printed in full.
const MAX_PRINTED_ITEMS: usize = 10;

/// Compression distances and Pareto ranking for tabular data
#[derive(Parser, Debug)]
#[command(name = "ncdx", version)]
#[command(about = "Compression distances and Pareto ranking for tabular data", long_about = None)]
struct Args {
    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// JSON file with engine and cache settings; command-line flags override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the NCD matrix between columns (or rows) of a table
    Ncd(NcdArgs),
    /// Rank the records of a table by Pareto dominance
    Pareto(ParetoArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Axis {
    Columns,
    Rows,
}

#[derive(ClapArgs, Debug)]
struct NcdArgs {
    /// Input table
    #[arg(short, long)]
    input: PathBuf,

    /// Field separator of the input table
    #[arg(short, long, default_value_t = ';')]
    delimiter: char,

    /// Compare columns or records
    #[arg(long, value_enum, default_value = "columns")]
    axis: Axis,

    /// Compressor: zlib, gzip or deflate
    #[arg(long)]
    compressor: Option<CompressorKind>,

    /// Compression level (0-9)
    #[arg(long)]
    level: Option<u32>,

    /// Matrix rows per work chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Worker threads (default: available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Bound on cached compressed sizes
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Fail on columns without enough numeric data instead of dropping them
    #[arg(long)]
    strict: bool,

    /// Reduce list and mapping cells by: first, mean, median, mode or sum
    #[arg(long, default_value = "first")]
    agg: Aggregation,

    /// Compute one matrix per distinct value of this column
    #[arg(long)]
    split_by: Option<String>,

    /// Write the matrix as ';'-separated text
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Store a compressed snapshot of the matrix in this directory
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Only link items closer than this in the similarity graph
    #[arg(long)]
    threshold: Option<f64>,
}

/// `name` or `name:min` / `name:max`
#[derive(Debug, Clone)]
struct ObjectiveSpec {
    name: String,
    direction: Direction,
}

impl FromStr for ObjectiveSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (name, direction) = match s.rsplit_once(':') {
            Some((name, dir)) => (name, dir.parse::<Direction>().map_err(|e| e.to_string())?),
            None => (s, Direction::Minimize),
        };
        if name.is_empty() {
            return Err(format!("empty objective name in '{}'", s));
        }
        Ok(Self {
            name: name.to_string(),
            direction,
        })
    }
}

#[derive(ClapArgs, Debug)]
struct ParetoArgs {
    /// Input table
    #[arg(short, long)]
    input: PathBuf,

    /// Field separator of the input table
    #[arg(short, long, default_value_t = ';')]
    delimiter: char,

    /// Objective column, optionally suffixed with :min or :max
    #[arg(long = "objective", required = true)]
    objectives: Vec<ObjectiveSpec>,

    /// Directory for the ranked table
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// File name prefix of the ranked table
    #[arg(long, default_value = "pareto")]
    prefix: String,

    /// Min-max normalize the first front
    #[arg(long)]
    normalize: bool,

    /// Report the hypervolume of the first front
    #[arg(long)]
    hypervolume: bool,

    /// Reduce list and mapping cells by: first, mean, median, mode or sum
    #[arg(long, default_value = "first")]
    agg: Aggregation,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting ncdx v{}", env!("CARGO_PKG_VERSION"));

    let base_config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => NcdConfig::default(),
    };

    match args.command {
        Command::Ncd(ncd) => run_ncd(ncd, base_config),
        Command::Pareto(pareto) => run_pareto(pareto),
    }
}

fn run_ncd(args: NcdArgs, mut config: NcdConfig) -> Result<()> {
    if let Some(compressor) = args.compressor {
        config.cache.compressor = compressor;
    }
    if let Some(level) = args.level {
        config.cache.level = level;
    }
    if args.cache_capacity.is_some() {
        config.cache.capacity = args.cache_capacity;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.engine.chunk_size = chunk_size;
    }
    if args.workers.is_some() {
        config.engine.workers = args.workers;
    }

    let table = Table::from_path(&args.input, args.delimiter)
        .with_context(|| format!("failed to load {}", args.input.display()))?
        .with_aggregation(args.agg);
    info!("Input: {} rows, {} columns", table.len(), table.headers().len());

    let engine = NcdEngine::new(config.engine)?;
    let cache = config.cache.build()?;
    let name = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("matrix")
        .to_string();

    match &args.split_by {
        None => compute_and_report(&args, &engine, &cache, &table, &name, args.output.clone()),
        Some(column) => {
            let slices = table.split_by(column)?;
            info!("Split on '{}': {} slices", column, slices.len());
            for (value, slice) in &slices {
                println!("== {} = {} ({} rows) ==", column, value, slice.len());
                let output = args.output.as_deref().map(|path| slice_path(path, value));
                let slice_name = format!("{}_{}", name, value);
                let result =
                    compute_and_report(&args, &engine, &cache, slice, &slice_name, output);
                if let Err(e) = result {
                    warn!("Slice '{}' skipped: {:#}", value, e);
                }
                println!();
            }
            Ok(())
        }
    }
}

fn compute_and_report(
    args: &NcdArgs,
    engine: &NcdEngine,
    cache: &CompressionCache,
    table: &Table,
    name: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let items = match args.axis {
        Axis::Columns => {
            serializer::serialize_columns(table.columns(), !args.strict, table.aggregation())?
        }
        Axis::Rows => serializer::serialize_rows(table.columns()),
    };

    let (matrix, stats) = engine.compute_with_stats(&items, cache)?;

    if matrix.max_value() > 1.0 {
        warn!("Largest distance {:.4} exceeds 1 (compressor overhead)", matrix.max_value());
    }

    if matrix.len() <= MAX_PRINTED_ITEMS {
        println!("{}", format_matrix(&matrix));
    } else {
        println!("NCD matrix with shape ({}, {})", matrix.len(), matrix.len());
    }
    println!();
    println!("{}", Dendrogram::average_linkage(&matrix)?.render_ascii());

    let policy = args.threshold.map_or(EdgePolicy::Complement, EdgePolicy::Threshold);
    let metrics = SimilarityGraph::from_matrix(&matrix, policy)?.metrics();
    println!();
    println!(
        "Graph: {} nodes, {} edges, density {:.4}, average clustering {:.4}",
        metrics.nodes, metrics.edges, metrics.density, metrics.average_clustering
    );

    if let Some(path) = &output {
        export_matrix_csv(&matrix, path)?;
    }
    if let Some(dir) = &args.snapshot_dir {
        let manager = SnapshotManager::new(dir)?;
        let compressor = stats.compressor.clone();
        let snapshot = MatrixSnapshot::new(name, compressor, matrix).with_stats(stats);
        let description = manager.create(&snapshot)?;
        info!("Snapshot {} ({} bytes)", description.name, description.size);
    }

    Ok(())
}

/// `out.csv` becomes `out_<value>.csv` for one slice.
fn slice_path(path: &Path, value: &str) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("ncd");
    let file_name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, value, ext),
        None => format!("{}_{}", stem, value),
    };
    path.with_file_name(file_name)
}

fn run_pareto(args: ParetoArgs) -> Result<()> {
    let table = Table::from_path(&args.input, args.delimiter)
        .with_context(|| format!("failed to load {}", args.input.display()))?
        .with_aggregation(args.agg);

    let names: Vec<&str> = args.objectives.iter().map(|o| o.name.as_str()).collect();
    let directions: Vec<Direction> = args.objectives.iter().map(|o| o.direction).collect();
    let objectives = table.objectives(&names)?;

    let options = AnalysisOptions {
        normalize: args.normalize,
        hypervolume: args.hypervolume,
        reference: None,
    };
    let analysis = ParetoAnalysis::run(&objectives, &directions, &options)?;

    println!(
        "{} records, {} fronts, {} on the first front",
        analysis.ranks.len(),
        analysis.front_count(),
        analysis.front.len()
    );
    for front in 1..=analysis.front_count() {
        let size = analysis.ranks.iter().filter(|&&r| r == front).count();
        println!("  front {}: {} records", front, size);
    }
    if let Some(hv) = analysis.hypervolume {
        println!("Hypervolume: {:.6}", hv);
    }

    if let Some(dir) = &args.output_dir {
        let path = export_ranked_table(&table, &analysis.ranks, dir, &args.prefix, &names)?;
        println!("Ranked table: {}", path.display());
    }

    Ok(())
}

fn format_matrix(matrix: &DistanceMatrix) -> String {
    let width = matrix
        .labels()
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(8);

    let mut out = format!("{:width$}", "", width = width);
    for label in matrix.labels() {
        out.push_str(&format!(" {:>width$}", label, width = width));
    }
    for (label, row) in matrix.labels().iter().zip(matrix.rows()) {
        out.push('\n');
        out.push_str(&format!("{:width$}", label, width = width));
        for value in row {
            out.push_str(&format!(" {:>width$.6}", value, width = width));
        }
    }
    out
}

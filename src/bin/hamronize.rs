use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{error, info, warn};

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use hamronize::adapter;
use hamronize::aggregate;
use hamronize::config::HamronizeConfig;
use hamronize::output::{
    Destination, OutputFormat, RecordSink, SummaryFormat, WriteMode, open_destination, schema,
    write_summary,
};
use hamronize::{MetadataContext, Tool};

#[derive(Parser)]
#[command(name = "hamronize", version)]
#[command(
    about = "Harmonize antimicrobial resistance detection reports",
    long_about = "Converts the reports of AMR gene detection tools into one canonical record schema and merges converted reports into summaries."
)]
struct Cli {
    /// Log verbosity level
    #[arg(long, global = true, default_value = "info")]
    log_level: LogLevel,
    /// Write log output to a file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<String>,
    /// Append to log file instead of truncating
    #[arg(long, global = true)]
    append_log: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Facts about the run that most reports do not record themselves
#[derive(Args, Default)]
struct MetadataArgs {
    /// Name of the sequence file the tool was run on
    #[arg(long)]
    input_file_name: Option<String>,
    /// Version of the tool that wrote the report
    #[arg(long)]
    analysis_software_version: Option<String>,
    /// Name of the reference database the tool searched
    #[arg(long)]
    reference_database_name: Option<String>,
    /// Version of the reference database
    #[arg(long)]
    reference_database_version: Option<String>,
}

impl MetadataArgs {
    fn context(&self) -> MetadataContext {
        [
            ("input_file_name", &self.input_file_name),
            ("analysis_software_version", &self.analysis_software_version),
            ("reference_database_name", &self.reference_database_name),
            ("reference_database_version", &self.reference_database_version),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key, v.clone())))
        .collect()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert tool reports into canonical records
    Convert {
        /// Tool that wrote the reports
        #[arg(value_enum)]
        tool: Tool,
        /// Report files (see `hamronize tools` for which file each tool needs)
        #[arg(required = true)]
        reports: Vec<PathBuf>,
        /// Output layout
        #[arg(long, value_enum, default_value = "tsv")]
        format: OutputFormat,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        metadata: MetadataArgs,
        /// JSON configuration with default metadata and field-map overrides
        #[arg(long)]
        config: Option<PathBuf>,
        /// Force overwrite of an existing output file
        #[arg(short, long)]
        force: bool,
        /// Append to an existing output file; a tabular header is written only once
        #[arg(long, conflicts_with = "force")]
        append: bool,
    },
    /// Merge canonical reports into one summary
    Summarize {
        /// Reports written by `convert` (tabular or JSON)
        #[arg(required = true)]
        reports: Vec<PathBuf>,
        /// Summary layout
        #[arg(short = 't', long, value_enum, default_value = "tsv")]
        summary_type: SummaryFormat,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// JSON configuration declaring the input format
        #[arg(long)]
        config: Option<PathBuf>,
        /// Force overwrite of an existing output file
        #[arg(short, long)]
        force: bool,
    },
    /// List supported tools, their report files and required metadata
    Tools,
    /// Print the JSON Schema of the canonical record
    Schema {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Force overwrite of an existing output file
        #[arg(short, long)]
        force: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<HamronizeConfig> {
    match path {
        Some(path) => HamronizeConfig::load(path)
            .with_context(|| format!("Error loading config {}", path.display())),
        None => Ok(HamronizeConfig::default()),
    }
}

fn write_mode(force: bool, append: bool) -> WriteMode {
    if force {
        WriteMode::Overwrite
    } else if append {
        WriteMode::Append
    } else {
        WriteMode::Create
    }
}

#[allow(clippy::too_many_arguments)]
fn convert(
    tool: Tool,
    reports: &[PathBuf],
    format: OutputFormat,
    output: Option<&Path>,
    metadata: &MetadataArgs,
    config: Option<&Path>,
    force: bool,
    append: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let metadata = config.metadata_under(&metadata.context());
    metadata.require(tool.name(), tool.required_metadata())?;
    let overrides = config.field_overrides(tool.name());

    let Destination {
        writer,
        continues,
        commit,
    } = open_destination(output, write_mode(force, append)).context("Error opening output")?;
    let mut sink = RecordSink::new(format, writer, continues);

    for report in reports {
        let records = adapter::open(tool, report, &metadata, overrides)
            .with_context(|| format!("Error reading {}", report.display()))?;
        let mut count = 0;
        for record in records {
            let record = record.with_context(|| format!("Error converting {}", report.display()))?;
            sink.write_record(&record).context("Error writing output")?;
            count += 1;
        }
        info!("{}: {} records", report.display(), count);
    }

    let total = sink.finish().context("Error writing output")?;
    commit.commit().context("Error writing output")?;
    info!("Wrote {} records from {} reports", total, reports.len());
    Ok(())
}

fn summarize(
    reports: &[PathBuf],
    summary_type: SummaryFormat,
    output: Option<&Path>,
    config: Option<&Path>,
    force: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let merged = aggregate::merge(reports, config.summary.input_format)
        .context("Error merging reports")?;
    info!(
        "Summarized {} reports: {} unique records, {} duplicates removed",
        merged.reports,
        merged.records.len(),
        merged.duplicates
    );
    if merged.records.is_empty() {
        warn!("No records to summarize");
    }

    let destination = open_destination(output, write_mode(force, false))
        .context("Error opening output")?;
    write_summary(summary_type, &merged.records, destination.writer)
        .context("Error writing summary")?;
    destination.commit.commit().context("Error writing summary")?;
    Ok(())
}

fn list_tools() -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "tool\treport\trequired metadata")?;
    for tool in Tool::ALL {
        writeln!(
            stdout,
            "{}\t{}\t{}",
            tool,
            tool.report_hint(),
            tool.required_metadata().join(", ")
        )?;
    }
    Ok(())
}

fn print_schema(output: Option<&Path>, force: bool) -> Result<()> {
    let json = schema::schema_json_pretty().context("Error serializing schema")?;
    let Destination {
        mut writer, commit, ..
    } = open_destination(output, write_mode(force, false)).context("Error opening output")?;
    writeln!(writer, "{}", json)?;
    writer.flush()?;
    drop(writer);
    commit.commit().context("Error writing schema")?;
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Convert {
            tool,
            reports,
            format,
            output,
            metadata,
            config,
            force,
            append,
        } => convert(
            *tool,
            reports,
            *format,
            output.as_deref(),
            metadata,
            config.as_deref(),
            *force,
            *append,
        ),
        Commands::Summarize {
            reports,
            summary_type,
            output,
            config,
            force,
        } => summarize(reports, *summary_type, output.as_deref(), config.as_deref(), *force),
        Commands::Tools => list_tools(),
        Commands::Schema { output, force } => print_schema(output.as_deref(), *force),
    }
}

fn main() {
    let cli = Cli::parse();

    let mut log_builder = env_logger::Builder::from_default_env();
    log_builder
        .filter_level(cli.log_level.to_level_filter())
        .format_module_path(false);
    if let Some(ref path) = cli.log_file {
        let file = if cli.append_log {
            std::fs::File::options().create(true).append(true).open(path)
        } else {
            std::fs::File::create(path)
        };
        match file {
            Ok(file) => {
                log_builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Could not open log file '{}': {}", path, e);
                std::process::exit(1);
            }
        }
    }
    log_builder.init();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

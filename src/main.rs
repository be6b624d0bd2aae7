use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkjet_raster::{DitherAlgorithm, PageRange, PassEmitter, PassMap, WeaveGeometry, WeaveStrategy};
use inkweave::models::JobConfig;
use inkweave::services::{read_pass_dump, JobRunner, PassLog};

#[derive(Parser)]
#[command(name = "inkweave")]
#[command(about = "Inkweave - dither and softweave raster jobs for multi-nozzle inkjet heads")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a job and write its passes to a dump file
    Render {
        /// Job description (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Output pass dump
        #[arg(short, long)]
        output: PathBuf,

        /// Also render the rebuilt page to this PNG file
        #[arg(short, long)]
        preview: Option<PathBuf>,

        /// Print the job report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the pass schedule of a head without printing anything
    Schedule {
        /// Number of nozzles per color
        #[arg(short, long)]
        jets: usize,

        /// Nozzle pitch in rows
        #[arg(short, long)]
        separation: usize,

        /// Passes per row (horizontal column phases)
        #[arg(short, long, default_value_t = 1)]
        oversample: usize,

        /// Weave strategy name or id
        #[arg(long, default_value = "zigzag")]
        strategy: String,

        /// Number of rows to print
        #[arg(short, long, default_value_t = 200)]
        rows: usize,

        /// First printed row
        #[arg(long, default_value_t = 0)]
        first_row: usize,

        /// Page length in rows (defaults to first_row + rows)
        #[arg(long)]
        page_length: Option<usize>,

        /// Print the schedule as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarize the passes of a dump file
    Inspect {
        /// Pass dump written by `render`
        dump: PathBuf,
    },
    /// List the dither algorithms
    Algorithms,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkweave=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    match cli.command {
        Some(Commands::Render {
            config,
            output,
            preview,
            json,
        }) => run_render_command(&config, &output, preview.as_deref(), json),
        Some(Commands::Schedule {
            jets,
            separation,
            oversample,
            strategy,
            rows,
            first_row,
            page_length,
            json,
        }) => run_schedule_command(
            jets,
            separation,
            oversample,
            &strategy,
            rows,
            first_row,
            page_length,
            json,
        ),
        Some(Commands::Inspect { dump }) => run_inspect_command(&dump),
        Some(Commands::Algorithms) => {
            for algorithm in DitherAlgorithm::ALL {
                println!("{:<16} {}", algorithm.alias(), algorithm.name());
            }
            Ok(())
        }
        None => run_status_command(),
    }
}

/// Run a job file into a pass dump
fn run_render_command(
    config_path: &Path,
    output: &Path,
    preview: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let config = JobConfig::load(config_path)
        .with_context(|| format!("Failed to load job {}", config_path.display()))?;
    let runner = JobRunner::new(config);
    let report = runner
        .render_to_file(output, preview)
        .with_context(|| format!("Failed to render {}", output.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Rendered {} ({} rows, {} blank, {} passes, {} bytes, seed {})",
            output.display(),
            report.rows,
            report.blank_rows,
            report.passes,
            report.data_bytes.unwrap_or(0),
            report.seed
        );
        if let Some(path) = preview {
            println!("Preview {}", path.display());
        }
    }
    Ok(())
}

/// Print the pass table of a head geometry
#[allow(clippy::too_many_arguments)]
fn run_schedule_command(
    jets: usize,
    separation: usize,
    oversample: usize,
    strategy: &str,
    rows: usize,
    first_row: usize,
    page_length: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let strategy: WeaveStrategy = strategy.parse()?;
    let geometry = WeaveGeometry::new(separation, jets, oversample, strategy)?;
    let last_row = first_row + rows.max(1) - 1;
    let page = PageRange::new(first_row, last_row, page_length.unwrap_or(last_row + 1))?;
    let map = PassMap::new(geometry, page)?;
    let log = PassLog::from_map(&map);

    if json {
        println!("{}", serde_json::to_string_pretty(&log)?);
        return Ok(());
    }

    println!(
        "separation {separation}, jets {jets}, oversample {oversample}, strategy {strategy}"
    );
    println!(
        "passes {}..{} ({}), ring of {} open passes",
        map.first_premapped_pass(),
        map.first_unused_pass(),
        map.len(),
        map.window()
    );
    print!("{}", log.table());
    Ok(())
}

/// Summarize a pass dump
fn run_inspect_command(path: &Path) -> anyhow::Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let dump = read_pass_dump(BufReader::new(file))
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let header = &dump.header;
    let channels: String = header.channels.iter().map(|(c, _)| c.code()).collect();
    println!(
        "{}: width {}, rows {}..={}, separation {}, jets {}, oversample {}, inks {}",
        path.display(),
        header.width,
        header.page.first_row,
        header.page.last_row,
        header.separation,
        header.jets,
        header.oversample,
        channels
    );

    let mut log = PassLog::new();
    for pass in &dump.passes {
        log.emit_pass(pass)?;
    }
    print!("{}", log.table());
    Ok(())
}

/// Print version and defaults
fn run_status_command() -> anyhow::Result<()> {
    println!("inkweave v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Environment:");
    println!(
        "  RUST_LOG: {}",
        std::env::var("RUST_LOG").unwrap_or_else(|_| "(not set, using inkweave=warn)".to_string())
    );
    println!();
    println!("Default job:");
    let defaults = serde_yaml::to_string(&JobConfig::default())?;
    for line in defaults.lines() {
        println!("  {line}");
    }
    println!();
    println!("Run 'inkweave --help' for available commands.");
    Ok(())
}

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

use vedetta::config::{read_config_file, Config};
use vedetta::pipeline::Pipeline;
use vedetta::pool::WorkerPool;
use vedetta::stream::StreamQueue;
use vedetta::tree::visitor::HealthVisitor;

#[derive(Debug, Clone, Parser)]
#[command(name = "vedetta", about = "Sensor ingest and fan-out pipeline")]
struct Args {
    /// Input file with one raw sensor line per row
    #[arg(default_value = "sensor_data.txt")]
    input: String,

    /// Processing mode: sequential, pool or stream (prompts when omitted)
    #[arg(short, long)]
    mode: Option<String>,

    /// Optional JSON configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Sequential,
    Pool,
    Stream,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![("vedetta", LevelFilter::DEBUG)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(filter)
        .init();
}

fn parse_mode(raw: &str) -> Option<Mode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "sequential" => Some(Mode::Sequential),
        "2" | "pool" => Some(Mode::Pool),
        "3" | "stream" => Some(Mode::Stream),
        _ => None,
    }
}

fn prompt_mode() -> anyhow::Result<Mode> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "Select processing mode:")?;
    writeln!(stdout, "  1) sequential")?;
    writeln!(stdout, "  2) worker pool")?;
    writeln!(stdout, "  3) streaming")?;
    write!(stdout, "> ")?;
    stdout.flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;

    parse_mode(&answer).context("unrecognized mode selection")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.config {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };

    let content = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("failed to read input file {}", args.input))?;

    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    info!("loaded {} lines from {}", lines.len(), args.input);

    let mode = match args.mode.as_deref() {
        Some(raw) => parse_mode(raw).context("invalid --mode, expected sequential|pool|stream")?,
        None => prompt_mode()?,
    };

    let pipeline = Arc::new(Pipeline::from_config(&config)?);

    match mode {
        Mode::Sequential => {
            info!("processing sequentially");
            pipeline.run_sequential(lines).await;
        }

        Mode::Pool => {
            let pool = match config.pool_parallelism {
                Some(n) => WorkerPool::new(n),
                None => WorkerPool::with_default_parallelism(),
            };
            info!("processing with worker pool ({} workers)", pool.parallelism());
            Arc::clone(&pipeline).run_pool(lines, &pool).await;
        }

        Mode::Stream => {
            let queue = StreamQueue::new(config.queue_capacity);
            info!("processing via streaming queue (capacity {})", queue.capacity());

            let run = Arc::clone(&pipeline).run_stream(lines, &queue);
            tokio::pin!(run);

            tokio::select! {
                result = &mut run => result?,
                _ = tokio::signal::ctrl_c() => {
                    warn!("interrupt received, stopping stream");
                    queue.stop().await;
                }
            }
        }
    }

    print_summary(&pipeline).await;
    pipeline.shutdown().await;

    Ok(())
}

/// End-of-run report: composite tree, analyzer and visitor output, actor
/// status and the alert log.
async fn print_summary(pipeline: &Pipeline) {
    pipeline.tree().organize_by_manufacturer();

    println!("\n=== Sensor Tree ===");
    print!("{}", pipeline.tree().render());

    println!();
    for (_, report) in pipeline.analyzers().reports() {
        println!("{report}");
    }

    let mut health = HealthVisitor::new();
    print!("{}", pipeline.tree().apply_visitor(&mut health));

    let mut anomaly = pipeline.anomaly_visitor();
    print!("{}", pipeline.tree().apply_visitor(&mut anomaly));

    match pipeline.actors().status().await {
        Ok(status) => println!(
            "\nProcessed {} records across {} sensors ({} registered types)",
            status.processed,
            status.active_sensors,
            pipeline.registry().count()
        ),
        Err(error) => error!(%error, "could not fetch store status"),
    }

    match pipeline.actors().alerts().await {
        Ok(alerts) if !alerts.is_empty() => println!("\n=== Alerts ===\n{alerts}"),
        Ok(_) => println!("\nNo alerts raised."),
        Err(error) => error!(%error, "could not fetch alert log"),
    }
}

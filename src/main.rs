use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use roboblocks::block_types::SensorPort;
use roboblocks::catalog::get_block_catalog_by_category;
use roboblocks::config::EngineConfig;
use roboblocks::model::ProgramDoc;
use roboblocks::runtime::{Clock, Engine, RunEvent, RunOutcome, SystemClock};
use roboblocks::sim::SimRobot;
use roboblocks::{logging, presets};

#[derive(Parser, Debug)]
#[command(author, version, about = "Build and run block programs for a small wheeled robot", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the block catalog grouped by category
    Catalog {
        /// Only show blocks matching this text
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Write a built-in program (JSON, or binary for a .rbk file)
    Preset {
        #[arg(value_name = "NAME")]
        name: String,
        /// Output file; prints JSON when omitted
        #[arg(short, long)]
        out: Option<Utf8PathBuf>,
    },
    /// Convert a program document between JSON and binary (.rbk)
    Convert {
        input: Utf8PathBuf,
        output: Utf8PathBuf,
    },
    /// Run a program against the simulated robot
    Run {
        #[arg(value_name = "PROGRAM")]
        program: Utf8PathBuf,
        /// Engine configuration (JSON)
        #[arg(long)]
        config: Option<Utf8PathBuf>,
        /// Stop the run after this many seconds
        #[arg(long)]
        limit: Option<f64>,
        /// Constant sensor reading, e.g. --sensor 2=30
        #[arg(long = "sensor", value_name = "PORT=VALUE", value_parser = parse_sensor)]
        sensors: Vec<(SensorPort, u8)>,
    },
}

fn parse_sensor(raw: &str) -> Result<(SensorPort, u8), String> {
    let (port, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PORT=VALUE, got '{}'", raw))?;
    let port = SensorPort::from_choice(port.trim())
        .ok_or_else(|| format!("sensor port must be 1-4, got '{}'", port))?;
    let value = value
        .trim()
        .parse::<u8>()
        .map_err(|_| format!("sensor value must be 0-255, got '{}'", value))?;
    Ok((port, value))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match cli.command {
        Command::Catalog { query } => print_catalog(query.as_deref().unwrap_or("")),
        Command::Preset { name, out } => write_preset(&name, out),
        Command::Convert { input, output } => convert(&input, &output),
        Command::Run {
            program,
            config,
            limit,
            sensors,
        } => run(&program, config, limit, &sensors),
    }
}

fn print_catalog(query: &str) -> Result<()> {
    for category in get_block_catalog_by_category() {
        let entries: Vec<_> = category
            .entries
            .iter()
            .filter(|e| e.matches_query(query))
            .collect();
        if entries.is_empty() {
            continue;
        }
        println!("{}", category.category.label());
        for e in entries {
            let slots: Vec<&str> = e.slots.iter().map(|s| s.label.as_str()).collect();
            println!(
                "  {} {:<20} {:<24} [{}]",
                e.emoji,
                e.kind.name(),
                e.label,
                slots.join(", ")
            );
        }
    }
    Ok(())
}

fn write_preset(name: &str, out: Option<Utf8PathBuf>) -> Result<()> {
    let program = presets::load(name)?.ok_or_else(|| {
        anyhow!(
            "Unknown preset '{}', expected one of: {}",
            name,
            presets::NAMES.join(", ")
        )
    })?;
    let doc = ProgramDoc::from_program(name, &program);
    match out {
        Some(path) => {
            doc.save(&path)
                .with_context(|| format!("Failed to write {}", path))?;
            info!(%path, blocks = program.len(), "preset written");
        }
        None => println!("{}", serde_json::to_string_pretty(&doc)?),
    }
    Ok(())
}

fn convert(input: &Utf8PathBuf, output: &Utf8PathBuf) -> Result<()> {
    let doc = ProgramDoc::load(input).with_context(|| format!("Failed to load {}", input))?;
    let program = doc
        .to_program()
        .with_context(|| format!("{} is not a valid program", input))?;
    doc.save(output)
        .with_context(|| format!("Failed to write {}", output))?;
    info!(%input, %output, blocks = program.len(), "converted");
    Ok(())
}

fn run(
    path: &Utf8PathBuf,
    config: Option<Utf8PathBuf>,
    limit: Option<f64>,
    sensors: &[(SensorPort, u8)],
) -> Result<()> {
    let doc = ProgramDoc::load(path).with_context(|| format!("Failed to load {}", path))?;
    let program = doc
        .to_program()
        .with_context(|| format!("{} is not a valid program", path))?;
    let config = match config {
        Some(p) => EngineConfig::load(&p)?,
        None => EngineConfig::default(),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let sim = SimRobot::new(Arc::clone(&clock));
    for (port, value) in sensors {
        sim.set_constant(*port, *value);
    }

    let engine = Engine::new(config, Arc::clone(&clock));
    let handle = engine.start(program, Box::new(sim.clone()), Box::new(sim.clone()))?;
    let deadline = limit
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .map(|d| Instant::now() + d);

    let mut stop_sent = false;
    let mut active = None;
    loop {
        match handle.events().recv_timeout(Duration::from_millis(50)) {
            Ok(RunEvent::Active(Some(id))) if active != Some(id) => {
                active = Some(id);
                debug!(%id, "active");
            }
            Ok(RunEvent::Completed | RunEvent::Stopped | RunEvent::Failed(_)) => break,
            Ok(_) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if !stop_sent && deadline.is_some_and(|d| Instant::now() >= d) {
            info!("time limit reached, stopping");
            handle.stop();
            stop_sent = true;
        }
    }
    let report = handle
        .join()
        .map_err(|_| anyhow!("run thread panicked"))?;

    for c in sim.commands() {
        println!("{:>9.3}s  {:?}", c.at.as_secs_f64(), c.command);
    }
    println!("state: {}", report.context.state.current());
    println!("outcome: {} after {:.3}s", report.outcome, report.elapsed().as_secs_f64());
    if let RunOutcome::Failed(reason) = report.outcome {
        return Err(anyhow!(reason)).context("Run failed");
    }
    Ok(())
}

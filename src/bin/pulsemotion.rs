//! Pulse Motion CLI - Command-line interface for the Pulse Motion engine
//!
//! Commands:
//! - scan: Estimate from recorded RGB samples (PPG scan)
//! - exercise: Count repetitions in recorded pose landmark frames
//! - simulate: Generate synthetic sample or landmark streams
//! - config: Print or check engine configuration
//! - doctor: Diagnose configuration and store health

use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pulse_motion::emitter::{EngineEvent, EventLog};
use pulse_motion::exercise::types::{ExerciseKind, LandmarkFrame};
use pulse_motion::pipeline::{ExercisePipeline, ScanPipeline};
use pulse_motion::source::ReplaySource;
use pulse_motion::store::MemoryStore;
use pulse_motion::synth::{uncovered_sample, MotionScript, PulseGenerator};
use pulse_motion::types::{Indicator, Locale, RgbSample, VitalsEstimate};
use pulse_motion::{ComputeError, EngineConfig, ExerciseSummary, ENGINE_NAME, ENGINE_VERSION};

/// Pulse Motion - Camera vitals and guided exercise engine
#[derive(Parser)]
#[command(name = "pulsemotion")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Estimate vitals from PPG samples and count exercise repetitions", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a PPG scan over recorded RGB samples
    Scan {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// User the estimate belongs to
        #[arg(long, default_value = "local")]
        user: String,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// History store file, loaded before and saved after the scan
        #[arg(long)]
        store: Option<PathBuf>,

        /// Language for labels and feedback (en, id)
        #[arg(long, default_value = "en")]
        locale: String,

        /// Print every engine event as NDJSON instead of the result
        #[arg(long)]
        events: bool,
    },

    /// Count repetitions over recorded landmark frames
    Exercise {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Exercise to count (marching, knee-lifts, arm-circles, sit-to-stand)
        #[arg(short, long)]
        kind: String,

        /// User the session belongs to
        #[arg(long, default_value = "local")]
        user: String,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Session store file, loaded before and saved after the session
        #[arg(long)]
        store: Option<PathBuf>,

        /// Language for labels and feedback (en, id)
        #[arg(long, default_value = "en")]
        locale: String,

        /// Print every engine event as NDJSON instead of the summary
        #[arg(long)]
        events: bool,
    },

    /// Generate a synthetic input stream as NDJSON
    Simulate {
        #[command(subcommand)]
        stream: SimulateStream,
    },

    /// Print the default configuration or check a configuration file
    Config {
        /// Configuration file to validate
        #[arg(long)]
        check: Option<PathBuf>,
    },

    /// Diagnose configuration and store health
    Doctor {
        /// Check configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Check store file
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SimulateStream {
    /// Covered-finger RGB samples with a cardiac pulse
    Ppg {
        /// Number of covered samples
        #[arg(long, default_value = "300")]
        samples: usize,

        /// Uncovered frames before the finger is placed
        #[arg(long, default_value = "0")]
        lead_in: usize,

        /// Simulated heart rate
        #[arg(long, default_value = "72")]
        bpm: f64,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Landmark frames performing an exercise
    Exercise {
        #[arg(short, long)]
        kind: String,

        #[arg(long, default_value = "5")]
        reps: u32,

        /// Milliseconds between frames
        #[arg(long, default_value = "100")]
        interval_ms: u64,

        /// Frames spent in each phase of a repetition
        #[arg(long, default_value = "5")]
        frames_per_phase: usize,

        /// Positional noise added to every landmark
        #[arg(long, default_value = "0.0")]
        jitter: f64,

        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level_filter = cli
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::WARN);
    tracing_subscriber::fmt()
        .with_max_level(log_level_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PulseCliError> {
    match cli.command {
        Commands::Scan {
            input,
            input_format,
            user,
            config,
            store,
            locale,
            events,
        } => cmd_scan(
            &input,
            input_format,
            &user,
            config.as_deref(),
            store.as_deref(),
            &locale,
            events,
        ),
        Commands::Exercise {
            input,
            input_format,
            kind,
            user,
            config,
            store,
            locale,
            events,
        } => cmd_exercise(
            &input,
            input_format,
            &kind,
            &user,
            config.as_deref(),
            store.as_deref(),
            &locale,
            events,
        ),
        Commands::Simulate { stream } => cmd_simulate(stream),
        Commands::Config { check } => cmd_config(check.as_deref()),
        Commands::Doctor {
            config,
            store,
            json,
        } => cmd_doctor(config.as_deref(), store.as_deref(), json),
    }
}

fn cmd_scan(
    input: &Path,
    input_format: InputFormat,
    user: &str,
    config: Option<&Path>,
    store_path: Option<&Path>,
    locale: &str,
    events: bool,
) -> Result<(), PulseCliError> {
    let config = load_config(config)?;
    let locale = parse_locale(locale)?;
    let samples: Vec<RgbSample> = read_frames(input, &input_format)?;
    if samples.is_empty() {
        return Err(PulseCliError::NoFrames);
    }
    let store = load_store(store_path)?;

    let mut pipeline = ScanPipeline::new(
        user,
        ReplaySource::new(samples),
        store,
        EventLog::new(),
        &config,
    )
    .with_locale(locale);
    pipeline.start()?;
    let result = pipeline.run();

    if events {
        write_events(pipeline.sink().events())?;
    }
    let outcome = result?;

    if let Some(path) = store_path {
        fs::write(path, pipeline.store().to_json()?)?;
    }

    if !events {
        let classification = outcome.estimate.classification;
        let report = ScanReport {
            estimate: &outcome.estimate,
            label: classification.label(locale),
            rationale: classification.rationale(locale),
            indicator: classification.indicator(),
            samples: outcome.samples,
            persistence_error: outcome.persistence_error.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_exercise(
    input: &Path,
    input_format: InputFormat,
    kind: &str,
    user: &str,
    config: Option<&Path>,
    store_path: Option<&Path>,
    locale: &str,
    events: bool,
) -> Result<(), PulseCliError> {
    let config = load_config(config)?;
    let locale = parse_locale(locale)?;
    let kind: ExerciseKind = kind.parse()?;
    let frames: Vec<LandmarkFrame> = read_frames(input, &input_format)?;
    if frames.is_empty() {
        return Err(PulseCliError::NoFrames);
    }
    let store = load_store(store_path)?;

    let mut pipeline = ExercisePipeline::new(
        user,
        kind,
        ReplaySource::new(frames),
        store,
        EventLog::new(),
        config.exercise,
    )
    .with_locale(locale);
    pipeline.start()?;
    pipeline.run_to_end()?;
    let outcome = pipeline.finish()?;

    if let Some(path) = store_path {
        fs::write(path, pipeline.store().to_json()?)?;
    }

    if events {
        write_events(pipeline.sink().events())?;
    } else {
        let report = ExerciseReport {
            summary: &outcome.summary,
            persistence_error: outcome.persistence_error.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn cmd_simulate(stream: SimulateStream) -> Result<(), PulseCliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match stream {
        SimulateStream::Ppg {
            samples,
            lead_in,
            bpm,
            seed,
        } => {
            for _ in 0..lead_in {
                writeln!(out, "{}", serde_json::to_string(&uncovered_sample())?)?;
            }
            let mut generator = PulseGenerator::new(seed).with_heart_rate(bpm);
            for sample in generator.samples(samples) {
                writeln!(out, "{}", serde_json::to_string(&sample)?)?;
            }
        }
        SimulateStream::Exercise {
            kind,
            reps,
            interval_ms,
            frames_per_phase,
            jitter,
            seed,
        } => {
            let kind: ExerciseKind = kind.parse()?;
            let mut script = MotionScript::new(kind)
                .with_tempo(interval_ms, frames_per_phase)
                .with_jitter(jitter, seed);
            for frame in script.frames(reps) {
                writeln!(out, "{}", serde_json::to_string(&frame)?)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn cmd_config(check: Option<&Path>) -> Result<(), PulseCliError> {
    match check {
        Some(path) => {
            load_config(Some(path))?;
            println!("Configuration OK: {}", path.display());
        }
        None => println!("{}", EngineConfig::default().to_json_pretty()?),
    }
    Ok(())
}

fn cmd_doctor(
    config: Option<&Path>,
    store: Option<&Path>,
    json: bool,
) -> Result<(), PulseCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} version {}", ENGINE_NAME, ENGINE_VERSION),
    });

    // Check configuration, falling back to defaults
    match config {
        Some(path) if !path.exists() => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Configuration file does not exist, defaults apply".to_string(),
        }),
        Some(path) => match load_config(Some(path)) {
            Ok(config) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Configuration valid (scan needs {} samples, debounce {} ms)",
                    config.scan.required_samples, config.exercise.debounce_ms
                ),
            }),
            Err(e) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: CliError::from(e).message,
            }),
        },
        None => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in defaults".to_string(),
        }),
    }

    // Check store file if provided
    if let Some(path) = store {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match MemoryStore::from_json(&content) {
                    Ok(_) => checks.push(DoctorCheck {
                        name: "store".to_string(),
                        status: CheckStatus::Ok,
                        message: "Store file valid".to_string(),
                    }),
                    Err(e) => checks.push(DoctorCheck {
                        name: "store".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid store JSON: {}", e),
                    }),
                },
                Err(e) => checks.push(DoctorCheck {
                    name: "store".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read store file: {}", e),
                }),
            }
        } else {
            checks.push(DoctorCheck {
                name: "store".to_string(),
                status: CheckStatus::Warning,
                message: "Store file does not exist, it will be created".to_string(),
            });
        }
    }

    // Check stdin is available (for piped frame input)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (use --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        engine: ENGINE_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pulse Motion Doctor Report");
        println!("==========================");
        println!("Engine:  {}", report.engine);
        println!("Version: {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PulseCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, PulseCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_frames<T: DeserializeOwned>(
    input: &Path,
    format: &InputFormat,
) -> Result<Vec<T>, PulseCliError> {
    let data = read_input(input)?;
    match format {
        InputFormat::Json => Ok(serde_json::from_str(&data)?),
        InputFormat::Ndjson => data
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line.trim()).map_err(|e| {
                    PulseCliError::ParseError(format!("line {}: {}", i + 1, e))
                })
            })
            .collect(),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, PulseCliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_json_file(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn load_store(path: Option<&Path>) -> Result<MemoryStore, PulseCliError> {
    match path {
        Some(path) if path.exists() => Ok(MemoryStore::from_json(&fs::read_to_string(path)?)?),
        _ => Ok(MemoryStore::default()),
    }
}

fn parse_locale(locale: &str) -> Result<Locale, PulseCliError> {
    locale.parse().map_err(PulseCliError::ParseError)
}

fn write_events(events: &[EngineEvent]) -> Result<(), PulseCliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for event in events {
        writeln!(out, "{}", serde_json::to_string(event)?)?;
    }
    out.flush()?;
    Ok(())
}

// Error types

#[derive(Debug)]
enum PulseCliError {
    Io(io::Error),
    Engine(ComputeError),
    Json(serde_json::Error),
    NoFrames,
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for PulseCliError {
    fn from(e: io::Error) -> Self {
        PulseCliError::Io(e)
    }
}

impl From<ComputeError> for PulseCliError {
    fn from(e: ComputeError) -> Self {
        PulseCliError::Engine(e)
    }
}

impl From<serde_json::Error> for PulseCliError {
    fn from(e: serde_json::Error) -> Self {
        PulseCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PulseCliError> for CliError {
    fn from(e: PulseCliError) -> Self {
        match e {
            PulseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PulseCliError::Engine(e) => engine_error(e),
            PulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PulseCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            PulseCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            PulseCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

fn engine_error(e: ComputeError) -> CliError {
    let (code, hint) = match &e {
        ComputeError::SourceUnavailable(_) => ("SOURCE_UNAVAILABLE", "Check the frame source"),
        ComputeError::InsufficientSignal { .. } => (
            "INSUFFICIENT_SIGNAL",
            "Keep the fingertip over the camera for the whole scan and retry",
        ),
        ComputeError::InvalidConfig { .. } => {
            ("INVALID_CONFIG", "Run 'pulsemotion config' for a valid template")
        }
        ComputeError::UnsupportedExercise(_) => (
            "UNSUPPORTED_EXERCISE",
            "Use marching, knee-lifts, arm-circles or sit-to-stand",
        ),
        ComputeError::PersistenceError(_) => ("PERSISTENCE_ERROR", "Check the store file"),
        ComputeError::JsonError(_) | ComputeError::ParseError(_) => {
            ("PARSE_ERROR", "Check input format")
        }
        ComputeError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
        _ => ("ENGINE_ERROR", "Run 'pulsemotion doctor' for diagnostics"),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: Some(hint.to_string()),
    }
}

// Report types

#[derive(Serialize)]
struct ScanReport<'a> {
    #[serde(flatten)]
    estimate: &'a VitalsEstimate,
    label: &'static str,
    rationale: &'static str,
    indicator: Indicator,
    samples: usize,
    persistence_error: Option<&'a str>,
}

#[derive(Serialize)]
struct ExerciseReport<'a> {
    #[serde(flatten)]
    summary: &'a ExerciseSummary,
    persistence_error: Option<&'a str>,
}

#[derive(Serialize)]
struct DoctorReport {
    engine: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

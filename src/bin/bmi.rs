//! BMI CLI - Command-line interface for the BMI tracker
//!
//! Commands:
//! - calc: Calculate BMI for a measurement (optionally saving it)
//! - convert: Convert a measurement between metric and imperial
//! - history: List, save, delete or clear saved entries
//! - chart: Print the trend series for recent entries
//! - doctor: Diagnose configuration and stored history

use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bmi_tracker::calculator::compose_height;
use bmi_tracker::chart::{domain_fraction, trend_delta, trend_series, REFERENCE_LINES};
use bmi_tracker::config::{default_config_path, load_config, Config};
use bmi_tracker::display::{
    category_label, format_entry_time, format_height, format_waist, format_weight,
    format_weight_range,
};
use bmi_tracker::history::parse_entries;
use bmi_tracker::{
    convert_units, BmiCalculation, BmiError, BmiTracker, FileStorage, HistoryStore,
    KeyValueStorage, MeasurementType, MemoryStorage, StorageError, UnitSystem, TRACKER_VERSION,
};

/// BMI - Calculate Body Mass Index and track it over time
#[derive(Parser)]
#[command(name = "bmi")]
#[command(author = "Synheart AI Inc")]
#[command(version = TRACKER_VERSION)]
#[command(about = "Calculate BMI and keep a local history", long_about = None)]
struct Cli {
    /// Configuration file (defaults to config.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the history file (overrides the configuration)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate BMI for a measurement
    Calc {
        #[command(flatten)]
        measurement: MeasurementArgs,

        /// Save the result to history
        #[arg(long)]
        save: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert a measurement out of the given unit system
    Convert {
        /// Value to convert
        value: f64,

        /// Unit system the value is expressed in
        #[arg(long)]
        from: Units,

        /// Kind of measurement
        #[arg(long)]
        kind: Kind,
    },

    /// Manage saved entries
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Print the BMI trend for recent entries
    Chart {
        /// Number of recent entries to include
        #[arg(long)]
        window: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and stored history
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List saved entries, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Calculate and save an entry
    Save {
        #[command(flatten)]
        measurement: MeasurementArgs,
    },

    /// Delete an entry by id
    Delete {
        /// Entry id
        id: String,
    },

    /// Remove all saved entries
    Clear,
}

#[derive(clap::Args)]
struct MeasurementArgs {
    /// Height (cm, or inches with --units imperial)
    #[arg(long, required_unless_present = "feet", conflicts_with = "feet")]
    height: Option<f64>,

    /// Height in whole feet, with the remainder in --inches
    #[arg(long)]
    feet: Option<u32>,

    /// Inches on top of --feet
    #[arg(long, requires = "feet")]
    inches: Option<f64>,

    /// Weight (kg, or lb with --units imperial)
    #[arg(long)]
    weight: f64,

    /// Waist circumference (cm, or inches with --units imperial)
    #[arg(long)]
    waist: Option<f64>,

    /// Unit system of the values given (defaults to the configured one)
    #[arg(long)]
    units: Option<Units>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Units {
    Metric,
    Imperial,
}

impl From<Units> for UnitSystem {
    fn from(u: Units) -> Self {
        match u {
            Units::Metric => UnitSystem::Metric,
            Units::Imperial => UnitSystem::Imperial,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Height,
    Weight,
    Waist,
}

impl From<Kind> for MeasurementType {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Height => MeasurementType::Height,
            Kind::Weight => MeasurementType::Weight,
            Kind::Waist => MeasurementType::Waist,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = CliError::from(e);
            eprintln!(
                "{}",
                serde_json::to_string(&error).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BmiCliError> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    match cli.command {
        Commands::Calc {
            measurement,
            save,
            json,
        } => cmd_calc(&config, &measurement, save, json),

        Commands::Convert { value, from, kind } => cmd_convert(value, from.into(), kind.into()),

        Commands::History { action } => match action {
            HistoryAction::List { json } => cmd_history_list(&config, json),
            HistoryAction::Save { measurement } => cmd_calc(&config, &measurement, true, true),
            HistoryAction::Delete { id } => cmd_history_delete(&config, &id),
            HistoryAction::Clear => cmd_history_clear(&config),
        },

        Commands::Chart { window, json } => cmd_chart(&config, window, json),

        Commands::Doctor { json } => cmd_doctor(&config, cli.config, json),
    }
}

fn open_tracker(config: &Config) -> Result<BmiTracker<FileStorage>, BmiCliError> {
    let storage = FileStorage::open(config.data_dir())?;
    let store = HistoryStore::with_key(storage, config.storage_key.clone());
    let (tracker, report) = BmiTracker::with_unit_system(store, config.unit_system);

    if let Some(e) = &report.error {
        tracing::warn!(error = %e, "history could not be read, starting empty");
    }
    if report.discarded > 0 {
        tracing::warn!(discarded = report.discarded, "ignored invalid history records");
    }

    Ok(tracker)
}

fn cmd_calc(
    config: &Config,
    args: &MeasurementArgs,
    save: bool,
    json: bool,
) -> Result<(), BmiCliError> {
    let units = args.units.map(UnitSystem::from).unwrap_or(config.unit_system);

    if save {
        calc_with(open_tracker(config)?, args, units, true, json)
    } else {
        let (tracker, _) =
            BmiTracker::with_unit_system(HistoryStore::new(MemoryStorage::new()), units);
        calc_with(tracker, args, units, false, json)
    }
}

fn calc_with<S: KeyValueStorage>(
    mut tracker: BmiTracker<S>,
    args: &MeasurementArgs,
    units: UnitSystem,
    save: bool,
    json: bool,
) -> Result<(), BmiCliError> {
    tracker.set_unit_system(units);
    match (args.feet, args.height) {
        (Some(feet), _) => {
            tracker.set_height_cm(compose_height(feet, args.inches.unwrap_or(0.0)));
        }
        (None, Some(height)) => tracker.set_height_in(height, units)?,
        (None, None) => {
            return Err(BmiError::InvalidInput("height is required".to_string()).into());
        }
    }
    tracker.set_weight_in(args.weight, units)?;
    tracker.set_waist_in(args.waist.unwrap_or(0.0), units)?;

    let measurement = tracker.measurement();
    let calculation = bmi_tracker::calculate_bmi(
        measurement.height_cm,
        measurement.weight_kg,
        measurement.waist_cm,
    )?;

    let saved = if save { Some(tracker.save()?) } else { None };

    if json {
        let output = serde_json::json!({
            "calculation": calculation,
            "entry": saved,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_calculation(&calculation, units);
        println!("Height:        {}", format_height(measurement.height_cm, units));
        println!("Weight:        {}", format_weight(measurement.weight_kg, units));
        if let Some(waist) = measurement.waist_cm {
            println!("Waist:         {}", format_waist(waist, units));
        }
        if let Some(entry) = saved {
            println!("\nSaved as {}", entry.id);
        }
    }

    Ok(())
}

fn print_calculation(calculation: &BmiCalculation, units: UnitSystem) {
    println!("BMI Result");
    println!("==========");
    println!("BMI:           {:.1}", calculation.bmi);
    println!("Category:      {}", category_label(calculation.category));
    println!(
        "Healthy range: {}",
        format_weight_range(&calculation.healthy_weight_range, units)
    );
    if let (Some(ratio), Some(interpretation)) = (
        calculation.waist_to_height_ratio,
        calculation.waist_to_height_interpretation.as_deref(),
    ) {
        println!("Waist/height:  {:.2} ({})", ratio, interpretation);
    }
}

fn cmd_convert(value: f64, from: UnitSystem, kind: MeasurementType) -> Result<(), BmiCliError> {
    let converted = convert_units(value, from, kind)?;
    println!("{} {}", converted, unit_symbol(kind, from.toggled()));
    Ok(())
}

fn unit_symbol(kind: MeasurementType, units: UnitSystem) -> &'static str {
    match (kind, units) {
        (MeasurementType::Weight, UnitSystem::Metric) => "kg",
        (MeasurementType::Weight, UnitSystem::Imperial) => "lb",
        (_, UnitSystem::Metric) => "cm",
        (_, UnitSystem::Imperial) => "in",
    }
}

fn cmd_history_list(config: &Config, json: bool) -> Result<(), BmiCliError> {
    let tracker = open_tracker(config)?;
    let entries = tracker.entries();

    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No saved entries");
        return Ok(());
    }

    let units = tracker.unit_system();
    for entry in entries {
        let when = format_entry_time(entry.timestamp)
            .unwrap_or_else(|| entry.timestamp.to_string());
        let mut line = format!(
            "{}  {:>5.1}  {:<12} {}  {}  {}",
            entry.id,
            entry.bmi,
            category_label(entry.category),
            when,
            format_height(entry.height_cm, units),
            format_weight(entry.weight_kg, units),
        );
        if let Some(waist) = entry.waist_cm {
            line.push_str(&format!("  waist {}", format_waist(waist, units)));
        }
        println!("{}", line);
    }

    Ok(())
}

fn cmd_history_delete(config: &Config, id: &str) -> Result<(), BmiCliError> {
    let mut tracker = open_tracker(config)?;
    if tracker.delete(id)? {
        println!("Deleted {}", id);
        Ok(())
    } else {
        Err(BmiCliError::EntryNotFound(id.to_string()))
    }
}

fn cmd_history_clear(config: &Config) -> Result<(), BmiCliError> {
    let mut tracker = open_tracker(config)?;
    let count = tracker.entries().len();
    tracker.clear()?;
    println!("Removed {} entries", count);
    Ok(())
}

fn cmd_chart(config: &Config, window: Option<usize>, json: bool) -> Result<(), BmiCliError> {
    let tracker = open_tracker(config)?;
    let window = window.unwrap_or(config.chart_window);
    let series = trend_series(tracker.entries(), window);

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    if series.is_empty() {
        println!("No saved entries");
        return Ok(());
    }

    println!("BMI Trend");
    println!("=========");
    for point in &series {
        let bar_len = (domain_fraction(point.bmi) * 40.0).round() as usize;
        let crossed = REFERENCE_LINES.iter().filter(|line| point.bmi >= **line).count();
        println!(
            "{:>7} {:>5.1} {:<40} {}",
            point.label,
            point.bmi,
            "#".repeat(bar_len),
            "|".repeat(crossed)
        );
    }
    if let Some(delta) = trend_delta(&series) {
        println!("\nChange: {:+.1}", delta);
    }

    Ok(())
}

fn cmd_doctor(
    config: &Config,
    config_path: Option<PathBuf>,
    json: bool,
) -> Result<(), BmiCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("bmi-tracker version {}", TRACKER_VERSION),
    });

    let config_path = config_path.unwrap_or_else(default_config_path);
    checks.push(DoctorCheck {
        name: "config".to_string(),
        status: CheckStatus::Ok,
        message: if config_path.exists() {
            format!("Loaded {}", config_path.display())
        } else {
            format!("{} not found, using defaults", config_path.display())
        },
    });

    let data_dir = config.data_dir();
    let storage = FileStorage::at(&data_dir);

    checks.push(match storage.path_for(&config.storage_key) {
        Err(e) => DoctorCheck {
            name: "history".to_string(),
            status: CheckStatus::Error,
            message: format!("Unusable storage_key: {}", e),
        },
        Ok(history_path) => match storage.get(&config.storage_key) {
            Ok(Some(content)) => match parse_entries(&content) {
                Ok((entries, 0)) => DoctorCheck {
                    name: "history".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("History file valid ({} entries)", entries.len()),
                },
                Ok((entries, discarded)) => DoctorCheck {
                    name: "history".to_string(),
                    status: CheckStatus::Warning,
                    message: format!(
                        "{} valid entries, {} invalid records will be ignored",
                        entries.len(),
                        discarded
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "history".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Unreadable history, it will load as empty: {}", e),
                },
            },
            Ok(None) => DoctorCheck {
                name: "history".to_string(),
                status: CheckStatus::Warning,
                message: format!("No history at {}", history_path.display()),
            },
            Err(e) => DoctorCheck {
                name: "history".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read history file: {}", e),
            },
        },
    });

    let stdout_check = if atty::is(atty::Stream::Stdout) {
        "stdout is a TTY (human-readable output)"
    } else {
        "stdout is a pipe (prefer --json)"
    };
    checks.push(DoctorCheck {
        name: "stdout".to_string(),
        status: CheckStatus::Ok,
        message: stdout_check.to_string(),
    });

    let report = DoctorReport {
        version: TRACKER_VERSION.to_string(),
        data_dir: data_dir.display().to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("BMI Doctor Report");
        println!("=================");
        println!("Version:  {}", report.version);
        println!("Data dir: {}", report.data_dir);
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(BmiCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum BmiCliError {
    Compute(BmiError),
    Storage(StorageError),
    Json(serde_json::Error),
    EntryNotFound(String),
    DoctorFailed,
}

impl From<BmiError> for BmiCliError {
    fn from(e: BmiError) -> Self {
        BmiCliError::Compute(e)
    }
}

impl From<StorageError> for BmiCliError {
    fn from(e: StorageError) -> Self {
        BmiCliError::Storage(e)
    }
}

impl From<serde_json::Error> for BmiCliError {
    fn from(e: serde_json::Error) -> Self {
        BmiCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BmiCliError> for CliError {
    fn from(e: BmiCliError) -> Self {
        match e {
            BmiCliError::Compute(e) => {
                let (code, hint) = match &e {
                    BmiError::InvalidInput(_) => {
                        ("INVALID_INPUT", "Height and weight must be positive numbers")
                    }
                    BmiError::PersistenceWrite(_) => {
                        ("PERSISTENCE_ERROR", "The entry was not saved; check disk space")
                    }
                    BmiError::ConfigError(_) => ("CONFIG_ERROR", "Check the configuration file"),
                    _ => ("COMPUTE_ERROR", "Run 'bmi doctor' for details"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            BmiCliError::Storage(e) => CliError {
                code: "STORAGE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check --data-dir and its permissions".to_string()),
            },
            BmiCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            BmiCliError::EntryNotFound(id) => CliError {
                code: "NOT_FOUND".to_string(),
                message: format!("No entry with id {}", id),
                hint: Some("Run 'bmi history list' to see ids".to_string()),
            },
            BmiCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    version: String,
    data_dir: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

//! PulseGuard CLI
//!
//! Runs the ward simulation against a SQLite snapshot file and prints what
//! an observing view would see.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use pulseguard_core::models::initial_patients;
use pulseguard_core::vitals::assess;
use pulseguard_core::{
    Database, DriverSpec, PatientStore, Simulation, SimulationConfig, StatusFilter, SyncMessage,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "pulseguard")]
#[command(about = "Ward vitals simulation with cross-view sync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation in real time
    Run {
        /// Snapshot database path
        #[arg(long, default_value = "pulseguard.db")]
        db: PathBuf,

        /// How long to run for
        #[arg(short, long, default_value = "30")]
        seconds: u64,

        /// Vitals driver interval (defaults to the view interval with --observe)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Patient whose updates are printed (all patients when omitted)
        #[arg(short, long)]
        observe: Option<String>,

        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List stored patients
    List {
        /// Snapshot database path
        #[arg(long, default_value = "pulseguard.db")]
        db: PathBuf,

        /// all, critical or warning
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// Print the full records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Overwrite the stored patients with the default ward
    Reset {
        /// Snapshot database path
        #[arg(long)]
        db: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            db,
            seconds,
            interval_ms,
            observe,
            seed,
            config,
        } => run(db, seconds, interval_ms, observe, seed, config),
        Commands::List { db, filter, json } => list(db, &filter, json),
        Commands::Reset { db } => reset(db),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<SimulationConfig> {
    match path {
        Some(path) => SimulationConfig::from_path(&path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(SimulationConfig::default()),
    }
}

fn run(
    db_path: PathBuf,
    seconds: u64,
    interval_ms: Option<u64>,
    observe: Option<String>,
    seed: Option<u64>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if seed.is_some() {
        config.rng_seed = seed;
    }
    let interval_ms = interval_ms.unwrap_or(config.driver_interval_ms(observe.is_some()));
    if interval_ms == 0 {
        bail!("interval must be positive");
    }

    let db = Database::open(&db_path)
        .with_context(|| format!("opening {}", db_path.display()))?;
    let snapshot = db.load_patients(&config.storage_key)?;
    info!(
        "Loaded {} patients from {} ({:?})",
        snapshot.patients.len(),
        db_path.display(),
        snapshot.source
    );

    if let Some(id) = observe.as_deref() {
        if !snapshot.patients.iter().any(|p| p.id == id) {
            bail!("unknown patient: {}", id);
        }
    }

    let store = PatientStore::with_patients(snapshot.patients, config.history_capacity);
    let mut sim = Simulation::real_time(config, store).with_sink(Box::new(db));

    let print_update = |message: &SyncMessage| {
        if let SyncMessage::VitalsUpdate { patient_id, vitals } = message {
            let flag = if assess(vitals).any_warning() { "!" } else { " " };
            println!(
                "{} {:<4} HR {:>3}  BP {:>7}  SpO2 {:>3}%  T {:>4}  RR {:>2}",
                flag,
                patient_id,
                vitals.heart_rate,
                vitals.blood_pressure_label(),
                vitals.spo2,
                vitals.temperature_label(),
                vitals.respiratory_rate
            );
        }
    };
    let _subscription = match observe.as_deref() {
        Some(id) => sim.channel().subscribe(id, print_update),
        None => sim.channel().subscribe_all(print_update),
    };

    let spec = DriverSpec {
        interval_ms,
        observed: observe,
    };
    sim.start_vitals_driver(spec);
    sim.start_network_monitor();

    let deadline = Instant::now() + Duration::from_secs(seconds);
    while Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
        sim.run_due();
    }

    let network = sim.network_state();
    info!(
        "Stopping after {}s (last latency {}ms)",
        seconds, network.latency_ms
    );
    sim.shutdown();
    Ok(())
}

fn list(db_path: PathBuf, filter: &str, json: bool) -> Result<()> {
    let filter: StatusFilter = filter.parse().map_err(anyhow::Error::msg)?;
    let config = SimulationConfig::default();
    let db = Database::open(&db_path)
        .with_context(|| format!("opening {}", db_path.display()))?;
    let snapshot = db.load_patients(&config.storage_key)?;
    let store = PatientStore::with_patients(snapshot.patients, config.history_capacity);
    let patients = store.search("", filter);

    if json {
        let records: Vec<_> = patients.iter().map(|p| p.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for p in &patients {
        println!(
            "{:<4} {:<18} {:<8} {:<18} HR {:>3}  BP {:>7}  SpO2 {:>3}%  alerts {}",
            p.id,
            p.name,
            p.bed,
            p.status.label(),
            p.vitals.heart_rate,
            p.vitals.blood_pressure_label(),
            p.vitals.spo2,
            p.unacknowledged_alerts().count()
        );
    }
    Ok(())
}

fn reset(db_path: PathBuf) -> Result<()> {
    let config = SimulationConfig::default();
    let db = Database::open(&db_path)
        .with_context(|| format!("opening {}", db_path.display()))?;
    let patients = initial_patients();
    db.save_patients(&config.storage_key, &patients)?;
    println!("Reset {} to {} default patients", db_path.display(), patients.len());
    Ok(())
}

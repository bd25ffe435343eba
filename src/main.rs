use anyhow::Context;
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};

mod config;
mod data;
mod features;
mod models;
mod forecast;
mod los;
mod resources;
mod pipeline;
mod output;
mod error;

use crate::config::Config;
use crate::data::Table;
use crate::pipeline::{Pipeline, PipelineInputs};

#[derive(Parser)]
#[command(name = "hospital_forecast")]
#[command(about = "Forecast hospital admissions, ICU load and bed/staff needs")]
struct Cli {
    /// Admissions CSV (date, admissions)
    #[arg(long)]
    admissions: PathBuf,

    /// Patient demographics CSV (patient_id, attribute columns)
    #[arg(long)]
    demographics: PathBuf,

    /// Discharge CSV (patient_id, admission_date, discharge_date)
    #[arg(long)]
    discharge: PathBuf,

    /// ICU metrics CSV (date, one or more metric columns)
    #[arg(long)]
    icu: PathBuf,

    /// Staffing CSV (date, staff_count)
    #[arg(long)]
    staff: PathBuf,

    /// Emergency CSV (date, emergency_cases)
    #[arg(long)]
    emergency: Option<PathBuf>,

    /// Department CSV (date, department, patient_count)
    #[arg(long)]
    department: Option<PathBuf>,

    /// Pipeline configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_table(name: &str, path: &Path) -> anyhow::Result<Table> {
    let table = Table::from_csv(path)
        .with_context(|| format!("Failed to read {} dataset from {:?}", name, path))?;
    info!("Loaded {} dataset: {} rows from {:?}", name, table.len(), path);
    Ok(table)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let config = match &cli.config {
        Some(path) => {
            let config = Config::from_file(path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))?;
            info!("Loaded configuration from {:?}", path);
            config
        },
        None => Config::default(),
    };

    if let Some(threads) = config.worker_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to start worker pool")?;
    }

    let inputs = PipelineInputs {
        admissions: load_table("admissions", &cli.admissions)?,
        demographics: load_table("demographics", &cli.demographics)?,
        discharge: load_table("discharge", &cli.discharge)?,
        staff: load_table("staff", &cli.staff)?,
        icu: load_table("icu", &cli.icu)?,
        emergency: cli.emergency.as_deref()
            .map(|path| load_table("emergency", path))
            .transpose()?,
        department: cli.department.as_deref()
            .map(|path| load_table("department", path))
            .transpose()?,
    };

    let pipeline = Pipeline::new(config)?;
    let results = pipeline.run(&inputs)?;

    // Create output directory if it doesn't exist
    std::fs::create_dir_all(&cli.output)?;

    crate::output::save_results(&results, &cli.output)?;
    info!("Results saved to {:?}", cli.output);

    Ok(())
}

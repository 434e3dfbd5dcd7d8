use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use patient_dynamics::events::DEFAULT_DATE_FORMAT;
use patient_dynamics::io::{read_state_changes, write_epoch_report, write_rate_report};
use patient_dynamics::{
    DateConfig, DynamicsBuilder, DynamicsConfig, EventNormalizer, PatientStateDynamics,
    RateParameters,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "patient-dynamics",
    about = "Epoch tables and migration rates from patient state change records"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print each epoch's interval and the state of every subject.
    Epochs {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print per-epoch coalescent rates and backward migration matrices.
    Rates {
        #[command(flatten)]
        input: InputArgs,
        /// Base coalescent rate.
        #[arg(long, default_value_t = 1.0)]
        coalescent_rate: f64,
        /// Migration rate between subjects sharing no state.
        #[arg(long, default_value_t = 1.0)]
        migration_scalar: f64,
        /// Effect size per state variable, in variable order (default: all zero).
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        effect_sizes: Vec<f64>,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// State change table (CSV with PatientID, StateName, StateValue, Date, ChangeType).
    csv: PathBuf,
    /// Date of the most recent sample.
    #[arg(long)]
    final_sample_date: String,
    /// strftime-style format of every date in the input.
    #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
    date_format: String,
    /// Comma-delimited state variable names, e.g. "Network,Hospital,Ward".
    #[arg(long)]
    variables: String,
    /// Explicit subject list; defaults to subjects in file order.
    #[arg(long, value_delimiter = ',')]
    subjects: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("patient_dynamics=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Epochs { input } => run_epochs(input)?,
        Commands::Rates {
            input,
            coalescent_rate,
            migration_scalar,
            effect_sizes,
        } => run_rates(input, coalescent_rate, migration_scalar, effect_sizes)?,
    }

    Ok(())
}

fn run_epochs(input: InputArgs) -> Result<()> {
    let dynamics = build_dynamics(&input, None)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_epoch_report(&mut out, dynamics.epoch_table())?;
    writeln!(out, "# fingerprint {}", dynamics.fingerprint())?;
    Ok(())
}

fn run_rates(
    input: InputArgs,
    coalescent_rate: f64,
    migration_scalar: f64,
    effect_sizes: Vec<f64>,
) -> Result<()> {
    let parameters = RateParameters::new(coalescent_rate, migration_scalar, effect_sizes);
    let dynamics = build_dynamics(&input, Some(parameters))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_rate_report(&mut out, &dynamics)?;
    Ok(())
}

fn build_dynamics(
    input: &InputArgs,
    parameters: Option<RateParameters>,
) -> Result<PatientStateDynamics> {
    let date_config = DateConfig::new(&input.final_sample_date, input.date_format.as_str())
        .context("invalid final sample date")?;
    let normalizer = EventNormalizer::new(date_config);

    let raw = read_state_changes(&input.csv)
        .with_context(|| format!("failed to read state changes from {}", input.csv.display()))?;
    info!(records = raw.len(), "read state change table");

    let mut config = DynamicsConfig::new(Vec::<String>::new()).with_variable_list(&input.variables);
    if !input.subjects.is_empty() {
        config = config.with_subjects(input.subjects.iter().map(|s| s.trim().to_string()));
    }
    let parameters = match parameters {
        Some(parameters) if parameters.effect_sizes.is_empty() => RateParameters::new(
            parameters.coalescent_rate,
            parameters.migration_rate_scalar,
            vec![0.0; config.variables.len()],
        ),
        Some(parameters) => parameters,
        None => RateParameters::neutral(config.variables.len()),
    };
    config = config.with_parameters(parameters);

    DynamicsBuilder::new(config)
        .build_from_raw(&normalizer, &raw)
        .context("failed to build patient state dynamics")
}

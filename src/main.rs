// ========================================================================================
//
//                          THE COMMAND-LINE FRONT END: RISKSCOPE
//
// ========================================================================================
//
// Thin orchestration over the `riskscope` library. Each subcommand resolves its inputs,
// builds one `RiskScorer` around the cached classifier artifact, and prints the result.
// All scoring decisions live in the library; this file only moves data in and out.

use clap::{Args, Parser, Subcommand, ValueEnum};
use riskscope::io::{self, BatchRow};
use riskscope::model::LogisticArtifact;
use riskscope::{Gender, RawUserInput, RiskScorer, ScoringConfig, load_classifier};
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

// ========================================================================================
//                         COMMAND-LINE INTERFACE DEFINITION
// ========================================================================================

#[derive(Parser)]
#[command(
    name = "riskscope",
    version,
    about = "Chronic-disease risk scoring from basic health measurements",
    long_about = "Scores hypertension, obesity, diabetes and hyperlipidemia risk from a small \
                 set of health measurements, using a trained classifier artifact followed by \
                 a deterministic adjustment chain."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a single person and print the report as JSON
    #[command(about = "Score one record (outputs: JSON report on stdout)")]
    Score {
        #[command(flatten)]
        engine: EngineArgs,

        /// Read the record from a .toml or .json file instead of the field flags
        #[arg(long, conflicts_with_all = ["gender", "age", "height", "weight", "systolic", "diastolic"])]
        input: Option<PathBuf>,

        #[command(flatten)]
        fields: FieldArgs,

        /// Report an unreadable classifier output as an `unknown` result instead of failing
        #[arg(long)]
        unknown_on_shape_mismatch: bool,

        /// Include the comparison against population averages
        #[arg(long)]
        compare: bool,
    },

    /// Score every record of a tab-separated file
    #[command(about = "Score a TSV of records (outputs: results TSV)")]
    Batch {
        /// Path to a TSV whose header names gender, age, height, weight, systolic_bp,
        /// diastolic_bp and optionally smokes, drinks, exercises
        records: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        /// Where to write the results; defaults to stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the built-in scoring configuration as TOML
    #[command(about = "Print the default configuration (outputs: TOML on stdout)")]
    Defaults,
}

#[derive(Args)]
struct EngineArgs {
    /// Path to the trained classifier artifact (.toml)
    #[arg(long)]
    model: PathBuf,

    /// Optional scoring configuration (.toml); unset keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum GenderArg {
    Male,
    Female,
}

#[derive(Args)]
struct FieldArgs {
    #[arg(long, value_enum)]
    gender: Option<GenderArg>,

    /// Age in years
    #[arg(long)]
    age: Option<u32>,

    /// Height in centimetres
    #[arg(long)]
    height: Option<f64>,

    /// Weight in kilograms
    #[arg(long)]
    weight: Option<f64>,

    /// Systolic blood pressure in mmHg
    #[arg(long)]
    systolic: Option<f64>,

    /// Diastolic blood pressure in mmHg
    #[arg(long)]
    diastolic: Option<f64>,

    #[arg(long)]
    smokes: bool,

    #[arg(long)]
    drinks: bool,

    /// Exercises regularly
    #[arg(long)]
    exercises: bool,
}

impl FieldArgs {
    fn into_input(self) -> Result<RawUserInput, String> {
        let missing = |flag: &str| format!("--{flag} is required unless --input is given");
        Ok(RawUserInput {
            gender: match self.gender.ok_or_else(|| missing("gender"))? {
                GenderArg::Male => Gender::Male,
                GenderArg::Female => Gender::Female,
            },
            age: self.age.ok_or_else(|| missing("age"))?,
            height: self.height.ok_or_else(|| missing("height"))?,
            weight: self.weight.ok_or_else(|| missing("weight"))?,
            systolic_bp: self.systolic.ok_or_else(|| missing("systolic"))?,
            diastolic_bp: self.diastolic.ok_or_else(|| missing("diastolic"))?,
            smokes: self.smokes,
            drinks: self.drinks,
            exercises: self.exercises,
        })
    }
}

// ========================================================================================
//                           THE MAIN ORCHESTRATION LOGIC
// ========================================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Score {
            engine,
            input,
            fields,
            unknown_on_shape_mismatch,
            compare,
        } => score_command(&engine, input.as_deref(), fields, unknown_on_shape_mismatch, compare),
        Commands::Batch {
            records,
            engine,
            out,
        } => batch_command(&records, &engine, out.as_deref()),
        Commands::Defaults => defaults_command(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn build_scorer(engine: &EngineArgs) -> Result<RiskScorer<LogisticArtifact>, Box<dyn Error>> {
    let config = match &engine.config {
        Some(path) => ScoringConfig::load(path)?,
        None => ScoringConfig::default(),
    };
    let classifier = load_classifier(&engine.model)?;
    Ok(RiskScorer::new(classifier, config))
}

fn score_command(
    engine: &EngineArgs,
    input_path: Option<&Path>,
    fields: FieldArgs,
    unknown_on_shape_mismatch: bool,
    compare: bool,
) -> Result<(), Box<dyn Error>> {
    let input = match input_path {
        Some(path) => io::load_user_input(path)?,
        None => fields.into_input()?,
    };
    let scorer = build_scorer(engine)?;

    let mut report = if unknown_on_shape_mismatch {
        scorer.score_or_unknown(&input)?
    } else {
        scorer.score(&input)?
    };
    if compare {
        report = report.with_comparison(&input);
    }

    for condition in riskscope::Condition::ALL {
        log::info!(
            "{condition}: {:.1}% ({}) - {}",
            report.risks.get(condition),
            report.tiers.get(condition),
            report.tiers.get(condition).advice()
        );
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn batch_command(
    records_path: &Path,
    engine: &EngineArgs,
    out: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let records = io::read_batch(BufReader::new(File::open(records_path)?))?;
    log::info!("Read {} records from {}", records.len(), records_path.display());
    let scorer = build_scorer(engine)?;

    let rows: Vec<BatchRow> = records
        .iter()
        .enumerate()
        .map(|(i, record)| match record {
            Ok(input) => {
                let result = scorer.score_or_unknown(input);
                if let Err(e) = &result {
                    log::warn!("Record {} was not scored: {e}", i + 1);
                }
                BatchRow::from_result(i + 1, &result)
            }
            Err(e) => {
                log::warn!("Record {} could not be read: {e}", i + 1);
                BatchRow::failed(i + 1, format!("unreadable record: {e}"))
            }
        })
        .collect();

    let failed = rows.iter().filter(|row| row.status != "scored").count();
    match out {
        Some(path) => {
            io::write_batch(BufWriter::new(File::create(path)?), &rows)?;
            log::info!("Wrote {} results to {}", rows.len(), path.display());
        }
        None => io::write_batch(std::io::stdout().lock(), &rows)?,
    }
    if failed > 0 {
        log::warn!("{failed} of {} records have no usable score", rows.len());
    }
    Ok(())
}

fn defaults_command() -> Result<(), Box<dyn Error>> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}", ScoringConfig::default().to_toml_string()?)?;
    stdout.flush()?;
    Ok(())
}

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use storage::repository::Storage;
use survey_core::demo::{vaccination_survey, wellbeing_survey};
use survey_core::model::{Survey, SurveyId, SurveyStatus, SurveyToken};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Demo {
    Vaccination,
    Wellbeing,
}

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    survey_id: SurveyId,
    file: Option<PathBuf>,
    demo: Demo,
    reset: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSurveyId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidDemo { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSurveyId { raw } => write!(f, "invalid --survey-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDemo { raw } => {
                write!(f, "invalid --demo value (vaccination|wellbeing): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

/// A seed file holds one survey or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedFile {
    One(Survey),
    Many(Vec<Survey>),
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_demo(raw: &str) -> Result<Demo, ArgsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "vaccination" => Ok(Demo::Vaccination),
        "wellbeing" => Ok(Demo::Wellbeing),
        _ => Err(ArgsError::InvalidDemo { raw: raw.into() }),
    }
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("SURVEY_DB_URL").unwrap_or_else(|_| "sqlite:survey.sqlite3".into());
        let mut survey_id = std::env::var("SURVEY_ID")
            .ok()
            .and_then(|value| value.parse::<SurveyId>().ok())
            .unwrap_or_else(|| SurveyId::new(1));
        let mut file = std::env::var("SURVEY_FILE").ok().map(PathBuf::from);
        let mut demo = Demo::Vaccination;
        let mut reset = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--survey-id" => {
                    let value = require_value(&mut args, "--survey-id")?;
                    survey_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSurveyId { raw: value.clone() })?;
                }
                "--file" => {
                    file = Some(PathBuf::from(require_value(&mut args, "--file")?));
                }
                "--demo" => {
                    demo = parse_demo(&require_value(&mut args, "--demo")?)?;
                }
                "--reset" => reset = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            survey_id,
            file,
            demo,
            reset,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:survey.sqlite3)");
    eprintln!("  --survey-id <id>          Id for the built-in demo survey (default: 1)");
    eprintln!("  --demo <name>             vaccination | wellbeing (default: vaccination)");
    eprintln!("  --file <path>             Load survey definitions from JSON instead");
    eprintln!("  --reset                   Restart progress for every seeded survey");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  SURVEY_DB_URL, SURVEY_ID, SURVEY_FILE, SURVEY_LOG");
}

fn load_surveys(args: &Args) -> Result<Vec<Survey>, Box<dyn std::error::Error>> {
    if let Some(path) = &args.file {
        let raw = std::fs::read_to_string(path)?;
        return Ok(match serde_json::from_str::<SeedFile>(&raw)? {
            SeedFile::One(survey) => vec![survey],
            SeedFile::Many(surveys) => surveys,
        });
    }
    let survey = match args.demo {
        Demo::Vaccination => vaccination_survey(args.survey_id)?,
        Demo::Wellbeing => wellbeing_survey(args.survey_id)?,
    };
    Ok(vec![survey])
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let surveys = load_surveys(&args)?;

    for survey in &surveys {
        storage.surveys.upsert_survey(survey).await?;
        let has_status = storage.statuses.get_status(survey.id()).await?.is_some();
        if args.reset || !has_status {
            let status = SurveyStatus::new(
                survey.id(),
                survey.title(),
                SurveyToken::generate(),
                survey.start(),
            );
            storage.statuses.put_status(&status).await?;
        }
        tracing::info!(survey_id = %survey.id(), questions = survey.len(), "seeded survey");
    }

    println!(
        "Seeded {} survey(s) into {}",
        surveys.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("SURVEY_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| "info,storage=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

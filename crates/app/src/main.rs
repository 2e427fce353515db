mod terminal;

use std::fmt;
use std::sync::Arc;

use dioxus::LaunchBuilder;
use dioxus::desktop::{Config as DesktopConfig, WindowBuilder};
use services::{AppServices, Clock, HttpSurveyConfig, SessionLoopService};
use survey_core::demo::{vaccination_survey, wellbeing_survey};
use survey_core::model::{Survey, SurveyId};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use ui::{App, UiApp, build_app_context};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSurveyId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidRemoteUrl { raw: String },
    UnknownDemo { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSurveyId { raw } => write!(f, "invalid --survey-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidRemoteUrl { raw } => write!(f, "invalid --remote value: {raw}"),
            ArgsError::UnknownDemo { raw } => {
                write!(f, "unknown --demo value: {raw} (expected vaccination or wellbeing)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct DesktopApp {
    survey_id: SurveyId,
    session_loop: Arc<SessionLoopService>,
}

impl UiApp for DesktopApp {
    fn survey_id(&self) -> SurveyId {
        self.survey_id
    }

    fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Demo {
    Vaccination,
    Wellbeing,
}

impl Demo {
    fn from_arg(raw: &str) -> Option<Self> {
        match raw {
            "vaccination" => Some(Self::Vaccination),
            "wellbeing" => Some(Self::Wellbeing),
            _ => None,
        }
    }

    fn build(self, id: SurveyId) -> Result<Survey, survey_core::model::SurveyError> {
        match self {
            Demo::Vaccination => vaccination_survey(id),
            Demo::Wellbeing => wellbeing_survey(id),
        }
    }
}

#[derive(Debug, Clone)]
enum Backend {
    Memory,
    Sqlite(String),
    Remote(HttpSurveyConfig),
}

struct Args {
    backend: Backend,
    survey_id: SurveyId,
    demo: Demo,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- ui  [--db <sqlite_url> | --remote <base_url> | --memory]");
    eprintln!("                          [--survey-id <id>] [--demo vaccination|wellbeing]");
    eprintln!("  cargo run -p app -- cli [same flags]  # answer in the terminal");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  in-memory backend seeded with the vaccination demo");
    eprintln!("  --survey-id 1");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SURVEY_DB_URL, SURVEY_ID, SURVEY_API_BASE_URL, SURVEY_API_KEY, SURVEY_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Ui,
    Cli,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "ui" => Some(Self::Ui),
            "cli" => Some(Self::Cli),
            _ => None,
        }
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut backend = if let Some(config) = HttpSurveyConfig::from_env() {
            Backend::Remote(config)
        } else if let Ok(url) = std::env::var("SURVEY_DB_URL") {
            Backend::Sqlite(normalize_sqlite_url(url))
        } else {
            Backend::Memory
        };
        let mut survey_id = std::env::var("SURVEY_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| SurveyId::new(1), SurveyId::new);
        let mut demo = Demo::Vaccination;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    backend = Backend::Sqlite(normalize_sqlite_url(value));
                }
                "--remote" => {
                    let value = require_value(args, "--remote")?;
                    if !value.starts_with("http://") && !value.starts_with("https://") {
                        return Err(ArgsError::InvalidRemoteUrl { raw: value });
                    }
                    let mut config = HttpSurveyConfig::new(value);
                    if let Ok(key) = std::env::var("SURVEY_API_KEY") {
                        config = config.with_api_key(key);
                    }
                    backend = Backend::Remote(config);
                }
                "--memory" => backend = Backend::Memory,
                "--survey-id" => {
                    let value = require_value(args, "--survey-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSurveyId { raw: value.clone() })?;
                    survey_id = SurveyId::new(parsed);
                }
                "--demo" => {
                    let value = require_value(args, "--demo")?;
                    demo = Demo::from_arg(&value).ok_or(ArgsError::UnknownDemo { raw: value })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            backend,
            survey_id,
            demo,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn build_services(args: &Args) -> Result<AppServices, Box<dyn std::error::Error>> {
    let clock = Clock::system();
    let services = match &args.backend {
        Backend::Memory => AppServices::in_memory(clock),
        Backend::Sqlite(db_url) => {
            prepare_sqlite_file(db_url)?;
            AppServices::new_sqlite(db_url, clock).await?
        }
        Backend::Remote(config) => AppServices::http(Some(config.clone()), clock)?,
    };

    // Remote backends own their definitions; local ones get the demo if empty.
    if !matches!(args.backend, Backend::Remote(_)) {
        let survey = args.demo.build(args.survey_id)?;
        if services.ensure_survey(&survey).await? {
            info!(survey_id = %args.survey_id, demo = ?args.demo, "seeded demo survey");
        }
    }
    Ok(services)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: launching UI when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Ui,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Ui,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let services = build_services(&parsed).await?;
    let session_loop = services.session_loop();

    match cmd {
        Command::Ui => {
            let app: Arc<dyn UiApp> = Arc::new(DesktopApp {
                survey_id: parsed.survey_id,
                session_loop,
            });
            let context = build_app_context(&app);

            // On macOS, Dioxus/tao can default to an always-on-top window in some dev setups.
            let desktop_cfg = DesktopConfig::new().with_window(
                WindowBuilder::new()
                    .with_title("Survey")
                    .with_always_on_top(false),
            );

            LaunchBuilder::desktop()
                .with_cfg(desktop_cfg)
                .with_context(context)
                .launch(App);
            Ok(())
        }
        Command::Cli => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            terminal::run_survey(&session_loop, parsed.survey_id, stdin, tokio::io::stdout())
                .await?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("SURVEY_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| "info,services=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

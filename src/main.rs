use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use ai_survey_lib::auth::SessionRegistry;
use ai_survey_lib::config::{self, CliOverrides, SurveyConfig};
use ai_survey_lib::file_storage::{
    self, DataDirLock, FileEvaluationStore, QuestionCatalog, UserStore,
};
use ai_survey_lib::server::{self, ServerAppState};
use ai_survey_lib::shutdown::{self, ShutdownHandler, ShutdownResult, ShutdownState};

/// AI adoption survey - record before/after evaluations of AI in the SDLC
#[derive(Parser, Debug)]
#[command(name = "ai-survey")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config dir)
    #[arg(long, env = "AI_SURVEY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to bind the server to
    #[arg(long, env = "AI_SURVEY_PORT")]
    port: Option<u16>,

    /// Address to bind the server to
    #[arg(long, env = "AI_SURVEY_BIND")]
    bind: Option<String>,

    /// Directory holding questions, users and evaluations
    #[arg(long, env = "AI_SURVEY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Allowed CORS origin (repeatable); any origin when omitted
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,
}

fn main() {
    // Initialize logger
    env_logger::init();

    let cli = Cli::parse();
    let overrides = CliOverrides {
        port: cli.port,
        bind: cli.bind,
        data_dir: cli.data_dir,
        cors_origins: cli.cors_origins,
    };

    let config = match config::load_config(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(config: SurveyConfig) -> anyhow::Result<()> {
    let data_dir = config.storage.resolved_data_dir();
    file_storage::init_data_dir(&data_dir).map_err(anyhow::Error::msg)?;
    let lock = DataDirLock::acquire(&data_dir).map_err(anyhow::Error::msg)?;
    log::info!("Using data directory {:?}", data_dir);

    let catalog = Arc::new(QuestionCatalog::open(&data_dir).map_err(anyhow::Error::msg)?);
    let evaluations = Arc::new(FileEvaluationStore::new(&data_dir, catalog.clone())?);
    let users = Arc::new(UserStore::open(&data_dir).map_err(anyhow::Error::msg)?);
    let sessions = Arc::new(SessionRegistry::new(chrono::Duration::seconds(
        config.auth.session_max_age_secs,
    )));

    // Initialize shutdown state
    let shutdown_state = ShutdownState::new();
    if let Err(e) = shutdown::register_signal_handlers(shutdown_state.clone()) {
        log::warn!("Failed to register signal handlers: {}", e);
    }

    let state = ServerAppState::new(
        catalog,
        evaluations,
        users,
        sessions.clone(),
        shutdown_state.clone(),
    );
    let surveys = state.surveys.clone();

    let runtime = tokio::runtime::Runtime::new()?;
    let served = runtime.block_on(server::run_server(&config.server, state));

    let handler = ShutdownHandler::with_state(shutdown_state);
    handler.handle_shutdown(move || {
        let mut result = ShutdownResult::new();
        result.surveys_discarded = surveys.len();
        result.sessions_dropped = sessions.len();
        match lock.release() {
            Ok(()) => result.lock_released = true,
            Err(e) => result.errors.push(e),
        }
        Ok(result)
    })?;

    served.map_err(anyhow::Error::msg)
}

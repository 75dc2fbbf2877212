use engine::{LoopConfig, RemoteLinePump, Session, TablePlanRequest};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::rollport;
use super::rolls;

const ENABLED_PACKS_ENV_VAR: &str = "ROLLMILL_ENABLED_PACKS";
const SEED_ENV_VAR: &str = "ROLLMILL_SEED";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) session: Box<dyn Session>,
    pub(crate) pump: Box<dyn RemoteLinePump>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Rollmill Startup ===");

    let config = LoopConfig {
        table_plan_request: TablePlanRequest {
            enabled_packs: parse_enabled_packs_from_env(),
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
            game_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        ..LoopConfig::default()
    };

    let session = rolls::build_session(parse_seed_from_env());
    let pump = rollport::initialize();

    AppWiring {
        config,
        session,
        pump,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn parse_enabled_packs_from_env() -> Vec<String> {
    std::env::var(ENABLED_PACKS_ENV_VAR)
        .ok()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

fn parse_seed_from_env() -> Option<u64> {
    let raw = std::env::var(SEED_ENV_VAR).ok()?;
    match raw.parse::<u64>() {
        Ok(seed) => Some(seed),
        Err(_) => {
            warn!(
                env_var = SEED_ENV_VAR,
                value = raw.as_str(),
                "invalid seed env var value; using entropy"
            );
            None
        }
    }
}

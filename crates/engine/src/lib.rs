use std::env;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;

pub mod app;
pub mod audio;
pub mod content;

pub use app::{
    run_app, run_app_with_metrics, AppError, ConsoleCommandProcessor, ConsoleCommandRegistry,
    ConsoleState, ControlCommand, LoopConfig, LoopMetricsSnapshot, MetricsHandle, NullLinePump,
    RemoteLinePump, Session, SessionCommand, TickTimers, TimerId,
};
pub use audio::{AudioArbiter, AudioHandle, AudioHandleProvider, NullAudioProvider, PausedEquipped};
pub use content::{
    build_or_load_rarity_table, write_text_atomic, AudioCue, CompileAction, CompilePlan,
    CompileReason, ContentPipelineError, EffectProgram, EffectStep, OverridePool,
    PackCompileDecision, RarityDef, RarityDefId, RarityTable, TableCompileError, TableErrorCode,
    TablePlanError, TablePlanRequest, TableStatusSummary,
};

pub const ROOT_ENV_VAR: &str = "ROLLMILL_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub base_tables_dir: PathBuf,
    pub packs_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: PathBuf) -> Self {
        let base_tables_dir = root.join("assets").join("base");
        let packs_dir = root.join("packs");
        let cache_dir = root.join("cache");
        Self {
            root,
            base_tables_dir,
            packs_dir,
            cache_dir,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create cache directory at {path}: {source}")]
    CreateCacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = match env::var(ROOT_ENV_VAR) {
        Ok(value) => PathBuf::from(value),
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            exe.parent()
                .map(|parent| parent.to_path_buf())
                .ok_or(StartupError::ExeHasNoParent(exe))?
        }
        Err(source) => {
            return Err(StartupError::EnvVar {
                var: ROOT_ENV_VAR,
                source,
            })
        }
    };

    let paths = AppPaths::from_root(root);
    fs::create_dir_all(&paths.cache_dir).map_err(|source| StartupError::CreateCacheDir {
        path: paths.cache_dir.clone(),
        source,
    })?;
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_paths_layout_from_root() {
        let paths = AppPaths::from_root(PathBuf::from("/opt/rollmill"));
        assert_eq!(
            paths.base_tables_dir,
            PathBuf::from("/opt/rollmill/assets/base")
        );
        assert_eq!(paths.packs_dir, PathBuf::from("/opt/rollmill/packs"));
        assert_eq!(paths.cache_dir, PathBuf::from("/opt/rollmill/cache"));
    }
}

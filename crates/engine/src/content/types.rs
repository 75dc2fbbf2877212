use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct TablePlanRequest {
    pub enabled_packs: Vec<String>,
    pub compiler_version: String,
    pub game_version: String,
}

impl Default for TablePlanRequest {
    fn default() -> Self {
        Self {
            enabled_packs: Vec::new(),
            compiler_version: "dev".to_string(),
            game_version: "dev".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileAction {
    UseCache,
    Compile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileReason {
    CacheValid,
    ManifestMissing,
    ManifestUnreadable,
    PackFileMissing,
    VersionMismatch,
    EnabledPacksHashMismatch,
    InputHashMismatch,
    LoadIndexMismatch,
    PackIdMismatch,
    PackFormatMismatch,
}

#[derive(Debug, Clone)]
pub struct PackCompileDecision {
    pub pack_id: String,
    pub load_index: u32,
    pub source_dir: PathBuf,
    pub xml_file_count: usize,
    pub input_hash_sha256_hex: String,
    pub pack_path: PathBuf,
    pub manifest_path: PathBuf,
    pub action: CompileAction,
    pub reason: CompileReason,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TableStatusSummary {
    pub total_packs: usize,
    pub compile_count: usize,
    pub cache_hit_count: usize,
}

impl TableStatusSummary {
    pub fn status_label(&self) -> &'static str {
        if self.compile_count > 0 {
            "compiling"
        } else {
            "loaded"
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompilePlan {
    pub decisions: Vec<PackCompileDecision>,
    pub enabled_packs_hash_sha256_hex: String,
    pub summary: TableStatusSummary,
}

#[derive(Debug, Error)]
pub enum TablePlanError {
    #[error("enabled pack id cannot be empty")]
    EmptyEnabledPack,
    #[error("duplicate enabled pack id in request: {pack_id}")]
    DuplicateEnabledPack { pack_id: String },
    #[error("enabled pack does not exist on disk: {pack_id} at {expected_dir}")]
    EnabledPackMissing {
        pack_id: String,
        expected_dir: PathBuf,
    },
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read directory entry in {path}: {source}")]
    ReadDirEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create cache layout at {path}: {source}")]
    CreateCacheLayout {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::atomic_io::write_text_atomic;
use super::pack::TablePackError;
use super::types::TablePlanError;

pub(crate) const TABLE_PACK_FORMAT_VERSION: u16 = 1;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct PackManifestV1 {
    pub pack_format_version: u16,
    pub compiler_version: String,
    pub game_version: String,
    pub pack_id: String,
    pub load_index: u32,
    pub enabled_packs_hash_sha256_hex: String,
    pub input_hash_sha256_hex: String,
}

#[derive(Debug, Clone)]
pub(crate) enum ManifestReadState {
    Missing,
    Unreadable,
    Present(PackManifestV1),
}

pub(crate) fn read_manifest(path: &Path) -> Result<ManifestReadState, TablePlanError> {
    if !path.exists() {
        return Ok(ManifestReadState::Missing);
    }

    let raw = fs::read_to_string(path).map_err(|source| TablePlanError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = match serde_json::from_str::<PackManifestV1>(&raw) {
        Ok(value) => value,
        Err(_) => return Ok(ManifestReadState::Unreadable),
    };
    Ok(ManifestReadState::Present(parsed))
}

pub(crate) fn table_pack_cache_dir(cache_dir: &Path) -> PathBuf {
    cache_dir.join("table_packs")
}

pub(crate) fn pack_path(cache_dir: &Path, pack_id: &str) -> PathBuf {
    table_pack_cache_dir(cache_dir).join(format!("{pack_id}.tablepack.json"))
}

pub(crate) fn manifest_path(cache_dir: &Path, pack_id: &str) -> PathBuf {
    table_pack_cache_dir(cache_dir).join(format!("{pack_id}.manifest.json"))
}

pub(crate) fn write_manifest_atomic(
    path: &Path,
    manifest: &PackManifestV1,
) -> Result<(), TablePackError> {
    let text = serde_json::to_string(manifest).map_err(|error| TablePackError::InvalidFormat {
        path: path.to_path_buf(),
        message: format!("failed to encode manifest json: {error}"),
    })?;
    write_text_atomic(path, &text).map_err(|source| TablePackError::Io {
        path: path.to_path_buf(),
        source,
    })
}

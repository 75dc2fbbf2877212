use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::AppPaths;

use super::types::{TablePlanError, TablePlanRequest};

#[derive(Debug, Clone)]
pub(crate) struct PackSource {
    pub pack_id: String,
    pub load_index: u32,
    pub source_dir: PathBuf,
}

/// Base tables load first, then enabled packs in request order. Later packs
/// override earlier defs by name.
pub(crate) fn discover_pack_sources(
    app_paths: &AppPaths,
    request: &TablePlanRequest,
) -> Result<Vec<PackSource>, TablePlanError> {
    let mut seen = HashSet::<String>::new();
    let mut sources = vec![PackSource {
        pack_id: "base".to_string(),
        load_index: 0,
        source_dir: app_paths.base_tables_dir.clone(),
    }];

    for (idx, pack_id) in request.enabled_packs.iter().enumerate() {
        let trimmed = pack_id.trim();
        if trimmed.is_empty() {
            return Err(TablePlanError::EmptyEnabledPack);
        }
        if !seen.insert(trimmed.to_string()) {
            return Err(TablePlanError::DuplicateEnabledPack {
                pack_id: trimmed.to_string(),
            });
        }
        let pack_dir = app_paths.packs_dir.join(trimmed);
        ensure_dir_exists(trimmed, &pack_dir)?;
        sources.push(PackSource {
            pack_id: trimmed.to_string(),
            load_index: (idx + 1) as u32,
            source_dir: pack_dir,
        });
    }

    Ok(sources)
}

fn ensure_dir_exists(pack_id: &str, path: &Path) -> Result<(), TablePlanError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(TablePlanError::EnabledPackMissing {
            pack_id: pack_id.to_string(),
            expected_dir: path.to_path_buf(),
        })
    }
}

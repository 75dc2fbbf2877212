use std::fs;

use crate::AppPaths;

use super::discovery::discover_pack_sources;
use super::hashing::{hash_enabled_packs_list, hash_pack_xml_inputs};
use super::manifest::{
    manifest_path, pack_path, read_manifest, table_pack_cache_dir, ManifestReadState,
    TABLE_PACK_FORMAT_VERSION,
};
use super::types::{
    CompileAction, CompilePlan, CompileReason, PackCompileDecision, TablePlanError,
    TablePlanRequest, TableStatusSummary,
};

pub fn build_compile_plan(
    app_paths: &AppPaths,
    request: &TablePlanRequest,
) -> Result<CompilePlan, TablePlanError> {
    let pack_sources = discover_pack_sources(app_paths, request)?;
    let pack_ids = pack_sources
        .iter()
        .map(|source| source.pack_id.clone())
        .collect::<Vec<_>>();
    let enabled_packs_hash_sha256_hex = hash_enabled_packs_list(&pack_ids);

    let cache_dir = table_pack_cache_dir(&app_paths.cache_dir);
    fs::create_dir_all(&cache_dir).map_err(|source| TablePlanError::CreateCacheLayout {
        path: cache_dir.clone(),
        source,
    })?;

    let mut decisions = Vec::<PackCompileDecision>::new();
    for source in pack_sources {
        let input = hash_pack_xml_inputs(&source.source_dir)?;
        let pack_path = pack_path(&app_paths.cache_dir, &source.pack_id);
        let manifest_path = manifest_path(&app_paths.cache_dir, &source.pack_id);
        let (action, reason) = evaluate_cache_validity(
            &manifest_path,
            &pack_path,
            request,
            &source.pack_id,
            source.load_index,
            &enabled_packs_hash_sha256_hex,
            &input.hash_hex,
        )?;

        decisions.push(PackCompileDecision {
            pack_id: source.pack_id,
            load_index: source.load_index,
            source_dir: source.source_dir,
            xml_file_count: input.xml_file_count,
            input_hash_sha256_hex: input.hash_hex,
            pack_path,
            manifest_path,
            action,
            reason,
        });
    }

    let summary = summarize(&decisions);
    Ok(CompilePlan {
        decisions,
        enabled_packs_hash_sha256_hex,
        summary,
    })
}

#[allow(clippy::too_many_arguments)]
fn evaluate_cache_validity(
    manifest_path: &std::path::Path,
    pack_path: &std::path::Path,
    request: &TablePlanRequest,
    pack_id: &str,
    load_index: u32,
    enabled_packs_hash_sha256_hex: &str,
    input_hash_sha256_hex: &str,
) -> Result<(CompileAction, CompileReason), TablePlanError> {
    let manifest = read_manifest(manifest_path)?;
    match manifest {
        ManifestReadState::Missing => {
            return Ok((CompileAction::Compile, CompileReason::ManifestMissing))
        }
        ManifestReadState::Unreadable => {
            return Ok((CompileAction::Compile, CompileReason::ManifestUnreadable))
        }
        ManifestReadState::Present(value) => {
            if value.pack_format_version != TABLE_PACK_FORMAT_VERSION {
                return Ok((CompileAction::Compile, CompileReason::PackFormatMismatch));
            }
            if value.compiler_version != request.compiler_version
                || value.game_version != request.game_version
            {
                return Ok((CompileAction::Compile, CompileReason::VersionMismatch));
            }
            if value.pack_id != pack_id {
                return Ok((CompileAction::Compile, CompileReason::PackIdMismatch));
            }
            if value.load_index != load_index {
                return Ok((CompileAction::Compile, CompileReason::LoadIndexMismatch));
            }
            if value.enabled_packs_hash_sha256_hex != enabled_packs_hash_sha256_hex {
                return Ok((
                    CompileAction::Compile,
                    CompileReason::EnabledPacksHashMismatch,
                ));
            }
            if value.input_hash_sha256_hex != input_hash_sha256_hex {
                return Ok((CompileAction::Compile, CompileReason::InputHashMismatch));
            }
        }
    }

    if !pack_path.is_file() {
        return Ok((CompileAction::Compile, CompileReason::PackFileMissing));
    }
    Ok((CompileAction::UseCache, CompileReason::CacheValid))
}

fn summarize(decisions: &[PackCompileDecision]) -> TableStatusSummary {
    let compile_count = decisions
        .iter()
        .filter(|decision| decision.action == CompileAction::Compile)
        .count();
    let cache_hit_count = decisions
        .iter()
        .filter(|decision| decision.action == CompileAction::UseCache)
        .count();
    TableStatusSummary {
        total_packs: decisions.len(),
        compile_count,
        cache_hit_count,
    }
}

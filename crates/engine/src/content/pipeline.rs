use thiserror::Error;
use tracing::{info, warn};

use crate::AppPaths;

use super::compiler::{
    compile_pack_tables, merge_compiled_packs, CompiledPackTables, TableCompileError,
};
use super::database::RarityTable;
use super::manifest::{
    read_manifest, write_manifest_atomic, ManifestReadState, PackManifestV1,
    TABLE_PACK_FORMAT_VERSION,
};
use super::pack::{
    compiled_from_pack, read_table_pack_v1, write_table_pack_v1, TablePackError, TablePackMeta,
};
use super::planner::build_compile_plan;
use super::types::{CompileAction, PackCompileDecision, TablePlanError, TablePlanRequest};

#[derive(Debug, Error)]
pub enum ContentPipelineError {
    #[error(transparent)]
    Plan(#[from] TablePlanError),
    #[error(transparent)]
    Compile(#[from] TableCompileError),
    #[error(transparent)]
    Pack(#[from] TablePackError),
}

/// Builds the rarity table from authored XML, reusing per-pack cache
/// artifacts when the planner proves them current. Missing or empty
/// authored content degrades to the built-in table instead of failing.
pub fn build_or_load_rarity_table(
    app_paths: &AppPaths,
    request: &TablePlanRequest,
) -> Result<RarityTable, ContentPipelineError> {
    if !app_paths.base_tables_dir.is_dir() {
        warn!(
            base_tables_dir = %app_paths.base_tables_dir.display(),
            "base_tables_missing_using_builtin_table"
        );
        return Ok(RarityTable::builtin_default());
    }

    let compile_plan = build_compile_plan(app_paths, request)?;
    for decision in &compile_plan.decisions {
        info!(
            pack_id = %decision.pack_id,
            load_index = decision.load_index,
            action = ?decision.action,
            reason = ?decision.reason,
            xml_file_count = decision.xml_file_count,
            input_hash = %decision.input_hash_sha256_hex,
            "table_compile_plan_decision"
        );
    }

    let mut compiled_packs = Vec::<CompiledPackTables>::new();
    for decision in &compile_plan.decisions {
        let compiled = match decision.action {
            CompileAction::Compile => compile_and_write_pack(
                decision,
                request,
                &compile_plan.enabled_packs_hash_sha256_hex,
            )?,
            CompileAction::UseCache => match try_load_cached_pack(
                decision,
                request,
                &compile_plan.enabled_packs_hash_sha256_hex,
            ) {
                Ok(compiled) => {
                    info!(
                        pack_id = %decision.pack_id,
                        pack_path = %decision.pack_path.display(),
                        input_hash = %decision.input_hash_sha256_hex,
                        "table_cache_hit"
                    );
                    compiled
                }
                Err(reason) => {
                    warn!(
                        pack_id = %decision.pack_id,
                        reason = %reason,
                        "table_cache_invalid_rebuilding_pack"
                    );
                    compile_and_write_pack(
                        decision,
                        request,
                        &compile_plan.enabled_packs_hash_sha256_hex,
                    )?
                }
            },
        };
        compiled_packs.push(compiled);
    }

    let summary = compile_plan.summary;
    info!(
        total_packs = summary.total_packs,
        compile_count = summary.compile_count,
        cache_hit_count = summary.cache_hit_count,
        table_status = summary.status_label(),
        "table_pipeline_summary"
    );

    let merged = merge_compiled_packs(compiled_packs);
    if merged.defs.is_empty() {
        warn!("authored_tables_empty_using_builtin_table");
        return Ok(RarityTable::builtin_default());
    }
    Ok(RarityTable::from_parts(merged.defs, merged.overrides))
}

fn compile_and_write_pack(
    decision: &PackCompileDecision,
    request: &TablePlanRequest,
    enabled_packs_hash_sha256_hex: &str,
) -> Result<CompiledPackTables, ContentPipelineError> {
    let compiled = compile_pack_tables(&decision.source_dir, &decision.pack_id)?;
    let manifest = expected_manifest(decision, request, enabled_packs_hash_sha256_hex);
    let meta = manifest_to_meta(&manifest);
    write_table_pack_v1(&decision.pack_path, &meta, &compiled)?;
    write_manifest_atomic(&decision.manifest_path, &manifest)?;
    Ok(compiled)
}

fn try_load_cached_pack(
    decision: &PackCompileDecision,
    request: &TablePlanRequest,
    enabled_packs_hash_sha256_hex: &str,
) -> Result<CompiledPackTables, String> {
    let expected = expected_manifest(decision, request, enabled_packs_hash_sha256_hex);
    let manifest = match read_manifest(&decision.manifest_path) {
        Ok(ManifestReadState::Present(manifest)) => manifest,
        Ok(ManifestReadState::Missing) => return Err("manifest missing".to_string()),
        Ok(ManifestReadState::Unreadable) => return Err("manifest unreadable".to_string()),
        Err(error) => return Err(format!("failed to read manifest: {error}")),
    };

    validate_manifest_matches_expected(&manifest, &expected)?;

    let pack = read_table_pack_v1(&decision.pack_path)
        .map_err(|error| format!("failed to read pack: {error}"))?;
    validate_pack_meta_matches_manifest(&pack.meta, &manifest)?;

    Ok(compiled_from_pack(pack))
}

fn expected_manifest(
    decision: &PackCompileDecision,
    request: &TablePlanRequest,
    enabled_packs_hash_sha256_hex: &str,
) -> PackManifestV1 {
    PackManifestV1 {
        pack_format_version: TABLE_PACK_FORMAT_VERSION,
        compiler_version: request.compiler_version.clone(),
        game_version: request.game_version.clone(),
        pack_id: decision.pack_id.clone(),
        load_index: decision.load_index,
        enabled_packs_hash_sha256_hex: enabled_packs_hash_sha256_hex.to_string(),
        input_hash_sha256_hex: decision.input_hash_sha256_hex.clone(),
    }
}

fn manifest_to_meta(manifest: &PackManifestV1) -> TablePackMeta {
    TablePackMeta {
        pack_format_version: manifest.pack_format_version,
        compiler_version: manifest.compiler_version.clone(),
        game_version: manifest.game_version.clone(),
        pack_id: manifest.pack_id.clone(),
        load_index: manifest.load_index,
        enabled_packs_hash_sha256_hex: manifest.enabled_packs_hash_sha256_hex.clone(),
        input_hash_sha256_hex: manifest.input_hash_sha256_hex.clone(),
    }
}

fn validate_manifest_matches_expected(
    manifest: &PackManifestV1,
    expected: &PackManifestV1,
) -> Result<(), String> {
    if manifest.pack_format_version != expected.pack_format_version {
        return Err("manifest pack_format_version mismatch".to_string());
    }
    if manifest.compiler_version != expected.compiler_version {
        return Err("manifest compiler_version mismatch".to_string());
    }
    if manifest.game_version != expected.game_version {
        return Err("manifest game_version mismatch".to_string());
    }
    if manifest.pack_id != expected.pack_id {
        return Err("manifest pack_id mismatch".to_string());
    }
    if manifest.load_index != expected.load_index {
        return Err("manifest load_index mismatch".to_string());
    }
    if manifest.enabled_packs_hash_sha256_hex != expected.enabled_packs_hash_sha256_hex {
        return Err("manifest enabled_packs_hash mismatch".to_string());
    }
    if manifest.input_hash_sha256_hex != expected.input_hash_sha256_hex {
        return Err("manifest input_hash mismatch".to_string());
    }
    Ok(())
}

fn validate_pack_meta_matches_manifest(
    pack_meta: &TablePackMeta,
    manifest: &PackManifestV1,
) -> Result<(), String> {
    if pack_meta.pack_format_version != manifest.pack_format_version {
        return Err("pack header pack_format_version mismatch vs manifest".to_string());
    }
    if pack_meta.compiler_version != manifest.compiler_version {
        return Err("pack header compiler_version mismatch vs manifest".to_string());
    }
    if pack_meta.game_version != manifest.game_version {
        return Err("pack header game_version mismatch vs manifest".to_string());
    }
    if pack_meta.pack_id != manifest.pack_id {
        return Err("pack header pack_id mismatch vs manifest".to_string());
    }
    if pack_meta.load_index != manifest.load_index {
        return Err("pack header load_index mismatch vs manifest".to_string());
    }
    if pack_meta.enabled_packs_hash_sha256_hex != manifest.enabled_packs_hash_sha256_hex {
        return Err("pack header enabled_packs_hash mismatch vs manifest".to_string());
    }
    if pack_meta.input_hash_sha256_hex != manifest.input_hash_sha256_hex {
        return Err("pack header input_hash mismatch vs manifest".to_string());
    }
    Ok(())
}

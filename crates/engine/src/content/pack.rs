use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::atomic_io::write_text_atomic;
use super::compiler::CompiledPackTables;
use super::database::{OverridePool, RarityDef};

#[derive(Debug, Error)]
pub enum TablePackError {
    #[error("pack io failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pack format failure at {path}: {message}")]
    InvalidFormat { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TablePackMeta {
    pub pack_format_version: u16,
    pub compiler_version: String,
    pub game_version: String,
    pub pack_id: String,
    pub load_index: u32,
    pub enabled_packs_hash_sha256_hex: String,
    pub input_hash_sha256_hex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TablePackV1 {
    pub meta: TablePackMeta,
    pub defs: Vec<RarityDef>,
    pub overrides: Vec<OverridePool>,
}

pub(crate) fn write_table_pack_v1(
    path: &Path,
    meta: &TablePackMeta,
    compiled: &CompiledPackTables,
) -> Result<(), TablePackError> {
    let pack = TablePackV1 {
        meta: meta.clone(),
        defs: compiled.defs.clone(),
        overrides: compiled.overrides.clone(),
    };
    let text = serde_json::to_string(&pack).map_err(|error| TablePackError::InvalidFormat {
        path: path.to_path_buf(),
        message: format!("failed to encode pack json: {error}"),
    })?;
    write_text_atomic(path, &text).map_err(|source| TablePackError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn read_table_pack_v1(path: &Path) -> Result<TablePackV1, TablePackError> {
    let raw = fs::read_to_string(path).map_err(|source| TablePackError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    match serde_path_to_error::deserialize::<_, TablePackV1>(&mut deserializer) {
        Ok(pack) => Ok(pack),
        Err(error) => {
            let field_path = error.path().to_string();
            let source = error.into_inner();
            let message = if field_path.is_empty() || field_path == "." {
                format!("failed to parse pack json: {source}")
            } else {
                format!("failed to parse pack json at {field_path}: {source}")
            };
            Err(TablePackError::InvalidFormat {
                path: path.to_path_buf(),
                message,
            })
        }
    }
}

pub(crate) fn compiled_from_pack(pack: TablePackV1) -> CompiledPackTables {
    CompiledPackTables {
        defs: pack.defs,
        overrides: pack.overrides,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::super::database::EffectProgram;
    use super::*;

    fn meta() -> TablePackMeta {
        TablePackMeta {
            pack_format_version: 1,
            compiler_version: "test".to_string(),
            game_version: "test".to_string(),
            pack_id: "base".to_string(),
            load_index: 0,
            enabled_packs_hash_sha256_hex: "aa".to_string(),
            input_hash_sha256_hex: "bb".to_string(),
        }
    }

    fn compiled() -> CompiledPackTables {
        CompiledPackTables {
            defs: vec![RarityDef {
                def_name: "1 in 2".to_string(),
                class: "basic".to_string(),
                weight: 10.0,
                titles: vec!["Stray".to_string()],
                quick: true,
                sound_id: None,
                background_id: None,
                effect: EffectProgram::default(),
            }],
            overrides: Vec::new(),
        }
    }

    #[test]
    fn pack_round_trips_meta_and_records() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("base.tablepack.json");

        write_table_pack_v1(&path, &meta(), &compiled()).expect("write");
        let loaded = read_table_pack_v1(&path).expect("read");

        assert_eq!(loaded.meta, meta());
        assert_eq!(loaded.defs.len(), 1);
        assert_eq!(loaded.defs[0].def_name, "1 in 2");
    }

    #[test]
    fn corrupt_pack_reports_invalid_format() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("base.tablepack.json");
        std::fs::write(&path, b"not json at all").expect("write corrupt");

        let error = read_table_pack_v1(&path).expect_err("error");
        assert!(matches!(error, TablePackError::InvalidFormat { .. }));
    }

    #[test]
    fn wrong_field_type_reports_field_path() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("base.tablepack.json");
        let valid = serde_json::json!({
            "meta": {
                "pack_format_version": 1,
                "compiler_version": "t",
                "game_version": "t",
                "pack_id": "base",
                "load_index": 0,
                "enabled_packs_hash_sha256_hex": "aa",
                "input_hash_sha256_hex": "bb"
            },
            "defs": [{
                "def_name": "1 in 2",
                "class": "basic",
                "weight": "oops",
                "titles": ["Stray"],
                "quick": true,
                "sound_id": null,
                "background_id": null,
                "effect": {"steps": [], "audio": null}
            }],
            "overrides": []
        });
        std::fs::write(&path, valid.to_string()).expect("write");

        let error = read_table_pack_v1(&path).expect_err("error");
        let TablePackError::InvalidFormat { message, .. } = error else {
            panic!("expected invalid format");
        };
        assert!(message.contains("defs[0].weight"), "message: {message}");
    }
}

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use super::database::{AudioCue, EffectProgram, EffectStep, OverridePool, RarityDef};
use super::hashing::collect_xml_files;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableErrorCode {
    Discovery,
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDefInPack,
    DuplicateModulusInPack,
    EmptyTable,
}

#[derive(Debug, Clone)]
pub struct TableCompileError {
    pub code: TableErrorCode,
    pub message: String,
    pub pack_id: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for TableCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (pack={}, file={}, line={}, column={})",
                self.code,
                self.message,
                self.pack_id,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (pack={}, file={})",
                self.code,
                self.message,
                self.pack_id,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for TableCompileError {}

#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledPackTables {
    pub defs: Vec<RarityDef>,
    pub overrides: Vec<OverridePool>,
}

pub(crate) fn compile_pack_tables(
    source_dir: &Path,
    pack_id: &str,
) -> Result<CompiledPackTables, TableCompileError> {
    let xml_files = collect_xml_files(source_dir).map_err(|error| TableCompileError {
        code: TableErrorCode::ReadFile,
        message: format!("failed to enumerate table sources: {error}"),
        pack_id: pack_id.to_string(),
        file_path: source_dir.to_path_buf(),
        location: None,
    })?;

    let mut compiled = CompiledPackTables::default();
    let mut seen_def_names = HashSet::<String>::new();
    let mut seen_moduli = HashSet::<u64>::new();

    for (_, xml_file) in xml_files {
        let raw = fs::read_to_string(&xml_file).map_err(|source| TableCompileError {
            code: TableErrorCode::ReadFile,
            message: format!("failed to read table XML: {source}"),
            pack_id: pack_id.to_string(),
            file_path: xml_file.clone(),
            location: None,
        })?;
        parse_tables_document(
            pack_id,
            &xml_file,
            &raw,
            &mut compiled,
            &mut seen_def_names,
            &mut seen_moduli,
        )?;
    }

    Ok(compiled)
}

/// Fold pack outputs in load order. A later pack redefining a def_name (or
/// a modulus) replaces the earlier definition in place, so base declaration
/// order is stable under overrides.
pub(crate) fn merge_compiled_packs(packs: Vec<CompiledPackTables>) -> CompiledPackTables {
    let mut merged = CompiledPackTables::default();
    for pack in packs {
        for def in pack.defs {
            match merged
                .defs
                .iter_mut()
                .find(|existing| existing.def_name == def.def_name)
            {
                Some(existing) => *existing = def,
                None => merged.defs.push(def),
            }
        }
        for pool in pack.overrides {
            match merged
                .overrides
                .iter_mut()
                .find(|existing| existing.modulus == pool.modulus)
            {
                Some(existing) => *existing = pool,
                None => merged.overrides.push(pool),
            }
        }
    }
    merged
}

fn parse_tables_document(
    pack_id: &str,
    file_path: &Path,
    raw: &str,
    compiled: &mut CompiledPackTables,
    seen_def_names: &mut HashSet<String>,
    seen_moduli: &mut HashSet<u64>,
) -> Result<(), TableCompileError> {
    let doc = Document::parse(raw).map_err(|error| TableCompileError {
        code: TableErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        pack_id: pack_id.to_string(),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Tables" {
        return Err(error_at_node(
            TableErrorCode::InvalidRoot,
            "root element must be <Tables>".to_string(),
            pack_id,
            file_path,
            &doc,
            root,
        ));
    }

    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "RarityDef" => {
                let def = parse_rarity_def(pack_id, file_path, &doc, child, false)?;
                if !seen_def_names.insert(def.def_name.clone()) {
                    return Err(error_at_node(
                        TableErrorCode::DuplicateDefInPack,
                        format!(
                            "duplicate RarityDef '{}' in pack '{}'; each pack may define a defName only once",
                            def.def_name, pack_id
                        ),
                        pack_id,
                        file_path,
                        &doc,
                        child,
                    ));
                }
                compiled.defs.push(def);
            }
            "OverrideDef" => {
                let pool = parse_override_def(pack_id, file_path, &doc, child)?;
                if !seen_moduli.insert(pool.modulus) {
                    return Err(error_at_node(
                        TableErrorCode::DuplicateModulusInPack,
                        format!(
                            "duplicate OverrideDef modulus {} in pack '{}'",
                            pool.modulus, pack_id
                        ),
                        pack_id,
                        file_path,
                        &doc,
                        child,
                    ));
                }
                compiled.overrides.push(pool);
            }
            other => {
                return Err(error_at_node(
                    TableErrorCode::UnknownDefType,
                    format!("unsupported def type <{other}>; expected <RarityDef> or <OverrideDef>"),
                    pack_id,
                    file_path,
                    &doc,
                    child,
                ));
            }
        }
    }

    Ok(())
}

struct PendingDef {
    def_name: Option<String>,
    class: Option<String>,
    weight: Option<f64>,
    pool_weight: Option<f64>,
    modulus: Option<u64>,
    titles: Vec<String>,
    quick: Option<bool>,
    sound_id: Option<String>,
    background_id: Option<String>,
    effect: EffectProgram,
}

fn parse_rarity_def(
    pack_id: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    is_override: bool,
) -> Result<RarityDef, TableCompileError> {
    let pending = parse_def_fields(pack_id, file_path, doc, node, is_override)?;
    build_rarity_def(pending, pack_id, file_path, doc, node, is_override)
}

fn build_rarity_def(
    pending: PendingDef,
    pack_id: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    is_override: bool,
) -> Result<RarityDef, TableCompileError> {
    let Some(def_name) = pending.def_name else {
        return Err(error_at_node(
            TableErrorCode::MissingField,
            "missing required field <defName>".to_string(),
            pack_id,
            file_path,
            doc,
            node,
        ));
    };
    let Some(class) = pending.class else {
        return Err(error_at_node(
            TableErrorCode::MissingField,
            "missing required field <class>".to_string(),
            pack_id,
            file_path,
            doc,
            node,
        ));
    };
    let weight = if is_override {
        pending.pool_weight.ok_or_else(|| {
            error_at_node(
                TableErrorCode::MissingField,
                "missing required field <poolWeight> in <OverrideDef>".to_string(),
                pack_id,
                file_path,
                doc,
                node,
            )
        })?
    } else {
        pending.weight.ok_or_else(|| {
            error_at_node(
                TableErrorCode::MissingField,
                "missing required field <weight> in <RarityDef>".to_string(),
                pack_id,
                file_path,
                doc,
                node,
            )
        })?
    };
    if pending.titles.is_empty() {
        return Err(error_at_node(
            TableErrorCode::MissingField,
            "field <titles> must contain at least one <li>".to_string(),
            pack_id,
            file_path,
            doc,
            node,
        ));
    }

    Ok(RarityDef {
        def_name,
        class,
        weight,
        titles: pending.titles,
        quick: pending.quick.unwrap_or(false),
        sound_id: pending.sound_id,
        background_id: pending.background_id,
        effect: pending.effect,
    })
}

fn parse_override_def(
    pack_id: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<OverridePool, TableCompileError> {
    let pending = parse_def_fields(pack_id, file_path, doc, node, true)?;
    let Some(modulus) = pending.modulus else {
        return Err(error_at_node(
            TableErrorCode::MissingField,
            "missing required field <modulus> in <OverrideDef>".to_string(),
            pack_id,
            file_path,
            doc,
            node,
        ));
    };
    let def = build_rarity_def(pending, pack_id, file_path, doc, node, true)?;
    let pool_weight = def.weight;
    Ok(OverridePool {
        modulus,
        pool_weight,
        def,
    })
}

fn parse_def_fields(
    pack_id: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    is_override: bool,
) -> Result<PendingDef, TableCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut pending = PendingDef {
        def_name: None,
        class: None,
        weight: None,
        pool_weight: None,
        modulus: None,
        titles: Vec::new(),
        quick: None,
        sound_id: None,
        background_id: None,
        effect: EffectProgram::default(),
    };

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                TableErrorCode::DuplicateField,
                format!("duplicate field <{field_name}>"),
                pack_id,
                file_path,
                doc,
                field,
            ));
        }

        match field_name.as_str() {
            "defName" => {
                pending.def_name = Some(required_text(pack_id, file_path, doc, field, "defName")?);
            }
            "class" => {
                pending.class = Some(required_text(pack_id, file_path, doc, field, "class")?);
            }
            "weight" if !is_override => {
                pending.weight = Some(parse_positive_number(
                    pack_id, file_path, doc, field, "weight",
                )?);
            }
            "poolWeight" if is_override => {
                pending.pool_weight = Some(parse_positive_number(
                    pack_id,
                    file_path,
                    doc,
                    field,
                    "poolWeight",
                )?);
            }
            "modulus" if is_override => {
                let value = required_text(pack_id, file_path, doc, field, "modulus")?;
                let parsed = value.parse::<u64>().map_err(|_| {
                    error_at_node(
                        TableErrorCode::InvalidValue,
                        format!("modulus '{value}' is not a valid integer"),
                        pack_id,
                        file_path,
                        doc,
                        field,
                    )
                })?;
                if parsed < 2 {
                    return Err(error_at_node(
                        TableErrorCode::InvalidValue,
                        "modulus must be >= 2".to_string(),
                        pack_id,
                        file_path,
                        doc,
                        field,
                    ));
                }
                pending.modulus = Some(parsed);
            }
            "titles" => {
                for li in field.children().filter(|child| child.is_element()) {
                    if li.tag_name().name() != "li" {
                        return Err(error_at_node(
                            TableErrorCode::UnknownField,
                            format!(
                                "unexpected <{}> in <titles>; expected <li>",
                                li.tag_name().name()
                            ),
                            pack_id,
                            file_path,
                            doc,
                            li,
                        ));
                    }
                    pending
                        .titles
                        .push(required_text(pack_id, file_path, doc, li, "titles.li")?);
                }
            }
            "quick" => {
                let value = required_text(pack_id, file_path, doc, field, "quick")?;
                let parsed = match value.as_str() {
                    "true" => true,
                    "false" => false,
                    other => {
                        return Err(error_at_node(
                            TableErrorCode::InvalidValue,
                            format!("quick '{other}' is not a valid bool (expected true|false)"),
                            pack_id,
                            file_path,
                            doc,
                            field,
                        ));
                    }
                };
                pending.quick = Some(parsed);
            }
            "sound" => {
                pending.sound_id = Some(required_text(pack_id, file_path, doc, field, "sound")?);
            }
            "background" => {
                pending.background_id =
                    Some(required_text(pack_id, file_path, doc, field, "background")?);
            }
            "effect" => {
                pending.effect = parse_effect_program(pack_id, file_path, doc, field)?;
            }
            _ => {
                return Err(error_at_node(
                    TableErrorCode::UnknownField,
                    format!("unknown field <{field_name}>"),
                    pack_id,
                    file_path,
                    doc,
                    field,
                ));
            }
        }
    }

    Ok(pending)
}

fn parse_effect_program(
    pack_id: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<EffectProgram, TableCompileError> {
    let mut program = EffectProgram::default();

    for child in node.children().filter(|child| child.is_element()) {
        match child.tag_name().name() {
            "step" => {
                let delay_seconds = parse_delay_ms_attr(pack_id, file_path, doc, child)?;
                let Some(visual) = child.attribute("visual") else {
                    return Err(error_at_node(
                        TableErrorCode::MissingField,
                        "missing 'visual' attribute on <step>".to_string(),
                        pack_id,
                        file_path,
                        doc,
                        child,
                    ));
                };
                program.steps.push(EffectStep {
                    delay_seconds,
                    visual_state: visual.to_string(),
                });
            }
            "audio" => {
                if program.audio.is_some() {
                    return Err(error_at_node(
                        TableErrorCode::DuplicateField,
                        "an effect program may start at most one audio cue".to_string(),
                        pack_id,
                        file_path,
                        doc,
                        child,
                    ));
                }
                let delay_seconds = parse_delay_ms_attr(pack_id, file_path, doc, child)?;
                let Some(sound) = child.attribute("sound") else {
                    return Err(error_at_node(
                        TableErrorCode::MissingField,
                        "missing 'sound' attribute on <audio>".to_string(),
                        pack_id,
                        file_path,
                        doc,
                        child,
                    ));
                };
                program.audio = Some(AudioCue {
                    delay_seconds,
                    sound_id: sound.to_string(),
                });
            }
            other => {
                return Err(error_at_node(
                    TableErrorCode::UnknownField,
                    format!("unknown element <{other}> in <effect>"),
                    pack_id,
                    file_path,
                    doc,
                    child,
                ));
            }
        }
    }

    Ok(program)
}

fn parse_delay_ms_attr(
    pack_id: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<f32, TableCompileError> {
    let Some(raw) = node.attribute("delayMs") else {
        return Err(error_at_node(
            TableErrorCode::MissingField,
            format!(
                "missing 'delayMs' attribute on <{}>",
                node.tag_name().name()
            ),
            pack_id,
            file_path,
            doc,
            node,
        ));
    };
    let millis = raw.parse::<u64>().map_err(|_| {
        error_at_node(
            TableErrorCode::InvalidValue,
            format!("delayMs '{raw}' is not a valid integer"),
            pack_id,
            file_path,
            doc,
            node,
        )
    })?;
    Ok(millis as f32 / 1000.0)
}

fn parse_positive_number(
    pack_id: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<f64, TableCompileError> {
    let value = required_text(pack_id, file_path, doc, node, field_name)?;
    let parsed = value.parse::<f64>().map_err(|_| {
        error_at_node(
            TableErrorCode::InvalidValue,
            format!("{field_name} '{value}' is not a valid number"),
            pack_id,
            file_path,
            doc,
            node,
        )
    })?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(error_at_node(
            TableErrorCode::InvalidValue,
            format!("{field_name} must be finite and > 0"),
            pack_id,
            file_path,
            doc,
            node,
        ));
    }
    Ok(parsed)
}

fn required_text(
    pack_id: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, TableCompileError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            TableErrorCode::MissingField,
            format!("field <{field_name}> must not be empty"),
            pack_id,
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn error_at_node(
    code: TableErrorCode,
    message: String,
    pack_id: &str,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> TableCompileError {
    let pos = doc.text_pos_at(node.range().start);
    TableCompileError {
        code,
        message,
        pack_id: pack_id.to_string(),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    const VALID_TABLES: &str = r#"<Tables>
        <RarityDef>
            <defName>1 in 2</defName>
            <class>basic</class>
            <weight>500000</weight>
            <titles><li>Stray</li><li>Wanderer</li></titles>
            <quick>true</quick>
        </RarityDef>
        <RarityDef>
            <defName>1 in 1,024</defName>
            <class>grand</class>
            <weight>977</weight>
            <titles><li>Herald</li></titles>
            <sound>sting.grand</sound>
            <effect>
                <step delayMs="0" visual="veil.dim"/>
                <step delayMs="1200" visual="flash.white"/>
                <audio delayMs="400" sound="sting.grand"/>
            </effect>
        </RarityDef>
        <OverrideDef>
            <modulus>333</modulus>
            <defName>The Equinox</defName>
            <class>exalted_event</class>
            <poolWeight>40</poolWeight>
            <titles><li>Equinox</li></titles>
            <background>bg.equinox</background>
        </OverrideDef>
    </Tables>"#;

    #[test]
    fn valid_tables_compile_with_effects_and_overrides() {
        let temp = TempDir::new().expect("temp");
        write_file(&temp.path().join("tables.xml"), VALID_TABLES);

        let compiled = compile_pack_tables(temp.path(), "base").expect("compile");
        assert_eq!(compiled.defs.len(), 2);
        assert_eq!(compiled.overrides.len(), 1);

        let grand = &compiled.defs[1];
        assert_eq!(grand.def_name, "1 in 1,024");
        assert!(!grand.quick);
        assert_eq!(grand.effect.steps.len(), 2);
        assert!((grand.effect.steps[1].delay_seconds - 1.2).abs() < 0.0001);
        let cue = grand.effect.audio.as_ref().expect("audio cue");
        assert_eq!(cue.sound_id, "sting.grand");

        let pool = &compiled.overrides[0];
        assert_eq!(pool.modulus, 333);
        assert_eq!(pool.pool_weight, 40.0);
        assert_eq!(pool.def.def_name, "The Equinox");
        assert_eq!(pool.def.background_id.as_deref(), Some("bg.equinox"));
    }

    #[test]
    fn missing_def_name_reports_pack_file_and_location() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("tables.xml"),
            r#"<Tables><RarityDef><class>basic</class><weight>1</weight><titles><li>X</li></titles></RarityDef></Tables>"#,
        );

        let error = compile_pack_tables(temp.path(), "base").expect_err("error");
        assert_eq!(error.code, TableErrorCode::MissingField);
        assert_eq!(error.pack_id, "base");
        assert!(error.location.is_some());
    }

    #[test]
    fn unknown_field_errors() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("tables.xml"),
            r#"<Tables><RarityDef><defName>a</defName><class>basic</class><weight>1</weight><titles><li>X</li></titles><mood>happy</mood></RarityDef></Tables>"#,
        );

        let error = compile_pack_tables(temp.path(), "base").expect_err("error");
        assert_eq!(error.code, TableErrorCode::UnknownField);
    }

    #[test]
    fn non_positive_weight_errors() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("tables.xml"),
            r#"<Tables><RarityDef><defName>a</defName><class>basic</class><weight>0</weight><titles><li>X</li></titles></RarityDef></Tables>"#,
        );

        let error = compile_pack_tables(temp.path(), "base").expect_err("error");
        assert_eq!(error.code, TableErrorCode::InvalidValue);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("tables.xml"),
            r#"<Tables><RarityDef><defName>a</defName></Tables>"#,
        );

        let error = compile_pack_tables(temp.path(), "base").expect_err("error");
        assert_eq!(error.code, TableErrorCode::XmlMalformed);
        assert!(error.location.is_some());
    }

    #[test]
    fn duplicate_def_in_same_pack_errors() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("tables.xml"),
            r#"<Tables>
                <RarityDef><defName>a</defName><class>basic</class><weight>1</weight><titles><li>X</li></titles></RarityDef>
                <RarityDef><defName>a</defName><class>basic</class><weight>2</weight><titles><li>Y</li></titles></RarityDef>
            </Tables>"#,
        );

        let error = compile_pack_tables(temp.path(), "base").expect_err("error");
        assert_eq!(error.code, TableErrorCode::DuplicateDefInPack);
    }

    #[test]
    fn duplicate_modulus_in_same_pack_errors() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("tables.xml"),
            r#"<Tables>
                <OverrideDef><modulus>7</modulus><defName>a</defName><class>basic</class><poolWeight>1</poolWeight><titles><li>X</li></titles></OverrideDef>
                <OverrideDef><modulus>7</modulus><defName>b</defName><class>basic</class><poolWeight>2</poolWeight><titles><li>Y</li></titles></OverrideDef>
            </Tables>"#,
        );

        let error = compile_pack_tables(temp.path(), "base").expect_err("error");
        assert_eq!(error.code, TableErrorCode::DuplicateModulusInPack);
    }

    #[test]
    fn modulus_below_two_errors() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("tables.xml"),
            r#"<Tables><OverrideDef><modulus>1</modulus><defName>a</defName><class>basic</class><poolWeight>1</poolWeight><titles><li>X</li></titles></OverrideDef></Tables>"#,
        );

        let error = compile_pack_tables(temp.path(), "base").expect_err("error");
        assert_eq!(error.code, TableErrorCode::InvalidValue);
    }

    #[test]
    fn empty_titles_errors() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("tables.xml"),
            r#"<Tables><RarityDef><defName>a</defName><class>basic</class><weight>1</weight><titles></titles></RarityDef></Tables>"#,
        );

        let error = compile_pack_tables(temp.path(), "base").expect_err("error");
        assert_eq!(error.code, TableErrorCode::MissingField);
    }

    #[test]
    fn merge_is_last_pack_wins_preserving_declaration_order() {
        let base = CompiledPackTables {
            defs: vec![
                RarityDef {
                    def_name: "first".to_string(),
                    class: "basic".to_string(),
                    weight: 10.0,
                    titles: vec!["A".to_string()],
                    quick: true,
                    sound_id: None,
                    background_id: None,
                    effect: EffectProgram::default(),
                },
                RarityDef {
                    def_name: "second".to_string(),
                    class: "fine".to_string(),
                    weight: 5.0,
                    titles: vec!["B".to_string()],
                    quick: true,
                    sound_id: None,
                    background_id: None,
                    effect: EffectProgram::default(),
                },
            ],
            overrides: Vec::new(),
        };
        let pack = CompiledPackTables {
            defs: vec![RarityDef {
                def_name: "first".to_string(),
                class: "basic".to_string(),
                weight: 99.0,
                titles: vec!["A2".to_string()],
                quick: true,
                sound_id: None,
                background_id: None,
                effect: EffectProgram::default(),
            }],
            overrides: Vec::new(),
        };

        let merged = merge_compiled_packs(vec![base, pack]);
        assert_eq!(merged.defs.len(), 2);
        assert_eq!(merged.defs[0].def_name, "first");
        assert_eq!(merged.defs[0].weight, 99.0);
        assert_eq!(merged.defs[1].def_name, "second");
    }
}

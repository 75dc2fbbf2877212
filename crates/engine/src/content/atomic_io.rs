use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write-to-temp then rename. The destination either keeps its old content
/// or holds the full new content; readers never observe a partial file.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, bytes)?;

    match fs::remove_file(path) {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(error);
        }
    }

    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

pub fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    write_bytes_atomic(path, text.as_bytes())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("rollmill.tmp");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn write_creates_missing_parent_dirs() {
        let temp = TempDir::new().expect("tempdir");
        let target = temp.path().join("nested").join("deep").join("value.json");

        write_text_atomic(&target, "{}").expect("write");

        assert_eq!(fs::read_to_string(&target).expect("read"), "{}");
    }

    #[test]
    fn write_replaces_existing_content() {
        let temp = TempDir::new().expect("tempdir");
        let target = temp.path().join("value.json");
        write_text_atomic(&target, "old").expect("first write");

        write_text_atomic(&target, "new").expect("second write");

        assert_eq!(fs::read_to_string(&target).expect("read"), "new");
    }

    #[test]
    fn no_temp_file_left_behind() {
        let temp = TempDir::new().expect("tempdir");
        let target = temp.path().join("value.json");
        write_text_atomic(&target, "content").expect("write");

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}

//! Small filesystem helpers for state that must survive a crash mid-write.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Writes `text` to a temp file in the same directory and renames it over
/// `path`. The rename replaces the target in one step, so readers only ever
/// observe the previous or the new contents.
pub fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|error| error.error)?;
    Ok(())
}

/// `Ok(None)` when the file does not exist yet.
pub fn read_text_if_exists(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_replaces_previous_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");

        write_text_atomic(&path, "first").expect("first write");
        write_text_atomic(&path, "second").expect("second write");

        let text = read_text_if_exists(&path).expect("read");
        assert_eq!(text.as_deref(), Some("second"));
        let leftovers = fs::read_dir(dir.path().join("nested"))
            .expect("read dir")
            .count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn failed_replace_leaves_target_and_removes_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("state.json");
        fs::create_dir_all(target.join("child")).expect("blocking dir");

        assert!(write_text_atomic(&target, "lost").is_err());

        assert!(target.join("child").is_dir());
        let entries = fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let text = read_text_if_exists(&dir.path().join("absent.json")).expect("read");
        assert!(text.is_none());
    }
}

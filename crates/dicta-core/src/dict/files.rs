//! Dictionary file helpers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::DictError;

pub const DICT_FILE_EXTENSION: &str = ".dict";

pub fn dict_file_path(dir: &Path, dict_name: &str) -> PathBuf {
    dir.join(format!("{dict_name}{DICT_FILE_EXTENSION}"))
}

/// Whether `file_name` belongs to a dictionary named
/// `{name_prefix}{name}.{locale}[.{account}]`, for any name prefix: the
/// file `dict_file_path` gives it, or a sidecar sharing that file's name.
pub fn is_dict_file_of(file_name: &str, name: &str) -> bool {
    let Some(end) = file_name.find(DICT_FILE_EXTENSION) else {
        return false;
    };
    let rest = &file_name[end + DICT_FILE_EXTENSION.len()..];
    if !rest.is_empty() && !rest.starts_with('.') {
        return false;
    }
    match file_name[..end].split_once('.') {
        Some((head, tail)) => head.ends_with(name) && !tail.is_empty(),
        None => false,
    }
}

fn dict_files_for(dir: &Path, dict_name: &str) -> io::Result<Vec<PathBuf>> {
    let prefix = format!("{dict_name}{DICT_FILE_EXTENSION}");
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Renames every file of dictionary `from_name` (the main file and any
/// sidecars sharing its prefix) to the `to_name` equivalent. Either all
/// files move or none do.
pub fn rename_dict_files(dir: &Path, from_name: &str, to_name: &str) -> Result<(), DictError> {
    let from_prefix = format!("{from_name}{DICT_FILE_EXTENSION}");
    let to_prefix = format!("{to_name}{DICT_FILE_EXTENSION}");
    let mut done: Vec<(PathBuf, PathBuf)> = Vec::new();
    for from in dict_files_for(dir, from_name)? {
        let name = from.file_name().map(|n| n.to_string_lossy().into_owned());
        let Some(name) = name else { continue };
        let to = dir.join(format!("{to_prefix}{}", &name[from_prefix.len()..]));
        if let Err(source) = fs::rename(&from, &to) {
            for (orig, moved) in done.iter().rev() {
                if let Err(e) = fs::rename(moved, orig) {
                    warn!(from = %moved.display(), to = %orig.display(), "rollback failed: {e}");
                }
            }
            return Err(DictError::Rename { from, to, source });
        }
        done.push((from, to));
    }
    debug!(from = from_name, to = to_name, files = done.len(), "renamed dictionary files");
    Ok(())
}

/// Deletes regular files in `dir` whose name matches `predicate`. Returns
/// the number deleted; a missing directory deletes nothing.
pub fn delete_filtered_files(
    dir: &Path,
    predicate: impl Fn(&str) -> bool,
) -> Result<usize, DictError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    let mut deleted = 0;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if predicate(&entry.file_name().to_string_lossy()) {
            fs::remove_file(entry.path())?;
            deleted += 1;
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_moves_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("history.en.dict"), b"a").unwrap();
        fs::write(dir.path().join("history.en.dict.lookup"), b"b").unwrap();
        fs::write(dir.path().join("other.en.dict"), b"c").unwrap();

        rename_dict_files(dir.path(), "history.en", "history.fr").unwrap();
        assert!(dir.path().join("history.fr.dict").exists());
        assert!(dir.path().join("history.fr.dict.lookup").exists());
        assert!(!dir.path().join("history.en.dict").exists());
        assert!(dir.path().join("other.en.dict").exists());
    }

    #[test]
    fn rename_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.dict"), b"a").unwrap();
        fs::write(dir.path().join("a.dict.z"), b"b").unwrap();
        // A directory in the way of the second rename makes it fail.
        fs::create_dir(dir.path().join("b.dict.z")).unwrap();
        fs::write(dir.path().join("b.dict.z").join("keep"), b"x").unwrap();

        let err = rename_dict_files(dir.path(), "a", "b").unwrap_err();
        assert!(matches!(err, DictError::Rename { .. }));
        assert!(dir.path().join("a.dict").exists());
        assert!(dir.path().join("a.dict.z").exists());
        assert!(!dir.path().join("b.dict").exists());
    }

    #[test]
    fn dict_files_are_recognised_by_name() {
        let name = "UserHistoryDictionary";
        assert!(is_dict_file_of("UserHistoryDictionary.en.dict", name));
        assert!(is_dict_file_of("kbd_UserHistoryDictionary.en_US.me@example.com.dict", name));
        assert!(is_dict_file_of("UserHistoryDictionary.en.dict.tmp", name));
        assert!(!is_dict_file_of("UserHistoryDictionary.dict", name));
        assert!(!is_dict_file_of("UserHistoryDictionary.en.dictionary", name));
        assert!(!is_dict_file_of("UserHistoryDictionary-notes.txt", name));
        assert!(!is_dict_file_of("backup.UserHistoryDictionary.en.dict", name));
        assert!(!is_dict_file_of("user.en.dict", name));
    }

    #[test]
    fn delete_by_predicate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("UserHistoryDictionary.en.dict"), b"").unwrap();
        fs::write(dir.path().join("UserHistoryDictionary.de.dict"), b"").unwrap();
        fs::write(dir.path().join("user.en.dict"), b"").unwrap();
        let n = delete_filtered_files(dir.path(), |name| name.contains("UserHistoryDictionary"))
            .unwrap();
        assert_eq!(n, 2);
        assert!(dir.path().join("user.en.dict").exists());
        assert_eq!(
            delete_filtered_files(&dir.path().join("missing"), |_| true).unwrap(),
            0
        );
    }
}

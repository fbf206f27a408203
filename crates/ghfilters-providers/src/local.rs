//! Local checkout listing.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{ProviderError, ProviderResult};

/// Returns the names of the immediate subdirectories of `dir`, sorted.
///
/// Files and symlinks are skipped. An empty directory yields an empty list;
/// a directory that cannot be read is an error.
pub fn list_local_repos(dir: &Path) -> ProviderResult<Vec<String>> {
    info!("listing repos from {}", dir.display());

    let entries = fs::read_dir(dir).map_err(|e| {
        ProviderError::io(format!("couldn't list contents of {}: {}", dir.display(), e))
            .with_source(e)
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            ProviderError::io(format!("couldn't read entry in {}: {}", dir.display(), e))
                .with_source(e)
        })?;

        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => warn!("skipping non UTF-8 directory name {:?}", raw),
        }
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_directories() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("foo")).unwrap();
        fs::create_dir(tmp.path().join("bar")).unwrap();
        fs::write(tmp.path().join("notes.txt"), "not a repo").unwrap();

        let repos = list_local_repos(tmp.path()).unwrap();
        assert_eq!(repos, vec!["bar", "foo"]);
    }

    #[test]
    fn does_not_descend() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("foo").join("nested")).unwrap();

        assert_eq!(list_local_repos(tmp.path()).unwrap(), vec!["foo"]);
    }

    #[test]
    fn empty_directory_is_empty_list() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(list_local_repos(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = list_local_repos(&tmp.path().join("github")).unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::Io);
        assert!(err.message().contains("couldn't list contents"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(target.path(), tmp.path().join("linked")).unwrap();
        fs::create_dir(tmp.path().join("real")).unwrap();

        assert_eq!(list_local_repos(tmp.path()).unwrap(), vec!["real"]);
    }
}

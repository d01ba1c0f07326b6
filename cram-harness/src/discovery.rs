//! Discovery of test files.

use crate::error::Error;
use crate::util;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Extension identifying test files.
pub const TEST_EXTENSION: &str = ".t";

/// Returns whether a file name names a test: it must end in `.t` and must not
/// be hidden.
pub fn is_test_name(name: &str) -> bool {
    !name.starts_with('.') && name.ends_with(TEST_EXTENSION)
}

/// Finds the tests named by the given paths, in order.
///
/// Directories are walked recursively, visiting entries in sorted order and
/// skipping hidden directories below the named root. Named files are included
/// if they look like tests. Paths are normalized lexically and each test is
/// listed once.
pub fn find_tests<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PathBuf>, Error> {
    let mut seen = HashSet::new();
    let mut tests = vec![];

    for root in paths {
        let root = root.as_ref();
        if !root.exists() {
            return Err(Error::NoSuchFile(root.to_path_buf()));
        }

        for path in tests_under(root)? {
            if seen.insert(path.clone()) {
                tests.push(path);
            } else {
                tracing::debug!(target: "discovery", "skipping duplicate test {}", path.display());
            }
        }
    }

    Ok(tests)
}

fn tests_under(root: &Path) -> Result<Vec<PathBuf>, Error> {
    if !root.is_dir() {
        let is_test = root
            .file_name()
            .is_some_and(|name| is_test_name(&name.to_string_lossy()));

        return Ok(if is_test {
            vec![util::normalize_path(root)]
        } else {
            tracing::debug!(target: "discovery", "ignoring non-test file {}", root.display());
            vec![]
        });
    }

    let walker = walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !entry.file_name().to_string_lossy().starts_with('.')
        });

    let mut tests = vec![];
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }

        if is_test_name(&entry.file_name().to_string_lossy()) {
            tracing::debug!(target: "discovery", "found test {}", entry.path().display());
            tests.push(util::normalize_path(entry.path()));
        }
    }

    Ok(tests)
}

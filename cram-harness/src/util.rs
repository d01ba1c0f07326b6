//! Utility functions for the test harness.

use std::path::{Component, Path, PathBuf};

/// Decodes raw bytes as text, replacing invalid UTF-8 and translating `\r\n`
/// and bare `\r` line endings to `\n`.
pub fn normalize_newlines(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if !text.contains('\r') {
        return text.into_owned();
    }

    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Splits text into lines, keeping each line's terminating newline. A final
/// unterminated line is kept as-is.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(ToOwned::to_owned).collect()
}

/// Lexically normalizes a path: `.` components are dropped and `..` components
/// cancel out the preceding component where there is one. The file system is
/// never consulted.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                if depth > 0 {
                    result.pop();
                    depth -= 1;
                } else if !result.has_root() {
                    result.push("..");
                }
            }
            Component::Normal(name) => {
                result.push(name);
                depth += 1;
            }
            Component::RootDir | Component::Prefix(_) => result.push(component.as_os_str()),
        }
    }

    if result.as_os_str().is_empty() {
        result.push(".");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn newline_normalization() {
        assert_eq!(normalize_newlines(b"a\r\nb\rc\n"), "a\nb\nc\n");
        assert_eq!(normalize_newlines(b"plain\n"), "plain\n");
        assert_eq!(normalize_newlines(b"bad \xff byte"), "bad \u{fffd} byte");
    }

    #[test]
    fn line_splitting() {
        assert_eq!(split_lines("a\nb\n"), ["a\n", "b\n"]);
        assert_eq!(split_lines("a\n\nb"), ["a\n", "\n", "b"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn path_normalization() {
        let cases = [
            ("tests/./a.t", "tests/a.t"),
            ("./a.t", "a.t"),
            ("tests/sub/../a.t", "tests/a.t"),
            ("../a.t", "../a.t"),
            ("/../a.t", "/a.t"),
            ("tests//a.t", "tests/a.t"),
            (".", "."),
            ("sub/..", "."),
        ];

        for (input, expected) in cases {
            assert_eq!(
                normalize_path(Path::new(input)),
                PathBuf::from(expected),
                "{input}"
            );
        }
    }
}

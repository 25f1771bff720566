//! Line-oriented tool outputs: prettier, git status, pycodestyle, isort, black.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::finding::{relative_path, Finding};

/// `prettier --list-different`: one mal-formatted file per line.
pub fn prettier<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<Finding> {
    lines
        .into_iter()
        .map(|file| Finding::error("Mal-formatted file", "Prettier: Code style issue").with_file(file))
        .collect()
}

/// `git status -s`: every line is an uncommitted change.
pub fn git_status<'a>(lines: impl IntoIterator<Item = &'a str>, title: &str) -> Vec<Finding> {
    lines
        .into_iter()
        .map(|line| Finding::error(format!("Unclean git : {line}"), title))
        .collect()
}

fn pycodestyle_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<file>.+?):(?P<line>\d+):(?P<col>\d+): (?P<code>[A-Z]\d+) (?P<message>.*)$")
            .expect("pycodestyle pattern is valid")
    })
}

/// `pycodestyle`: `path:line:col: CODE message`.
///
/// Lines that do not match (source excerpts with `--show-source`, statistics)
/// are kept as plain log lines.
pub fn pycodestyle<'a>(lines: impl IntoIterator<Item = &'a str>, base: &Path) -> Vec<Finding> {
    lines
        .into_iter()
        .map(|line| match pycodestyle_pattern().captures(line) {
            Some(caps) => Finding::error(&caps["message"], format!("Pycodestyle: {}", &caps["code"]))
                .with_file(relative_path(base, &caps["file"]))
                .with_position(caps["line"].parse().ok(), caps["col"].parse().ok()),
            None => Finding::info(line),
        })
        .collect()
}

/// `isort --check-only`: `ERROR: <path> <message>` per badly sorted file.
pub fn isort<'a>(lines: impl IntoIterator<Item = &'a str>, base: &Path) -> Vec<Finding> {
    lines
        .into_iter()
        .filter_map(|line| line.strip_prefix("ERROR: "))
        .map(|rest| {
            let (file, message) = rest.split_once(' ').unwrap_or((rest, "Imports are incorrectly sorted"));
            Finding::error(message, "Isort: Import order").with_file(relative_path(base, file))
        })
        .collect()
}

/// `black --check`: `would reformat <path>` per mal-formatted file.
pub fn black<'a>(lines: impl IntoIterator<Item = &'a str>, base: &Path) -> Vec<Finding> {
    lines
        .into_iter()
        .filter_map(|line| line.strip_prefix("would reformat "))
        .map(|file| {
            Finding::error("Mal-formatted file", "Black: Code style issue")
                .with_file(relative_path(base, file.trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ywci_core::Level;

    #[test]
    fn test_prettier_one_error_per_file() {
        let findings = prettier(["src/a.ts", "README.md"]);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[1].props.file.as_deref(), Some("README.md"));
        assert_eq!(findings[1].props.title.as_deref(), Some("Prettier: Code style issue"));
    }

    #[test]
    fn test_git_status_lines() {
        let findings = git_status([" M src/a.ts", "?? new.txt"], "Build: git cleanness");
        assert_eq!(findings[0].message, "Unclean git :  M src/a.ts");
        assert_eq!(findings[1].props.title.as_deref(), Some("Build: git cleanness"));
    }

    #[test]
    fn test_pycodestyle() {
        let base = Path::new("/src/py-youwol");
        let findings = pycodestyle(
            [
                "./src/youwol/app.py:12:80: E501 line too long (88 > 79 characters)",
                "/src/py-youwol/src/youwol/x.py:3:1: W391 blank line at end of file",
                "1       E501 line too long",
            ],
            base,
        );
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].message, "line too long (88 > 79 characters)");
        assert_eq!(findings[0].props.title.as_deref(), Some("Pycodestyle: E501"));
        assert_eq!(findings[0].props.file.as_deref(), Some("src/youwol/app.py"));
        assert_eq!(findings[0].props.start_line, Some(12));
        assert_eq!(findings[0].props.start_column, Some(80));
        assert_eq!(findings[1].props.file.as_deref(), Some("src/youwol/x.py"));
        assert_eq!(findings[2].level, Level::Info);
    }

    #[test]
    fn test_isort() {
        let base = Path::new("/work");
        let findings = isort(
            [
                "ERROR: /work/src/a.py Imports are incorrectly sorted and/or formatted.",
                "Skipped 2 files",
            ],
            base,
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].props.file.as_deref(), Some("src/a.py"));
        assert_eq!(
            findings[0].message,
            "Imports are incorrectly sorted and/or formatted."
        );
    }

    #[test]
    fn test_black() {
        let base = Path::new("/work");
        let findings = black(
            [
                "would reformat /work/src/b.py",
                "Oh no! 💥 💔 💥",
                "1 file would be reformatted, 12 files would be left unchanged.",
            ],
            base,
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].props.file.as_deref(), Some("src/b.py"));
        assert_eq!(findings[0].props.title.as_deref(), Some("Black: Code style issue"));
    }
}

//! File resolution for the scanner constructor (spec.md §4.I step 1):
//! locating the `.synctex`/`.synctex.gz` sibling of an output file, with the
//! quoting convention legacy pdfTeX 1.40.9 used for path components
//! containing spaces (spec.md §6.4).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Wrap the last path component in double quotes if it contains a space,
/// the way pdfTeX 1.40.9 quoted `\jobname` before writing it into a
/// `.synctex` path. A no-op for components without a space.
pub fn quote_last_component(path: &Path) -> PathBuf {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return path.to_path_buf();
    };
    if !name.contains(' ') || (name.starts_with('"') && name.ends_with('"')) {
        return path.to_path_buf();
    }
    path.with_file_name(format!("\"{name}\""))
}

/// Strip a surrounding pair of double quotes from the last path component,
/// if present.
pub fn unquote_last_component(path: &Path) -> PathBuf {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return path.to_path_buf();
    };
    if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
        path.with_file_name(&name[1..name.len() - 1])
    } else {
        path.to_path_buf()
    }
}

/// Case-insensitive on Windows/OS2, byte-identical elsewhere (spec.md §6.4,
/// `SYNCTEX_ARE_PATH_CHARACTERS_EQUAL`).
pub fn names_match(a: &str, b: &str) -> bool {
    if cfg!(windows) {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

fn candidate_paths(output: &Path) -> Vec<PathBuf> {
    let synctex = output.with_extension("synctex");
    let synctex_gz = output.with_extension("synctex.gz");
    vec![quote_last_component(&synctex), synctex.clone(), quote_last_component(&synctex_gz), synctex_gz]
}

/// Locate the `.synctex`/`.synctex.gz` file for `output`, trying
/// `build_directory` as a fallback when the natural location has nothing.
/// Renames a quoted match to its unquoted form when that succeeds (spec.md
/// §4.I step 1), best-effort: a rename failure is not itself fatal.
pub fn resolve_synctex_path(output: &Path, build_directory: Option<&Path>) -> Option<PathBuf> {
    for candidate in candidate_paths(output) {
        if let Some(found) = try_candidate(&candidate) {
            return Some(found);
        }
    }
    if let Some(dir) = build_directory {
        let Some(basename) = output.file_name() else { return None };
        let relocated = dir.join(basename);
        for candidate in candidate_paths(&relocated) {
            if let Some(found) = try_candidate(&candidate) {
                return Some(found);
            }
        }
    }
    None
}

fn try_candidate(path: &Path) -> Option<PathBuf> {
    if !path.exists() {
        return None;
    }
    debug!(path = %path.display(), "found synctex file");
    let is_quoted = path.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with('"')).unwrap_or(false);
    if is_quoted {
        let unquoted = unquote_last_component(path);
        if fs::rename(path, &unquoted).is_ok() {
            debug!(from = %path.display(), to = %unquoted.display(), "renamed quoted synctex file");
            return Some(unquoted);
        }
    }
    Some(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn quote_wraps_only_when_space_present() {
        assert_eq!(quote_last_component(Path::new("/tmp/my file.synctex")), PathBuf::from("/tmp/\"my file.synctex\""));
        assert_eq!(quote_last_component(Path::new("/tmp/plain.synctex")), PathBuf::from("/tmp/plain.synctex"));
    }

    #[test]
    fn unquote_strips_surrounding_quotes() {
        assert_eq!(unquote_last_component(Path::new("/tmp/\"my file.synctex\"")), PathBuf::from("/tmp/my file.synctex"));
    }

    #[test]
    fn names_match_is_byte_identical_on_non_windows() {
        if !cfg!(windows) {
            assert!(!names_match("Foo.tex", "foo.tex"));
        }
    }
}

//! Environment variable handling.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

/// Module search path extended for the stub tool
pub const MODULE_SEARCH_PATH_VAR: &str = "PYTHONPATH";

// Helper for boolean environment variables that accept "1", "true", "yes"
fn is_enabled(var: &str) -> bool {
    env::var(var).ok().is_some_and(|s| parse_enabled(&s))
}

fn parse_enabled(value: &str) -> bool {
    let s = value.to_lowercase();
    s == "1" || s == "true" || s == "yes"
}

// extbuild configuration

/// Get config file path override (`EXTBUILD_CONFIG`).
pub fn extbuild_config() -> Option<String> {
    env::var("EXTBUILD_CONFIG").ok()
}

/// Get parallel job override (`EXTBUILD_JOBS`).
pub fn extbuild_jobs() -> Option<usize> {
    env::var("EXTBUILD_JOBS")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|&n| n > 0)
}

/// Check if cached fingerprints should be ignored (`EXTBUILD_FORCE`).
pub fn extbuild_force() -> bool {
    is_enabled("EXTBUILD_FORCE")
}

/// Get stub generator command override (`EXTBUILD_STUBGEN`).
pub fn extbuild_stubgen() -> Option<String> {
    env::var("EXTBUILD_STUBGEN").ok().filter(|s| !s.is_empty())
}

// Build tool configuration
// CMAKE, PYTHON, CC, CXX, CFLAGS, CXXFLAGS, LDFLAGS

/// Get `CMake` executable override.
pub fn cmake() -> Option<String> {
    env::var("CMAKE").ok().filter(|s| !s.is_empty())
}

/// Get Python interpreter passed to `CMake` as `PYTHON_EXECUTABLE`.
pub fn python() -> Option<String> {
    env::var("PYTHON").ok().filter(|s| !s.is_empty())
}

/// Get C compiler (useful for cross-compilation).
pub fn cc() -> Option<String> {
    env::var("CC").ok()
}

/// Get C++ compiler (useful for cross-compilation).
pub fn cxx() -> Option<String> {
    env::var("CXX").ok()
}

/// Get C compiler flags.
pub fn cflags() -> Option<String> {
    env::var("CFLAGS").ok()
}

/// Get C++ compiler flags.
pub fn cxxflags() -> Option<String> {
    env::var("CXXFLAGS").ok()
}

/// Get linker flags.
pub fn ldflags() -> Option<String> {
    env::var("LDFLAGS").ok()
}

// Module search path

/// Build a `PYTHONPATH` value with `first` ahead of the current entries.
///
/// Falls back to `first` alone if the existing value can't be joined (an entry
/// containing the platform separator).
#[must_use]
pub fn prepend_module_search_path(first: PathBuf) -> OsString {
    let existing = env::var_os(MODULE_SEARCH_PATH_VAR);
    prepend_search_path(first, existing.as_deref())
}

/// Prepend `first` to a search path value
#[must_use]
pub fn prepend_search_path(first: PathBuf, existing: Option<&std::ffi::OsStr>) -> OsString {
    let mut entries = vec![first.clone()];
    if let Some(existing) = existing {
        entries.extend(env::split_paths(existing).filter(|p| !p.as_os_str().is_empty()));
    }

    env::join_paths(entries).unwrap_or_else(|_| first.into_os_string())
}

/// Search `PATH` for an executable named `program`.
///
/// On Windows the `.exe` suffix is tried as well.
#[must_use]
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{program}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Interpreter names tried on `PATH` when `PYTHON` is unset
pub const PYTHON_CANDIDATES: &[&str] = &["python3", "python"];

/// Search `PATH` for a Python interpreter.
#[must_use]
pub fn find_python() -> Option<PathBuf> {
    PYTHON_CANDIDATES
        .iter()
        .find_map(|program| find_in_path(program))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_parsing_true_variants() {
        assert!(parse_enabled("true"));
        assert!(parse_enabled("1"));
        assert!(parse_enabled("yes"));
        assert!(parse_enabled("TRUE"));
        assert!(parse_enabled("YES"));
    }

    #[test]
    fn enabled_parsing_false_variants() {
        assert!(!parse_enabled("false"));
        assert!(!parse_enabled("0"));
        assert!(!parse_enabled("no"));
        assert!(!parse_enabled(""));
    }

    #[test]
    fn prepend_to_empty_search_path() {
        let value = prepend_search_path(PathBuf::from("/proj/src"), None);
        assert_eq!(value, OsString::from("/proj/src"));
    }

    #[test]
    fn prepend_keeps_existing_entries_in_order() {
        let existing = env::join_paths(["/a", "/b"]).unwrap();
        let value = prepend_search_path(PathBuf::from("/proj/src"), Some(&existing));

        let entries: Vec<PathBuf> = env::split_paths(&value).collect();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("/proj/src"),
                PathBuf::from("/a"),
                PathBuf::from("/b")
            ]
        );
    }

    #[test]
    fn prepend_skips_empty_entries() {
        let value = prepend_search_path(PathBuf::from("/proj/src"), Some(std::ffi::OsStr::new("")));
        assert_eq!(value, OsString::from("/proj/src"));
    }

    #[test]
    fn missing_program_not_found() {
        assert!(find_in_path("extbuild-definitely-not-a-real-tool").is_none());
    }
}

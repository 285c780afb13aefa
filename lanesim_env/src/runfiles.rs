//! Runfiles search-path derivation.
//!
//! A script launched from a source tree keeps its runtime dependencies in a
//! companion `*.runfiles` directory under the build output tree. This module
//! derives that directory from the script path and collects it, together
//! with the repositories it contains, into a caller-owned [`SearchPath`].

use crate::error::EnvError;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Build output segment inserted in front of the source root.
pub const BUILD_OUTPUT_DIR: &str = "bazel-bin";

/// Source-tree roots that get mirrored under [`BUILD_OUTPUT_DIR`].
pub const SOURCE_ROOTS: [&str; 2] = ["modules", "python"];

/// Repositories made available inside every runfiles directory, in lookup order.
pub const DEFAULT_REPO_PATHS: [&str; 6] = [
    "bark_project",
    "bark_project/python",
    "benchmark_database",
    "com_github_interaction_dataset_interaction_dataset",
    "com_github_interaction_dataset_interaction_dataset/python",
    "phd",
];

/// Derives the runfiles directory of `script`.
///
/// Relative scripts are resolved against `cwd`. The first directory segment
/// named after a source root gets [`BUILD_OUTPUT_DIR`] inserted in front of
/// it, and a trailing `.py` file becomes `.runfiles`. Paths that match
/// neither rule come back unchanged apart from the `cwd` join.
pub fn runfiles_dir(script: &Path, cwd: &Path) -> PathBuf {
    let components: Vec<Component<'_>> = script.components().collect();
    let last = components.len().saturating_sub(1);

    let mut derived = PathBuf::new();
    let mut inserted = false;

    for (i, component) in components.iter().enumerate() {
        match component {
            Component::Normal(segment) if i == last => {
                let file = Path::new(segment);
                if file.extension() == Some(OsStr::new("py")) {
                    derived.push(file.with_extension("runfiles"));
                } else {
                    derived.push(segment);
                }
            }
            Component::Normal(segment) => {
                if !inserted && SOURCE_ROOTS.iter().any(|root| OsStr::new(root) == *segment) {
                    derived.push(BUILD_OUTPUT_DIR);
                    inserted = true;
                }
                derived.push(segment);
            }
            other => derived.push(other.as_os_str()),
        }
    }

    if derived.is_absolute() {
        derived
    } else {
        cwd.join(derived)
    }
}

/// Ordered, append-only list of search roots.
///
/// Entries are never deduplicated; appending the same root twice leaves two
/// entries, and lookups honor the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    entries: Vec<PathBuf>,
}

impl SearchPath {
    /// Creates an empty search path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a search path from the running process's `argv[0]` and
    /// working directory, using [`DEFAULT_REPO_PATHS`].
    pub fn from_process_args() -> Result<Self, EnvError> {
        let script = std::env::args_os()
            .next()
            .ok_or_else(|| EnvError::missing_script("process has no argv[0]"))?;
        let cwd = std::env::current_dir()?;

        let mut search_path = Self::new();
        search_path.append_runfiles(Path::new(&script), &cwd, &DEFAULT_REPO_PATHS);
        Ok(search_path)
    }

    /// Appends a single entry.
    pub fn append(&mut self, path: impl Into<PathBuf>) {
        self.entries.push(path.into());
    }

    /// Appends the runfiles directory of `script` followed by each of
    /// `repos` joined under it. Returns the runfiles directory.
    pub fn append_runfiles(&mut self, script: &Path, cwd: &Path, repos: &[&str]) -> PathBuf {
        let runfiles = runfiles_dir(script, cwd);
        self.append(runfiles.clone());

        for repo in repos {
            let full_path = runfiles.join(repo);
            info!("adding search path: {}", full_path.display());
            self.append(full_path);
        }

        runfiles
    }

    /// Returns the first `root/relative` that exists on disk.
    pub fn find(&self, relative: impl AsRef<Path>) -> Option<PathBuf> {
        let relative = relative.as_ref();
        self.entries
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.exists())
    }

    /// Returns the entries in lookup order.
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries were appended.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_runfiles_dir_relative_script() {
        let dir = runfiles_dir(Path::new("modules/foo/bar.py"), Path::new("/ws"));
        assert_eq!(dir, PathBuf::from("/ws/bazel-bin/modules/foo/bar.runfiles"));
    }

    #[test]
    fn test_runfiles_dir_python_root() {
        let dir = runfiles_dir(Path::new("python/tests/run.py"), Path::new("/ws"));
        assert_eq!(dir, PathBuf::from("/ws/bazel-bin/python/tests/run.runfiles"));
    }

    #[test]
    fn test_runfiles_dir_absolute_script_ignores_cwd() {
        let dir = runfiles_dir(Path::new("/repo/modules/a.py"), Path::new("/elsewhere"));
        assert_eq!(dir, PathBuf::from("/repo/bazel-bin/modules/a.runfiles"));
    }

    #[test]
    fn test_runfiles_dir_unmatched_passes_through() {
        let dir = runfiles_dir(Path::new("tools/debug/run.sh"), Path::new("/ws"));
        assert_eq!(dir, PathBuf::from("/ws/tools/debug/run.sh"));
    }

    #[test]
    fn test_runfiles_dir_only_matches_whole_segments() {
        // "my_modules" contains the substring but is not the source root
        let dir = runfiles_dir(Path::new("my_modules/x.py"), Path::new("/ws"));
        assert_eq!(dir, PathBuf::from("/ws/my_modules/x.runfiles"));
    }

    #[test]
    fn test_runfiles_dir_cwd_segments_untouched() {
        let dir = runfiles_dir(Path::new("modules/x.py"), Path::new("/home/modules"));
        assert_eq!(dir, PathBuf::from("/home/modules/bazel-bin/modules/x.runfiles"));
    }

    #[test]
    fn test_search_path_order() {
        let mut search_path = SearchPath::new();
        let runfiles = search_path.append_runfiles(
            Path::new("modules/foo/bar.py"),
            Path::new("/ws"),
            &DEFAULT_REPO_PATHS,
        );

        assert_eq!(search_path.len(), 1 + DEFAULT_REPO_PATHS.len());
        assert_eq!(search_path.entries()[0], runfiles);
        for (entry, repo) in search_path.entries()[1..].iter().zip(DEFAULT_REPO_PATHS) {
            assert_eq!(*entry, runfiles.join(repo));
        }
        assert_eq!(
            search_path.entries()[2],
            PathBuf::from("/ws/bazel-bin/modules/foo/bar.runfiles/bark_project/python")
        );
    }

    #[test]
    fn test_search_path_keeps_duplicates() {
        let mut search_path = SearchPath::new();
        let script = Path::new("modules/foo/bar.py");
        search_path.append_runfiles(script, Path::new("/ws"), &DEFAULT_REPO_PATHS);
        search_path.append_runfiles(script, Path::new("/ws"), &DEFAULT_REPO_PATHS);

        let n = 1 + DEFAULT_REPO_PATHS.len();
        assert_eq!(search_path.len(), 2 * n);
        assert_eq!(search_path.entries()[..n], search_path.entries()[n..]);
    }

    #[test]
    fn test_search_path_find_first_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let second = root.join("second");
        std::fs::create_dir_all(&second).unwrap();
        std::fs::write(second.join("map.json"), "{}").unwrap();

        let mut search_path = SearchPath::new();
        search_path.append(root.join("first"));
        search_path.append(second.clone());

        assert_eq!(search_path.find("map.json"), Some(second.join("map.json")));
        assert_eq!(search_path.find("missing.json"), None);
    }

    proptest! {
        #[test]
        fn prop_runfiles_dir_replaces_suffix(
            prefix in prop::collection::vec("[a-z]{1,8}", 0..3),
            middle in prop::collection::vec("[a-z]{1,8}", 0..3),
            stem in "[a-z]{1,8}",
        ) {
            prop_assume!(prefix.iter().chain(middle.iter()).all(|s| s != "modules" && s != "python"));

            let mut script = PathBuf::new();
            for segment in &prefix {
                script.push(segment);
            }
            script.push("modules");
            for segment in &middle {
                script.push(segment);
            }
            script.push(format!("{stem}.py"));

            let dir = runfiles_dir(&script, Path::new("/ws"));
            let mut expected = PathBuf::from("/ws");
            for segment in &prefix {
                expected.push(segment);
            }
            expected.push("bazel-bin");
            expected.push("modules");
            for segment in &middle {
                expected.push(segment);
            }
            expected.push(format!("{stem}.runfiles"));

            prop_assert_eq!(&dir, &expected);
            prop_assert_ne!(dir.extension(), Some(OsStr::new("py")));
        }
    }
}

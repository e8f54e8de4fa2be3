//! Where GLM sample files live, and scratch directories for written ones.

use std::path::{Path, PathBuf};

/// Environment variable naming an extra directory of GLM samples.
pub const DATA_DIR_VAR: &str = "TEST_DATA_DIR";

/// The workspace root, two levels above `crates/test-utils`.
pub fn workspace_root() -> PathBuf {
    let here = Path::new(env!("CARGO_MANIFEST_DIR"));
    here.ancestors()
        .nth(2)
        .map_or_else(|| here.to_path_buf(), Path::to_path_buf)
}

/// Directories searched for sample files, most specific first:
/// `$TEST_DATA_DIR`, `crates/glm-reader/testdata`, then `testdata/` and
/// `data/` under the workspace root.
pub fn sample_dirs() -> Vec<PathBuf> {
    let root = workspace_root();
    std::env::var_os(DATA_DIR_VAR)
        .map(PathBuf::from)
        .into_iter()
        .chain([
            root.join("crates").join("glm-reader").join("testdata"),
            root.join("testdata"),
            root.join("data"),
        ])
        .collect()
}

/// First existing `name` in [`sample_dirs`].
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    sample_dirs()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Scratch directory for fixture files, removed on drop.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("glm_fixture_")
        .tempdir()
        .expect("create scratch directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_has_manifest() {
        let root = workspace_root();
        assert!(root.join("Cargo.toml").exists(), "{}", root.display());
        assert!(root.join("crates").join("glm-reader").is_dir());
    }

    #[test]
    fn test_sample_dirs_end_with_workspace_data() {
        let dirs = sample_dirs();
        assert!(dirs.last().unwrap().ends_with("data"));
        assert!(dirs.iter().any(|d| d.ends_with("crates/glm-reader/testdata")));
    }

    #[test]
    fn test_missing_sample_is_none() {
        assert_eq!(find_test_file("OR_GLM-L2-LCFA_no_such_granule.nc"), None);
    }

    #[test]
    fn test_scratch_dir_is_removed_on_drop() {
        let dir = temp_test_dir();
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path.to_string_lossy().contains("glm_fixture_"));
        drop(dir);
        assert!(!path.exists());
    }
}

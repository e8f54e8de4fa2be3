//! Shared test support for the glm-reader workspace.
//!
//! Synthetic GLM files are written with [`GlmFixture`] into a
//! [`temp_test_dir`]; real granules are optional and found through
//! [`find_test_file`].
//!
//! ```ignore
//! use test_utils::{GlmFixture, temp_test_dir};
//!
//! let dir = temp_test_dir();
//! let path = GlmFixture::five_events().write_in(dir.path(), "five.nc");
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Resolve a sample granule or return from the calling test.
///
/// Real GLM files are large and not checked in, so tests that need one
/// are skipped (with a note on stderr) rather than failed.
///
/// ```ignore
/// let path = require_test_file!(test_utils::REFERENCE_FILE);
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        let name: &str = $name;
        match $crate::find_test_file(name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "skipping: GLM sample '{}' not found (set {} to its directory)",
                    name,
                    $crate::DATA_DIR_VAR
                );
                return;
            }
        }
    }};
}

/// Assert two numbers are within `tolerance`, comparing as f64.
///
/// Takes f32 and f64 alike, since packed GLM variables are stored as f32
/// and decoded to f64.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let (left, right, tolerance) = ($left as f64, $right as f64, $tolerance as f64);
        let diff = (left - right).abs();
        assert!(
            diff <= tolerance,
            "values differ by {} (tolerance {}): left {}, right {}",
            diff,
            tolerance,
            left,
            right
        );
    }};
}

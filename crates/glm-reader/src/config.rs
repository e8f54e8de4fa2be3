//! Configuration for the GLM reader.

use serde::{Deserialize, Serialize};

use crate::error::{GlmError, GlmResult};
use crate::linkage::DanglingPolicy;

/// Configuration for opening and decoding GLM files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Handling of child records whose parent id does not resolve.
    pub dangling_policy: DanglingPolicy,

    /// Require the auxiliary bounds dimensions to have extent 2.
    pub strict_bounds: bool,

    /// Turn `_FillValue` entries of float columns into NaN.
    pub mask_fill_values: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            dangling_policy: DanglingPolicy::Fail,
            strict_bounds: true,
            mask_fill_values: true,
        }
    }
}

impl ReaderConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognizes `GLM_DANGLING_POLICY`, `GLM_STRICT_BOUNDS` and
    /// `GLM_MASK_FILL_VALUES`; unset variables keep their defaults.
    pub fn from_env() -> GlmResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ReaderConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> GlmResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("GLM_DANGLING_POLICY") {
            config.dangling_policy = val
                .parse()
                .map_err(|e| GlmError::Config(format!("GLM_DANGLING_POLICY: {}", e)))?;
        }

        if let Some(val) = lookup("GLM_STRICT_BOUNDS") {
            config.strict_bounds = parse_flag("GLM_STRICT_BOUNDS", &val)?;
        }

        if let Some(val) = lookup("GLM_MASK_FILL_VALUES") {
            config.mask_fill_values = parse_flag("GLM_MASK_FILL_VALUES", &val)?;
        }

        Ok(config)
    }

    pub fn with_dangling_policy(mut self, policy: DanglingPolicy) -> Self {
        self.dangling_policy = policy;
        self
    }

    pub fn with_strict_bounds(mut self, strict: bool) -> Self {
        self.strict_bounds = strict;
        self
    }

    pub fn with_mask_fill_values(mut self, mask: bool) -> Self {
        self.mask_fill_values = mask;
        self
    }
}

fn parse_flag(key: &str, val: &str) -> GlmResult<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(GlmError::Config(format!(
            "{}: expected a boolean, got '{}'",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(config.dangling_policy, DanglingPolicy::Fail);
        assert!(config.strict_bounds);
        assert!(config.mask_fill_values);
    }

    #[test]
    fn test_overrides() {
        let config = ReaderConfig::from_lookup(lookup(&[
            ("GLM_DANGLING_POLICY", "drop"),
            ("GLM_STRICT_BOUNDS", "0"),
            ("GLM_MASK_FILL_VALUES", "False"),
        ]))
        .unwrap();
        assert_eq!(config.dangling_policy, DanglingPolicy::Drop);
        assert!(!config.strict_bounds);
        assert!(!config.mask_fill_values);
    }

    #[test]
    fn test_bad_values_are_config_errors() {
        let err = ReaderConfig::from_lookup(lookup(&[("GLM_DANGLING_POLICY", "ignore")]))
            .unwrap_err();
        assert!(matches!(err, GlmError::Config(_)));

        let err = ReaderConfig::from_lookup(lookup(&[("GLM_STRICT_BOUNDS", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("GLM_STRICT_BOUNDS"));
    }
}

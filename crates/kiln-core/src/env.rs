//! Build environment variables.
//!
//! The production profile is a pure function of these values; they are read
//! from the process environment exactly once, at startup.

/// Environment variable selecting the profile / output subdirectory.
pub const NODE_ENV: &str = "NODE_ENV";

/// Environment variable enabling the bundle-size report.
pub const ANALYZE: &str = "ANALYZE";

/// Environment inputs to profile assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnv {
    /// Value of `NODE_ENV`; names the output subdirectory of production
    /// builds and enables source maps for `staging`.
    pub node_env: String,

    /// True iff `ANALYZE` is exactly `"true"`.
    pub analyze: bool,
}

impl BuildEnv {
    /// Read the build environment from process environment variables.
    ///
    /// `NODE_ENV` defaults to `production` when unset or empty.
    #[must_use]
    pub fn from_env() -> Self {
        let node_env = std::env::var(NODE_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "production".to_string());
        let analyze = std::env::var(ANALYZE).as_deref() == Ok("true");

        Self { node_env, analyze }
    }

    /// Construct from explicit values (used by tests and CLI overrides).
    #[must_use]
    pub fn new(node_env: impl Into<String>, analyze: bool) -> Self {
        Self {
            node_env: node_env.into(),
            analyze,
        }
    }

    /// Whether this environment emits source maps (staging only).
    #[must_use]
    pub fn source_maps(&self) -> bool {
        self.node_env == "staging"
    }
}

impl Default for BuildEnv {
    fn default() -> Self {
        Self::new("production", false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        std::env::remove_var(NODE_ENV);
        std::env::remove_var(ANALYZE);

        let env = BuildEnv::from_env();
        assert_eq!(env.node_env, "production");
        assert!(!env.analyze);
    }

    #[test]
    #[serial]
    fn test_from_env_reads_node_env() {
        std::env::set_var(NODE_ENV, "staging");
        std::env::remove_var(ANALYZE);

        let env = BuildEnv::from_env();
        assert_eq!(env.node_env, "staging");
        assert!(env.source_maps());

        std::env::remove_var(NODE_ENV);
    }

    #[test]
    #[serial]
    fn test_analyze_requires_exact_true() {
        std::env::remove_var(NODE_ENV);

        for (value, expected) in [("true", true), ("TRUE", false), ("1", false), ("", false)] {
            std::env::set_var(ANALYZE, value);
            assert_eq!(BuildEnv::from_env().analyze, expected, "ANALYZE={value}");
        }

        std::env::remove_var(ANALYZE);
    }

    #[test]
    fn test_source_maps_only_for_staging() {
        assert!(BuildEnv::new("staging", false).source_maps());
        assert!(!BuildEnv::new("production", false).source_maps());
        assert!(!BuildEnv::new("qa", false).source_maps());
    }
}

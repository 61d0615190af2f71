use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("kiln {VERSION}");

    if let Some(hash) = option_env!("KILN_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_not_empty() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_version_string_contains_version() {
        let vs = version_string();
        assert!(vs.contains(VERSION));
        assert!(vs.starts_with("kiln "));
    }
}

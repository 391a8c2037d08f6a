//! Package-level constants and record defaults.

/// Current version of the archive (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "wabun";

/// Separator between paragraphs in record text.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Intent stamped on interactions registered without one.
pub const DEFAULT_INTENT: &str = "unspecified";

/// Project stamped on interactions registered without one.
pub const DEFAULT_PROJECT: &str = "General";

/// Document type for decrees registered without one.
pub const DEFAULT_DOC_TYPE: &str = "Protocolo";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_semver() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert_eq!(parts.len(), 3, "VERSION must be semver (MAJOR.MINOR.PATCH)");
        for part in parts {
            let _: u32 = part.parse().expect("each semver segment must be a number");
        }
    }

    #[test]
    fn name_is_lowercase() {
        assert_eq!(NAME, NAME.to_lowercase());
    }
}

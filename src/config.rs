//! Store configuration
//!
//! All behavioral thresholds of the pattern store live in [`StoreConfig`],
//! injected at construction. The defaults mirror the values the extraction
//! pipeline was tuned with; none of them is a contractual constant.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable thresholds for the pattern store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Minimum cosine similarity for a hint to be considered usable
    pub similarity_threshold: f64,

    /// Minimum stored confidence for a hint to be considered usable
    pub confidence_threshold: f64,

    /// Maximum |expected - actual| confidence gap before an observation
    /// counts as a divergence
    pub divergence_tolerance: f64,

    /// Number of divergences that permanently deprecates a pattern
    pub deprecation_threshold: u32,

    /// Similarity below this floor returns no hint at all. Matches above it
    /// but below `similarity_threshold` still come back as a hint with
    /// `should_use == false`, so weak matches stay observable.
    pub similarity_noise_floor: f64,

    /// Maximum connections in the SQLite pool
    pub pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            confidence_threshold: 0.6,
            divergence_tolerance: 0.3,
            deprecation_threshold: 3,
            similarity_noise_floor: 0.5,
            pool_size: 8,
        }
    }
}

impl StoreConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// absent fields.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let cfg: StoreConfig = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations that would make the store misbehave silently.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("similarity_threshold", self.similarity_threshold),
            ("confidence_threshold", self.confidence_threshold),
            ("divergence_tolerance", self.divergence_tolerance),
            ("similarity_noise_floor", self.similarity_noise_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(crate::error::PrecedenteError::Validation(format!(
                    "{} must be in [0.0, 1.0], got {}",
                    name, value
                )));
            }
        }
        if self.deprecation_threshold == 0 {
            return Err(crate::error::PrecedenteError::Validation(
                "deprecation_threshold must be at least 1".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(crate::error::PrecedenteError::Validation(
                "pool_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.similarity_threshold, 0.85);
        assert_eq!(cfg.confidence_threshold, 0.6);
        assert_eq!(cfg.divergence_tolerance, 0.3);
        assert_eq!(cfg.deprecation_threshold, 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let cfg = StoreConfig {
            similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = StoreConfig {
            deprecation_threshold: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_file_partial_overrides() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "similarity_threshold = 0.9").unwrap();
        writeln!(file, "deprecation_threshold = 5").unwrap();
        file.flush().unwrap();

        let cfg = StoreConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.similarity_threshold, 0.9);
        assert_eq!(cfg.deprecation_threshold, 5);
        // untouched fields keep their defaults
        assert_eq!(cfg.confidence_threshold, 0.6);
    }
}

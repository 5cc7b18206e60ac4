//! Run configuration
//!
//! One YAML file with three sections, all optional:
//!
//! ```yaml
//! storage:
//!   aws_access_key_id: AKIA...
//!   aws_secret_access_key: "..."
//!   region: us-west-2
//! locations:
//!   input_url: "s3://songlake-raw/"
//!   output_url: "s3://songlake-warehouse/"
//! pipeline:
//!   songplay_join: inner
//! ```
//!
//! Credentials left unset fall back to the standard `AWS_*` environment
//! variables picked up by the store builder.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete run configuration loaded from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LakeConfig {
    /// Object storage credentials and endpoint overrides
    #[serde(default)]
    pub storage: StorageConfig,

    /// Input and output dataset roots
    #[serde(default)]
    pub locations: Locations,

    /// Pipeline behavior knobs
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl LakeConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "Failed to read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Object storage credentials, per run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Access key id; falls back to `AWS_ACCESS_KEY_ID`
    #[serde(default)]
    pub aws_access_key_id: Option<String>,

    /// Secret access key; falls back to `AWS_SECRET_ACCESS_KEY`
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,

    /// Bucket region; falls back to `AWS_REGION`
    #[serde(default)]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint (MinIO, R2, ...)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Allow plain-HTTP endpoints. Only sensible for local test stacks.
    #[serde(default)]
    pub allow_http: bool,
}

// ============================================================================
// Locations
// ============================================================================

/// The two dataset roots of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locations {
    /// Root holding `song_data/` and `log_data/`
    #[serde(default = "default_input_url")]
    pub input_url: String,

    /// Root the five output tables are written under
    #[serde(default = "default_output_url")]
    pub output_url: String,
}

impl Default for Locations {
    fn default() -> Self {
        Self {
            input_url: default_input_url(),
            output_url: default_output_url(),
        }
    }
}

fn default_input_url() -> String {
    "s3://songlake-raw/".to_string()
}

fn default_output_url() -> String {
    "s3://songlake-warehouse/".to_string()
}

// ============================================================================
// Pipeline
// ============================================================================

/// Pipeline behavior knobs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How play events are matched against the song catalog
    #[serde(default)]
    pub songplay_join: JoinPolicy,
}

/// Join policy for matching play events against the song catalog.
///
/// `inner` drops events with no catalog match; `left` keeps them with null
/// `song_id`/`artist_id` and logs how many failed to match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    #[default]
    Inner,
    Left,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
locations:
  input_url: "s3://raw-bucket/"
  output_url: "s3://warehouse-bucket/lake/"
"#;

        let config: LakeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.locations.input_url, "s3://raw-bucket/");
        assert_eq!(config.locations.output_url, "s3://warehouse-bucket/lake/");
        assert_eq!(config.pipeline.songplay_join, JoinPolicy::Inner);
        assert!(config.storage.aws_access_key_id.is_none());
    }

    #[test]
    fn test_parse_storage_section() {
        let yaml = r#"
storage:
  aws_access_key_id: AKIAEXAMPLE
  aws_secret_access_key: secret
  region: eu-central-1
  endpoint: "http://localhost:9000"
  allow_http: true
"#;

        let config: LakeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.storage.aws_access_key_id.as_deref(),
            Some("AKIAEXAMPLE")
        );
        assert_eq!(config.storage.region.as_deref(), Some("eu-central-1"));
        assert!(config.storage.allow_http);
    }

    #[test]
    fn test_parse_join_policy() {
        let yaml = r#"
pipeline:
  songplay_join: left
"#;

        let config: LakeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pipeline.songplay_join, JoinPolicy::Left);
    }

    #[test]
    fn test_default_config() {
        let config = LakeConfig::default();
        assert_eq!(config.locations.input_url, "s3://songlake-raw/");
        assert_eq!(config.locations.output_url, "s3://songlake-warehouse/");
        assert_eq!(config.pipeline.songplay_join, JoinPolicy::Inner);
        assert!(!config.storage.allow_http);
    }
}

//! Configuration for the cloud JSON store.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`StoreConfig`] struct.  Credentials, bucket and endpoint are the only
//! required fields; everything else carries a default.

use serde::Deserialize;
use std::path::Path;

/// Read-only store configuration shared by every operation.
///
/// The bridge holds no mutable state beyond this struct, so a single
/// instance may be shared freely across threads.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Endpoint base URL, e.g. `http://s3.amazonaws.com`.
    pub base_url: String,

    /// Access key identifying the caller.
    pub access_key: String,

    /// Secret key used for request signing.
    pub secret_key: String,

    /// Target bucket name.
    pub bucket: String,

    /// Signing realm: `aws`, `google`, or any literal header prefix.
    #[serde(default = "default_realm")]
    pub realm: String,

    /// Write the virtual-hosted `Host` header (`<bucket>.<endpoint host>`)
    /// explicitly on every request.  Replaces the process-wide
    /// restricted-headers switch some HTTP stacks require for this.
    #[serde(default = "default_true")]
    pub set_host_header: bool,

    /// Connect timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub read_timeout_secs: u64,
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_realm() -> String {
    "aws".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<StoreConfig> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: StoreConfig = serde_yaml::from_str(&contents)?;
    Ok(config)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_yaml_applies_defaults() {
        let yaml = r#"
base_url: "http://s3.amazonaws.com"
access_key: "AKID"
secret_key: "secret"
bucket: "mybucket"
"#;
        let config: StoreConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.realm, "aws");
        assert!(config.set_host_header);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.read_timeout_secs, 10);
    }

    #[test]
    fn test_full_yaml_overrides() {
        let yaml = r#"
base_url: "http://storage.googleapis.com"
access_key: "GOOGKEY"
secret_key: "secret"
bucket: "records"
realm: "google"
set_host_header: false
connect_timeout_secs: 5
read_timeout_secs: 30
"#;
        let config: StoreConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.realm, "google");
        assert!(!config.set_host_header);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.read_timeout_secs, 30);
    }

    #[test]
    fn test_missing_required_field_is_error() {
        let yaml = r#"
base_url: "http://s3.amazonaws.com"
access_key: "AKID"
"#;
        assert!(serde_yaml::from_str::<StoreConfig>(yaml).is_err());
    }
}

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Behavior switches for a [`crate::session::Session`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    /// Delete of an object the device does not have succeeds.
    pub idempotent_delete: bool,
    pub commit_interval_ms: u64,
    /// `None` waits for the commit job forever.
    pub commit_timeout_secs: Option<u64>,
    /// Retry on the HA peer when the active member is unreachable.
    pub ha_failover: bool,
    /// Probe HA state before the first mutating request.
    pub probe_ha_state: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            idempotent_delete: false,
            commit_interval_ms: 500,
            commit_timeout_secs: None,
            ha_failover: true,
            probe_ha_state: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Where loaded settings came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    Embedded,
    File(String),
}

impl SyncSettings {
    pub fn commit_interval(&self) -> Duration {
        Duration::from_millis(self.commit_interval_ms)
    }

    pub fn commit_timeout(&self) -> Option<Duration> {
        self.commit_timeout_secs.map(Duration::from_secs)
    }

    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml(raw: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(raw)?)
    }

    /// The settings file shipped with the crate.
    pub fn embedded() -> Result<Self, SettingsError> {
        Self::from_toml(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/settings/default.toml"
        )))
    }

    /// Load `path` when given, otherwise the embedded defaults.
    pub fn load(path: Option<&Path>) -> Result<(Self, SettingsSource), SettingsError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Ok((
                    Self::from_toml(&raw)?,
                    SettingsSource::File(path.display().to_string()),
                ))
            }
            None => Ok((Self::embedded()?, SettingsSource::Embedded)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use tempfile::tempdir;

    use super::{SettingsSource, SyncSettings};

    #[test]
    fn embedded_matches_defaults() {
        assert_eq!(SyncSettings::embedded().expect("embedded"), SyncSettings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("sync.toml");
        fs::write(&path, "idempotent_delete = true\ncommit_timeout_secs = 30\n").expect("write");

        let (settings, source) = SyncSettings::load(Some(&path)).expect("load");
        assert!(settings.idempotent_delete);
        assert_eq!(settings.commit_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(settings.commit_interval(), Duration::from_millis(500));
        assert!(matches!(source, SettingsSource::File(p) if p.ends_with("sync.toml")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(SyncSettings::from_toml("idempotent_delet = true").is_err());
    }

    #[test]
    fn missing_path_uses_embedded() {
        let (_, source) = SyncSettings::load(None).expect("load");
        assert_eq!(source, SettingsSource::Embedded);
    }
}

//! Endpoint profiles
//!
//! A profile names one S3-compatible endpoint together with the static
//! credentials used to reach it. Remote paths start with a profile name.

use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;
use crate::error::{Error, Result};

/// A named S3-compatible endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Unique name, used as the first path segment
    pub name: String,

    /// Endpoint URL
    pub endpoint: String,

    pub access_key: String,

    pub secret_key: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Use path-style bucket addressing instead of virtual hosts
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_path_style() -> bool {
    true
}

impl Profile {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: default_region(),
            path_style: default_path_style(),
        }
    }

    /// Check the name and endpoint before the profile is stored
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::Usage(format!(
                "profile name '{}' may only contain letters, digits, '-' and '_'",
                self.name
            )));
        }

        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| Error::Usage(format!("invalid endpoint '{}': {e}", self.endpoint)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Usage(format!(
                "endpoint '{}' must use http or https",
                self.endpoint
            )));
        }

        Ok(())
    }
}

/// Reads and writes profiles through the configuration file
pub struct ProfileManager {
    config_manager: ConfigManager,
}

impl ProfileManager {
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Use the default configuration location
    pub fn new() -> Result<Self> {
        Ok(Self {
            config_manager: ConfigManager::new()?,
        })
    }

    pub fn config_manager(&self) -> &ConfigManager {
        &self.config_manager
    }

    pub fn list(&self) -> Result<Vec<Profile>> {
        Ok(self.config_manager.load()?.profiles)
    }

    pub fn get(&self, name: &str) -> Result<Profile> {
        self.config_manager
            .load()?
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    /// Add a profile, replacing any profile with the same name
    pub fn set(&self, profile: Profile) -> Result<()> {
        profile.validate()?;

        let mut config = self.config_manager.load()?;
        config.profiles.retain(|p| p.name != profile.name);
        config.profiles.push(profile);

        self.config_manager.save(&config)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.profiles.len();

        config.profiles.retain(|p| p.name != name);

        if config.profiles.len() == original_len {
            return Err(Error::ProfileNotFound(name.to_string()));
        }

        self.config_manager.save(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_profile_manager() -> (ProfileManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_manager = ConfigManager::with_path(temp_dir.path().join("config.toml"));
        (ProfileManager::with_config_manager(config_manager), temp_dir)
    }

    #[test]
    fn test_profile_defaults() {
        let profile = Profile::new("local", "http://localhost:9000", "ak", "sk");
        assert_eq!(profile.region, "us-east-1");
        assert!(profile.path_style);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_profile_validation() {
        let bad_name = Profile::new("my profile", "http://localhost:9000", "ak", "sk");
        assert!(matches!(bad_name.validate(), Err(Error::Usage(_))));

        let bad_url = Profile::new("local", "localhost:9000/x y", "ak", "sk");
        assert!(matches!(bad_url.validate(), Err(Error::Usage(_))));

        let bad_scheme = Profile::new("local", "ftp://localhost", "ak", "sk");
        assert!(matches!(bad_scheme.validate(), Err(Error::Usage(_))));
    }

    #[test]
    fn test_set_get_and_replace() {
        let (manager, _temp_dir) = temp_profile_manager();

        manager
            .set(Profile::new("s3", "https://old.example.com", "a", "b"))
            .unwrap();
        manager
            .set(Profile::new("s3", "https://new.example.com", "c", "d"))
            .unwrap();

        let profiles = manager.list().unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(manager.get("s3").unwrap().endpoint, "https://new.example.com");
    }

    #[test]
    fn test_set_rejects_invalid_profile() {
        let (manager, _temp_dir) = temp_profile_manager();
        let result = manager.set(Profile::new("", "http://localhost:9000", "a", "b"));
        assert!(result.is_err());
        assert!(manager.list().unwrap().is_empty());
    }

    #[test]
    fn test_remove() {
        let (manager, _temp_dir) = temp_profile_manager();

        manager
            .set(Profile::new("local", "http://localhost:9000", "a", "b"))
            .unwrap();
        manager.remove("local").unwrap();

        assert!(matches!(
            manager.get("local").unwrap_err(),
            Error::ProfileNotFound(_)
        ));
        assert!(matches!(
            manager.remove("local").unwrap_err(),
            Error::ProfileNotFound(_)
        ));
    }
}

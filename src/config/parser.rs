use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Recorded on every harvest run so that runs made with different settings
/// can be told apart.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[api]
summary-url = "https://catalogue.example.com/api/category.json"
items-url = "https://catalogue.example.com/api/items.json"

[retry]
max-attempts = 6
retry-wait = 250

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
database-path = "./items.db"

[[category]]
id = 0
name = "Miscellaneous"

[[category]]
id = 1
name = "Ammo"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.api.page_size, 12);
        assert_eq!(config.api.request_timeout, 30);
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.retry.retry_wait, 250);
        // Unspecified retry keys fall back to their defaults
        assert_eq!(config.retry.cooldown_after, 5);
        assert_eq!(config.retry.cooldown, 300);
        assert_eq!(config.user_agent.crawler_name, "TestHarvester");
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[1].name, "Ammo");
    }

    #[test]
    fn test_retry_table_is_optional() {
        let content = VALID_CONFIG.replace("[retry]\nmax-attempts = 6\nretry-wait = 250\n", "");
        let file = create_temp_config(&content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.retry.max_attempts, 8);
        assert_eq!(config.retry.retry_wait, 5100);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = VALID_CONFIG.replace("max-attempts = 6", "max-attempts = 0");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}

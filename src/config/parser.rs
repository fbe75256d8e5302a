use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
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
/// Used to detect configuration changes between runs of the daemon.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its content hash
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
[scraper]
fetch-timeout-secs = 10
browser-timeout-secs = 30
max-concurrent-jobs = 2
tick-interval-secs = 15

[storage]
database-path = "./test.db"
media-root = "./media"

[[job]]
name = "news text"
url = "https://example.com/news"
data-type = "Text"
keyword = "technology"
schedule-type = "daily"
schedule-value = "14:30"

[[job]]
name = "gallery"
url = "https://example.com/gallery"
data-type = "Images"
download-images = true
schedule-type = "hourly"
schedule-value = "2"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.scraper.fetch_timeout_secs, 10);
        assert_eq!(config.scraper.max_concurrent_jobs, 2);
        assert_eq!(config.jobs.len(), 2);
        assert_eq!(config.jobs[0].keyword.as_deref(), Some("technology"));
        assert!(config.jobs[1].download_images);
    }

    #[test]
    fn test_defaults_applied() {
        let file = create_temp_config(
            r#"
[scraper]

[storage]
database-path = "./test.db"
media-root = "./media"
"#,
        );
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.scraper.fetch_timeout_secs, 10);
        assert_eq!(config.scraper.browser_timeout_secs, 30);
        assert_eq!(config.scraper.failure_backoff_minutes, 0);
        assert_eq!(config.storage.image_quota_bytes, 500 * 1024 * 1024);
        assert!(config.jobs.is_empty());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_config_with_invalid_job_url() {
        let file = create_temp_config(
            r#"
[scraper]

[storage]
database-path = "./test.db"
media-root = "./media"

[[job]]
name = "bad"
url = "javascript:void(0)"
data-type = "Text"
"#,
        );
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_compute_config_hash_stable() {
        let file = create_temp_config("same content");
        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");
        assert_ne!(
            compute_config_hash(file1.path()).unwrap(),
            compute_config_hash(file2.path()).unwrap()
        );
    }
}

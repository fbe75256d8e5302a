//! Semantic validation for loaded configuration
//!
//! TOML parsing only guarantees shape; this module checks that the values
//! make sense before any job is registered or scheduled. Invalid job
//! definitions are rejected here so no run is ever recorded for them.

use crate::config::types::Config;
use crate::jobs::ScheduleType;
use crate::scraper::DataType;
use crate::url::normalize_url;
use crate::ConfigError;

/// Validates a configuration, returning the first problem found
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.scraper.fetch_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch-timeout-secs must be greater than 0".to_string(),
        ));
    }

    if config.scraper.browser_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "browser-timeout-secs must be greater than 0".to_string(),
        ));
    }

    if config.scraper.max_concurrent_jobs == 0 {
        return Err(ConfigError::Validation(
            "max-concurrent-jobs must be greater than 0".to_string(),
        ));
    }

    if config.scraper.tick_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "tick-interval-secs must be greater than 0".to_string(),
        ));
    }

    if config.storage.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path must not be empty".to_string(),
        ));
    }

    if config.storage.media_root.is_empty() {
        return Err(ConfigError::Validation(
            "media-root must not be empty".to_string(),
        ));
    }

    for job in &config.jobs {
        if job.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "job name must not be empty".to_string(),
            ));
        }

        normalize_url(&job.url, None)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", job.name, e)))?;

        if DataType::parse(&job.data_type).is_none() {
            return Err(ConfigError::Validation(format!(
                "job {}: unknown data-type {:?} (expected Text, Links, Images, or Videos)",
                job.name, job.data_type
            )));
        }

        ScheduleType::parse(&job.schedule_type, &job.schedule_value)
            .map_err(|e| ConfigError::InvalidSchedule(format!("{}: {}", job.name, e)))?;

        if let Some(keyword) = &job.keyword {
            if keyword.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "job {}: keyword must not be blank when present",
                    job.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::JobEntry;

    fn base_config() -> Config {
        let toml = r#"
[scraper]

[storage]
database-path = "./test.db"
media-root = "./media"
"#;
        toml::from_str(toml).unwrap()
    }

    fn job(name: &str) -> JobEntry {
        JobEntry {
            name: name.to_string(),
            url: "https://example.com/page".to_string(),
            data_type: "Text".to_string(),
            keyword: None,
            download_images: false,
            download_videos: false,
            schedule_type: "manual".to_string(),
            schedule_value: String::new(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        let mut config = base_config();
        config.jobs.push(job("ok"));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = base_config();
        config.scraper.fetch_timeout_secs = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = base_config();
        config.scraper.max_concurrent_jobs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_job_url_rejected() {
        let mut config = base_config();
        let mut bad = job("bad url");
        bad.url = "file:///etc/passwd".to_string();
        config.jobs.push(bad);
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_unknown_data_type_rejected() {
        let mut config = base_config();
        let mut bad = job("bad type");
        bad.data_type = "Audio".to_string();
        config.jobs.push(bad);
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_bad_schedule_rejected() {
        let mut config = base_config();
        let mut bad = job("bad schedule");
        bad.schedule_type = "daily".to_string();
        bad.schedule_value = "25:99".to_string();
        config.jobs.push(bad);
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn test_blank_keyword_rejected() {
        let mut config = base_config();
        let mut bad = job("blank keyword");
        bad.keyword = Some("   ".to_string());
        config.jobs.push(bad);
        assert!(validate(&config).is_err());
    }
}

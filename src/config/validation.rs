use crate::config::types::{
    Config, CrawlerConfig, SearchConfig, SiteEntry, StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_search_config(&config.search)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 1000, got {}",
            config.batch_size
        )));
    }

    if config.max_concurrent_batches < 1 || config.max_concurrent_batches > 256 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_batches must be between 1 and 256, got {}",
            config.max_concurrent_batches
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user agent name cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.referrer)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid referrer: {}", e)))?;

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates ranking parameters
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if !(config.presence_ratio > 0.0 && config.presence_ratio <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "presence_ratio must be in (0, 1], got {}",
            config.presence_ratio
        )));
    }

    if config.snippet_density == 0 {
        return Err(ConfigError::Validation(
            "snippet_density must be positive".to_string(),
        ));
    }

    if config.default_limit == 0 {
        return Err(ConfigError::Validation(
            "default_limit must be positive".to_string(),
        ));
    }

    Ok(())
}

/// Validates site entries: well-formed HTTP(S) roots, no duplicates
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for site in sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Site '{}' must have a name",
                site.url
            )));
        }

        let url = Url::parse(&site.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid site URL '{}': {}", site.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Site URL '{}' must use HTTP or HTTPS",
                site.url
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Site URL '{}' has no host",
                site.url
            )));
        }

        if !seen.insert(site.url.trim_end_matches('/').to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "Site URL '{}' is listed more than once",
                site.url
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(url: &str, name: &str) -> SiteEntry {
        SiteEntry {
            url: url.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_validate_sites() {
        assert!(validate_sites(&[site("https://example.com", "Example")]).is_ok());
        assert!(validate_sites(&[site("http://127.0.0.1:8080", "Local")]).is_ok());

        assert!(validate_sites(&[site("ftp://example.com", "Ftp")]).is_err());
        assert!(validate_sites(&[site("not a url", "Broken")]).is_err());
        assert!(validate_sites(&[site("https://example.com", " ")]).is_err());
    }

    #[test]
    fn test_duplicate_sites_rejected() {
        let sites = [
            site("https://example.com", "One"),
            site("https://example.com/", "Two"),
        ];
        assert!(matches!(
            validate_sites(&sites),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_search_config() {
        assert!(validate_search_config(&SearchConfig::default()).is_ok());

        let mut config = SearchConfig::default();
        config.presence_ratio = 0.0;
        assert!(validate_search_config(&config).is_err());

        let mut config = SearchConfig::default();
        config.presence_ratio = 1.5;
        assert!(validate_search_config(&config).is_err());

        let mut config = SearchConfig::default();
        config.snippet_density = 0;
        assert!(validate_search_config(&config).is_err());
    }

    #[test]
    fn test_validate_user_agent() {
        let ok = UserAgentConfig {
            name: "Bot".to_string(),
            referrer: "https://www.google.com".to_string(),
        };
        assert!(validate_user_agent_config(&ok).is_ok());

        let bad_referrer = UserAgentConfig {
            name: "Bot".to_string(),
            referrer: "google".to_string(),
        };
        assert!(matches!(
            validate_user_agent_config(&bad_referrer),
            Err(ConfigError::InvalidUrl(_))
        ));
    }
}

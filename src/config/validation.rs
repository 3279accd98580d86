use crate::cache::MAX_TTL_SECS;
use crate::config::types::{
    CacheConfig, Config, ProbeConfig, SchedulerConfig, TargetConfig, UserAgentConfig,
};
use crate::crawler::resolve_page_url;
use crate::target::PaginationMode;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_scheduler_config(&config.scheduler)?;
    validate_probe_config(&config.probe)?;
    validate_cache_config(&config.cache)?;
    validate_targets(&config.targets, &config.probe)?;
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates batch scheduling and retry settings
fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > 100 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 100, got {}",
            config.batch_size
        )));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if !config.backoff_multiplier.is_finite() || config.backoff_multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_multiplier must be a finite number >= 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    if config.max_backoff_ms < config.initial_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "max_backoff_ms ({}) must be >= initial_backoff_ms ({})",
            config.max_backoff_ms, config.initial_backoff_ms
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.run_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "run_timeout_secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates probe settings
fn validate_probe_config(config: &ProbeConfig) -> Result<(), ConfigError> {
    validate_probe_bound(config.max_check_pages, "probe")
}

fn validate_probe_bound(bound: u32, owner: &str) -> Result<(), ConfigError> {
    if bound < 1 || bound > 1000 {
        return Err(ConfigError::Validation(format!(
            "max_check_pages for {} must be between 1 and 1000, got {}",
            owner, bound
        )));
    }
    Ok(())
}

/// Validates cache settings
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.ttl_secs < 1 {
        return Err(ConfigError::Validation(
            "ttl_secs must be >= 1".to_string(),
        ));
    }

    if config.ttl_secs > MAX_TTL_SECS {
        return Err(ConfigError::Validation(format!(
            "ttl_secs must be at most {} (ten years), got {}",
            MAX_TTL_SECS, config.ttl_secs
        )));
    }

    if let Some(path) = &config.database_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database_path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates crawl targets
fn validate_targets(targets: &[TargetConfig], probe: &ProbeConfig) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for target in targets {
        if target.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "target name cannot be empty".to_string(),
            ));
        }

        if !names.insert(target.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate target name '{}'",
                target.name
            )));
        }

        validate_target(target, probe)?;
        target.extractor.build()?;
    }

    Ok(())
}

/// Validates the mode-specific fields of one target
fn validate_target(target: &TargetConfig, probe: &ProbeConfig) -> Result<(), ConfigError> {
    match target.mode {
        PaginationMode::Explicit => {
            if target.urls.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Target '{}' uses explicit pagination but lists no urls",
                    target.name
                )));
            }
            for url in &target.urls {
                validate_http_url(url, &target.name)?;
            }
        }
        PaginationMode::Templated | PaginationMode::AutoDetect => {
            let template = target
                .template
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingTemplate {
                    target: target.name.clone(),
                    mode: target.mode.to_string(),
                })?;

            if target.page_param.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Target '{}' has an empty page-param",
                    target.name
                )));
            }

            let first_page = resolve_page_url(template, &target.page_param, target.start_page)?;
            validate_http_url(&first_page, &target.name)?;

            if target.mode == PaginationMode::Templated {
                match target.page_count {
                    None => {
                        return Err(ConfigError::MissingPageCount {
                            target: target.name.clone(),
                        })
                    }
                    Some(0) => {
                        return Err(ConfigError::Validation(format!(
                            "Target '{}' must have page-count >= 1",
                            target.name
                        )))
                    }
                    Some(count) => validate_page_range(target, count)?,
                }
            } else {
                let bound = target.max_check_pages.unwrap_or(probe.max_check_pages);
                validate_probe_bound(bound, &format!("target '{}'", target.name))?;
                validate_page_range(target, bound)?;
            }
        }
    }

    Ok(())
}

/// Checks that `count` pages from the start page stay within `u32`
fn validate_page_range(target: &TargetConfig, count: u32) -> Result<(), ConfigError> {
    if target.start_page.checked_add(count - 1).is_none() {
        return Err(ConfigError::Validation(format!(
            "Target '{}' pages {} onwards ({} pages) exceed the largest page index",
            target.name, target.start_page, count
        )));
    }
    Ok(())
}

/// Validates that a URL parses and uses HTTP(S)
fn validate_http_url(url: &str, target: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid URL '{}' in target '{}': {}", url, target, e))
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "URL '{}' in target '{}' must use HTTP or HTTPS",
            url, target
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

//! Application configuration loaded from environment variables.

use std::env;

use faultline_core::domain::IgnoreList;
use faultline_core::{ConfigError, ReporterConfig};

/// Where notices are delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifierSettings {
    /// Log notices through tracing only.
    Tracing,
    /// POST notices to an error tracking endpoint.
    Webhook { endpoint: String, api_key: String },
}

/// Application configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub reporter: ReporterConfig,
    pub notifier: NotifierSettings,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            reporter: Self::reporter(env::var("FAULTLINE_IGNORE_USER_AGENTS").ok().as_deref())?,
            notifier: Self::notifier(
                env::var("FAULTLINE_ENDPOINT").ok(),
                env::var("FAULTLINE_API_KEY").ok(),
            ),
        })
    }

    /// Parse the ignore list.
    /// Format: FAULTLINE_IGNORE_USER_AGENTS=<pattern>;<pattern>,<pattern>
    /// Example: FAULTLINE_IGNORE_USER_AGENTS=HealthCheckBot/1.0;/crawler/i
    fn reporter(ignore_user_agents: Option<&str>) -> Result<ReporterConfig, ConfigError> {
        let ignore = match ignore_user_agents {
            Some(spec) => IgnoreList::parse(spec)?,
            None => IgnoreList::default(),
        };
        Ok(ReporterConfig::new(ignore))
    }

    /// Webhook delivery needs both an endpoint and an API key.
    fn notifier(endpoint: Option<String>, api_key: Option<String>) -> NotifierSettings {
        match (endpoint, api_key) {
            (Some(endpoint), Some(api_key)) if !endpoint.is_empty() => {
                NotifierSettings::Webhook { endpoint, api_key }
            }
            _ => NotifierSettings::Tracing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_parses_ignore_list() {
        let config = AppConfig::reporter(Some("HealthCheckBot/1.0;/crawler/i")).unwrap();
        assert!(config.ignores_user_agent(Some("HealthCheckBot/1.0")));
        assert!(config.ignores_user_agent(Some("SomeCrawlerX")));
        assert!(!config.ignores_user_agent(Some("curl/8.0")));

        assert!(AppConfig::reporter(None).unwrap().ignore_user_agents.is_empty());
        assert!(AppConfig::reporter(Some("/bad(/")).is_err());
    }

    #[test]
    fn test_notifier_requires_endpoint_and_key() {
        assert_eq!(
            AppConfig::notifier(Some("https://errors.example.com".into()), None),
            NotifierSettings::Tracing
        );
        assert_eq!(
            AppConfig::notifier(Some("https://errors.example.com".into()), Some("k".into())),
            NotifierSettings::Webhook {
                endpoint: "https://errors.example.com".to_string(),
                api_key: "k".to_string(),
            }
        );
    }
}

//! Reporter configuration shared by the middleware.

use std::sync::OnceLock;

use crate::domain::IgnoreList;

/// Settings read by the reporting middleware on every request.
#[derive(Debug, Default)]
pub struct ReporterConfig {
    pub ignore_user_agents: IgnoreList,
    framework: OnceLock<String>,
}

impl ReporterConfig {
    pub fn new(ignore_user_agents: IgnoreList) -> Self {
        Self {
            ignore_user_agents,
            framework: OnceLock::new(),
        }
    }

    /// Record the host framework identity. Only the first call has any
    /// effect; returns whether this call set it.
    pub fn record_framework(&self, identity: impl Into<String>) -> bool {
        self.framework.set(identity.into()).is_ok()
    }

    pub fn framework(&self) -> Option<&str> {
        self.framework.get().map(String::as_str)
    }

    /// Whether reports for this user agent are suppressed.
    ///
    /// Requests without a user agent are never suppressed.
    pub fn ignores_user_agent(&self, user_agent: Option<&str>) -> bool {
        user_agent.is_some_and(|ua| self.ignore_user_agents.matches(ua))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserAgentPattern;

    #[test]
    fn test_framework_is_write_once() {
        let config = ReporterConfig::default();
        assert_eq!(config.framework(), None);
        assert!(config.record_framework("actix-web 4"));
        assert!(!config.record_framework("something else"));
        assert_eq!(config.framework(), Some("actix-web 4"));
    }

    #[test]
    fn test_missing_user_agent_is_not_ignored() {
        let config =
            ReporterConfig::new(IgnoreList::new(vec![UserAgentPattern::regex(".*").unwrap()]));
        assert!(!config.ignores_user_agent(None));
        assert!(config.ignores_user_agent(Some("")));
    }
}

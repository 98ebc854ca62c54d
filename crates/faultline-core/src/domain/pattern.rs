//! User agent ignore patterns.

use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;

/// Flags accepted after the closing slash of `/body/flags`.
const REGEX_FLAGS: &str = "imx";

/// A rule suppressing reports for matching user agents.
#[derive(Debug, Clone)]
pub enum UserAgentPattern {
    /// Matches when the user agent equals the string exactly.
    Exact(String),
    /// Matches when the regex finds a match anywhere in the user agent.
    Regex(Regex),
    /// Nested group, flattened before matching.
    List(Vec<UserAgentPattern>),
}

impl UserAgentPattern {
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact(value.into())
    }

    pub fn regex(pattern: &str) -> Result<Self, ConfigError> {
        Self::build_regex(pattern, "")
    }

    /// Parse a single pattern.
    ///
    /// `/body/flags` becomes a regex when every flag is one of `i`, `m`, `x`;
    /// anything else, such as `/api/v1`, is an exact match.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix('/') {
            if let Some(end) = rest.rfind('/') {
                let flags = &rest[end + 1..];
                if flags.chars().all(|c| REGEX_FLAGS.contains(c)) {
                    return Self::build_regex(&rest[..end], flags);
                }
            }
        }
        Ok(Self::exact(raw))
    }

    fn build_regex(body: &str, flags: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPattern {
            pattern: format!("/{}/{}", body, flags),
            reason,
        };

        let mut builder = RegexBuilder::new(body);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                'x' => builder.ignore_whitespace(true),
                other => return Err(invalid(format!("unsupported flag '{}'", other))),
            };
        }

        builder
            .build()
            .map(Self::Regex)
            .map_err(|e| invalid(e.to_string()))
    }

    pub fn matches(&self, user_agent: &str) -> bool {
        match self {
            Self::Exact(value) => value == user_agent,
            Self::Regex(regex) => regex.is_match(user_agent),
            Self::List(patterns) => patterns.iter().any(|p| p.matches(user_agent)),
        }
    }

    fn flatten_into<'a>(&'a self, out: &mut Vec<&'a UserAgentPattern>) {
        match self {
            Self::List(patterns) => patterns.iter().for_each(|p| p.flatten_into(out)),
            leaf => out.push(leaf),
        }
    }
}

/// The configured ignore list. May contain nested groups.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: Vec<UserAgentPattern>,
}

impl IgnoreList {
    pub fn new(patterns: Vec<UserAgentPattern>) -> Self {
        Self { patterns }
    }

    /// Parse a list such as `HealthCheckBot/1.0;/crawler/i;Pingdom,UptimeRobot`.
    ///
    /// Entries are separated by `;`. An entry containing `,` becomes a nested
    /// group. Regex bodies therefore cannot contain either separator.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let mut patterns = Vec::new();
        for entry in spec.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            if entry.contains(',') {
                let group = entry
                    .split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(UserAgentPattern::parse)
                    .collect::<Result<Vec<_>, _>>()?;
                patterns.push(UserAgentPattern::List(group));
            } else {
                patterns.push(UserAgentPattern::parse(entry)?);
            }
        }
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.flatten().is_empty()
    }

    /// Leaf patterns with every nested group expanded.
    pub fn flatten(&self) -> Vec<&UserAgentPattern> {
        let mut leaves = Vec::new();
        for pattern in &self.patterns {
            pattern.flatten_into(&mut leaves);
        }
        leaves
    }

    pub fn matches(&self, user_agent: &str) -> bool {
        self.flatten().iter().any(|p| p.matches(user_agent))
    }
}

impl FromIterator<UserAgentPattern> for IgnoreList {
    fn from_iter<I: IntoIterator<Item = UserAgentPattern>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

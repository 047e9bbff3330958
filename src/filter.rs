//! Monitor name filters.
//!
//! Filters are declared in configuration either as a plain string (exact
//! match) or as `{ regex: "<pattern>" }` (unanchored search). They are
//! compiled once, at configuration load, under a single global case policy.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Global case policy applied to every filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSensitivity {
    /// Names must match with identical case.
    #[default]
    Sensitive,
    /// Case is ignored on both sides.
    Insensitive,
}

impl CaseSensitivity {
    /// Maps the `caseSensitive` configuration flag.
    #[must_use]
    pub const fn from_flag(case_sensitive: bool) -> Self {
        if case_sensitive {
            Self::Sensitive
        } else {
            Self::Insensitive
        }
    }

    /// Returns true for [`CaseSensitivity::Sensitive`].
    #[must_use]
    pub const fn is_sensitive(self) -> bool {
        matches!(self, Self::Sensitive)
    }
}

/// Filter as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFilter {
    /// `- "API"`
    Exact(String),
    /// `- regex: "^API"`
    Pattern {
        /// Regex source.
        regex: String,
    },
}

impl RawFilter {
    /// Creates an exact-match filter.
    #[must_use]
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    /// Creates a regex filter.
    #[must_use]
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Pattern {
            regex: pattern.into(),
        }
    }
}

/// Compiled filter.
#[derive(Debug, Clone)]
pub enum FilterSpec {
    /// Whole-name equality.
    Exact(String),
    /// Regex search anywhere in the name.
    Pattern(Regex),
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => write!(f, "exact({name})"),
            Self::Pattern(re) => write!(f, "regex({})", re.as_str()),
        }
    }
}

/// Compiles and evaluates filters under one case policy.
///
/// Compiling and matching through the same matcher keeps regex flags and
/// exact comparisons on the same policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterMatcher {
    case: CaseSensitivity,
}

impl FilterMatcher {
    /// Creates a matcher for the given policy.
    #[must_use]
    pub const fn new(case: CaseSensitivity) -> Self {
        Self { case }
    }

    /// Compiles a raw filter for `category`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRegex`] if a regex filter does not compile.
    pub fn compile(&self, category: &str, raw: &RawFilter) -> Result<FilterSpec, ConfigError> {
        match raw {
            RawFilter::Exact(name) => Ok(FilterSpec::Exact(name.clone())),
            RawFilter::Pattern { regex } => RegexBuilder::new(regex)
                .case_insensitive(!self.case.is_sensitive())
                .build()
                .map(FilterSpec::Pattern)
                .map_err(|e| ConfigError::InvalidRegex {
                    category: category.to_string(),
                    pattern: regex.clone(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Returns true if `filter` selects `monitor_name`.
    #[must_use]
    pub fn matches(&self, monitor_name: &str, filter: &FilterSpec) -> bool {
        match filter {
            FilterSpec::Pattern(re) => re.is_match(monitor_name),
            FilterSpec::Exact(name) => match self.case {
                CaseSensitivity::Sensitive => monitor_name == name,
                CaseSensitivity::Insensitive => monitor_name.to_lowercase() == name.to_lowercase(),
            },
        }
    }

    /// Returns true if any of `filters` selects `monitor_name`.
    #[must_use]
    pub fn matches_any(&self, monitor_name: &str, filters: &[FilterSpec]) -> bool {
        filters.iter().any(|f| self.matches(monitor_name, f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(case: CaseSensitivity, raw: RawFilter) -> (FilterMatcher, FilterSpec) {
        let matcher = FilterMatcher::new(case);
        let spec = matcher.compile("test", &raw).unwrap();
        (matcher, spec)
    }

    #[test]
    fn exact_case_sensitive_requires_identical_case() {
        let (m, f) = compile(CaseSensitivity::Sensitive, RawFilter::exact("API"));
        assert!(m.matches("API", &f));
        assert!(!m.matches("api", &f));
        assert!(!m.matches("API Gateway", &f));
    }

    #[test]
    fn exact_case_insensitive_ignores_case() {
        let (m, f) = compile(CaseSensitivity::Insensitive, RawFilter::exact("Api"));
        assert!(m.matches("API", &f));
        assert!(m.matches("api", &f));
        assert!(!m.matches("api2", &f));
    }

    #[test]
    fn regex_searches_substrings() {
        let (m, f) = compile(CaseSensitivity::Sensitive, RawFilter::regex("DB"));
        assert!(m.matches("Primary DB", &f));
        assert!(m.matches("DB-replica", &f));
        assert!(!m.matches("db", &f));
    }

    #[test]
    fn regex_honours_case_policy() {
        let (m, f) = compile(CaseSensitivity::Insensitive, RawFilter::regex("^a"));
        assert!(m.matches("API", &f));
        assert!(!m.matches("DB", &f));

        let (m, f) = compile(CaseSensitivity::Sensitive, RawFilter::regex("^a"));
        assert!(!m.matches("API", &f));
    }

    #[test]
    fn invalid_regex_is_a_config_error() {
        let err = FilterMatcher::default()
            .compile("Core", &RawFilter::regex("(unclosed"))
            .unwrap_err();
        match err {
            ConfigError::InvalidRegex { category, pattern, .. } => {
                assert_eq!(category, "Core");
                assert_eq!(pattern, "(unclosed");
            }
            other => panic!("expected invalid regex, got {other:?}"),
        }
    }

    #[test]
    fn matches_any_is_or() {
        let m = FilterMatcher::default();
        let filters = vec![
            m.compile("c", &RawFilter::exact("API")).unwrap(),
            m.compile("c", &RawFilter::regex("^DB")).unwrap(),
        ];
        assert!(m.matches_any("API", &filters));
        assert!(m.matches_any("DB-1", &filters));
        assert!(!m.matches_any("Cache", &filters));
        assert!(!m.matches_any("Cache", &[]));
    }

    #[test]
    fn raw_filter_deserializes_both_shapes() {
        let filters: Vec<RawFilter> = serde_yaml::from_str("- API\n- regex: \"^DB\"\n").unwrap();
        assert_eq!(filters, vec![RawFilter::exact("API"), RawFilter::regex("^DB")]);
    }
}

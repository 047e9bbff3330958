//! Categories: named groups of monitors, one chat message each.

use crate::error::ConfigError;
use crate::feed::MonitorRecord;
use crate::filter::{FilterMatcher, FilterSpec, RawFilter};

/// A configured category with its compiled filters.
#[derive(Debug, Clone)]
pub struct CategorySpec {
    /// Unique title; also the display heading and the state table key.
    pub title: String,
    /// Filters, combined with OR.
    pub filters: Vec<FilterSpec>,
}

impl CategorySpec {
    /// Creates a category from already-compiled filters.
    #[must_use]
    pub fn new(title: impl Into<String>, filters: Vec<FilterSpec>) -> Self {
        Self {
            title: title.into(),
            filters,
        }
    }

    /// Compiles raw filters with `matcher`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::InvalidRegex`] encountered.
    pub fn compile(
        title: impl Into<String>,
        raw: &[RawFilter],
        matcher: &FilterMatcher,
    ) -> Result<Self, ConfigError> {
        let title = title.into();
        let filters = raw
            .iter()
            .map(|f| matcher.compile(&title, f))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { title, filters })
    }
}

/// Records selected by one category in one cycle.
#[derive(Debug, Clone)]
pub struct CategoryMatch<'a> {
    /// The category.
    pub category: &'a CategorySpec,
    /// Matching records in feed order.
    pub monitors: Vec<&'a MonitorRecord>,
}

impl CategoryMatch<'_> {
    /// Returns the category title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.category.title
    }

    /// An empty match means the category is skipped this cycle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

/// Partitions `records` into `categories`, in configuration order.
///
/// Every category is returned, including empty ones. A record may appear in
/// several categories.
#[must_use]
pub fn categorize<'a>(
    records: &'a [MonitorRecord],
    categories: &'a [CategorySpec],
    matcher: &FilterMatcher,
) -> Vec<CategoryMatch<'a>> {
    categories
        .iter()
        .map(|category| CategoryMatch {
            category,
            monitors: records
                .iter()
                .filter(|r| matcher.matches_any(&r.name, &category.filters))
                .collect(),
        })
        .collect()
}

use regex::Regex;

/// Represents a method key filter pattern
#[derive(Debug, Clone)]
pub enum FilterPattern {
    /// Prefix match: `geometry$*` matches every method of the `geometry` unit
    Prefix(String),
    /// Regex match: `re:\$__.*` matches keys via regex
    Regex(Regex),
    /// Exact match: `geometry$area` matches the key exactly
    Exact(String),
}

impl FilterPattern {
    /// Parse a filter string into a FilterPattern
    ///
    /// - `re:<pattern>` → Regex filter
    /// - `<prefix>*` → Prefix filter (trailing `*`)
    /// - `<exact>` → Exact match
    pub fn parse(pattern: &str) -> Result<Self, String> {
        if let Some(regex_str) = pattern.strip_prefix("re:") {
            let regex = Regex::new(regex_str)
                .map_err(|e| format!("Invalid regex pattern '{}': {}", regex_str, e))?;
            Ok(FilterPattern::Regex(regex))
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            Ok(FilterPattern::Prefix(prefix.to_string()))
        } else {
            Ok(FilterPattern::Exact(pattern.to_string()))
        }
    }

    /// Check if a key matches this filter pattern
    pub fn matches(&self, key: &str) -> bool {
        match self {
            FilterPattern::Prefix(prefix) => key.starts_with(prefix),
            FilterPattern::Regex(regex) => regex.is_match(key),
            FilterPattern::Exact(exact) => key == exact,
        }
    }
}

/// Exclusion list for method keys, patterns combined with OR logic.
#[derive(Debug, Clone, Default)]
pub struct MethodFilter {
    patterns: Vec<FilterPattern>,
}

impl MethodFilter {
    /// Create a new filter from a list of pattern strings
    pub fn new(patterns: &[String]) -> Result<Self, String> {
        let parsed: Result<Vec<FilterPattern>, String> =
            patterns.iter().map(|p| FilterPattern::parse(p)).collect();
        Ok(Self { patterns: parsed? })
    }

    /// True when the key matches any exclusion pattern.
    pub fn excludes(&self, key: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(key))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Get a human-readable summary of active patterns
    pub fn summary(&self) -> String {
        self.patterns
            .iter()
            .map(|p| match p {
                FilterPattern::Prefix(prefix) => format!("{}*", prefix),
                FilterPattern::Regex(regex) => format!("re:{}", regex.as_str()),
                FilterPattern::Exact(exact) => exact.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

//! Wildcard include/exclude rules over symbol names and header paths.

use crate::config::RulesConfig;
use crate::error::{ConfigError, Result};
use regex::Regex;

/// Separator a single `*` never crosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// `::` in fully-qualified names
    Scope,
    /// `/` in header paths
    Path,
}

/// Compile a wildcard into an anchored regex.
///
/// `**` matches anything, `*` matches within one segment, every other
/// character is literal.
pub fn wildcard_to_regex(wildcard: &str, separator: Separator) -> Result<Regex> {
    let segment = match separator {
        Separator::Scope => "[^:]*",
        Separator::Path => "[^/]*",
    };

    let mut pattern = String::from("^");
    let mut rest = wildcard;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("**") {
            pattern.push_str(".*");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('*') {
            pattern.push_str(segment);
            rest = tail;
        } else {
            let next = rest.find('*').unwrap_or(rest.len());
            pattern.push_str(&regex::escape(&rest[..next]));
            rest = &rest[next..];
        }
    }
    pattern.push('$');

    Regex::new(&pattern).map_err(|e| ConfigError::Pattern {
        pattern: wildcard.to_string(),
        message: e.to_string(),
    })
}

/// A list of wildcards, any of which may match.
#[derive(Debug, Clone, Default)]
pub struct WildcardSet {
    patterns: Vec<Regex>,
}

impl WildcardSet {
    pub fn new<S: AsRef<str>>(wildcards: &[S], separator: Separator) -> Result<Self> {
        let patterns = wildcards
            .iter()
            .map(|w| wildcard_to_regex(w.as_ref(), separator))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, value: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(value))
    }
}

/// Include/exclude filter: a value passes if it matches an include rule (or
/// there are none) and no exclude rule.
#[derive(Debug, Clone, Default)]
pub struct SymbolFilter {
    include: WildcardSet,
    exclude: WildcardSet,
}

impl SymbolFilter {
    pub fn new(rules: &RulesConfig, separator: Separator) -> Result<Self> {
        Ok(Self {
            include: WildcardSet::new(&rules.include, separator)?,
            exclude: WildcardSet::new(&rules.exclude, separator)?,
        })
    }

    /// Filter that accepts everything.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_included(&self, value: &str) -> bool {
        (self.include.is_empty() || self.include.matches(value)) && !self.is_excluded(value)
    }

    /// Whether an exclude rule matches, regardless of the include rules.
    pub fn is_excluded(&self, value: &str) -> bool {
        self.exclude.matches(value)
    }
}

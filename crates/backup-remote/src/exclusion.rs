//! Exclusion rules applied when listing remote objects
//!
//! A rule matches a path when the path ends with the rule (suffix match, e.g.
//! `.gitignore`) or starts with the rule as a directory (prefix match, e.g.
//! `build/`). A directory is pruned as soon as its own path, with a trailing
//! slash, matches a rule.

use serde::{Deserialize, Serialize};

/// Entries excluded from every listing on top of the user's rules.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[".gitignore", ".idea/", "build/", "dist/"];

/// Ordered set of exclusion patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionRules {
    rules: Vec<String>,
}

impl ExclusionRules {
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: rules.into_iter().map(Into::into).collect(),
        }
    }

    /// The user's rules followed by [`DEFAULT_EXCLUSIONS`] not already present.
    pub fn with_defaults(&self) -> Self {
        let mut rules = self.rules.clone();
        for default in DEFAULT_EXCLUSIONS {
            if !rules.iter().any(|r| r == default) {
                rules.push((*default).to_string());
            }
        }
        Self { rules }
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Append a rule; returns `false` when it was already present.
    pub fn add(&mut self, rule: impl Into<String>) -> bool {
        let rule = rule.into();
        if self.rules.contains(&rule) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    /// Remove a rule; returns `false` when it was not present.
    pub fn remove(&mut self, rule: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r != rule);
        self.rules.len() != before
    }

    /// Whether a file at `path` is excluded, either directly or because one
    /// of its ancestor directories is.
    pub fn is_excluded(&self, path: &str) -> bool {
        if self.matches(path) {
            return true;
        }
        path.match_indices('/')
            .any(|(idx, _)| self.is_excluded_dir(&path[..idx]))
    }

    /// Whether the directory at `dir` should be pruned from a listing.
    pub fn is_excluded_dir(&self, dir: &str) -> bool {
        let dir = dir.trim_end_matches('/');
        !dir.is_empty() && (self.matches(dir) || self.matches(&format!("{dir}/")))
    }

    fn matches(&self, path: &str) -> bool {
        self.rules.iter().filter(|r| !r.is_empty()).any(|rule| {
            let as_dir = format!("{}/", rule.trim_end_matches('/'));
            path.ends_with(rule.as_str()) || path.starts_with(&as_dir)
        })
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionRules {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

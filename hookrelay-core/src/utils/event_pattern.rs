//! Event-type filters.
//!
//! A pattern is either the catch-all `*`, an exact event type, or a glob in
//! which every `*` stands for any (possibly empty) character sequence. Globs
//! are anchored at both ends and every other character is literal, so
//! `project.*` matches `project.created` but not `xproject.created`.
//!
//! Patterns are compiled when a subscription is registered, never at match
//! time.

use compact_str::CompactString;
use itertools::Itertools;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("event pattern must not be empty")]
    Empty,
    #[error("event pattern {0:?} contains whitespace or control characters")]
    IllegalCharacter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Matcher {
    Any,
    Exact,
    /// Literal runs between `*`s; always at least two entries.
    Glob(Vec<CompactString>),
}

/// A single compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPattern {
    source: CompactString,
    matcher: Matcher,
}

impl EventPattern {
    pub fn compile(source: &str) -> Result<Self, PatternError> {
        if source.is_empty() {
            return Err(PatternError::Empty);
        }
        if source.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(PatternError::IllegalCharacter(source.to_owned()));
        }

        let matcher = if source.chars().all(|c| c == '*') {
            Matcher::Any
        } else if source.contains('*') {
            Matcher::Glob(source.split('*').map(CompactString::from).collect())
        } else {
            Matcher::Exact
        };

        Ok(Self {
            source: source.into(),
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, event_type: &str) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Exact => self.source == event_type,
            Matcher::Glob(parts) => glob_matches(parts, event_type),
        }
    }
}

fn glob_matches(parts: &[CompactString], input: &str) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return false;
    };

    let Some(remaining) = input.strip_prefix(first.as_str()) else {
        return false;
    };
    // Prefix and suffix must not overlap.
    let Some(mut remaining) = remaining.strip_suffix(last.as_str()) else {
        return false;
    };

    // Leftmost match for each literal run is always safe for `*`-only globs.
    for part in middle {
        match remaining.find(part.as_str()) {
            Some(index) => remaining = &remaining[index + part.len()..],
            None => return false,
        }
    }
    true
}

/// The ordered, de-duplicated pattern set of a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPatternSet {
    patterns: Vec<EventPattern>,
}

impl EventPatternSet {
    /// Compile every pattern, keeping first-seen order and dropping
    /// duplicates. An empty input subscribes to every event.
    pub fn compile<S: AsRef<str>>(sources: &[S]) -> Result<Self, PatternError> {
        if sources.is_empty() {
            return Ok(Self::catch_all());
        }
        let patterns = sources
            .iter()
            .map(|s| s.as_ref())
            .unique()
            .map(EventPattern::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn catch_all() -> Self {
        Self {
            patterns: vec![EventPattern {
                source: "*".into(),
                matcher: Matcher::Any,
            }],
        }
    }

    pub fn matches(&self, event_type: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(event_type))
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.as_str().to_owned()).collect()
    }
}

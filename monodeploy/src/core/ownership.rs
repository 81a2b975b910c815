//! Ownership rules: which workdir-relative paths belong to an action.
//!
//! Rules are compiled once when the action is discovered. Matching never
//! touches the filesystem.

use std::fmt;

use anyhow::{Context, Result, anyhow};
use regex::Regex;

use crate::core::path::{is_within, normalize_relative};

/// One path claim made by an action.
#[derive(Debug, Clone)]
pub enum OwnershipRule {
    /// Owns the directory and everything beneath it.
    Prefix(String),
    /// Owns every path matching the glob (`*`, `**`, `?`).
    Glob { pattern: String, regex: Regex },
}

impl OwnershipRule {
    /// Parse a rule. Patterns containing `*` or `?` are globs, anything else
    /// is a directory prefix.
    pub fn parse(raw: &str) -> Result<Self> {
        let pattern =
            normalize_relative(raw).ok_or_else(|| anyhow!("empty ownership rule '{raw}'"))?;
        if pattern.split('/').any(|segment| segment == "..") {
            return Err(anyhow!("ownership rule '{raw}' escapes the working directory"));
        }
        if pattern.contains(|c: char| c == '*' || c == '?') {
            let regex = Regex::new(&glob_to_regex(&pattern))
                .with_context(|| format!("compile glob '{pattern}'"))?;
            return Ok(Self::Glob { pattern, regex });
        }
        Ok(Self::Prefix(pattern))
    }

    pub fn prefix(dir: impl Into<String>) -> Self {
        Self::Prefix(dir.into())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Prefix(dir) => is_within(path, dir),
            Self::Glob { regex, .. } => regex.is_match(path),
        }
    }

    /// The directory this rule owns outright, if it is prefix-shaped
    /// (`dir` or `dir/**` with no other wildcards).
    pub fn as_prefix(&self) -> Option<&str> {
        match self {
            Self::Prefix(dir) => Some(dir),
            Self::Glob { pattern, .. } => pattern
                .strip_suffix("/**")
                .filter(|dir| !dir.contains(|c: char| c == '*' || c == '?')),
        }
    }

    pub fn pattern(&self) -> &str {
        match self {
            Self::Prefix(dir) => dir,
            Self::Glob { pattern, .. } => pattern,
        }
    }
}

impl PartialEq for OwnershipRule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Prefix(a), Self::Prefix(b)) => a == b,
            (Self::Glob { pattern: a, .. }, Self::Glob { pattern: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for OwnershipRule {}

impl fmt::Display for OwnershipRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefix(dir) => write!(f, "{dir}/**"),
            Self::Glob { pattern, .. } => f.write_str(pattern),
        }
    }
}

/// The full set of rules an action owns. A path is owned if any rule matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ownership {
    rules: Vec<OwnershipRule>,
}

impl Ownership {
    pub fn new(rules: Vec<OwnershipRule>) -> Self {
        Self { rules }
    }

    /// Parse a list of raw rules, failing on the first invalid one.
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        let rules = raw
            .iter()
            .map(|rule| OwnershipRule::parse(rule.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn push(&mut self, rule: OwnershipRule) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    pub fn rules(&self) -> &[OwnershipRule] {
        &self.rules
    }

    pub fn contains(&self, path: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(path))
    }
}

/// Translate a normalized glob into an anchored regex.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let at_segment_start = i == 0 || chars[i - 1] == '/';
                let followed_by_slash = chars.get(i + 2) == Some(&'/');
                if at_segment_start && followed_by_slash {
                    // `**/` matches zero or more whole segments.
                    out.push_str("(?:[^/]+/)*");
                    i += 3;
                    continue;
                }
                if at_segment_start && i + 2 == chars.len() && i > 0 {
                    // Trailing `/**` also owns the directory itself.
                    out.pop();
                    out.push_str("(?:/.*)?");
                    i += 2;
                    continue;
                }
                out.push_str(".*");
                i += 2;
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                out.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }
    out.push('$');
    out
}

//! Glob-style invalidation patterns.
//!
//! A pattern matches a whole key. `*` (and any run of stars, so `**` too)
//! matches any sequence of characters, including none. Every other character
//! matches itself literally, regex metacharacters included.

use regex::Regex;

use crate::Error;

/// A compiled invalidation pattern.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    pattern: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compile a glob-style pattern into a key predicate.
    pub fn compile(pattern: &str) -> Result<Self, Error> {
        let source = pattern_to_regex(pattern);
        let regex = Regex::new(&source).map_err(|e| Error::InvalidPattern(format!("{pattern}: {e}")))?;
        Ok(Self { pattern: pattern.to_string(), regex })
    }

    /// Whether `key` is matched by this pattern.
    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The glob pattern as written.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// The regular expression the pattern was compiled into.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// Translate a glob-style pattern into an anchored regular expression.
///
/// Literal segments are escaped before the wildcard translation is applied.
pub fn pattern_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("(?s)^");

    let mut segments = pattern.split('*').peekable();
    while let Some(literal) = segments.next() {
        out.push_str(&regex::escape(literal));
        if segments.peek().is_some() && !out.ends_with(".*") {
            out.push_str(".*");
        }
    }

    out.push('$');
    out
}

//! Filename pattern matching for the watch directory.
//!
//! Patterns are regular expressions anchored at the start of the filename
//! but not at the end: `dev\d+` matches `dev0` and also `dev0.lock`.

use std::fmt;
use std::path::Path;

use regex::Regex;

use super::WatchError;

/// Compiled watch pattern.
///
/// Compilation happens once in [`WatchPattern::new`]; matching never fails.
#[derive(Clone)]
pub struct WatchPattern {
    source: String,
    regex: Regex,
}

impl WatchPattern {
    /// Compile a pattern, rejecting malformed expressions up front.
    pub fn new(pattern: &str) -> Result<Self, WatchError> {
        let regex =
            Regex::new(&format!("^(?:{pattern})")).map_err(|e| WatchError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Check whether a filename satisfies the pattern.
    ///
    /// Empty names never match.
    pub fn matches(&self, filename: &str) -> bool {
        !filename.is_empty() && self.regex.is_match(filename)
    }

    /// The pattern as originally written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for WatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WatchPattern").field(&self.source).finish()
    }
}

/// Strip any directory components from an event name.
///
/// Returns `None` when nothing usable is left (empty input, `..`, non UTF-8).
pub fn basename(name: &str) -> Option<&str> {
    Path::new(name).file_name().and_then(|n| n.to_str())
}

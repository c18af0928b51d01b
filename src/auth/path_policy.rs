//! Decide which request paths bypass authentication.
//!
//! Two matching modes exist and they are not interchangeable:
//!
//! - [`PathMatch::Exact`] (default): both sides are normalised to a single
//!   trailing `/` and must be equal. `/status` matches `/status/` but never
//!   `/status/detail/`.
//! - [`PathMatch::Prefix`]: a request path is excluded when an excluded entry
//!   *starts with* it. This is looser: `/stat` is excluded by `/status/`.

use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PathMatch {
    #[default]
    Exact,
    Prefix,
}

impl FromStr for PathMatch {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "prefix" => Ok(Self::Prefix),
            other => Err(format!("unknown path match mode: {other}")),
        }
    }
}

impl fmt::Display for PathMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::Prefix => f.write_str("prefix"),
        }
    }
}

/// Ensure exactly one trailing `/`.
pub(crate) fn normalize_path(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

/// Exact-match rule on raw inputs.
///
/// Returns `true` (auth required) when either side is absent or empty.
/// Entries are trimmed and blank ones ignored, as in [`PathPolicy::new`].
pub fn requires_auth<S: AsRef<str>>(path: Option<&str>, excluded: Option<&[S]>) -> bool {
    let (Some(path), Some(excluded)) = (path, excluded) else {
        return true;
    };
    if path.is_empty() || excluded.is_empty() {
        return true;
    }
    let path = normalize_path(path);
    !excluded
        .iter()
        .map(|entry| entry.as_ref().trim())
        .filter(|entry| !entry.is_empty())
        .any(|entry| normalize_path(entry) == path)
}

/// Configured exclusion list with entries normalised once at startup.
#[derive(Clone, Debug)]
pub struct PathPolicy {
    excluded: Vec<String>,
    mode: PathMatch,
}

impl PathPolicy {
    #[must_use]
    pub fn new<I, S>(excluded: I, mode: PathMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let excluded = excluded
            .into_iter()
            .map(|entry| entry.as_ref().trim().to_string())
            .filter(|entry| !entry.is_empty())
            .map(|entry| match mode {
                PathMatch::Exact => normalize_path(&entry),
                PathMatch::Prefix => entry,
            })
            .collect();
        Self { excluded, mode }
    }

    #[must_use]
    pub fn mode(&self) -> PathMatch {
        self.mode
    }

    #[must_use]
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    #[must_use]
    pub fn requires_auth(&self, path: &str) -> bool {
        if path.is_empty() || self.excluded.is_empty() {
            return true;
        }
        match self.mode {
            PathMatch::Exact => {
                let path = normalize_path(path);
                !self.excluded.iter().any(|entry| *entry == path)
            }
            PathMatch::Prefix => !self.excluded.iter().any(|entry| entry.starts_with(path)),
        }
    }
}

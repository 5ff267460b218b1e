// src/job_conf.rs
//
// Read-only job configuration handed to every task.

use crate::defaults::{KEY_CLASSIFIER, KEY_RECONCILE};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[path = "job_conf_test.rs"]
mod job_conf_test;

/// Immutable string-to-string job configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobConf {
    entries: BTreeMap<String, String>,
}

/// Which per-record classification the mapper performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    /// Top hit of an external alignment search
    Blast,
    /// GC percentage of the sequence, no external tool
    GcContent,
}

/// How the reducer collapses candidates sharing a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// First candidate in delivery order
    FirstSeen,
    /// Lexicographically smallest label, independent of delivery order
    SmallestLabel,
}

impl FromStr for ClassifierKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "blast" => Ok(ClassifierKind::Blast),
            "gc" => Ok(ClassifierKind::GcContent),
            _ => Err(format!("unknown classifier '{}' (expected blast or gc)", s)),
        }
    }
}

impl FromStr for ReconcilePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "first" => Ok(ReconcilePolicy::FirstSeen),
            "min" => Ok(ReconcilePolicy::SmallestLabel),
            _ => Err(format!("unknown reconcile policy '{}' (expected first or min)", s)),
        }
    }
}

impl JobConf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, later values replace earlier ones
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load `key=value` lines; blank lines and `#` comments are ignored
    pub fn load_properties(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut entries = BTreeMap::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = parse_define(line).map_err(|_| Error::InvalidConfig {
                key: format!("{}:{}", path.display(), lineno + 1),
                value: line.to_string(),
            })?;
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }

    /// Overlay `other` on top of `self`
    pub fn merged(mut self, other: JobConf) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Look up a key that has no meaningful default
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(Error::MissingConfig(key.to_string())),
        }
    }

    pub fn classifier(&self) -> Result<ClassifierKind> {
        self.parse_or(KEY_CLASSIFIER, ClassifierKind::Blast)
    }

    pub fn reconcile_policy(&self) -> Result<ReconcilePolicy> {
        self.parse_or(KEY_RECONCILE, ReconcilePolicy::FirstSeen)
    }

    fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| Error::InvalidConfig {
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a `key=value` definition as given to `-D`
pub fn parse_define(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Definition must be KEY=VALUE: {}", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Definition has an empty key: {}", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

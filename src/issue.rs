//! Diagnostics collected while converting, and the result handed back to callers.
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::Document;
use crate::version::{SourceFormat, Version};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Ordered: `Info < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A deliberate, lossless choice was made.
    Info,
    /// Lossy, best-effort translation.
    Warning,
    /// No equivalent in the target dialect; dropped.
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionIssue {
    /// Dot/bracket location, e.g. `paths./pets.get.parameters[0]`.
    pub path: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Maps a location in the source tree to where it was written.
///
/// Keys use JSONPath-like syntax rooted at [`LOOKUP_ROOT`], e.g. `$.paths./pets.get`.
pub trait PositionLookup: Send + Sync {
    fn position(&self, path: &str) -> Option<SourcePosition>;
}

pub const LOOKUP_ROOT: &str = "$";

/// Load-time numbers passed through from the loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub paths: usize,
    pub operations: usize,
    pub schemas: usize,
    pub references: usize,
}

/// Append-only issue ledger for one conversion call.
pub struct Issues<'a> {
    items: Vec<ConversionIssue>,
    positions: Option<&'a dyn PositionLookup>,
}

#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Shares the source allocation only for same-version conversions.
    pub document: Arc<Document>,
    pub source_version: String,
    pub target_version: String,
    pub source: Version,
    pub target: Version,
    pub source_format: SourceFormat,
    pub issues: Vec<ConversionIssue>,
    pub info_count: usize,
    pub warning_count: usize,
    pub critical_count: usize,
    /// `true` iff there are no critical issues.
    pub success: bool,
    pub load_time: Option<Duration>,
    pub size: Option<u64>,
    pub stats: Option<DocumentStats>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'a> Issues<'a> {
    pub fn new() -> Self {
        Self { items: Vec::new(), positions: None }
    }

    pub fn with_positions(positions: Option<&'a dyn PositionLookup>) -> Self {
        Self { items: Vec::new(), positions }
    }

    /// The single issue builder: every finding goes through here, and position
    /// back-fill happens here once.
    pub fn add(
        &mut self,
        severity: Severity,
        path: impl Into<String>,
        message: impl Into<String>,
        context: Option<String>,
    ) {
        let path = path.into();
        let position = self.positions.and_then(|lookup| lookup.position(&lookup_key(&path)));
        let (line, column, file) = match position {
            Some(p) => (Some(p.line), Some(p.column), p.file),
            None => (None, None, None),
        };
        let issue = ConversionIssue {
            path,
            message: message.into(),
            severity,
            context,
            line,
            column,
            file,
        };
        log::debug!("{:?} at {}: {}", issue.severity, issue.path, issue.message);
        self.items.push(issue);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[ConversionIssue] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<ConversionIssue> {
        self.items
    }
}

impl Default for Issues<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a dotted location into the lookup's path syntax.
pub fn lookup_key(path: &str) -> String {
    if path.starts_with(LOOKUP_ROOT) {
        path.to_string()
    } else if path.is_empty() {
        LOOKUP_ROOT.to_string()
    } else {
        format!("{LOOKUP_ROOT}.{path}")
    }
}

/// Join a location with a child key or segment.
pub fn at(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else if child.starts_with('[') {
        format!("{parent}{child}")
    } else {
        format!("{parent}.{child}")
    }
}

pub fn index(parent: &str, i: usize) -> String {
    format!("{parent}[{i}]")
}

impl PositionLookup for IndexMap<String, SourcePosition> {
    fn position(&self, path: &str) -> Option<SourcePosition> {
        self.get(path).cloned()
    }
}

impl ConversionResult {
    /// Recompute the counters and success flag from the issue list.
    pub fn recount(&mut self) {
        self.info_count = self.count(Severity::Info);
        self.warning_count = self.count(Severity::Warning);
        self.critical_count = self.count(Severity::Critical);
        self.success = self.critical_count == 0;
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn issues_with(&self, severity: Severity) -> impl Iterator<Item = &ConversionIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    pub fn has_issues(&self) -> bool {
        self.info_count + self.warning_count + self.critical_count > 0
    }

    /// Any warning or critical finding.
    pub fn is_lossy(&self) -> bool {
        self.warning_count + self.critical_count > 0
    }
}
